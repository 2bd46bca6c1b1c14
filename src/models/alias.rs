use serde::{Deserialize, Serialize};

/// A concrete inference engine family. Adding a new backend means adding a
/// variant here, a default port in `crate::port_allocator`, and a lifecycle
/// strategy in `crate::servers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Llamacpp,
    Ollama,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Llamacpp => write!(f, "llamacpp"),
            BackendKind::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llamacpp" | "llama.cpp" | "llama_cpp" => Ok(BackendKind::Llamacpp),
            "ollama" => Ok(BackendKind::Ollama),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// The underlying model identifier plus the backend that serves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasModel {
    pub model_id: String,
    pub backend: BackendKind,
}

/// A symbolic name resolving to a concrete model, backend and launch
/// configuration. Immutable once constructed; equality is structural,
/// including the order of `command_params`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub model: AliasModel,
    pub n_ctx: u32,
    pub command_params: Vec<String>,
}

impl Alias {
    pub fn new(
        name: impl Into<String>,
        model_id: impl Into<String>,
        backend: BackendKind,
        n_ctx: u32,
        command_params: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: AliasModel {
                model_id: model_id.into(),
                backend,
            },
            n_ctx,
            command_params,
        }
    }
}

pub const DEFAULT_N_CTX: u32 = 4096;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_structural_including_param_order() {
        let a = Alias::new("m", "id", BackendKind::Ollama, 2048, vec!["--a".into(), "--b".into()]);
        let b = Alias::new("m", "id", BackendKind::Ollama, 2048, vec!["--a".into(), "--b".into()]);
        let c = Alias::new("m", "id", BackendKind::Ollama, 2048, vec!["--b".into(), "--a".into()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn backend_kind_parses_common_spellings() {
        assert_eq!("llama.cpp".parse::<BackendKind>().unwrap(), BackendKind::Llamacpp);
        assert_eq!("Ollama".parse::<BackendKind>().unwrap(), BackendKind::Ollama);
        assert!("vllm".parse::<BackendKind>().is_err());
    }
}
