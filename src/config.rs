use crate::error::{LlmSwapError, Result};
use crate::models::alias::{Alias, AliasModel, BackendKind, DEFAULT_N_CTX};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One alias entry as it appears under `aliases:` in either YAML source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasConfig {
    pub model_name: String,
    pub backend: BackendKind,
    #[serde(default = "default_n_ctx")]
    pub n_ctx: u32,
    #[serde(default)]
    pub command_params: Vec<String>,
}

fn default_n_ctx() -> u32 {
    DEFAULT_N_CTX
}

impl AliasConfig {
    pub fn to_alias(&self, name: &str) -> Alias {
        Alias {
            name: name.to_string(),
            model: AliasModel {
                model_id: self.model_name.clone(),
                backend: self.backend,
            },
            n_ctx: self.n_ctx,
            command_params: self.command_params.clone(),
        }
    }
}

/// Shared shape of the global and project configs: a name-keyed table of
/// alias definitions. The global config additionally carries
/// `llamacpp_model_dir`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub aliases: HashMap<String, AliasConfig>,
    #[serde(default)]
    pub llamacpp_model_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub aliases: HashMap<String, AliasConfig>,
}

fn aliases_from(table: &HashMap<String, AliasConfig>) -> Vec<Alias> {
    table.iter().map(|(name, cfg)| cfg.to_alias(name)).collect()
}

impl GlobalConfig {
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| {
            LlmSwapError::Config("could not determine config directory".into())
        })?;
        Ok(base.join("llmswap").join("config.yaml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: GlobalConfig = serde_yaml::from_str(&content)
            .map_err(|e| LlmSwapError::Config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)
            .map_err(|e| LlmSwapError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get_aliases(&self) -> Vec<Alias> {
        aliases_from(&self.aliases)
    }
}

impl ProjectConfig {
    /// `./.llmswap.yaml` in the current working directory.
    pub fn path() -> Result<PathBuf> {
        Ok(std::env::current_dir()?.join(".llmswap.yaml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: ProjectConfig = serde_yaml::from_str(&content)
            .map_err(|e| LlmSwapError::Config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    pub fn get_aliases(&self) -> Vec<Alias> {
        aliases_from(&self.aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.yaml");
        let cfg = GlobalConfig::load_from(&path).unwrap();
        assert!(cfg.aliases.is_empty());
    }

    #[test]
    fn parses_aliases_and_model_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            "llamacpp_model_dir: /models\naliases:\n  mistral:\n    model_name: mistral-7b\n    backend: llamacpp\n    n_ctx: 8192\n    command_params: [\"--flash-attn\"]\n"
        )
        .unwrap();

        let cfg = GlobalConfig::load_from(&path).unwrap();
        assert_eq!(cfg.llamacpp_model_dir.as_deref(), Some("/models"));
        let aliases = cfg.get_aliases();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].name, "mistral");
        assert_eq!(aliases[0].n_ctx, 8192);
        assert_eq!(aliases[0].command_params, vec!["--flash-attn".to_string()]);
    }

    #[test]
    fn default_n_ctx_applies_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "aliases:\n  tiny:\n    model_name: tinyllama\n    backend: ollama\n",
        )
        .unwrap();

        let cfg = ProjectConfig::load_from(&path).unwrap();
        assert_eq!(cfg.get_aliases()[0].n_ctx, DEFAULT_N_CTX);
    }

    #[test]
    fn malformed_yaml_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "aliases: [this, is, not, a, map]").unwrap();
        assert!(GlobalConfig::load_from(&path).is_err());
    }
}
