use super::command::CommandLauncher;
use super::BackendLifecycle;
use crate::config::GlobalConfig;
use crate::error::{LlmSwapError, Result};
use crate::models::alias::Alias;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// `llama-server --model <resolved-path> --ctx-size <n_ctx> --port <port>
/// [command_params...]`.
pub struct LlamaCppLifecycle {
    launcher: CommandLauncher,
}

impl LlamaCppLifecycle {
    pub fn new(alias: &Alias, port: u16, global: &GlobalConfig) -> Result<Self> {
        let model_path = resolve_model_path(&alias.model.model_id, global)?;
        let mut command = Command::new("llama-server");
        command
            .arg("--model")
            .arg(&model_path)
            .arg("--ctx-size")
            .arg(alias.n_ctx.to_string())
            .arg("--port")
            .arg(port.to_string())
            .args(&alias.command_params);
        Ok(Self {
            launcher: CommandLauncher::new(command),
        })
    }
}

/// The alias's `model_id` verbatim if it is an absolute path ending in
/// `.gguf`, else looked up under the global config's `llamacpp_model_dir`
/// with `.gguf` appended if missing.
fn resolve_model_path(model_id: &str, global: &GlobalConfig) -> Result<PathBuf> {
    let path = Path::new(model_id);
    if model_id.ends_with(".gguf") && path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let model_dir = global
        .llamacpp_model_dir
        .as_ref()
        .ok_or_else(|| LlmSwapError::ModelNotFound(format!("{model_id} (no llamacpp_model_dir configured)")))?;
    let model_dir = shellexpand::tilde(model_dir).to_string();

    let file_name = if model_id.ends_with(".gguf") {
        model_id.to_string()
    } else {
        format!("{model_id}.gguf")
    };
    let resolved = Path::new(&model_dir).join(file_name);

    if !resolved.exists() {
        return Err(LlmSwapError::ModelNotFound(resolved.display().to_string()));
    }
    Ok(resolved)
}

#[async_trait]
impl BackendLifecycle for LlamaCppLifecycle {
    async fn start(&mut self) -> Result<()> {
        self.launcher.spawn().await
    }

    async fn stop(&mut self) -> Result<()> {
        self.launcher.terminate_and_wait().await;
        Ok(())
    }

    async fn check_running(&mut self) -> bool {
        self.launcher.is_alive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::alias::BackendKind;

    fn global_with_dir(dir: &Path) -> GlobalConfig {
        GlobalConfig {
            aliases: Default::default(),
            llamacpp_model_dir: Some(dir.to_string_lossy().into_owned()),
        }
    }

    #[test]
    fn absolute_gguf_path_is_used_verbatim() {
        let global = GlobalConfig::default();
        let resolved = resolve_model_path("/models/mistral.gguf", &global).unwrap();
        assert_eq!(resolved, PathBuf::from("/models/mistral.gguf"));
    }

    #[test]
    fn bare_name_resolves_under_model_dir_with_gguf_appended() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mistral-7b.gguf"), b"").unwrap();
        let global = global_with_dir(dir.path());
        let resolved = resolve_model_path("mistral-7b", &global).unwrap();
        assert_eq!(resolved, dir.path().join("mistral-7b.gguf"));
    }

    #[test]
    fn missing_model_file_fails_with_model_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let global = global_with_dir(dir.path());
        let err = resolve_model_path("ghost", &global).unwrap_err();
        assert!(matches!(err, LlmSwapError::ModelNotFound(_)));
    }

    #[test]
    fn missing_model_dir_config_fails_with_model_not_found() {
        let global = GlobalConfig::default();
        let err = resolve_model_path("anything", &global).unwrap_err();
        assert!(matches!(err, LlmSwapError::ModelNotFound(_)));
    }

    #[test]
    fn construction_wires_backend_kind_check() {
        let alias = Alias::new("m", "/models/m.gguf", BackendKind::Llamacpp, 2048, vec![]);
        let global = GlobalConfig::default();
        assert!(LlamaCppLifecycle::new(&alias, 8000, &global).is_ok());
    }
}
