use super::command::CommandLauncher;
use super::BackendLifecycle;
use crate::error::{LlmSwapError, Result};
use crate::models::alias::Alias;
use async_trait::async_trait;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;

const API_READY_TIMEOUT: Duration = Duration::from_secs(15);
const WARMUP_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const WARMUP_ATTEMPTS: u32 = 20;

/// Ollama does not accept a per-request context size via its native API,
/// so `start` drives a four-step protocol: spawn `ollama serve`, wait for
/// its API, materialize a Modelfile pinning `n_ctx`, then warm the model
/// with a dummy chat completion.
pub struct OllamaLifecycle {
    launcher: CommandLauncher,
    port: u16,
    model_id: String,
    n_ctx: u32,
    tag: String,
    modelfile_dir: TempDir,
    client: reqwest::Client,
}

impl OllamaLifecycle {
    pub fn new(alias: &Alias, port: u16) -> Result<Self> {
        let tag = format!("{}-ctx{}-{}", alias.model.model_id, alias.n_ctx, port);
        let mut command = Command::new("ollama");
        command.arg("serve").env("OLLAMA_HOST", format!("localhost:{port}"));
        Ok(Self {
            launcher: CommandLauncher::new(command),
            port,
            model_id: alias.model.model_id.clone(),
            n_ctx: alias.n_ctx,
            tag,
            modelfile_dir: TempDir::new()?,
            client: reqwest::Client::new(),
        })
    }

    fn modelfile_path(&self) -> std::path::PathBuf {
        self.modelfile_dir.path().join("Modelfile")
    }

    fn write_modelfile(&self) -> Result<()> {
        let contents = format!("FROM {}\nPARAMETER n_ctx {}\n", self.model_id, self.n_ctx);
        std::fs::write(self.modelfile_path(), contents)?;
        Ok(())
    }

    async fn wait_for_api_ready(&self) -> Result<()> {
        let url = format!("http://localhost:{}/v1/status", self.port);
        let deadline = tokio::time::Instant::now() + API_READY_TIMEOUT;
        loop {
            if let Ok(resp) = self.client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(LlmSwapError::ApiReadinessTimeout(API_READY_TIMEOUT.as_secs_f64()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Exit status is intentionally not checked: a failed `ollama create`
    /// is left to surface through `warm_up`'s own timeout rather than
    /// raised here.
    async fn ollama_create(&self) -> Result<()> {
        self.write_modelfile()?;
        Command::new("ollama")
            .arg("create")
            .arg(&self.tag)
            .arg("-f")
            .arg(self.modelfile_path())
            .status()
            .await?;
        Ok(())
    }

    async fn warm_up(&self) -> Result<()> {
        let url = format!("http://localhost:{}/v1/chat/completions", self.port);
        let payload = serde_json::json!({
            "model": self.tag,
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": false,
        });
        for _ in 0..WARMUP_ATTEMPTS {
            if let Ok(resp) = self.client.post(&url).json(&payload).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Err(LlmSwapError::WarmupTimeout(WARMUP_TIMEOUT.as_secs_f64()))
    }
}

#[async_trait]
impl BackendLifecycle for OllamaLifecycle {
    async fn start(&mut self) -> Result<()> {
        if self.launcher.is_alive() {
            return Ok(());
        }
        self.launcher.spawn().await?;
        self.wait_for_api_ready().await?;
        self.ollama_create().await?;
        self.warm_up().await?;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        // Best-effort: a race where the process is already gone must not
        // surface as an error.
        self.launcher.terminate_and_wait().await;
        let _ = std::fs::remove_dir_all(self.modelfile_dir.path());
        Ok(())
    }

    async fn check_running(&mut self) -> bool {
        self.launcher.is_alive()
    }

    /// Ollama's own readiness protocol already ran to completion inside
    /// `start`; there is no separate generic `/models` probe to repeat.
    async fn wait_until_ready(&mut self, _port: u16) -> Result<()> {
        Ok(())
    }
}
