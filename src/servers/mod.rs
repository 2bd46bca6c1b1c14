pub mod command;
pub mod llamacpp;
pub mod ollama;

use crate::error::{LlmSwapError, Result};
use crate::models::alias::Alias;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// `stopped -> starting -> running -> stopping -> stopped`, cyclically.
/// No other transition is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Capability set a concrete backend process must implement. `start` must
/// return as soon as the launch is *initiated*, not when ready, and must be
/// idempotent if the process is already live. `stop` must be idempotent and
/// tolerate an already-dead process.
#[async_trait]
pub trait BackendLifecycle: Send {
    async fn start(&mut self) -> Result<()>;
    async fn stop(&mut self) -> Result<()>;
    async fn check_running(&mut self) -> bool;

    /// Generic readiness probe shared by every variant: poll `/models`
    /// until 200 or timeout. Variants with their own readiness protocol
    /// (e.g. Ollama warms up inside `start`) may override this.
    async fn wait_until_ready(&mut self, port: u16) -> Result<()> {
        wait_until_ready(port, DEFAULT_READY_TIMEOUT).await
    }
}

const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Polls `GET http://localhost:{port}/models` every 500ms until a 200
/// response or `timeout` elapses. Transport errors are swallowed and
/// retried; only exhausting the timeout is a failure.
pub async fn wait_until_ready(port: u16, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("http://localhost:{port}/models");
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            _ => {}
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(LlmSwapError::ReadinessTimeout(timeout.as_secs_f64()));
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
}

/// A tracked running-or-transitioning backend process. The manager owns
/// this value outright; there is no back-reference from here to the
/// manager, matching the source's alias-by-value coupling.
pub struct Server {
    pub alias: Alias,
    pub port: u16,
    pub status: ServerStatus,
    lifecycle: Box<dyn BackendLifecycle>,
}

impl Server {
    pub fn new(alias: Alias, port: u16, lifecycle: Box<dyn BackendLifecycle>) -> Self {
        Self {
            alias,
            port,
            status: ServerStatus::Stopped,
            lifecycle,
        }
    }

    pub async fn check_running(&mut self) -> bool {
        self.lifecycle.check_running().await
    }

    /// `status <- starting; start(); wait_until_ready(); status <- running`.
    pub async fn start_and_wait(&mut self) -> Result<()> {
        self.status = ServerStatus::Starting;
        if let Err(e) = self.lifecycle.start().await {
            self.status = ServerStatus::Stopped;
            return Err(e);
        }
        if let Err(e) = self.lifecycle.wait_until_ready(self.port).await {
            warn!(alias = %self.alias.name, "readiness timeout, stopping partially-started server");
            let _ = self.lifecycle.stop().await;
            self.status = ServerStatus::Stopped;
            return Err(e);
        }
        self.status = ServerStatus::Running;
        debug!(alias = %self.alias.name, port = self.port, "server running");
        Ok(())
    }

    /// `status <- stopping; stop(); poll check_running until false; status <- stopped`.
    pub async fn stop_and_wait(&mut self) {
        self.status = ServerStatus::Stopping;
        let _ = self.lifecycle.stop().await;
        while self.lifecycle.check_running().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.status = ServerStatus::Stopped;
        debug!(alias = %self.alias.name, "server stopped");
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// An in-memory lifecycle with no real process, used by server-manager
    /// tests. Mirrors the Python suite's `MockServer`/`EvictableMockServer`.
    #[derive(Clone)]
    pub struct MockLifecycle {
        running: Arc<Mutex<bool>>,
        pub never_ready: bool,
    }

    impl MockLifecycle {
        pub fn new() -> Self {
            Self {
                running: Arc::new(Mutex::new(false)),
                never_ready: false,
            }
        }
    }

    #[async_trait]
    impl BackendLifecycle for MockLifecycle {
        async fn start(&mut self) -> Result<()> {
            *self.running.lock().await = true;
            Ok(())
        }

        async fn stop(&mut self) -> Result<()> {
            *self.running.lock().await = false;
            Ok(())
        }

        async fn check_running(&mut self) -> bool {
            *self.running.lock().await
        }

        async fn wait_until_ready(&mut self, _port: u16) -> Result<()> {
            if self.never_ready {
                Err(LlmSwapError::ReadinessTimeout(0.01))
            } else {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MockLifecycle;
    use super::*;
    use crate::models::alias::BackendKind;

    fn alias() -> Alias {
        Alias::new("a", "m", BackendKind::Ollama, 2048, vec![])
    }

    #[tokio::test]
    async fn status_sequence_follows_legal_transitions_on_stop() {
        let mut server = Server::new(alias(), 0, Box::new(MockLifecycle::new()));
        server.status = ServerStatus::Running;
        server.stop_and_wait().await;
        assert_eq!(server.status, ServerStatus::Stopped);
        assert!(!server.check_running().await);
    }

    #[tokio::test]
    async fn start_and_wait_reaches_running() {
        let mut server = Server::new(alias(), 0, Box::new(MockLifecycle::new()));
        server.start_and_wait().await.unwrap();
        assert_eq!(server.status, ServerStatus::Running);
    }

    #[tokio::test]
    async fn readiness_timeout_leaves_server_stopped() {
        let mut lifecycle = MockLifecycle::new();
        lifecycle.never_ready = true;
        let mut server = Server::new(alias(), 0, Box::new(lifecycle));
        let err = server.start_and_wait().await.unwrap_err();
        assert!(matches!(err, LlmSwapError::ReadinessTimeout(_)));
        assert_eq!(server.status, ServerStatus::Stopped);
    }
}
