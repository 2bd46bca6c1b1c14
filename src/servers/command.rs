use crate::error::Result;
use std::time::Duration;
use tokio::process::{Child, Command};

const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Shared plumbing for every backend that is ultimately "run a shell
/// command and supervise the child process": stdio is redirected away from
/// the parent terminal, the child is placed in its own process group so
/// descendants (e.g. Ollama's model loader) can be reaped together, and
/// termination is graceful-then-forceful.
pub struct CommandLauncher {
    command: Command,
    child: Option<Child>,
}

impl CommandLauncher {
    pub fn new(mut command: Command) -> Self {
        command
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .stdin(std::process::Stdio::null());
        new_process_group(&mut command);
        Self { command, child: None }
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Idempotent: a second call while the child is alive is a no-op.
    pub async fn spawn(&mut self) -> Result<()> {
        if self.is_alive() {
            return Ok(());
        }
        let child = self.command.spawn()?;
        self.child = Some(child);
        Ok(())
    }

    pub fn is_alive(&mut self) -> bool {
        match &mut self.child {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// SIGTERM the process group, give it `GRACE_PERIOD` to exit, then
    /// SIGKILL. Idempotent and tolerant of an already-dead process.
    pub async fn terminate_and_wait(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Some(pid) = child.id() {
            terminate_process_group(pid);
        }
        if tokio::time::timeout(GRACE_PERIOD, child.wait()).await.is_err() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

#[cfg(unix)]
fn new_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    // pgid 0 -> the new process becomes its own group leader, so killing
    // the group later reaches children it spawns (e.g. Ollama's loader).
    command.process_group(0);
}

#[cfg(not(unix))]
fn new_process_group(_command: &mut Command) {}

#[cfg(unix)]
fn terminate_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;
    let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM);
}

#[cfg(not(unix))]
fn terminate_process_group(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_and_terminate_a_real_process() {
        let mut launcher = CommandLauncher::new({
            let mut cmd = Command::new("sleep");
            cmd.arg("30");
            cmd
        });
        launcher.spawn().await.unwrap();
        assert!(launcher.is_alive());
        launcher.terminate_and_wait().await;
        assert!(!launcher.is_alive());
    }

    #[tokio::test]
    async fn spawn_is_idempotent_while_alive() {
        let mut launcher = CommandLauncher::new({
            let mut cmd = Command::new("sleep");
            cmd.arg("30");
            cmd
        });
        launcher.spawn().await.unwrap();
        let first_pid = launcher.pid();
        launcher.spawn().await.unwrap();
        assert_eq!(launcher.pid(), first_pid);
        launcher.terminate_and_wait().await;
    }

    #[tokio::test]
    async fn terminate_tolerates_never_having_started() {
        let mut launcher = CommandLauncher::new(Command::new("true"));
        launcher.terminate_and_wait().await;
        assert!(!launcher.is_alive());
    }
}
