// Shell command tasks

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::engine::TaskAction;

/// Runs a command line through a shell; a non-zero exit status is a failure.
#[derive(Debug, Clone)]
pub struct CommandAction {
    shell: String,
    command: String,
}

impl CommandAction {
    pub fn new(shell: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            command: command.into(),
        }
    }
}

#[async_trait]
impl TaskAction for CommandAction {
    async fn execute(&self) -> Result<()> {
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(&self.command)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to spawn `{}` via {}", self.command, self.shell))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(command = %self.command, stdout = %stdout.trim_end(), "Command output");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                bail!("command `{}` exited with {}", self.command, output.status);
            }
            bail!("command `{}` exited with {}: {}", self.command, output.status, stderr);
        }
        Ok(())
    }
}
