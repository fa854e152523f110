use std::{process::Stdio, time::Duration};

use thiserror::Error;
use tokio::{process::Command, time::timeout};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DockerCommandError {
    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Run a docker command to completion, returning its trimmed stdout.
pub async fn run_docker_command(
    mut command: Command,
    limit: Duration,
    description: &str,
) -> Result<String, DockerCommandError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(command = description, timeout = ?limit, "running docker command");

    let output = timeout(limit, command.output())
        .await
        .map_err(|_| {
            warn!(command = description, timeout = ?limit, "docker command timed out");
            DockerCommandError::Timeout {
                command: description.to_owned(),
                timeout: limit,
            }
        })?
        .map_err(|source| DockerCommandError::Spawn {
            command: description.to_owned(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        warn!(
            command = description,
            status = %output.status,
            stderr = %stderr,
            "docker command failed"
        );
        return Err(DockerCommandError::Failed {
            command: description.to_owned(),
            status: output.status,
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

/// `true` when `docker info` succeeds within `limit`.
pub async fn docker_available(limit: Duration) -> bool {
    let mut command = Command::new("docker");
    command.arg("info");
    run_docker_command(command, limit, "docker info").await.is_ok()
}

pub fn docker(args: &[&str]) -> Command {
    let mut command = Command::new("docker");
    command.args(args);
    command
}
