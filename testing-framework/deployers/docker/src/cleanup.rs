use std::{thread, time::Duration};

use testnet_config::adjust_timeout;
use tracing::{debug, info, warn};

use crate::{
    commands::{DockerCommandError, docker, run_docker_command},
    lifecycle::{SharedState, lock},
    workspace::DockerWorkspace,
};

const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(60);

/// Removes every container and the private network when dropped.
///
/// With `TESTNET_RUNNER_PRESERVE` set, containers keep running and the
/// workspace directory is left on disk for inspection.
pub struct DockerCleanup {
    project: String,
    network: Option<String>,
    workspace: Option<DockerWorkspace>,
    state: SharedState,
}

impl DockerCleanup {
    pub(crate) fn new(
        project: String,
        network: Option<String>,
        workspace: DockerWorkspace,
        state: SharedState,
    ) -> Self {
        Self {
            project,
            network,
            workspace: Some(workspace),
            state,
        }
    }

    fn persist_workspace(&mut self) {
        if let Some(workspace) = self.workspace.take() {
            let keep = workspace.into_inner().keep();
            info!(path = %keep.display(), "preserving docker workspace");
        }
        info!(project = %self.project, "preserve flag set; leaving containers running");
    }

    fn teardown(&self) {
        let containers: Vec<String> = lock(&self.state)
            .containers
            .values()
            .map(|record| record.name.clone())
            .collect();
        let network = self.network.clone();
        let limit = adjust_timeout(TEARDOWN_TIMEOUT);

        if let Err(err) = run_blocking(async move {
            for name in &containers {
                if let Err(err) =
                    run_docker_command(docker(&["rm", "-f", name]), limit, "docker rm")
                        .await
                {
                    warn!(container = %name, error = %err, "failed to remove container");
                }
            }
            if let Some(network) = network {
                run_docker_command(
                    docker(&["network", "rm", &network]),
                    limit,
                    "docker network rm",
                )
                .await?;
            }
            Ok(())
        }) {
            warn!(project = %self.project, error = %err, "docker teardown failed");
        }
        lock(&self.state).containers.clear();
    }
}

impl Drop for DockerCleanup {
    fn drop(&mut self) {
        let preserve = testnet_env::testnet_runner_preserve();
        debug!(project = %self.project, preserve, "docker cleanup started");
        if preserve {
            self.persist_workspace();
            return;
        }
        self.teardown();
    }
}

/// Drive `fut` on a dedicated thread so teardown works from inside or outside
/// a tokio runtime.
fn run_blocking<F>(fut: F) -> Result<(), DockerCommandError>
where
    F: std::future::Future<Output = Result<(), DockerCommandError>> + Send + 'static,
{
    let handle = thread::spawn(move || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| DockerCommandError::Spawn {
                command: "docker teardown".into(),
                source,
            })?
            .block_on(fut)
    });

    handle.join().map_err(|_| DockerCommandError::Spawn {
        command: "docker teardown".into(),
        source: std::io::Error::other("teardown thread panicked"),
    })?
}
