use std::{
    collections::BTreeMap,
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Context as _, anyhow};
use async_trait::async_trait;
use testnet_config::{adjust_timeout, constants::TEST_VOLUME_MOUNTPOINT};
use testnet_core::topology::{DynError, ServiceLifecycle, ServiceSpec, StartedService};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    cleanup::DockerCleanup,
    commands::{docker, docker_available, run_docker_command},
    network::{IpAllocator, Subnet},
    workspace::DockerWorkspace,
};

const DOCKER_INFO_TIMEOUT: Duration = Duration::from_secs(10);
const NETWORK_TIMEOUT: Duration = Duration::from_secs(30);
const RUN_TIMEOUT: Duration = Duration::from_secs(120);
const REMOVE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContainerRecord {
    pub name: String,
    pub ip: Ipv4Addr,
}

#[derive(Debug)]
pub(crate) struct RunnerState {
    allocator: IpAllocator,
    pub containers: BTreeMap<String, ContainerRecord>,
}

/// Shared between the lifecycle and its cleanup guard.
pub(crate) type SharedState = Arc<Mutex<RunnerState>>;

pub(crate) fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, RunnerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs every node as a container on a private bridge network with a fixed
/// subnet, so each address is known before the node command is rendered.
#[derive(Debug)]
pub struct DockerLifecycle {
    project: String,
    network: String,
    workspace_root: PathBuf,
    state: SharedState,
}

impl DockerLifecycle {
    /// Verify docker, create the network and workspace, and return the
    /// lifecycle together with the guard that tears everything down.
    pub async fn create() -> anyhow::Result<(Self, DockerCleanup)> {
        if !docker_available(adjust_timeout(DOCKER_INFO_TIMEOUT)).await {
            return Err(anyhow!("docker is not available (`docker info` failed)"));
        }

        let project = project_name();
        let subnet = Subnet::from_env();
        let (network, owns_network) = match testnet_env::testnet_docker_network() {
            Some(existing) => (existing, false),
            None => (format!("{project}-net"), true),
        };

        if owns_network {
            let subnet_arg = subnet.to_string();
            run_docker_command(
                docker(&[
                    "network",
                    "create",
                    "--driver",
                    "bridge",
                    "--subnet",
                    &subnet_arg,
                    &network,
                ]),
                adjust_timeout(NETWORK_TIMEOUT),
                "docker network create",
            )
            .await
            .with_context(|| format!("creating docker network {network}"))?;
        }

        let workspace = DockerWorkspace::create()?;
        let state = Arc::new(Mutex::new(RunnerState {
            allocator: IpAllocator::new(subnet),
            containers: BTreeMap::new(),
        }));

        info!(project = %project, network = %network, subnet = %subnet, "docker runner ready");

        let lifecycle = Self {
            project: project.clone(),
            network: network.clone(),
            workspace_root: workspace.root_path().to_path_buf(),
            state: Arc::clone(&state),
        };
        let cleanup =
            DockerCleanup::new(project, owns_network.then_some(network), workspace, state);
        Ok((lifecycle, cleanup))
    }

    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    #[must_use]
    pub fn network(&self) -> &str {
        &self.network
    }

    #[must_use]
    pub fn container_name(&self, service_id: &str) -> String {
        format!("{}-{service_id}", self.project)
    }

    #[must_use]
    pub fn running_services(&self) -> Vec<String> {
        lock(&self.state).containers.keys().cloned().collect()
    }

    #[must_use]
    pub fn service_ip(&self, service_id: &str) -> Option<IpAddr> {
        lock(&self.state)
            .containers
            .get(service_id)
            .map(|record| IpAddr::V4(record.ip))
    }

    fn reserve(&self, service_id: &str) -> anyhow::Result<Ipv4Addr> {
        let mut state = lock(&self.state);
        if state.containers.contains_key(service_id) {
            return Err(anyhow!("service {service_id} is already running"));
        }
        Ok(state.allocator.allocate()?)
    }
}

#[async_trait]
impl ServiceLifecycle for DockerLifecycle {
    async fn start_service(&self, spec: ServiceSpec) -> Result<StartedService, DynError> {
        let ip = self.reserve(&spec.service_id)?;
        let host_dir = self.workspace_root.join(&spec.service_id);
        let mounted = DockerWorkspace::materialise_into(&host_dir, &spec.files)?;
        let command = spec.command.render(IpAddr::V4(ip), &mounted);
        let name = self.container_name(&spec.service_id);

        let args = run_args(&name, &self.network, ip, &host_dir, &spec.image, &command);
        debug!(service = %spec.service_id, container = %name, %ip, "starting container");
        let container_id =
            run_docker_command(docker(&as_strs(&args)), adjust_timeout(RUN_TIMEOUT), "docker run")
                .await
                .with_context(|| format!("starting container for {}", spec.service_id))?;

        lock(&self.state).containers.insert(
            spec.service_id.clone(),
            ContainerRecord {
                name: name.clone(),
                ip,
            },
        );
        info!(
            service = %spec.service_id,
            container = %name,
            container_id = %container_id,
            %ip,
            "container started"
        );

        Ok(StartedService { ip: IpAddr::V4(ip) })
    }

    async fn stop_service(&self, service_id: &str, grace: Duration) -> Result<(), DynError> {
        let record = lock(&self.state)
            .containers
            .get(service_id)
            .cloned()
            .ok_or_else(|| anyhow!("service {service_id} is not running"))?;

        let grace_secs = grace.as_secs().to_string();
        run_docker_command(
            docker(&["stop", "-t", &grace_secs, &record.name]),
            grace + adjust_timeout(REMOVE_TIMEOUT),
            "docker stop",
        )
        .await
        .with_context(|| format!("stopping container {}", record.name))?;
        run_docker_command(
            docker(&["rm", "-f", &record.name]),
            adjust_timeout(REMOVE_TIMEOUT),
            "docker rm",
        )
        .await
        .with_context(|| format!("removing container {}", record.name))?;

        lock(&self.state).containers.remove(service_id);
        info!(service = service_id, container = %record.name, "container stopped");
        Ok(())
    }
}

fn project_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("testnet-{}", &id[..8])
}

fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

/// Arguments of the `docker run` invocation for one node container.
#[must_use]
pub fn run_args(
    name: &str,
    network: &str,
    ip: Ipv4Addr,
    host_dir: &Path,
    image: &str,
    command: &[String],
) -> Vec<String> {
    let mut args = vec![
        "run".to_owned(),
        "-d".to_owned(),
        "--name".to_owned(),
        name.to_owned(),
        "--network".to_owned(),
        network.to_owned(),
        "--ip".to_owned(),
        ip.to_string(),
        "-v".to_owned(),
        format!("{}:{TEST_VOLUME_MOUNTPOINT}", host_dir.display()),
        image.to_owned(),
    ];
    args.extend(command.iter().cloned());
    args
}
