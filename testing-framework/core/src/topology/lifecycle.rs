use std::{
    collections::{BTreeMap, HashMap},
    error::Error,
    net::IpAddr,
    path::PathBuf,
    time::Duration,
};

/// Type-erased error surfaced by lifecycle implementations.
pub type DynError = Box<dyn Error + Send + Sync + 'static>;

/// Renders the container command once the IP and file mounts are known.
pub trait LaunchCommand: Send + Sync {
    fn render(&self, ip: IpAddr, mounted: &HashMap<String, PathBuf>) -> Vec<String>;
}

/// Everything needed to start one node service.
pub struct ServiceSpec {
    pub service_id: String,
    pub image: String,
    /// File id -> contents, materialised before the command runs.
    pub files: BTreeMap<String, Vec<u8>>,
    pub command: Box<dyn LaunchCommand>,
}

impl std::fmt::Debug for ServiceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSpec")
            .field("service_id", &self.service_id)
            .field("image", &self.image)
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartedService {
    pub ip: IpAddr,
}

/// Starts and stops node services (containers, processes, ...).
#[async_trait::async_trait]
pub trait ServiceLifecycle: Send + Sync {
    async fn start_service(&self, spec: ServiceSpec) -> Result<StartedService, DynError>;

    /// Stop a service, forcing it down once `grace` elapses.
    async fn stop_service(&self, service_id: &str, grace: Duration) -> Result<(), DynError>;
}
