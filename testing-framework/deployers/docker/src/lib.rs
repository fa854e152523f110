mod cleanup;
pub mod commands;
mod lifecycle;
pub mod network;
mod workspace;

pub use cleanup::DockerCleanup;
pub use commands::{DockerCommandError, docker_available, run_docker_command};
pub use lifecycle::{DockerLifecycle, run_args};
pub use network::{DEFAULT_DOCKER_SUBNET, IpAllocator, Subnet, SubnetError};
pub use workspace::DockerWorkspace;
