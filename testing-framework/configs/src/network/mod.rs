mod definition;
pub mod manifest;
mod node;
pub mod presets;

pub use definition::{NetworkDefinition, NetworkDefinitionError, NetworkParams};
pub use manifest::{ManifestError, NetworkManifest};
pub use node::{BootstrapPeer, NodeConfig, NodeParams, NodeRole, StakingCredentials};
