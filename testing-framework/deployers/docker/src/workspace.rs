use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use tempfile::TempDir;
use testnet_config::constants::TEST_VOLUME_MOUNTPOINT;
use tracing::{debug, info};

/// Host directory mounted into every container at the test volume mountpoint.
#[derive(Debug)]
pub struct DockerWorkspace {
    root: TempDir,
}

impl DockerWorkspace {
    pub fn create() -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix("ledger-testnet-")
            .tempdir()
            .context("creating testnet temp dir")?;
        info!(root = %root.path().display(), "docker workspace created");
        Ok(Self { root })
    }

    #[must_use]
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    #[must_use]
    pub fn service_dir(&self, service_id: &str) -> PathBuf {
        self.root.path().join(service_id)
    }

    /// Write a service's files to the host and return file id -> path as seen
    /// from inside the container.
    pub fn materialise(
        &self,
        service_id: &str,
        files: &BTreeMap<String, Vec<u8>>,
    ) -> Result<HashMap<String, PathBuf>> {
        Self::materialise_into(&self.service_dir(service_id), files)
    }

    pub(crate) fn materialise_into(
        dir: &Path,
        files: &BTreeMap<String, Vec<u8>>,
    ) -> Result<HashMap<String, PathBuf>> {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating service dir {}", dir.display()))?;

        let mut mounted = HashMap::with_capacity(files.len());
        for (file_id, contents) in files {
            let host_path = dir.join(file_id);
            fs::write(&host_path, contents)
                .with_context(|| format!("writing {}", host_path.display()))?;
            debug!(dir = %dir.display(), file = %file_id, "materialised service file");
            mounted.insert(file_id.clone(), Path::new(TEST_VOLUME_MOUNTPOINT).join(file_id));
        }
        Ok(mounted)
    }

    #[must_use]
    pub fn into_inner(self) -> TempDir {
        self.root
    }
}
