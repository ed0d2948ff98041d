use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GenesisError, GenesisResult};

pub const ANCHOR_INDEX: usize = 0;
const SEED_DIR: &str = "seed";

/// Deterministic placement of every node home under the network root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HomeLayout {
    root: PathBuf,
}

impl HomeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn validator(&self, index: usize) -> NodeHome {
        NodeHome::new(self.root.join(index.to_string()))
    }

    /// Home of validator 0, where gentxs are collected and the final genesis
    /// is assembled.
    pub fn anchor(&self) -> NodeHome {
        self.validator(ANCHOR_INDEX)
    }

    pub fn seed(&self) -> NodeHome {
        NodeHome::new(self.root.join(SEED_DIR))
    }

    /// Destroy whatever a previous run left behind and recreate an empty root.
    pub fn reset(&self) -> GenesisResult<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(GenesisError::directory(&self.root, err)),
        }
        fs::create_dir_all(&self.root).map_err(|err| GenesisError::directory(&self.root, err))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeHome {
    dir: PathBuf,
}

impl NodeHome {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_dir(&self) -> PathBuf {
        self.dir.join("config")
    }

    pub fn config_toml(&self) -> PathBuf {
        self.config_dir().join("config.toml")
    }

    pub fn app_toml(&self) -> PathBuf {
        self.config_dir().join("app.toml")
    }

    pub fn client_toml(&self) -> PathBuf {
        self.config_dir().join("client.toml")
    }

    pub fn genesis(&self) -> PathBuf {
        self.config_dir().join("genesis.json")
    }

    pub fn gentx_dir(&self) -> PathBuf {
        self.config_dir().join("gentx")
    }

    /// Name a relocated gentx gets inside the anchor's collection directory.
    pub fn collected_gentx(&self, validator_index: usize) -> PathBuf {
        self.gentx_dir().join(format!("validator{validator_index}.json"))
    }
}
