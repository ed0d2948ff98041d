use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Overlay;
use crate::error::{GenesisError, GenesisResult};
use crate::gentx::GentxFlags;

pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Declarative description of the whole test network.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub binary: String,
    pub home_dir: PathBuf,
    #[serde(default = "default_keyring_backend")]
    pub keyring_backend: String,
    #[serde(default)]
    pub passphrase: String,
    /// Passed to `keys add --algo` when present.
    #[serde(default)]
    pub key_algo: Option<String>,
    pub seed: SeedSpec,
    #[serde(default)]
    pub accounts: Vec<AccountSpec>,
    #[serde(default)]
    pub genesis: Overlay,
    pub validators: Vec<ValidatorSpec>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidatorSpec {
    pub name: String,
    /// Self-delegation, also credited to the validator's genesis account.
    pub bonded: String,
    #[serde(default)]
    pub config: Overlay,
    #[serde(default)]
    pub app: Overlay,
    #[serde(default)]
    pub client: Overlay,
    #[serde(default)]
    pub gentx: Option<GentxFlags>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountSpec {
    pub name: String,
    #[serde(default)]
    pub coins: Vec<String>,
    /// Fund this address directly instead of creating a key for the account.
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeedSpec {
    #[serde(default = "default_seed_name")]
    pub name: String,
    /// Externally reachable `host:port` advertised to every validator.
    pub addr: String,
    #[serde(default)]
    pub config: Overlay,
    #[serde(default)]
    pub app: Overlay,
    #[serde(default)]
    pub client: Overlay,
}

fn default_keyring_backend() -> String {
    "test".to_string()
}

fn default_seed_name() -> String {
    "seed".to_string()
}

impl NetworkSpec {
    /// Read and decode the YAML document at `path`.
    ///
    /// The result is not validated yet: callers apply command-line overrides
    /// first and then call [`NetworkSpec::validate`].
    pub fn load(path: impl AsRef<Path>) -> GenesisResult<Self> {
        let path = path.as_ref();
        let config_load = |reason: String| GenesisError::ConfigLoad {
            path: path.to_path_buf(),
            reason,
        };
        let raw = fs::read_to_string(path).map_err(|err| config_load(err.to_string()))?;
        decode(&raw).map_err(config_load)
    }

    /// Decode and validate an in-memory YAML document.
    pub fn from_yaml(raw: &str) -> GenesisResult<Self> {
        let spec = decode(raw).map_err(GenesisError::InvalidSpec)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> GenesisResult<()> {
        if self.binary.trim().is_empty() {
            return Err(invalid("binary must not be empty"));
        }
        if self.home_dir.as_os_str().is_empty() {
            return Err(invalid("home_dir must not be empty"));
        }
        self.chain_id()?;
        if self.validators.is_empty() {
            return Err(invalid("at least one validator is required"));
        }

        let mut names = HashSet::new();
        for validator in &self.validators {
            if validator.name.trim().is_empty() {
                return Err(invalid("validator name must not be empty"));
            }
            if !names.insert(validator.name.as_str()) {
                return Err(invalid(format!("duplicate validator name {}", validator.name)));
            }
            if validator.bonded.trim().is_empty() {
                return Err(invalid(format!("validator {} has no bonded amount", validator.name)));
            }
        }

        // Account keys live in the anchor keyring next to the anchor's own key.
        let mut anchor_keys = HashSet::from([self.validators[0].name.as_str()]);
        for account in &self.accounts {
            if account.name.trim().is_empty() {
                return Err(invalid("account name must not be empty"));
            }
            if account.coins.is_empty() {
                return Err(invalid(format!("account {} has no coins", account.name)));
            }
            if account.address.is_none() && !anchor_keys.insert(account.name.as_str()) {
                return Err(invalid(format!(
                    "account {} collides with another key in the anchor keyring",
                    account.name
                )));
            }
        }

        if self.seed.addr.trim().is_empty() {
            return Err(invalid("seed addr must not be empty"));
        }

        for (index, validator) in self.validators.iter().enumerate() {
            let owner = format!("validators[{index}]");
            check_toml_overlays(&owner, [&validator.config, &validator.app, &validator.client])?;
        }
        check_toml_overlays("seed", [&self.seed.config, &self.seed.app, &self.seed.client])?;
        Ok(())
    }

    /// Chain id taken from the genesis overrides; every subcommand needs it.
    pub fn chain_id(&self) -> GenesisResult<&str> {
        match self.genesis.get("chain_id") {
            Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.as_str()),
            Some(_) => Err(invalid("genesis.chain_id must be a non-empty string")),
            None => Err(invalid("genesis.chain_id is required")),
        }
    }
}

fn decode(raw: &str) -> Result<NetworkSpec, String> {
    serde_yaml::from_str(raw).map_err(|err| err.to_string())
}

/// TOML has no null, so an empty YAML value in a node overlay could never be
/// written back. Reject it here, before anything touches the disk.
fn check_toml_overlays(owner: &str, overlays: [&Overlay; 3]) -> GenesisResult<()> {
    for (section, overlay) in ["config", "app", "client"].into_iter().zip(overlays) {
        if let Some(key) = find_null(overlay) {
            return Err(invalid(format!(
                "{owner}.{section}.{key} has no value; TOML cannot store null"
            )));
        }
    }
    Ok(())
}

/// Dotted path of the first null leaf, if any.
fn find_null(overlay: &Overlay) -> Option<String> {
    overlay.iter().find_map(|(key, value)| match value {
        Value::Null => Some(key.clone()),
        Value::Object(nested) => find_null(nested).map(|rest| format!("{key}.{rest}")),
        Value::Array(items) if items.iter().any(Value::is_null) => Some(key.clone()),
        _ => None,
    })
}

fn invalid(reason: impl Into<String>) -> GenesisError {
    GenesisError::InvalidSpec(reason.into())
}
