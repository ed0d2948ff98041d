//! The genesis assembly pipeline.
//!
//! Stages run strictly in order and the first error aborts the run. Nothing is
//! rolled back: the next run's reset discards whatever was left on disk.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::chain::ChainCli;
use crate::config::{AccountSpec, NetworkSpec, ValidatorSpec};
use crate::document::{merge_overlay, overlay_at, DocumentFormat, Overlay};
use crate::error::{GenesisError, GenesisResult};
use crate::keys::create_key;
use crate::layout::{HomeLayout, NodeHome, ANCHOR_INDEX};
use crate::process::CommandRunner;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Reset,
    PerValidatorInit,
    PerValidatorKeyAndFunding,
    GenesisOverride,
    AccountFunding,
    Collection,
    Propagation,
    SeedStandup,
    PeerWiring,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Reset,
        Stage::PerValidatorInit,
        Stage::PerValidatorKeyAndFunding,
        Stage::GenesisOverride,
        Stage::AccountFunding,
        Stage::Collection,
        Stage::Propagation,
        Stage::SeedStandup,
        Stage::PeerWiring,
    ];

    /// One-based position in the pipeline.
    pub fn step(self) -> usize {
        Stage::ALL
            .iter()
            .position(|stage| *stage == self)
            .map_or(0, |index| index + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Reset => "reset",
            Stage::PerValidatorInit => "validator-init",
            Stage::PerValidatorKeyAndFunding => "validator-key-and-funding",
            Stage::GenesisOverride => "genesis-override",
            Stage::AccountFunding => "account-funding",
            Stage::Collection => "collection",
            Stage::Propagation => "propagation",
            Stage::SeedStandup => "seed-standup",
            Stage::PeerWiring => "peer-wiring",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a completed run produced, in declaration order.
#[derive(Clone, Debug, Serialize)]
pub struct NetworkSummary {
    pub chain_id: String,
    pub home_dir: PathBuf,
    pub validators: Vec<ValidatorSummary>,
    pub accounts: Vec<AccountSummary>,
    pub seed: SeedSummary,
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidatorSummary {
    pub index: usize,
    pub name: String,
    pub home: PathBuf,
    pub address: String,
    pub gentx: PathBuf,
}

#[derive(Clone, Debug, Serialize)]
pub struct AccountSummary {
    pub name: String,
    pub address: String,
    pub coins: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SeedSummary {
    pub name: String,
    pub home: PathBuf,
    pub node_id: String,
    pub persistent_peers: String,
}

pub struct GenesisBuilder<'a, R> {
    spec: &'a NetworkSpec,
    cli: ChainCli<'a, R>,
    layout: HomeLayout,
}

impl<'a, R: CommandRunner> GenesisBuilder<'a, R> {
    pub fn new(spec: &'a NetworkSpec, runner: R) -> GenesisResult<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            cli: ChainCli::new(runner, spec)?,
            layout: HomeLayout::new(&spec.home_dir),
        })
    }

    pub fn run(&self) -> GenesisResult<NetworkSummary> {
        info!(
            chain_id = self.cli.chain_id(),
            home = %self.layout.root().display(),
            validators = self.spec.validators.len(),
            accounts = self.spec.accounts.len(),
            "assembling genesis"
        );

        self.enter(Stage::Reset);
        self.layout.reset()?;

        let mut validators = Vec::with_capacity(self.spec.validators.len());
        for (index, validator) in self.spec.validators.iter().enumerate() {
            let _span = tracing::info_span!("validator", index, name = %validator.name).entered();
            let home = self.init_validator(index, validator)?;
            validators.push(self.provision_validator(index, validator, home)?);
        }

        self.enter(Stage::GenesisOverride);
        merge_overlay(
            self.layout.anchor().genesis(),
            DocumentFormat::Json,
            &self.spec.genesis,
        )?;

        self.enter(Stage::AccountFunding);
        let accounts = self
            .spec
            .accounts
            .iter()
            .map(|account| self.fund_account(account))
            .collect::<GenesisResult<Vec<_>>>()?;

        self.enter(Stage::Collection);
        self.cli.collect_gentxs(&self.layout.anchor())?;

        self.enter(Stage::Propagation);
        self.propagate_genesis()?;

        self.enter(Stage::SeedStandup);
        let seed = self.stand_up_seed()?;

        self.enter(Stage::PeerWiring);
        self.wire_peers(&seed.persistent_peers)?;

        info!(
            home = %self.layout.root().display(),
            peers = %seed.persistent_peers,
            "network ready"
        );
        Ok(NetworkSummary {
            chain_id: self.cli.chain_id().to_string(),
            home_dir: self.layout.root().to_path_buf(),
            validators,
            accounts,
            seed,
        })
    }

    fn enter(&self, stage: Stage) {
        info!(%stage, step = stage.step(), of = Stage::ALL.len(), "stage");
    }

    fn init_validator(&self, index: usize, validator: &ValidatorSpec) -> GenesisResult<NodeHome> {
        self.enter(Stage::PerValidatorInit);
        let home = self.layout.validator(index);
        self.init_node(
            &validator.name,
            &home,
            [&validator.config, &validator.app, &validator.client],
        )?;
        Ok(home)
    }

    /// Key, funding, gentx and gentx relocation for one validator.
    fn provision_validator(
        &self,
        index: usize,
        validator: &ValidatorSpec,
        home: NodeHome,
    ) -> GenesisResult<ValidatorSummary> {
        self.enter(Stage::PerValidatorKeyAndFunding);
        let address = create_key(&self.cli, &home, &validator.name)?;
        let bonded = std::slice::from_ref(&validator.bonded);

        // The anchor genesis becomes canonical, so it must know every balance.
        if index != ANCHOR_INDEX {
            self.cli
                .add_genesis_account(&address, bonded, &self.layout.anchor())?;
        }
        // gentx validates the self-delegation against the local genesis copy.
        self.cli.add_genesis_account(&address, bonded, &home)?;

        self.cli.gentx(
            &validator.name,
            &validator.bonded,
            &home,
            validator.gentx.as_ref(),
        )?;
        let gentx = self.relocate_gentx(index, &home)?;
        info!(%address, gentx = %gentx.display(), "validator provisioned");

        Ok(ValidatorSummary {
            index,
            name: validator.name.clone(),
            home: home.dir().to_path_buf(),
            address,
            gentx,
        })
    }

    /// Move the freshly signed gentx into the anchor's collection directory as
    /// `validator<index>.json`, whatever name the binary gave it.
    fn relocate_gentx(&self, index: usize, home: &NodeHome) -> GenesisResult<PathBuf> {
        let source_dir = home.gentx_dir();
        let produced = single_json_file(&source_dir)?;
        let anchor = self.layout.anchor();
        let target = anchor.collected_gentx(index);
        fs::create_dir_all(anchor.gentx_dir())
            .map_err(|err| GenesisError::directory(anchor.gentx_dir(), err))?;
        fs::rename(&produced, &target).map_err(|err| GenesisError::directory(&produced, err))?;
        debug!(from = %produced.display(), to = %target.display(), "gentx relocated");
        Ok(target)
    }

    fn fund_account(&self, account: &AccountSpec) -> GenesisResult<AccountSummary> {
        let anchor = self.layout.anchor();
        let address = match &account.address {
            Some(address) => address.clone(),
            None => create_key(&self.cli, &anchor, &account.name)?,
        };
        self.cli
            .add_genesis_account(&address, &account.coins, &anchor)?;
        info!(account = %account.name, %address, coins = %account.coins.join(","), "account funded");
        Ok(AccountSummary {
            name: account.name.clone(),
            address,
            coins: account.coins.clone(),
        })
    }

    /// Byte-for-byte copy of the anchor genesis over every other validator's.
    fn propagate_genesis(&self) -> GenesisResult<()> {
        let source = self.layout.anchor().genesis();
        for index in (0..self.spec.validators.len()).filter(|index| *index != ANCHOR_INDEX) {
            copy_file(&source, &self.layout.validator(index).genesis())?;
        }
        Ok(())
    }

    fn stand_up_seed(&self) -> GenesisResult<SeedSummary> {
        let seed = &self.spec.seed;
        let home = self.layout.seed();
        self.init_node(&seed.name, &home, [&seed.config, &seed.app, &seed.client])?;
        copy_file(&self.layout.anchor().genesis(), &home.genesis())?;
        let node_id = self.cli.show_node_id(&home)?;
        let persistent_peers = format!("{node_id}@{}", seed.addr);
        info!(%node_id, addr = %seed.addr, "seed node ready");
        Ok(SeedSummary {
            name: seed.name.clone(),
            home: home.dir().to_path_buf(),
            node_id,
            persistent_peers,
        })
    }

    fn wire_peers(&self, persistent_peers: &str) -> GenesisResult<()> {
        let overlay = overlay_at(
            &["p2p", "persistent_peers"],
            Value::String(persistent_peers.to_string()),
        );
        for index in 0..self.spec.validators.len() {
            merge_overlay(
                self.layout.validator(index).config_toml(),
                DocumentFormat::Toml,
                &overlay,
            )?;
        }
        Ok(())
    }

    /// `init` followed by the node, app and client overlays.
    fn init_node(&self, moniker: &str, home: &NodeHome, overlays: [&Overlay; 3]) -> GenesisResult<()> {
        self.cli.init(moniker, home)?;
        let [config, app, client] = overlays;
        merge_overlay(home.config_toml(), DocumentFormat::Toml, config)?;
        merge_overlay(home.app_toml(), DocumentFormat::Toml, app)?;
        merge_overlay(home.client_toml(), DocumentFormat::Toml, client)?;
        debug!(home = %home.dir().display(), "node home initialized");
        Ok(())
    }
}

fn single_json_file(dir: &Path) -> GenesisResult<PathBuf> {
    let entries = fs::read_dir(dir).map_err(|err| GenesisError::directory(dir, err))?;
    let mut found = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| GenesisError::directory(dir, err))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            found.push(path);
        }
    }
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(GenesisError::MissingArtifact(format!(
            "no gentx produced in {}",
            dir.display()
        ))),
        count => Err(GenesisError::MissingArtifact(format!(
            "expected one gentx in {}, found {count}",
            dir.display()
        ))),
    }
}

fn copy_file(from: &Path, to: &Path) -> GenesisResult<()> {
    fs::copy(from, to).map_err(|err| GenesisError::directory(to, err))?;
    Ok(())
}
