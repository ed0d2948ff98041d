use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cosmos_init::{
    config::DEFAULT_CONFIG_FILE, GenesisBuilder, HomeLayout, NetworkSpec, SystemRunner,
};

#[derive(Parser)]
#[command(
    name = "cosmos-init",
    version,
    about = "Bootstrap a multi-validator test network from a declarative spec"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every node home, the shared genesis and the peer wiring.
    Run {
        #[command(flatten)]
        spec: SpecArgs,
        /// Write the JSON summary here instead of stdout.
        #[arg(long)]
        summary_out: Option<PathBuf>,
    },
    /// Load and check the spec, print the planned layout, touch nothing.
    Validate {
        #[command(flatten)]
        spec: SpecArgs,
    },
}

#[derive(Args)]
struct SpecArgs {
    #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Override `home_dir` from the spec.
    #[arg(long)]
    home: Option<PathBuf>,
    /// Override `binary` from the spec.
    #[arg(long)]
    binary: Option<String>,
    /// Override `passphrase` from the spec.
    #[arg(long, env = "COSMOS_INIT_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,
    /// Default log filter when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl SpecArgs {
    fn load(&self) -> Result<NetworkSpec> {
        let mut spec = NetworkSpec::load(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;
        if let Some(home) = &self.home {
            spec.home_dir = home.clone();
        }
        if let Some(binary) = &self.binary {
            spec.binary = binary.clone();
        }
        if let Some(passphrase) = &self.passphrase {
            spec.passphrase = passphrase.clone();
        }
        spec.validate()
            .with_context(|| format!("invalid network spec {}", self.config.display()))?;
        Ok(spec)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let spec_args = match &cli.command {
        Commands::Run { spec, .. } | Commands::Validate { spec } => spec,
    };
    init_tracing(&spec_args.log_level);

    match &cli.command {
        Commands::Run { spec, summary_out } => cmd_run(spec, summary_out.as_deref()),
        Commands::Validate { spec } => cmd_validate(spec),
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run(args: &SpecArgs, summary_out: Option<&Path>) -> Result<()> {
    let spec = args.load()?;
    let builder = GenesisBuilder::new(&spec, SystemRunner)?;
    let summary = builder.run().context("genesis assembly failed")?;
    emit_json(&summary, summary_out)
}

fn cmd_validate(args: &SpecArgs) -> Result<()> {
    let spec = args.load()?;
    let layout = HomeLayout::new(&spec.home_dir);
    let plan = Plan {
        chain_id: spec.chain_id()?.to_string(),
        binary: spec.binary.clone(),
        home_dir: layout.root().to_path_buf(),
        validators: spec
            .validators
            .iter()
            .enumerate()
            .map(|(index, validator)| PlannedNode {
                name: validator.name.clone(),
                home: layout.validator(index).dir().to_path_buf(),
            })
            .collect(),
        seed: PlannedNode {
            name: spec.seed.name.clone(),
            home: layout.seed().dir().to_path_buf(),
        },
        accounts: spec.accounts.iter().map(|account| account.name.clone()).collect(),
    };
    emit_json(&plan, None)
}

#[derive(Serialize)]
struct Plan {
    chain_id: String,
    binary: String,
    home_dir: PathBuf,
    validators: Vec<PlannedNode>,
    seed: PlannedNode,
    accounts: Vec<String>,
}

#[derive(Serialize)]
struct PlannedNode {
    name: String,
    home: PathBuf,
}

fn emit_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(path) = out {
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    } else {
        println!("{}", json);
    }
    Ok(())
}
