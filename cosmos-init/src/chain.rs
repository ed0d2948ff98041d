//! Argument-level contract with the chain binary.
//!
//! `ChainCli` knows how each subcommand is spelled and which ones prompt for
//! the keyring passphrase; the orchestrator only deals in homes and values.

use crate::config::NetworkSpec;
use crate::error::{GenesisError, GenesisResult};
use crate::gentx::GentxFlags;
use crate::layout::NodeHome;
use crate::process::{CommandRunner, Invocation};

pub struct ChainCli<'a, R> {
    runner: R,
    binary: &'a str,
    chain_id: &'a str,
    keyring_backend: &'a str,
    passphrase: &'a str,
    key_algo: Option<&'a str>,
}

impl<'a, R: CommandRunner> ChainCli<'a, R> {
    pub fn new(runner: R, spec: &'a NetworkSpec) -> GenesisResult<Self> {
        Ok(Self {
            runner,
            binary: &spec.binary,
            chain_id: spec.chain_id()?,
            keyring_backend: &spec.keyring_backend,
            passphrase: &spec.passphrase,
            key_algo: spec.key_algo.as_deref(),
        })
    }

    pub fn chain_id(&self) -> &str {
        self.chain_id
    }

    fn invocation(&self) -> Invocation {
        Invocation::new(self.binary)
    }

    /// The binary asks for the passphrase and then for its confirmation.
    fn passphrase_script(&self) -> Vec<String> {
        vec![self.passphrase.to_string(), self.passphrase.to_string()]
    }

    fn run(&self, invocation: Invocation) -> GenesisResult<String> {
        Ok(self.runner.run(&invocation)?)
    }

    /// `init <moniker> --home <dir> --chain-id <id>`
    pub fn init(&self, moniker: &str, home: &NodeHome) -> GenesisResult<String> {
        self.run(
            self.invocation()
                .arg("init")
                .arg(moniker)
                .arg("--home")
                .arg(home.dir())
                .arg("--chain-id")
                .arg(self.chain_id),
        )
    }

    /// `keys add <name> --home <dir> --keyring-backend <backend> [--algo <algo>]`
    pub fn keys_add(&self, name: &str, home: &NodeHome) -> GenesisResult<String> {
        let mut invocation = self
            .invocation()
            .args(["keys", "add", name])
            .arg("--home")
            .arg(home.dir())
            .args(["--keyring-backend", self.keyring_backend]);
        if let Some(algo) = self.key_algo {
            invocation = invocation.args(["--algo", algo]);
        }
        self.run(invocation.interactive(self.passphrase_script()))
    }

    /// `add-genesis-account <address> <coin,coin,..> --home <dir>`
    pub fn add_genesis_account(
        &self,
        address: &str,
        coins: &[String],
        home: &NodeHome,
    ) -> GenesisResult<String> {
        self.run(
            self.invocation()
                .args(["add-genesis-account", address])
                .arg(coins.join(","))
                .arg("--home")
                .arg(home.dir()),
        )
    }

    /// `gentx <name> <amount> --home <dir> --keyring-backend <b> --chain-id <id> [flags]`
    pub fn gentx(
        &self,
        key_name: &str,
        amount: &str,
        home: &NodeHome,
        flags: Option<&GentxFlags>,
    ) -> GenesisResult<String> {
        let mut invocation = self
            .invocation()
            .args(["gentx", key_name, amount])
            .arg("--home")
            .arg(home.dir())
            .args(["--keyring-backend", self.keyring_backend])
            .args(["--chain-id", self.chain_id]);
        if let Some(flags) = flags {
            invocation = invocation.args(flags.to_args());
        }
        self.run(invocation.interactive(self.passphrase_script()))
    }

    /// `collect-gentxs --home <dir>`
    pub fn collect_gentxs(&self, home: &NodeHome) -> GenesisResult<String> {
        self.run(
            self.invocation()
                .arg("collect-gentxs")
                .arg("--home")
                .arg(home.dir()),
        )
    }

    /// `tendermint show-node-id --home <dir>`, reduced to the id token.
    pub fn show_node_id(&self, home: &NodeHome) -> GenesisResult<String> {
        let invocation = self
            .invocation()
            .args(["tendermint", "show-node-id"])
            .arg("--home")
            .arg(home.dir());
        let command = invocation.command_line();
        let output = self.run(invocation)?;
        parse_node_id(&output).ok_or(GenesisError::Parse {
            expected: "node id",
            command,
            output,
        })
    }
}

/// The id is the last non-empty line; anything printed before it (warnings on
/// stderr) is ignored. A line with embedded whitespace is not an id.
fn parse_node_id(output: &str) -> Option<String> {
    let line = output.lines().map(str::trim).rev().find(|line| !line.is_empty())?;
    if line.split_whitespace().count() == 1 {
        Some(line.to_string())
    } else {
        None
    }
}
