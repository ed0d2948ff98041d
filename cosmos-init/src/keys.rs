use crate::chain::ChainCli;
use crate::error::{GenesisError, GenesisResult};
use crate::layout::NodeHome;
use crate::process::CommandRunner;

const ADDRESS_FIELD: &str = "address:";

/// Create `name` in the keyring of `home` and return its account address.
pub fn create_key<R: CommandRunner>(
    cli: &ChainCli<'_, R>,
    home: &NodeHome,
    name: &str,
) -> GenesisResult<String> {
    let output = cli.keys_add(name, home)?;
    let address = extract_address(&output).ok_or_else(|| GenesisError::Parse {
        expected: "key address",
        command: format!("keys add {name} --home {}", home.dir().display()),
        output: output.clone(),
    })?;
    tracing::debug!(key = name, %address, home = %home.dir().display(), "key created");
    Ok(address)
}

/// Pull the account address out of `keys add` output.
///
/// The binary prints a YAML-ish record (`- address: evmos1...`); passphrase
/// prompts written to stderr may share the line with it because they carry no
/// trailing newline, so the field is searched for anywhere in a line.
pub fn extract_address(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (_, rest) = line.split_once(ADDRESS_FIELD)?;
        let token = rest.split_whitespace().next()?;
        let token = token.trim_matches(|c| c == '"' || c == '\'');
        (!token.is_empty()).then(|| token.to_string())
    })
}
