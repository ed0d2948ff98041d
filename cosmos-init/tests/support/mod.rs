//! In-process stand-in for a Cosmos SDK chain binary.
//!
//! It honours the same argv contract and leaves the same files behind that
//! the real binary would (config files, keyring entries, gentx files, genesis
//! accounts), so the pipeline can be driven end to end without one installed.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cosmos_init::{CommandRunner, Invocation, ProcessError};
use serde_json::{json, Value};

pub const PASSPHRASE: &str = "12345678";

/// Argv layout: `gentx <name> <amount> --home <dir> --keyring-backend <b> --chain-id <id>`.
const GENTX_MANDATORY_ARGS: usize = 9;

#[derive(Default)]
pub struct MockChain {
    calls: Mutex<Vec<Vec<String>>>,
    fail_on: Option<&'static str>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit non-zero whenever `subcommand` is invoked.
    pub fn failing_on(subcommand: &'static str) -> Self {
        Self {
            fail_on: Some(subcommand),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, subcommand: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|argv| argv.first().map(String::as_str) == Some(subcommand))
            .collect()
    }
}

impl CommandRunner for MockChain {
    fn run(&self, invocation: &Invocation) -> Result<String, ProcessError> {
        let argv: Vec<String> = invocation
            .argv()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        self.calls.lock().unwrap().push(argv.clone());
        let command = invocation.command_line();

        if let Some(subcommand) = self.fail_on {
            if argv[0] == subcommand {
                return Err(exit(command, "Error: mock failure\n".to_string()));
            }
        }

        let result = match argv[0].as_str() {
            "init" => init(&argv),
            "keys" => keys_add(&argv, invocation.script()),
            "add-genesis-account" => add_genesis_account(&argv),
            "gentx" => gentx(&argv, invocation.script()),
            "collect-gentxs" => collect_gentxs(&argv),
            "tendermint" => show_node_id(&argv),
            other => Err(format!("Error: unknown command \"{other}\"\n")),
        };
        result.map_err(|output| exit(command, output))
    }
}

fn exit(command: String, output: String) -> ProcessError {
    ProcessError::Exit {
        command,
        code: Some(1),
        output,
    }
}

fn flag(argv: &[String], name: &str) -> Result<String, String> {
    argv.iter()
        .position(|arg| arg == name)
        .and_then(|pos| argv.get(pos + 1))
        .cloned()
        .ok_or_else(|| format!("Error: missing {name}\n"))
}

fn home(argv: &[String]) -> Result<PathBuf, String> {
    flag(argv, "--home").map(PathBuf::from)
}

fn check_passphrase(script: Option<&[String]>) -> Result<(), String> {
    match script {
        Some([first, second]) if first == PASSPHRASE && second == PASSPHRASE => Ok(()),
        _ => Err("Error: too many failed passphrase attempts\n".to_string()),
    }
}

/// Deterministic 40 hex character identifier.
pub fn hex_id(seed: &str) -> String {
    fn fnv(input: &str) -> u64 {
        input.bytes().fold(0xcbf29ce484222325, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x100000001b3)
        })
    }
    format!(
        "{:016x}{:016x}{:08x}",
        fnv(seed),
        fnv(&format!("{seed}#1")),
        fnv(&format!("{seed}#2")) as u32
    )
}

pub fn address_for(key_name: &str) -> String {
    format!("cosmos1{}", hex_id(key_name))
}

fn io(err: std::io::Error) -> String {
    format!("Error: {err}\n")
}

fn read_json(path: &Path) -> Result<Value, String> {
    let raw = fs::read(path).map_err(io)?;
    serde_json::from_slice(&raw).map_err(|err| format!("Error: {err}\n"))
}

fn write_json(path: &Path, value: &Value) -> Result<(), String> {
    let raw = serde_json::to_vec_pretty(value).map_err(|err| format!("Error: {err}\n"))?;
    fs::write(path, raw).map_err(io)
}

fn init(argv: &[String]) -> Result<String, String> {
    let moniker = &argv[1];
    let home = home(argv)?;
    let chain_id = flag(argv, "--chain-id")?;
    let config = home.join("config");
    if config.join("genesis.json").exists() {
        return Err("Error: genesis.json file already exists\n".to_string());
    }
    fs::create_dir_all(&config).map_err(io)?;
    fs::write(
        config.join("config.toml"),
        format!(
            "moniker = \"{moniker}\"\n\n[p2p]\nladdr = \"tcp://0.0.0.0:26656\"\npersistent_peers = \"\"\nseed_mode = false\n\n[rpc]\nladdr = \"tcp://127.0.0.1:26657\"\n"
        ),
    )
    .map_err(io)?;
    fs::write(
        config.join("app.toml"),
        "minimum-gas-prices = \"\"\n\n[api]\nenable = false\naddress = \"tcp://0.0.0.0:1317\"\n",
    )
    .map_err(io)?;
    fs::write(
        config.join("client.toml"),
        format!("chain-id = \"{chain_id}\"\nkeyring-backend = \"os\"\nnode = \"tcp://localhost:26657\"\n"),
    )
    .map_err(io)?;
    write_json(
        &config.join("node_key.json"),
        &json!({"id": hex_id(&format!("node:{moniker}"))}),
    )?;
    write_json(
        &config.join("genesis.json"),
        &json!({
            "chain_id": chain_id,
            "genesis_time": "2024-01-01T00:00:00Z",
            "app_state": {
                "auth": {"accounts": []},
                "bank": {"balances": []},
                "genutil": {"gen_txs": []},
                "staking": {"params": {"bond_denom": "stake", "max_validators": 100}},
            },
        }),
    )?;
    Ok(format!("{{\"moniker\":\"{moniker}\",\"chain_id\":\"{chain_id}\"}}\n"))
}

fn keyring_entry(argv: &[String], name: &str) -> Result<PathBuf, String> {
    let backend = flag(argv, "--keyring-backend")?;
    Ok(home(argv)?
        .join(format!("keyring-{backend}"))
        .join(format!("{name}.info")))
}

fn keys_add(argv: &[String], script: Option<&[String]>) -> Result<String, String> {
    if argv.get(1).map(String::as_str) != Some("add") {
        return Err("Error: unknown keys subcommand\n".to_string());
    }
    let name = &argv[2];
    check_passphrase(script)?;
    let entry = keyring_entry(argv, name)?;
    if entry.exists() {
        return Err(format!("Error: cannot overwrite key: {name}\n"));
    }
    let address = address_for(name);
    if let Some(parent) = entry.parent() {
        fs::create_dir_all(parent).map_err(io)?;
    }
    fs::write(&entry, &address).map_err(io)?;
    Ok(format!(
        "Enter keyring passphrase:Re-enter keyring passphrase:\n- address: {address}\n  name: {name}\n  pubkey: '{{\"@type\":\"/cosmos.crypto.secp256k1.PubKey\"}}'\n  type: local\n\n\n**Important** write this mnemonic phrase in a safe place.\n\nabandon abandon abandon about\n"
    ))
}

fn add_genesis_account(argv: &[String]) -> Result<String, String> {
    let address = &argv[1];
    let coins: Vec<&str> = argv[2].split(',').collect();
    let path = home(argv)?.join("config").join("genesis.json");
    let mut genesis = read_json(&path)?;
    let state = &mut genesis["app_state"];
    let exists = state["auth"]["accounts"]
        .as_array()
        .is_some_and(|accounts| accounts.iter().any(|acc| acc["address"] == **address));
    if exists {
        return Err(format!(
            "Error: cannot add account at existing address {address}\n"
        ));
    }
    push(&mut state["auth"]["accounts"], json!({"address": address}))?;
    push(
        &mut state["bank"]["balances"],
        json!({"address": address, "coins": coins}),
    )?;
    write_json(&path, &genesis)?;
    Ok(String::new())
}

fn push(target: &mut Value, item: Value) -> Result<(), String> {
    target
        .as_array_mut()
        .map(|items| items.push(item))
        .ok_or_else(|| "Error: malformed genesis\n".to_string())
}

fn gentx(argv: &[String], script: Option<&[String]>) -> Result<String, String> {
    let name = &argv[1];
    let amount = &argv[2];
    check_passphrase(script)?;
    let home = home(argv)?;
    let address = fs::read_to_string(keyring_entry(argv, name)?)
        .map_err(|_| format!("Error: {name}.info: key not found\n"))?;
    let genesis = read_json(&home.join("config").join("genesis.json"))?;
    if genesis["chain_id"] != *flag(argv, "--chain-id")? {
        return Err("Error: chain id mismatch\n".to_string());
    }
    let funded = genesis["app_state"]["bank"]["balances"]
        .as_array()
        .is_some_and(|balances| balances.iter().any(|b| b["address"] == *address));
    if !funded {
        return Err(format!(
            "Error: account {address} does not have a balance in the genesis state\n"
        ));
    }

    let node_id = read_json(&home.join("config").join("node_key.json"))?["id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let dir = home.join("config").join("gentx");
    fs::create_dir_all(&dir).map_err(io)?;
    let path = dir.join(format!("gentx-{node_id}.json"));
    write_json(
        &path,
        &json!({
            "body": {
                "messages": [{
                    "@type": "/cosmos.staking.v1beta1.MsgCreateValidator",
                    "description": {"moniker": name},
                    "delegator_address": address,
                    "value": amount,
                }],
                "memo": format!("{node_id}@192.168.1.64:26656"),
            },
            "extra_flags": argv[GENTX_MANDATORY_ARGS..],
        }),
    )?;
    Ok(format!(
        "Enter keyring passphrase:Genesis transaction written to \"{}\"\n",
        path.display()
    ))
}

fn collect_gentxs(argv: &[String]) -> Result<String, String> {
    let config = home(argv)?.join("config");
    let mut gentxs = BTreeMap::new();
    for entry in fs::read_dir(config.join("gentx")).map_err(io)? {
        let path = entry.map_err(io)?.path();
        gentxs.insert(path.clone(), read_json(&path)?);
    }
    let path = config.join("genesis.json");
    let mut genesis = read_json(&path)?;
    genesis["app_state"]["genutil"]["gen_txs"] = Value::Array(gentxs.into_values().collect());
    write_json(&path, &genesis)?;
    Ok(String::new())
}

fn show_node_id(argv: &[String]) -> Result<String, String> {
    if argv.get(1).map(String::as_str) != Some("show-node-id") {
        return Err("Error: unknown tendermint subcommand\n".to_string());
    }
    let key = read_json(&home(argv)?.join("config").join("node_key.json"))?;
    Ok(format!("{}\n", key["id"].as_str().unwrap_or_default()))
}

/// Every file under `root`, keyed by relative path.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(relative, fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}
