//! Optional per-validator `gentx` flags.
//!
//! Each field maps to exactly one command-line flag through [`FLAG_TABLE`].
//! `--home`, `--keyring-backend` and `--chain-id` are not part of the table:
//! the orchestrator always passes them itself.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GentxFlags {
    pub amount: Option<String>,
    pub moniker: Option<String>,
    pub commission_max_change_rate: Option<String>,
    pub commission_max_rate: Option<String>,
    pub commission_rate: Option<String>,
    pub details: Option<String>,
    pub security_contact: Option<String>,
    pub website: Option<String>,
    pub account_number: Option<u64>,
    pub broadcast_mode: Option<String>,
    pub dry_run: Option<bool>,
    pub fee_account: Option<String>,
    #[serde(alias = "fee")]
    pub fees: Option<String>,
    pub from: Option<String>,
    pub gas: Option<String>,
    pub gas_adjustment: Option<String>,
    pub gas_prices: Option<String>,
    pub generate_only: Option<bool>,
    pub identity: Option<String>,
    pub ip: Option<String>,
    pub keyring_dir: Option<String>,
    pub ledger: Option<bool>,
    pub min_self_delegation: Option<String>,
    pub node: Option<String>,
    pub node_id: Option<String>,
    pub note: Option<String>,
    pub offline: Option<bool>,
    pub output: Option<String>,
    pub output_document: Option<String>,
    pub pubkey: Option<String>,
    pub sequence: Option<u64>,
    pub sign_mode: Option<String>,
    pub timeout_height: Option<u64>,
}

enum FlagValue<'a> {
    Text(&'a Option<String>),
    Number(Option<u64>),
    Switch(Option<bool>),
}

type FlagAccessor = for<'a> fn(&'a GentxFlags) -> FlagValue<'a>;

/// Flag name and field accessor, in the order the flags are emitted.
const FLAG_TABLE: &[(&str, FlagAccessor)] = &[
    ("amount", |f| FlagValue::Text(&f.amount)),
    ("moniker", |f| FlagValue::Text(&f.moniker)),
    ("commission-max-change-rate", |f| FlagValue::Text(&f.commission_max_change_rate)),
    ("commission-max-rate", |f| FlagValue::Text(&f.commission_max_rate)),
    ("commission-rate", |f| FlagValue::Text(&f.commission_rate)),
    ("details", |f| FlagValue::Text(&f.details)),
    ("security-contact", |f| FlagValue::Text(&f.security_contact)),
    ("website", |f| FlagValue::Text(&f.website)),
    ("account-number", |f| FlagValue::Number(f.account_number)),
    ("broadcast-mode", |f| FlagValue::Text(&f.broadcast_mode)),
    ("dry-run", |f| FlagValue::Switch(f.dry_run)),
    ("fee-account", |f| FlagValue::Text(&f.fee_account)),
    ("fees", |f| FlagValue::Text(&f.fees)),
    ("from", |f| FlagValue::Text(&f.from)),
    ("gas", |f| FlagValue::Text(&f.gas)),
    ("gas-adjustment", |f| FlagValue::Text(&f.gas_adjustment)),
    ("gas-prices", |f| FlagValue::Text(&f.gas_prices)),
    ("generate-only", |f| FlagValue::Switch(f.generate_only)),
    ("identity", |f| FlagValue::Text(&f.identity)),
    ("ip", |f| FlagValue::Text(&f.ip)),
    ("keyring-dir", |f| FlagValue::Text(&f.keyring_dir)),
    ("ledger", |f| FlagValue::Switch(f.ledger)),
    ("min-self-delegation", |f| FlagValue::Text(&f.min_self_delegation)),
    ("node", |f| FlagValue::Text(&f.node)),
    ("node-id", |f| FlagValue::Text(&f.node_id)),
    ("note", |f| FlagValue::Text(&f.note)),
    ("offline", |f| FlagValue::Switch(f.offline)),
    ("output", |f| FlagValue::Text(&f.output)),
    ("output-document", |f| FlagValue::Text(&f.output_document)),
    ("pubkey", |f| FlagValue::Text(&f.pubkey)),
    ("sequence", |f| FlagValue::Number(f.sequence)),
    ("sign-mode", |f| FlagValue::Text(&f.sign_mode)),
    ("timeout-height", |f| FlagValue::Number(f.timeout_height)),
];

impl GentxFlags {
    /// Render every present field as command-line arguments.
    ///
    /// Text and numeric values become `--flag value`; booleans are attached
    /// with `=` because the binary's flag parser does not consume a separate
    /// value for them.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (name, accessor) in FLAG_TABLE {
            match accessor(self) {
                FlagValue::Text(Some(value)) => {
                    args.push(format!("--{name}"));
                    args.push(value.clone());
                }
                FlagValue::Number(Some(value)) => {
                    args.push(format!("--{name}"));
                    args.push(value.to_string());
                }
                FlagValue::Switch(Some(value)) => args.push(format!("--{name}={value}")),
                FlagValue::Text(None) | FlagValue::Number(None) | FlagValue::Switch(None) => {}
            }
        }
        args
    }
}
