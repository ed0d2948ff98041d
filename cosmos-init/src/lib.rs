pub mod chain;
pub mod config;
pub mod document;
pub mod error;
pub mod gentx;
pub mod keys;
pub mod layout;
pub mod orchestrator;
pub mod process;

pub use config::{AccountSpec, NetworkSpec, SeedSpec, ValidatorSpec};
pub use document::{merge_overlay, DocumentError, DocumentFormat, Overlay};
pub use error::{GenesisError, GenesisResult};
pub use gentx::GentxFlags;
pub use layout::{HomeLayout, NodeHome};
pub use orchestrator::{GenesisBuilder, NetworkSummary, Stage};
pub use process::{CommandRunner, Invocation, ProcessError, SystemRunner};
