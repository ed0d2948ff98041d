use std::path::PathBuf;

use thiserror::Error;

use crate::document::DocumentError;
use crate::process::ProcessError;

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("failed to load network spec {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid network spec: {0}")]
    InvalidSpec(String),

    #[error("directory operation on {path} failed: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("could not find {expected} in output of `{command}`:\n{output}")]
    Parse {
        expected: &'static str,
        command: String,
        output: String,
    },

    #[error("expected artifact missing: {0}")]
    MissingArtifact(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl GenesisError {
    pub(crate) fn directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Directory {
            path: path.into(),
            source,
        }
    }
}

pub type GenesisResult<T> = Result<T, GenesisError>;
