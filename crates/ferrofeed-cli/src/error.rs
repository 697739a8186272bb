use ferrofeed_core::{RetrievalError, ValidationError};
use ferrofeed_warehouse::WarehouseError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Command(_) => 2,
            Self::Retrieval(error) => match error {
                RetrievalError::Validation(_) | RetrievalError::SourceNotRegistered { .. } => 2,
                RetrievalError::DataUnavailable { .. } => 3,
                RetrievalError::RemoteRequestFailed { .. } => 4,
                RetrievalError::Cache(_) => 10,
            },
            Self::Warehouse(_) | Self::Io(_) => 10,
            Self::Serialization(_) => 1,
        }
    }
}
