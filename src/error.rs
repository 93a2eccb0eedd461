use rmcp::ErrorData as RpcError;

use thiserror::Error;
use tokio::io;

use crate::export::ExportError;
use crate::settings::SettingsError;
use crate::storage::StorageError;
use crate::validation::ValidationError;

pub type ServiceResult<T> = core::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    RpcError(#[from] RpcError),
    #[error("{0}")]
    IoError(#[from] io::Error),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Settings(#[from] SettingsError),
    #[error("{0}")]
    Export(#[from] ExportError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("habit not found: {0}")]
    HabitNotFound(String),
    #[error("{0}")]
    Prompt(#[from] dialoguer::Error),
}
