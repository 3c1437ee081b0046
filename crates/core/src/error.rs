use crate::render::RenderError;
use crate::suggestions::GatewayError;
use medbill_files::FilesError;
use medbill_types::{CodeError, TextError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    MissingField(#[from] TextError),
    #[error(transparent)]
    InvalidCode(#[from] CodeError),
    #[error("{kind} index {index} is out of range (length {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },
    #[error("encounter {0} is locked for billing; only clinical notes may change")]
    BillingLocked(String),
    #[error("{0}")]
    NotReadyForBilling(String),
    #[error("file of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("suggestion gateway failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),
    #[error("artifact storage failed: {0}")]
    Storage(#[from] FilesError),
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] medbill_uuid::UuidError),
}

impl CoreError {
    /// True for errors caused by the caller's input rather than by the server.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidInput(_)
                | CoreError::MissingField(_)
                | CoreError::InvalidCode(_)
                | CoreError::IndexOutOfRange { .. }
                | CoreError::BillingLocked(_)
                | CoreError::NotReadyForBilling(_)
                | CoreError::InvalidId(_)
        )
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
