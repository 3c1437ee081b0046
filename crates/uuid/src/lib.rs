//! Identifier and artifact-name utilities.
//!
//! MedBill hands out two kinds of names:
//!
//! - [`RecordId`]: the identifier of an in-memory record (patient, encounter, bill,
//!   prescription). Canonical form is **32 lowercase hexadecimal characters** with no
//!   hyphens, the same value `Uuid::new_v4().simple().to_string()` produces.
//! - [`ArtifactName`]: the on-disk filename of a write-once artifact (a rendered bill or an
//!   uploaded prescription). Names are collision resistant because they combine a
//!   millisecond timestamp with a random suffix:
//!
//! ```text
//! bill-1760706000123-9f2c41d07ab3.pdf
//! 1760706000123-9f2c41d07ab3-scan.png
//! ```
//!
//! Artifact names are also the only thing a client sends back when downloading, so
//! [`ArtifactName::parse`] doubles as the path-safety check for download requests.

mod service;

pub use service::{ArtifactName, RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
