//! MedBill artifact storage
//!
//! Rendered bills and uploaded prescriptions are stored as plain files in one directory per
//! artifact kind:
//!
//! ```text
//! <data_dir>/
//! ├── bills/
//! │   └── bill-1760706000123-9f2c41d07ab3.pdf
//! └── uploads/
//!     └── 1760706000456-0b1e77c9d2aa-scan.png
//! ```
//!
//! ## Rules
//!
//! - Artifacts are write-once: a name that already exists is never overwritten.
//! - Names are [`ArtifactName`]s, so every stored file is a single safe path component.
//! - Reads go through the same name validation, which keeps downloads inside the directory.
//!
//! ## Example Usage
//!
//! ```no_run
//! use medbill_files::ArtifactStore;
//! use medbill_uuid::ArtifactName;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ArtifactStore::open_or_create(Path::new("data/bills"))?;
//! let name = ArtifactName::generate("bill", "txt", chrono::Utc::now())?;
//! let stored = store.write_once(&name, b"TOTAL AMOUNT: $105.00")?;
//! assert_eq!(store.read(&stored.name)?, b"TOTAL AMOUNT: $105.00");
//! # Ok(())
//! # }
//! ```

mod files;

pub use files::{media_type_for, ArtifactStore, StoredArtifact};
pub use medbill_uuid::ArtifactName;

/// Errors that can occur during artifact storage operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Artifact directory does not exist, is not a directory, or cannot be created
    #[error("Invalid artifact directory: {0}")]
    InvalidDirectory(String),

    /// No artifact with this name exists
    #[error("Artifact not found: {0}")]
    NotFound(String),

    /// An artifact with this name was already written (write-once violation)
    #[error("Artifact {0} already exists")]
    AlreadyExists(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
