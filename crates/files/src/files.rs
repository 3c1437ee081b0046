//! Directory-scoped, write-once artifact storage.
//!
//! [`ArtifactStore`] owns one directory. It validates the directory once at construction
//! and afterwards only ever joins validated [`ArtifactName`]s onto it, so no request can
//! reach outside the directory.
//!
//! Writes use `create_new`, which makes the existence check and the creation a single
//! filesystem operation: two writers racing on the same name cannot both succeed.

use crate::FilesError;
use chrono::{DateTime, Utc};
use medbill_uuid::ArtifactName;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Metadata for a stored artifact.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Filename inside the store directory
    #[serde(with = "artifact_name_serde")]
    pub name: ArtifactName,

    /// Hexadecimal SHA-256 digest of the content
    pub sha256: String,

    /// Size of the artifact in bytes
    pub size_bytes: u64,

    /// Best-effort media type (content sniffing first, then the file extension)
    pub media_type: Option<String>,

    /// UTC timestamp of the write
    pub stored_at: DateTime<Utc>,
}

/// Write-once store for one kind of artifact.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    directory: PathBuf,
}

impl ArtifactStore {
    /// Opens an existing artifact directory.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidDirectory`] if the path is missing, is not a directory,
    /// or cannot be canonicalised.
    pub fn new(directory: &Path) -> Result<Self, FilesError> {
        if !directory.exists() {
            return Err(FilesError::InvalidDirectory(format!(
                "Directory does not exist: {}",
                directory.display()
            )));
        }

        if !directory.is_dir() {
            return Err(FilesError::InvalidDirectory(format!(
                "Path is not a directory: {}",
                directory.display()
            )));
        }

        let directory = directory.canonicalize().map_err(|e| {
            FilesError::InvalidDirectory(format!(
                "Cannot canonicalize path {}: {}",
                directory.display(),
                e
            ))
        })?;

        Ok(Self { directory })
    }

    /// Creates the directory (and parents) if needed, then opens it.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidDirectory`] if creation fails or the path exists but is
    /// not a directory.
    pub fn open_or_create(directory: &Path) -> Result<Self, FilesError> {
        fs::create_dir_all(directory).map_err(|e| {
            FilesError::InvalidDirectory(format!(
                "Cannot create directory {}: {}",
                directory.display(),
                e
            ))
        })?;
        Self::new(directory)
    }

    /// Writes `bytes` under `name`, refusing to overwrite.
    ///
    /// A partially written file is removed before the error is returned, so a failed write
    /// never leaves a truncated artifact behind.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::AlreadyExists`] if the name is taken, or [`FilesError::Io`] if
    /// the file cannot be created or written.
    pub fn write_once(
        &self,
        name: &ArtifactName,
        bytes: &[u8],
    ) -> Result<StoredArtifact, FilesError> {
        let path = self.path_for(name);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(FilesError::AlreadyExists(name.to_string()));
            }
            Err(e) => {
                return Err(FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create artifact {}: {}", path.display(), e),
                )));
            }
        };

        if let Err(e) = file.write_all(bytes).and_then(|()| file.sync_all()) {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path) {
                tracing::warn!(
                    "failed to remove partial artifact {}: {}",
                    path.display(),
                    cleanup
                );
            }
            return Err(FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write artifact {}: {}", path.display(), e),
            )));
        }

        Ok(StoredArtifact {
            name: name.clone(),
            sha256: hex::encode(Sha256::digest(bytes)),
            size_bytes: bytes.len() as u64,
            media_type: media_type_for(name, bytes),
            stored_at: Utc::now(),
        })
    }

    /// Reads an artifact back.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::NotFound`] if no regular file has this name, or
    /// [`FilesError::Io`] if reading fails.
    pub fn read(&self, name: &ArtifactName) -> Result<Vec<u8>, FilesError> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(FilesError::NotFound(name.to_string()));
        }

        fs::read(&path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read artifact {}: {}", path.display(), e),
            ))
        })
    }

    /// Checks that the directory accepts writes by creating and removing a probe file.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::Io`] describing the failing step.
    pub fn check_writable(&self) -> Result<(), FilesError> {
        let probe = ArtifactName::generate("write-probe", "tmp", Utc::now())
            .map_err(|e| FilesError::InvalidDirectory(e.to_string()))?;
        self.write_once(&probe, b"probe")?;
        fs::remove_file(self.path_for(&probe))?;
        Ok(())
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, name: &ArtifactName) -> PathBuf {
        self.directory.join(name.as_str())
    }
}

/// Best-effort media type: magic bytes first, then the name's extension.
pub fn media_type_for(name: &ArtifactName, bytes: &[u8]) -> Option<String> {
    if let Some(kind) = infer::get(bytes) {
        return Some(kind.mime_type().to_string());
    }

    let mime = match name.extension()?.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => return None,
    };
    Some(mime.to_string())
}

mod artifact_name_serde {
    use medbill_uuid::ArtifactName;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(name: &ArtifactName, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(name.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ArtifactName, D::Error> {
        let raw = String::deserialize(d)?;
        ArtifactName::parse(&raw).map_err(serde::de::Error::custom)
    }
}
