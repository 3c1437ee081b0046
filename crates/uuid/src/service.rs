//! Implementation of record identifiers and artifact names.

use crate::{UuidError, UuidResult};
use chrono::{DateTime, Utc};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Longest artifact name accepted from the outside world.
const MAX_ARTIFACT_NAME_LEN: usize = 200;

/// Longest slice of a client-supplied filename kept inside an artifact name.
const MAX_ORIGINAL_STEM_LEN: usize = 64;

/// Length of the random hex suffix in generated artifact names.
const RANDOM_SUFFIX_LEN: usize = 12;

/// Canonical record identifier (32 lowercase hex characters, no hyphens).
///
/// Once constructed the contained UUID is guaranteed to be in canonical form, so
/// identifiers round-trip through JSON and URLs without normalisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates an externally supplied identifier.
    ///
    /// Hyphenated or uppercase forms are rejected rather than normalised.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not canonical.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "record id must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(e.to_string()))
    }

    /// Returns true if `input` is in canonical form.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Filename of a write-once artifact.
///
/// Every `ArtifactName` is a single path component made of ASCII letters, digits, `.`,
/// `-` and `_`, never starting with `.` and never containing `..`. That makes it safe to
/// join onto an artifact directory without further checks.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtifactName(String);

impl ArtifactName {
    /// Generates `<prefix>-<unix millis>-<random hex>.<extension>`.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `prefix` or `extension` contain characters
    /// that are not allowed in artifact names.
    pub fn generate(prefix: &str, extension: &str, now: DateTime<Utc>) -> UuidResult<Self> {
        Self::parse(&format!(
            "{}-{}-{}.{}",
            prefix,
            now.timestamp_millis(),
            random_suffix(),
            extension
        ))
    }

    /// Generates `<unix millis>-<random hex>-<sanitised original name>` for uploaded files.
    ///
    /// Unsafe characters in `original` are replaced with `_` and the name is shortened
    /// (keeping the extension) so the result stays a valid artifact name.
    pub fn for_upload(original: &str, now: DateTime<Utc>) -> Self {
        let sanitised = sanitise_original(original);
        Self(format!(
            "{}-{}-{}",
            now.timestamp_millis(),
            random_suffix(),
            sanitised
        ))
    }

    /// Validates a name received from a client.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if the name is empty, too long, hidden, contains
    /// a parent-directory sequence, or contains characters outside the allowed set.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if input.is_empty() || input.len() > MAX_ARTIFACT_NAME_LEN {
            return Err(UuidError::InvalidInput(format!(
                "artifact name must be 1 to {} characters",
                MAX_ARTIFACT_NAME_LEN
            )));
        }
        if input.starts_with('.') || input.contains("..") {
            return Err(UuidError::InvalidInput(format!(
                "artifact name must not be hidden or contain '..': '{}'",
                input
            )));
        }
        if !input.bytes().all(is_name_byte) {
            return Err(UuidError::InvalidInput(format!(
                "artifact name contains invalid characters: '{}'",
                input
            )));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased extension after the final `.`, if any.
    pub fn extension(&self) -> Option<String> {
        self.0
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ArtifactName {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactName::parse(s)
    }
}

fn is_name_byte(b: u8) -> bool {
    matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_')
}

fn random_suffix() -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(RANDOM_SUFFIX_LEN);
    hex
}

fn sanitise_original(original: &str) -> String {
    // Browsers may send a full client path; only the last component matters.
    let base = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii() && is_name_byte(c as u8) {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.replace("..", "_").trim_start_matches('.').to_string();

    let (stem, ext) = match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && ext.len() <= 8 => {
            (stem.to_string(), Some(ext.to_string()))
        }
        _ => (cleaned.clone(), None),
    };

    let mut stem: String = stem.chars().take(MAX_ORIGINAL_STEM_LEN).collect();
    stem.truncate(stem.trim_end_matches('.').len());
    if stem.is_empty() {
        stem.push_str("upload");
    }

    match ext {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_record_id_is_canonical() {
        let id = RecordId::new();
        assert!(RecordId::is_canonical(&id.to_string()));
    }

    #[test]
    fn test_parse_record_id_rejects_non_canonical() {
        assert!(RecordId::parse("550e8400e29b41d4a716446655440000").is_ok());
        assert!(RecordId::parse("550e8400-e29b-41d4-a716-446655440000").is_err());
        assert!(RecordId::parse("550E8400E29B41D4A716446655440000").is_err());
        assert!(RecordId::parse("").is_err());
    }

    #[test]
    fn test_record_id_serde_as_string() {
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RecordId>("\"nope\"").is_err());
    }

    #[test]
    fn test_generate_artifact_name_layout() {
        let name = ArtifactName::generate("bill", "pdf", fixed_now()).unwrap();
        let s = name.as_str();

        assert!(s.starts_with(&format!("bill-{}-", fixed_now().timestamp_millis())));
        assert!(s.ends_with(".pdf"));
        assert_eq!(name.extension().as_deref(), Some("pdf"));
    }

    #[test]
    fn test_generated_names_do_not_collide_within_same_millisecond() {
        let a = ArtifactName::generate("bill", "txt", fixed_now()).unwrap();
        let b = ArtifactName::generate("bill", "txt", fixed_now()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_rejects_unsafe_prefix() {
        assert!(ArtifactName::generate("../bill", "pdf", fixed_now()).is_err());
        assert!(ArtifactName::generate("bill", "p/df", fixed_now()).is_err());
    }

    #[test]
    fn test_parse_rejects_traversal_and_hidden_names() {
        assert!(ArtifactName::parse("../etc/passwd").is_err());
        assert!(ArtifactName::parse("a/b.pdf").is_err());
        assert!(ArtifactName::parse(".env").is_err());
        assert!(ArtifactName::parse("bill..pdf").is_err());
        assert!(ArtifactName::parse("").is_err());
        assert!(ArtifactName::parse(&"a".repeat(201)).is_err());
        assert!(ArtifactName::parse("bill-1-abc.pdf").is_ok());
    }

    #[test]
    fn test_for_upload_sanitises_client_names() {
        let name = ArtifactName::for_upload("C:\\scans\\my rx (1).PNG", fixed_now());
        let s = name.as_str();

        assert!(s.ends_with("-my_rx__1_.PNG"));
        assert_eq!(name.extension().as_deref(), Some("png"));
        assert!(ArtifactName::parse(s).is_ok());
    }

    #[test]
    fn test_for_upload_handles_degenerate_names() {
        let hidden = ArtifactName::for_upload(".htaccess", fixed_now());
        assert!(ArtifactName::parse(hidden.as_str()).is_ok());
        assert!(!hidden.as_str().contains("-."));

        let empty = ArtifactName::for_upload("", fixed_now());
        assert!(empty.as_str().ends_with("-upload"));

        let unicode = ArtifactName::for_upload("röntgen.pdf", fixed_now());
        assert!(ArtifactName::parse(unicode.as_str()).is_ok());
    }
}
