/// Errors raised when a mandatory text field is blank.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    #[error("{field} is required")]
    Missing { field: &'static str },
}

/// Mandatory free-text field (patient name, gender, clinical notes).
///
/// Leading and trailing whitespace is removed; the remainder must be non-empty. The field
/// name is carried into the error so request validation can report which input is missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequiredText(String);

impl RequiredText {
    /// # Errors
    ///
    /// Returns [`TextError::Missing`] naming `field` when `input` is absent or blank.
    pub fn new(field: &'static str, input: Option<&str>) -> Result<Self, TextError> {
        match input.map(str::trim) {
            Some(text) if !text.is_empty() => Ok(Self(text.to_owned())),
            _ => Err(TextError::Missing { field }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RequiredText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequiredText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for RequiredText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}
