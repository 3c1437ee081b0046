use std::fmt;
use std::str::FromStr;

/// Error returned for tokens that are not ICD-10 shaped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid ICD-10 code '{0}': expected a letter, two digits and an optional .N or .NN")]
pub struct CodeError(pub String);

/// ICD-10 diagnosis code token, e.g. `J06.9`, `I10`, `E11.65`.
///
/// The accepted shape is one uppercase ASCII letter, two digits, then optionally a `.`
/// followed by one or two digits. Matching is exact: no case folding, no trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiagnosisCode(String);

impl DiagnosisCode {
    /// # Errors
    ///
    /// Returns [`CodeError`] if `token` does not have the ICD-10 shape.
    pub fn parse(token: &str) -> Result<Self, CodeError> {
        if Self::is_valid(token) {
            Ok(Self(token.to_owned()))
        } else {
            Err(CodeError(token.to_owned()))
        }
    }

    /// Accepts a labelled code such as `"J06.9 - Acute upper respiratory infection"`.
    ///
    /// Only the leading token (up to the first whitespace) is kept, and it must itself be a
    /// valid code. Bare tokens are accepted as well.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError`] carrying the whole input if the leading token is invalid.
    pub fn from_labelled(input: &str) -> Result<Self, CodeError> {
        let token = input.split_whitespace().next().unwrap_or_default();
        Self::parse(token).map_err(|_| CodeError(input.trim().to_owned()))
    }

    /// Syntactic check for `^[A-Z][0-9]{2}(\.[0-9]{1,2})?$`.
    pub fn is_valid(token: &str) -> bool {
        let bytes = token.as_bytes();
        let head_ok = bytes.len() >= 3
            && bytes[0].is_ascii_uppercase()
            && bytes[1].is_ascii_digit()
            && bytes[2].is_ascii_digit();
        if !head_ok {
            return false;
        }

        match &bytes[3..] {
            [] => true,
            [b'.', rest @ ..] => {
                (1..=2).contains(&rest.len()) && rest.iter().all(u8::is_ascii_digit)
            }
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiagnosisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DiagnosisCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiagnosisCode::parse(s)
    }
}

impl AsRef<str> for DiagnosisCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for DiagnosisCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for DiagnosisCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DiagnosisCode::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_icd10_shapes() {
        for token in ["J06.9", "I10", "E11.65", "R50.9", "A00"] {
            assert!(DiagnosisCode::parse(token).is_ok(), "{token} should parse");
        }
    }

    #[test]
    fn rejects_malformed_tokens() {
        for token in [
            "XYZ", "", "j06.9", "J6.9", "J06.", "J06.123", "J069", " J06.9", "J06.9 ", "JJ6",
        ] {
            assert!(DiagnosisCode::parse(token).is_err(), "{token:?} should fail");
        }
    }

    #[test]
    fn labelled_codes_keep_leading_token() {
        let code =
            DiagnosisCode::from_labelled("J06.9 - Acute upper respiratory infection").unwrap();
        assert_eq!(code.as_str(), "J06.9");
        assert_eq!(DiagnosisCode::from_labelled("  I10  ").unwrap().as_str(), "I10");
    }

    #[test]
    fn labelled_error_reports_whole_input() {
        let err = DiagnosisCode::from_labelled("Cough - R05").unwrap_err();
        assert_eq!(err.0, "Cough - R05");
        assert!(DiagnosisCode::from_labelled("").is_err());
    }

    #[test]
    fn deserialize_validates() {
        let code: DiagnosisCode = serde_json::from_str("\"R51\"").unwrap();
        assert_eq!(code.to_string(), "R51");
        assert!(serde_json::from_str::<DiagnosisCode>("\"headache\"").is_err());
    }
}
