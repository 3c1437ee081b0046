//! Validated value types shared across MedBill crates.
//!
//! - [`RequiredText`]: a trimmed, non-blank string for mandatory intake fields.
//! - [`DiagnosisCode`]: an ICD-10 token such as `J06.9` or `I10`.

mod code;
mod text;

pub use code::{CodeError, DiagnosisCode};
pub use text::{RequiredText, TextError};
