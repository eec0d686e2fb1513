// lib/split-text/src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitTextError {
    #[error("Invalid regex pattern: {pattern}, error: {error}")]
    InvalidRegex { pattern: String, error: String },

    #[error("Field list is empty")]
    EmptyFields,

    #[error("Record type is empty")]
    EmptyRecordType,
}
