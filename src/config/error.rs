//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Settings resolution error.
///
/// Validation variants always carry the field name and the raw value that
/// was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {value:?} (expected {expected})")]
    TypeCoercion {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{field} out of range: {value} (must be between {min} and {max})")]
    Range {
        field: &'static str,
        value: String,
        min: i64,
        max: i64,
    },

    #[error("invalid {field}: {value:?} (must be one of {allowed})")]
    InvalidEnumValue {
        field: &'static str,
        value: String,
        allowed: String,
    },

    #[error("failed to read {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Never includes the offending line content.
    #[error("failed to parse override file {} at line {line}", path.display())]
    FileParse { path: PathBuf, line: usize },

    #[error("failed to parse profile catalog: {0}")]
    CatalogParse(#[from] serde_yaml::Error),

    #[error("invalid profile catalog: {0}")]
    Catalog(String),
}

impl ConfigError {
    /// Name of the field this error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field }
            | Self::TypeCoercion { field, .. }
            | Self::Range { field, .. }
            | Self::InvalidEnumValue { field, .. } => Some(*field),
            _ => None,
        }
    }
}
