use thiserror::Error;

pub type Result<T, E = ConfigError> = core::result::Result<T, E>;

/// Everything that can go wrong while turning one device mapping into a
/// registered object graph. Every per-config variant carries the dotted path
/// of the offending field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing required field: {path}")]
    MissingRequiredField { path: String },
    #[error("unknown field: {path}")]
    UnknownField { path: String },
    #[error("{path}: unknown role `{token}`")]
    UnknownRole { path: String, token: String },
    #[error("{path}: invalid pin: {reason}")]
    InvalidPin { path: String, reason: String },
    #[error("{path}: identifier `{id}` is already declared")]
    DuplicateIdentifier { path: String, id: String },
    #[error("{path}: {reason}")]
    InvalidValue { path: String, reason: String },
    /// Raised while composing a schema, never for a particular config.
    #[error("schema definition conflict: field `{field}` declared twice")]
    SchemaDefinitionConflict { field: String },
}

impl ConfigError {
    /// Dotted path of the field the error points at, if it has one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredField { path }
            | Self::UnknownField { path }
            | Self::UnknownRole { path, .. }
            | Self::InvalidPin { path, .. }
            | Self::DuplicateIdentifier { path, .. }
            | Self::InvalidValue { path, .. } => Some(path),
            Self::SchemaDefinitionConflict { .. } => None,
        }
    }

    pub(crate) fn invalid(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
