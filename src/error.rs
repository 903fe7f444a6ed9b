//! Error types for the definition engine

use thiserror::Error;

use crate::registry::DefinitionKind;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Engine errors
///
/// Validation variants carry the owning definition id and the field path so a
/// caller can act on the first failure without re-running validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Registry collision: '{id}' is registered as {existing}, cannot register it as {requested}")]
    RegistryCollision {
        id: String,
        existing: DefinitionKind,
        requested: DefinitionKind,
    },

    #[error("{owner}: missing required field '{field}'")]
    MissingField { owner: String, field: String },

    #[error("{owner}: field '{field}' expected {expected}, found {found}")]
    TypeMismatch {
        owner: String,
        field: String,
        expected: String,
        found: String,
    },

    #[error("{owner}: field '{field}' references unregistered {kind} '{reference}'")]
    RefNotRegistered {
        owner: String,
        field: String,
        kind: &'static str,
        reference: String,
    },

    #[error("{owner}: field '{field}' failed validator '{predicate}'")]
    CustomPredicateFailed {
        owner: String,
        field: String,
        predicate: String,
    },

    #[error("{owner}: field '{field}' has a malformed descriptor: {reason}")]
    MalformedDescriptor {
        owner: String,
        field: String,
        reason: String,
    },

    #[error("{owner}: expected a record, found {found}")]
    NotARecord { owner: String, found: String },

    #[error("{owner}: value failed predicate '{predicate}'")]
    PredicateFailed { owner: String, predicate: String },

    #[error("Duplicate field '{field}' in both '{first}' and '{second}'")]
    DuplicateField {
        field: String,
        first: String,
        second: String,
    },

    #[error("Field '{field}' already exists on '{base}'")]
    FieldConflict { field: String, base: String },

    #[error("Unknown field '{field}' on '{owner}'{}", suggestion_hint(.suggestion))]
    UnknownField {
        field: String,
        owner: String,
        suggestion: Option<String>,
    },

    #[error("Definition not found: {id}")]
    DefinitionNotFound { id: String },

    #[error("No migration path for '{id}' from v{from} to v{to}")]
    NoMigrationPath { id: String, from: u32, to: u32 },

    #[error("No definition registered for '{id}' at v{version}")]
    MissingTargetDefinition { id: String, version: u32 },

    #[error("Definition '{id}' is registered at v{found}, expected v{expected}")]
    TargetVersionMismatch { id: String, expected: u32, found: u32 },

    #[error("Codec step {step} failed: {message}")]
    CodecStepFailed { step: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`SchemaError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Registry,
    Validation,
    Composition,
    Versioning,
    Codec,
    Environment,
}

impl SchemaError {
    /// Which subsystem produced this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::RegistryCollision { .. } => ErrorKind::Registry,
            SchemaError::MissingField { .. }
            | SchemaError::TypeMismatch { .. }
            | SchemaError::RefNotRegistered { .. }
            | SchemaError::CustomPredicateFailed { .. }
            | SchemaError::MalformedDescriptor { .. }
            | SchemaError::NotARecord { .. }
            | SchemaError::PredicateFailed { .. } => ErrorKind::Validation,
            SchemaError::DuplicateField { .. }
            | SchemaError::FieldConflict { .. }
            | SchemaError::UnknownField { .. } => ErrorKind::Composition,
            SchemaError::DefinitionNotFound { .. }
            | SchemaError::NoMigrationPath { .. }
            | SchemaError::MissingTargetDefinition { .. }
            | SchemaError::TargetVersionMismatch { .. } => ErrorKind::Versioning,
            SchemaError::CodecStepFailed { .. } => ErrorKind::Codec,
            SchemaError::Config(_) | SchemaError::Json(_) | SchemaError::Io(_) => {
                ErrorKind::Environment
            }
        }
    }

    /// Field path the error refers to, for validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            SchemaError::MissingField { field, .. }
            | SchemaError::TypeMismatch { field, .. }
            | SchemaError::RefNotRegistered { field, .. }
            | SchemaError::CustomPredicateFailed { field, .. }
            | SchemaError::MalformedDescriptor { field, .. }
            | SchemaError::DuplicateField { field, .. }
            | SchemaError::FieldConflict { field, .. }
            | SchemaError::UnknownField { field, .. } => Some(field),
            _ => None,
        }
    }
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{}'?)", name),
        None => String::new(),
    }
}
