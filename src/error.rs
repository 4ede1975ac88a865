//! Error handling module for the state adaptor
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Conversion failures carry one of a fixed set of kinds so callers can branch
//! on [`ErrorKind`] instead of matching message text.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::stage::ConversionStage;

/// Category of a conversion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedModule,
    PlatformConflict,
    EmptyMapping,
    BuildFailure,
    ExpandFailure,
    Internal,
}

/// A failed conversion. A call that returns this has produced no documents.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// Malformed module name, parameter set or platform value
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Module is not present in the registry
    #[error("Unsupported module: {module}")]
    UnsupportedModule { module: String },

    /// Module's package manager does not match the platform family
    #[error("Conflict on platform {platform} and module {module}")]
    PlatformConflict { platform: String, module: String },

    /// None of the supplied parameters is known to the module
    #[error("No recognized attributes for module {module}")]
    EmptyMapping { module: String },

    /// Module-specific transform produced no usable state bucket
    #[error("Failed to build states for module {module}: {reason}")]
    BuildFailure { module: String, reason: String },

    /// Post-processing of the document set could not complete
    #[error("Failed to expand documents: {reason}")]
    ExpandFailure { reason: String },

    /// Unanticipated failure, wrapped rather than propagated raw
    #[error("Conversion failed during {stage}: {reason}")]
    Internal {
        stage: ConversionStage,
        reason: String,
    },
}

impl ConvertError {
    /// Returns the category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::UnsupportedModule { .. } => ErrorKind::UnsupportedModule,
            Self::PlatformConflict { .. } => ErrorKind::PlatformConflict,
            Self::EmptyMapping { .. } => ErrorKind::EmptyMapping,
            Self::BuildFailure { .. } => ErrorKind::BuildFailure,
            Self::ExpandFailure { .. } => ErrorKind::ExpandFailure,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create a build failure for a module
    pub fn build_failure(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BuildFailure {
            module: module.into(),
            reason: reason.into(),
        }
    }

    /// Create an expansion failure
    pub fn expand_failure(reason: impl Into<String>) -> Self {
        Self::ExpandFailure {
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading or validating a schema registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Schema declares no target states
    #[error("Module {module} declares no states")]
    NoStates { module: String },

    /// Schema declares no attributes
    #[error("Module {module} declares no attributes")]
    NoAttributes { module: String },

    /// Two raw attributes rename to the same backend key
    #[error("Module {module} maps more than one attribute to '{key}'")]
    DuplicateBackendKey { module: String, key: String },

    /// Prerequisite or trigger refers to a module that is not registered
    #[error("Module {module} references unknown module {reference}")]
    UnknownReference { module: String, reference: String },

    /// Prerequisites loop back on themselves
    #[error("Prerequisite cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    /// Invalid registry file format
    #[error("Invalid registry format: {reason}")]
    InvalidFormat { reason: String },

    /// IO error reading a registry file
    #[error("Failed to read registry: {reason}")]
    IoError { reason: String },
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::IoError {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::InvalidFormat {
            reason: err.to_string(),
        }
    }
}

/// Main error type for the state adaptor application
#[derive(Error, Debug)]
pub enum AdaptorError {
    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for adaptor operations
pub type Result<T> = std::result::Result<T, AdaptorError>;

impl AdaptorError {
    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}
