use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

use crate::scheduler::TaskFailure;

/// The unified error type for distributed table operations
#[derive(Error, Debug)]
pub enum TableError {
    #[error("[E{code:04}] Construction error: {message}")]
    Construction { code: u16, message: String },

    #[error("[E{code:04}] Type promotion failed for column '{column}': {left} and {right} share no common representation")]
    TypePromotion {
        code: u16,
        column: String,
        left: String,
        right: String,
    },

    #[error("[E{:04}] Cannot collect a distributed table with no chunks", ErrorCode::EMPTY_TABLE)]
    EmptyTable,

    #[error("[E{:04}] Length of the table is unknown ({unknown_chunks} chunk(s) unresolved); call compute first", ErrorCode::UNKNOWN_LENGTH)]
    UnknownLength { unknown_chunks: usize },

    #[error(transparent)]
    UpstreamCompute(#[from] TaskFailure),

    #[error("[E{code:04}] Schema error: {message}")]
    Schema { code: u16, message: String },

    #[error("[E{code:04}] I/O error: {message}")]
    Io {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TableError {
    /// Create a construction error with default code
    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction {
            code: ErrorCode::CONSTRUCTION_GENERIC,
            message: message.into(),
        }
    }

    /// Create a construction error with specific code
    pub fn construction_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Construction {
            code,
            message: message.into(),
        }
    }

    /// Create a type promotion error for a column
    pub fn type_promotion(
        column: impl Into<String>,
        left: impl Display,
        right: impl Display,
    ) -> Self {
        Self::TypePromotion {
            code: ErrorCode::PROMOTION_GENERIC,
            column: column.into(),
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    /// Create a schema error with default code
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            code: ErrorCode::SCHEMA_GENERIC,
            message: message.into(),
        }
    }

    /// Create a schema error with specific code
    pub fn schema_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Schema {
            code,
            message: message.into(),
        }
    }

    /// Create an I/O error with specific code and path
    pub fn io_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Io {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        if let Self::Io { source: ref mut s, .. } = self {
            *s = Some(Box::new(source));
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Construction { message, .. }
            | Self::Schema { message, .. }
            | Self::Io { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
            _ => {}
        }
        self
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Construction { .. } => 2,
            Self::TypePromotion { .. } => 3,
            Self::EmptyTable | Self::UnknownLength { .. } => 4,
            Self::UpstreamCompute(_) => 5,
            Self::Schema { .. } => 6,
            Self::Io { .. } => 7,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Construction { code, .. }
            | Self::TypePromotion { code, .. }
            | Self::Schema { code, .. }
            | Self::Io { code, .. } => *code,
            Self::EmptyTable => ErrorCode::EMPTY_TABLE,
            Self::UnknownLength { .. } => ErrorCode::UNKNOWN_LENGTH,
            Self::UpstreamCompute(_) => ErrorCode::UPSTREAM_COMPUTE,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                message,
                path: Some(p),
                ..
            } => format!("I/O error at {}: {}", p.display(), message),
            Self::UpstreamCompute(failure) => {
                format!("Chunk computation failed: {}", failure)
            }
            other => other.to_string(),
        }
    }
}

/// Type alias for Results using TableError
pub type Result<T> = std::result::Result<T, TableError>;
