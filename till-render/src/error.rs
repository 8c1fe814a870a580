//! Error types for the rendering engine

use thiserror::Error;

/// Rendering error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The layout could not be parsed; raised before any data is bound
    #[error("Template syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// The record does not fit the layout (missing field, wrong type, failed function)
    #[error("Binding error: {0}")]
    Binding(String),
}

impl RenderError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn binding(message: impl Into<String>) -> Self {
        Self::Binding(message.into())
    }

    /// Whether the failure happened while parsing the layout
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
