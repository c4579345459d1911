//! Core error types for diagram editing
//!
//! Store, history, and interaction operations are total and never fail.
//! Errors only arise at the edges: importing a document, and running the
//! traffic calculation without a traffic source.

use thiserror::Error;

use super::types::ElementId;

/// Core error types for diagram import and analysis
#[derive(Error, Debug)]
pub enum DiagramError {
    #[error("Invalid diagram document: {message}")]
    InvalidDocument { message: String },

    #[error("Invalid diagram document: missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("Invalid diagram document: connection {connection_id} references missing component {node_id}")]
    DanglingConnection {
        connection_id: ElementId,
        node_id: ElementId,
    },

    #[error("Invalid diagram document: id {id} is used more than once")]
    DuplicateId { id: ElementId },

    #[error("No users component found. Add a users component to calculate traffic.")]
    NoTrafficSource,

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl DiagramError {
    /// Create a new invalid-document error
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Create a new missing-field error
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Returns true for errors that are advisory rather than blocking
    ///
    /// A missing traffic source leaves the diagram untouched and is surfaced
    /// as a warning; every other variant aborts the operation.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::NoTrafficSource)
    }
}

impl From<serde_json::Error> for DiagramError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_document(err.to_string())
    }
}
