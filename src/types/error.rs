use thiserror::Error;

/// Errors produced when converting an at-rest or import record into a [`Rule`](super::Rule).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("unknown match mode '{value}'")]
    UnknownMatchMode { value: String },

    #[error("unknown position '{value}'")]
    UnknownPosition { value: String },

    #[error("unknown device target '{value}'")]
    UnknownDeviceTarget { value: String },

    #[error("unknown alignment '{value}'")]
    UnknownAlignment { value: String },

    #[error("invalid integer '{value}' for field '{field}'")]
    InvalidInteger { field: String, value: String },
}
