// src/error.rs

use thiserror::Error;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A lookup found nothing. For violations this also covers entries that
    /// have been evicted from the store.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A collaborator (e.g. the document renderer) is not available.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl EngineError {
    pub fn violation_not_found(id: impl ToString) -> Self {
        EngineError::NotFound {
            kind: "violation",
            id: id.to_string(),
        }
    }

    pub fn challan_not_found(id: impl ToString) -> Self {
        EngineError::NotFound {
            kind: "challan",
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, EngineError::Unavailable(_))
    }
}

/// A frame the detector could not turn into detections.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("frame source I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of an optional secondary detector.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("detector unavailable: {0}")]
    Unavailable(String),

    #[error("detector failed: {0}")]
    Failed(String),
}
