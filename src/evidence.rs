// src/evidence.rs

use crate::types::{EvidenceRef, Frame, Violation};
use base64::Engine;

/// Stores a snapshot for a frame's violation batch and hands back a reference.
pub trait EvidenceStore: Send + Sync {
    fn attach(&self, frame: &Frame, batch: &[Violation]) -> Option<EvidenceRef>;
}

pub const JPEG_MIME: &str = "image/jpeg";
pub const JSON_MIME: &str = "application/json";

/// Embeds the frame bytes in the reference itself as a data URI.
#[derive(Debug, Clone)]
pub struct InlineEvidenceStore {
    mime: String,
}

impl InlineEvidenceStore {
    pub fn new(mime: impl Into<String>) -> Self {
        Self { mime: mime.into() }
    }

    /// Camera snapshots.
    pub fn jpeg() -> Self {
        Self::new(JPEG_MIME)
    }

    /// Recorded detector output.
    pub fn json() -> Self {
        Self::new(JSON_MIME)
    }
}

impl Default for InlineEvidenceStore {
    fn default() -> Self {
        Self::jpeg()
    }
}

impl EvidenceStore for InlineEvidenceStore {
    fn attach(&self, frame: &Frame, batch: &[Violation]) -> Option<EvidenceRef> {
        if batch.is_empty() || frame.data.is_empty() {
            return None;
        }
        let encoded = base64::engine::general_purpose::STANDARD.encode(&frame.data);
        Some(EvidenceRef(format!("data:{};base64,{}", self.mime, encoded)))
    }
}

/// Keeps no evidence.
#[derive(Debug, Default)]
pub struct NoEvidence;

impl EvidenceStore for NoEvidence {
    fn attach(&self, _frame: &Frame, _batch: &[Violation]) -> Option<EvidenceRef> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BBox, ViolationType};

    fn batch() -> Vec<Violation> {
        vec![Violation::new(
            ViolationType::LaneTermination,
            "car",
            0.5,
            BBox::new(0.0, 0.0, 1.0, 1.0),
            "d",
        )]
    }

    #[test]
    fn test_inline_data_uri() {
        let frame = Frame {
            frame_id: 1,
            data: b"abc".to_vec(),
        };
        let ev = InlineEvidenceStore::default().attach(&frame, &batch()).unwrap();
        assert_eq!(ev.0, "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn test_recorded_frames_are_labelled_json() {
        let frame = Frame {
            frame_id: 1,
            data: b"{}".to_vec(),
        };
        let ev = InlineEvidenceStore::json().attach(&frame, &batch()).unwrap();
        assert_eq!(ev.0, "data:application/json;base64,e30=");
    }

    #[test]
    fn test_inline_skips_empty_batch() {
        let frame = Frame {
            frame_id: 1,
            data: b"abc".to_vec(),
        };
        assert!(InlineEvidenceStore::jpeg().attach(&frame, &[]).is_none());
        assert!(NoEvidence.attach(&frame, &batch()).is_none());
    }
}
