// src/pipeline/frame_context.rs
//
// What one processed frame produced. Returned to the caller after the
// frame's batch has been committed.

use crate::types::{FrameCounts, Violation, ViolationType};
use serde::Serialize;

/// Result of the optional helmet check for a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum HelmetCheck {
    /// No helmet detector installed
    Disabled,
    /// Detector ran; `found` riders without helmets
    Checked { found: usize },
    /// Detector exists but had nothing for this frame
    Unavailable(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub frame_id: u64,
    pub width: u32,
    pub height: u32,
    pub counts: FrameCounts,
    /// Violations as recorded, in append order. A batch larger than the
    /// store capacity evicts its own oldest entries, so some ids here may
    /// no longer be in the store.
    pub violations: Vec<Violation>,
    pub accident_detected: bool,
    /// Ambulance-like vehicle seen in this frame
    pub ambulance_detected: bool,
    /// Combined priority flag after this frame
    pub priority: bool,
    pub helmet: HelmetCheck,
    pub rejected_boxes: usize,
}

impl FrameOutcome {
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn count_of(&self, kind: ViolationType) -> usize {
        self.violations.iter().filter(|v| v.kind() == kind).count()
    }
}
