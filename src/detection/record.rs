// src/detection/record.rs
//
// Boundary between detector output and the rule engines. Boxes are
// validated here once; the rule engines assume well-formed input.

use crate::types::{BBox, Detection, FrameCounts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Detector output before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: [f32; 4], // [x1, y1, x2, y2] in frame pixels
    pub label: String,
    pub confidence: f32,
}

impl RawDetection {
    pub fn new(bbox: [f32; 4], label: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            label: label.into(),
            confidence,
        }
    }

    /// Normalize into a `Detection` for a `width` x `height` frame.
    ///
    /// Reversed corners are swapped and coordinates clamped to the frame.
    /// Returns `None` for non-finite values or boxes with no area left.
    pub fn validate(&self, width: u32, height: u32) -> Option<Detection> {
        let [a, b, c, d] = self.bbox;
        if !(a.is_finite() && b.is_finite() && c.is_finite() && d.is_finite()) {
            return None;
        }
        if !self.confidence.is_finite() {
            return None;
        }

        let (w, h) = (width as f32, height as f32);
        let x1 = a.min(c).clamp(0.0, w);
        let x2 = a.max(c).clamp(0.0, w);
        let y1 = b.min(d).clamp(0.0, h);
        let y2 = b.max(d).clamp(0.0, h);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(Detection {
            bbox: BBox::new(x1, y1, x2, y2),
            label: self.label.clone(),
            confidence: self.confidence.clamp(0.0, 1.0),
        })
    }
}

/// Validated, allow-listed detections of one frame plus their counts.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub frame_id: u64,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
    pub counts: FrameCounts,
    /// Boxes dropped by validation (not by the allow-list)
    pub rejected: usize,
}

impl FrameRecord {
    pub fn build(
        frame_id: u64,
        width: u32,
        height: u32,
        raw: &[RawDetection],
        counted: &BTreeSet<String>,
    ) -> Self {
        let mut detections = Vec::with_capacity(raw.len());
        let mut rejected = 0;

        for r in raw {
            if !counted.contains(&r.label) {
                continue;
            }
            match r.validate(width, height) {
                Some(det) => detections.push(det),
                None => {
                    rejected += 1;
                    debug!(
                        "Rejected malformed box {:?} ({}) in frame {}",
                        r.bbox, r.label, frame_id
                    );
                }
            }
        }

        let counts = FrameCounts::from_detections(&detections);

        Self {
            frame_id,
            width,
            height,
            detections,
            counts,
            rejected,
        }
    }
}
