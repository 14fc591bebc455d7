// src/detection/source.rs
//
// Detector contracts. Model inference lives outside this crate; anything
// that can turn a frame into boxes plugs in here.

use super::record::RawDetection;
use super::vocabulary::label_for_class_id;
use crate::error::{DecodeError, DetectorError};
use crate::types::Frame;
use serde::Deserialize;
use tracing::debug;

/// Detector output for one frame.
#[derive(Debug, Clone)]
pub struct FrameDetections {
    pub frame_id: u64,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<RawDetection>,
}

/// Primary object detector. Zero detections is a valid result.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Result<FrameDetections, DecodeError>;
}

/// Optional secondary model that finds riders with and without helmets.
pub trait HelmetDetector: Send + Sync {
    fn detect_helmets(&self, frame: &Frame) -> Result<Vec<RawDetection>, DetectorError>;
}

// ============================================================================
// RECORDED FRAMES
// ============================================================================

/// One line of a detection recording.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedFrame {
    #[serde(default)]
    pub frame_id: Option<u64>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub detections: Vec<RecordedDetection>,
    /// Output of a helmet model, if one ran on this frame
    #[serde(default)]
    pub helmet: Option<Vec<RecordedDetection>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordedDetection {
    pub bbox: [f32; 4],
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub class_id: Option<u32>,
    pub confidence: f32,
}

impl RecordedDetection {
    /// Label wins over class id; unknown class ids are dropped.
    fn into_raw(self) -> Option<RawDetection> {
        let label = match (self.label, self.class_id) {
            (Some(label), _) => label,
            (None, Some(id)) => label_for_class_id(id)?.to_string(),
            (None, None) => return None,
        };
        Some(RawDetection::new(self.bbox, label, self.confidence))
    }
}

impl RecordedFrame {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let record: RecordedFrame = serde_json::from_slice(data)?;
        if record.width == 0 || record.height == 0 {
            return Err(DecodeError::InvalidDimensions {
                width: record.width,
                height: record.height,
            });
        }
        Ok(record)
    }
}

/// Detector that replays pre-computed detections stored as JSON frames.
#[derive(Debug, Default)]
pub struct ReplayDetector {
    frames_decoded: u64,
}

impl ReplayDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }
}

impl Detector for ReplayDetector {
    fn detect(&mut self, frame: &Frame) -> Result<FrameDetections, DecodeError> {
        let record = RecordedFrame::decode(&frame.data)?;
        self.frames_decoded += 1;

        let detections: Vec<RawDetection> = record
            .detections
            .into_iter()
            .filter_map(RecordedDetection::into_raw)
            .collect();

        debug!(
            "Replayed frame {}: {} detections",
            frame.frame_id,
            detections.len()
        );

        Ok(FrameDetections {
            frame_id: record.frame_id.unwrap_or(frame.frame_id),
            width: record.width,
            height: record.height,
            detections,
        })
    }
}

/// Helmet detector backed by the `helmet` field of recorded frames.
/// A recording without that field means no helmet model ran.
#[derive(Debug, Default)]
pub struct ReplayHelmetDetector;

impl HelmetDetector for ReplayHelmetDetector {
    fn detect_helmets(&self, frame: &Frame) -> Result<Vec<RawDetection>, DetectorError> {
        let record =
            RecordedFrame::decode(&frame.data).map_err(|e| DetectorError::Failed(e.to_string()))?;
        match record.helmet {
            Some(dets) => Ok(dets
                .into_iter()
                .filter_map(RecordedDetection::into_raw)
                .collect()),
            None => Err(DetectorError::Unavailable(format!(
                "frame {} carries no helmet output",
                frame.frame_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(json: &str) -> Frame {
        Frame {
            frame_id: 9,
            data: json.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_replay_decodes_labels_and_class_ids() {
        let f = frame(
            r#"{"width":640,"height":480,"detections":[
                {"bbox":[0,0,10,10],"label":"car","confidence":0.9},
                {"bbox":[5,5,20,20],"class_id":7,"confidence":0.6},
                {"bbox":[5,5,20,20],"class_id":63,"confidence":0.6}
            ]}"#,
        );
        let mut detector = ReplayDetector::new();
        let out = detector.detect(&f).unwrap();

        assert_eq!(out.frame_id, 9);
        assert_eq!(out.width, 640);
        assert_eq!(out.detections.len(), 2);
        assert_eq!(out.detections[1].label, "truck");
        assert_eq!(detector.frames_decoded(), 1);
    }

    #[test]
    fn test_replay_rejects_malformed_json() {
        let mut detector = ReplayDetector::new();
        let err = detector.detect(&frame("{not json")).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
        assert_eq!(detector.frames_decoded(), 0);
    }

    #[test]
    fn test_replay_rejects_zero_dimensions() {
        let mut detector = ReplayDetector::new();
        let err = detector
            .detect(&frame(r#"{"width":0,"height":480}"#))
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidDimensions { .. }));
    }

    #[test]
    fn test_empty_frame_is_valid() {
        let mut detector = ReplayDetector::new();
        let out = detector
            .detect(&frame(r#"{"frame_id":3,"width":64,"height":48}"#))
            .unwrap();
        assert_eq!(out.frame_id, 3);
        assert!(out.detections.is_empty());
    }

    #[test]
    fn test_helmet_output_distinguishes_missing_model() {
        let helmet = ReplayHelmetDetector;
        let none = helmet.detect_helmets(&frame(r#"{"width":64,"height":48}"#));
        assert!(matches!(none, Err(DetectorError::Unavailable(_))));

        let empty = helmet
            .detect_helmets(&frame(r#"{"width":64,"height":48,"helmet":[]}"#))
            .unwrap();
        assert!(empty.is_empty());
    }
}
