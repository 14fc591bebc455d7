// src/detection/mod.rs

mod record;
mod source;
mod vocabulary;

// Re-export public APIs
pub use record::{FrameRecord, RawDetection};
pub use source::{
    Detector, FrameDetections, HelmetDetector, RecordedDetection, RecordedFrame, ReplayDetector,
    ReplayHelmetDetector,
};
pub use vocabulary::label_for_class_id;
