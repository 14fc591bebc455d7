// src/lib.rs
//
// Traffic enforcement engine: per-frame violation rules, traffic state,
// emergency priority, violation log and challans.

pub mod analytics;
pub mod challan;
pub mod config;
pub mod detection;
pub mod document;
pub mod error;
pub mod evidence;
pub mod heartbeat;
pub mod pipeline;
pub mod priority;
pub mod replay;
pub mod rules;
pub mod types;
pub mod violation_store;

pub use analytics::{TrafficLevel, TrafficState, TrafficStateEstimator};
pub use challan::{Challan, ChallanId, ChallanManager, ChallanStatus};
pub use error::{DecodeError, DetectorError, EngineError};
pub use pipeline::{EngineEvent, EngineStats, FrameOutcome, HelmetCheck, TrafficEngine};
pub use types::{
    BBox, Config, Detection, EvidenceRef, Frame, FrameCounts, Violation, ViolationId,
    ViolationSummary, ViolationType,
};
pub use violation_store::ViolationStore;
