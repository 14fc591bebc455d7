// src/pipeline/mod.rs

pub mod engine;
pub mod event_bus;
pub mod frame_context;
pub mod metrics;

pub use engine::{EngineStats, TrafficEngine};
pub use event_bus::{EngineEvent, EventBus};
pub use frame_context::{FrameOutcome, HelmetCheck};
pub use metrics::{EngineMetrics, MetricsSummary};
