// src/pipeline/metrics.rs
//
// Engine counters. Cheap to clone and safe to bump from any thread.

use crate::types::ViolationType;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct EngineMetrics {
    pub frames_processed: Arc<AtomicU64>,
    pub frames_rejected: Arc<AtomicU64>,
    pub boxes_rejected: Arc<AtomicU64>,
    pub lane_termination: Arc<AtomicU64>,
    pub accidents: Arc<AtomicU64>,
    pub no_helmet: Arc<AtomicU64>,
    pub helmet_failures: Arc<AtomicU64>,
    pub challans_issued: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            frames_processed: Arc::new(AtomicU64::new(0)),
            frames_rejected: Arc::new(AtomicU64::new(0)),
            boxes_rejected: Arc::new(AtomicU64::new(0)),
            lane_termination: Arc::new(AtomicU64::new(0)),
            accidents: Arc::new(AtomicU64::new(0)),
            no_helmet: Arc::new(AtomicU64::new(0)),
            helmet_failures: Arc::new(AtomicU64::new(0)),
            challans_issued: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_violation(&self, kind: ViolationType) {
        let counter = match kind {
            ViolationType::LaneTermination => &self.lane_termination,
            ViolationType::Accident => &self.accidents,
            ViolationType::NoHelmet => &self.no_helmet,
        };
        self.inc(counter);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.frames_processed.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            boxes_rejected: self.boxes_rejected.load(Ordering::Relaxed),
            lane_termination: self.lane_termination.load(Ordering::Relaxed),
            accidents: self.accidents.load(Ordering::Relaxed),
            no_helmet: self.no_helmet.load(Ordering::Relaxed),
            helmet_failures: self.helmet_failures.load(Ordering::Relaxed),
            challans_issued: self.challans_issued.load(Ordering::Relaxed),
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub frames_processed: u64,
    pub frames_rejected: u64,
    pub boxes_rejected: u64,
    pub lane_termination: u64,
    pub accidents: u64,
    pub no_helmet: u64,
    pub helmet_failures: u64,
    pub challans_issued: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}

impl MetricsSummary {
    pub fn total_violations(&self) -> u64 {
        self.lane_termination + self.accidents + self.no_helmet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_counters() {
        let m = EngineMetrics::new();
        m.record_violation(ViolationType::LaneTermination);
        m.record_violation(ViolationType::LaneTermination);
        m.record_violation(ViolationType::Accident);

        let s = m.summary();
        assert_eq!(s.lane_termination, 2);
        assert_eq!(s.accidents, 1);
        assert_eq!(s.no_helmet, 0);
        assert_eq!(s.total_violations(), 3);
    }

    #[test]
    fn test_clones_share_counters() {
        let m = EngineMetrics::new();
        let c = m.clone();
        c.inc(&c.frames_processed);
        assert_eq!(m.summary().frames_processed, 1);
    }
}
