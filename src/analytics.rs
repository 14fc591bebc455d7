// src/analytics.rs
//
// Congestion level from a sliding window of per-frame counts.

use crate::types::{AnalyticsConfig, FrameCounts};
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLevel {
    Low,
    Medium,
    High,
    Congested,
}

impl TrafficLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficLevel::Low => "low",
            TrafficLevel::Medium => "medium",
            TrafficLevel::High => "high",
            TrafficLevel::Congested => "congested",
        }
    }

    fn headline(&self) -> &'static str {
        match self {
            TrafficLevel::Low => "Light traffic",
            TrafficLevel::Medium => "Moderate traffic",
            TrafficLevel::High => "Heavy traffic",
            TrafficLevel::Congested => "Congested",
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            TrafficLevel::Low => "Normal signal timing is fine.",
            TrafficLevel::Medium => "Consider slightly longer green for main flow.",
            TrafficLevel::High => "Extend green phase; monitor pedestrian crossings.",
            TrafficLevel::Congested => {
                "Maximize green for dominant direction; consider overflow lanes."
            }
        }
    }
}

/// Derived traffic state. `level` is `None` until the first frame arrives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficState {
    pub level: Option<TrafficLevel>,
    pub message: String,
    pub suggestion: String,
}

impl TrafficState {
    pub fn no_data() -> Self {
        Self {
            level: None,
            message: "No data yet".to_string(),
            suggestion: "Start a video or camera feed to analyze traffic.".to_string(),
        }
    }

    fn measured(level: TrafficLevel, average: f64) -> Self {
        Self {
            level: Some(level),
            message: format!("{} (~{} objects)", level.headline(), average.floor() as u64),
            suggestion: level.suggestion().to_string(),
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.level.is_none()
    }
}

/// Fixed-capacity FIFO of frame counts.
pub struct TrafficStateEstimator {
    history: VecDeque<FrameCounts>,
    config: AnalyticsConfig,
}

impl TrafficStateEstimator {
    pub fn new(config: AnalyticsConfig) -> Self {
        let capacity = config.window_capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            config: AnalyticsConfig {
                window_capacity: capacity,
                ..config
            },
        }
    }

    pub fn push(&mut self, counts: FrameCounts) {
        if self.history.len() >= self.config.window_capacity {
            self.history.pop_front();
        }
        self.history.push_back(counts);
    }

    pub fn average_total(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        let sum: u64 = self.history.iter().map(|c| c.total() as u64).sum();
        Some(sum as f64 / self.history.len() as f64)
    }

    pub fn classify(&self, average: f64) -> TrafficLevel {
        if average < self.config.medium_from {
            TrafficLevel::Low
        } else if average < self.config.high_from {
            TrafficLevel::Medium
        } else if average < self.config.congested_from {
            TrafficLevel::High
        } else {
            TrafficLevel::Congested
        }
    }

    pub fn state(&self) -> TrafficState {
        match self.average_total() {
            Some(avg) => TrafficState::measured(self.classify(avg), avg),
            None => TrafficState::no_data(),
        }
    }

    /// Window totals, oldest first.
    pub fn recent_totals(&self) -> Vec<u32> {
        self.history.iter().map(|c| c.total()).collect()
    }

    pub fn latest(&self) -> Option<&FrameCounts> {
        self.history.back()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
