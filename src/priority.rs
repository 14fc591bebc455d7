// src/priority.rs

use serde::Serialize;
use tracing::info;

/// Emergency-vehicle priority: automatic detection OR operator override.
/// The override stays set until an operator clears it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityTracker {
    auto_detected: bool,
    manual_override: bool,
}

impl PriorityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the combined flag changed.
    pub fn set_auto_detected(&mut self, value: bool) -> bool {
        let before = self.is_priority();
        self.auto_detected = value;
        before != self.is_priority()
    }

    /// Returns true if the combined flag changed.
    pub fn set_manual_override(&mut self, value: bool) -> bool {
        let before = self.is_priority();
        if self.manual_override != value {
            info!(
                "🚑 Manual priority override {}",
                if value { "ENABLED" } else { "cleared" }
            );
        }
        self.manual_override = value;
        before != self.is_priority()
    }

    pub fn is_priority(&self) -> bool {
        self.auto_detected || self.manual_override
    }

    pub fn manual_override(&self) -> bool {
        self.manual_override
    }
}
