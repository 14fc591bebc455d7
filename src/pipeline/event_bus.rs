// src/pipeline/event_bus.rs
//
// Engine notifications for whoever serves the engine (dashboard push,
// log sinks). Publishing never blocks; a full bus drops its oldest event.

use crate::challan::ChallanId;
use crate::types::{BBox, ViolationId, ViolationType};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    ViolationsRecorded {
        frame_id: u64,
        types: Vec<ViolationType>,
    },

    AccidentAlert {
        frame_id: u64,
        timestamp: f64,
        bbox: BBox,
    },

    PriorityChanged {
        active: bool,
        manual_override: bool,
    },

    ChallanIssued {
        challan_id: ChallanId,
        violation_id: ViolationId,
        amount: u32,
    },
}

pub struct EventBus {
    events: VecDeque<EngineEvent>,
    max_pending: usize,
    dropped: u64,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        let max_pending = max_pending.max(1);
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
            dropped: 0,
        }
    }

    pub fn publish(&mut self, event: EngineEvent) {
        if self.events.len() >= self.max_pending {
            if self.dropped == 0 {
                warn!(
                    "Event bus full ({} events), dropping oldest",
                    self.max_pending
                );
            }
            self.dropped += 1;
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
