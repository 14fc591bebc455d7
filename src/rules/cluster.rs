// src/rules/cluster.rs
//
// Accident heuristic: several vehicle boxes piled on top of each other.
// Boxes are visited in detector order and the first box with enough
// overlapping neighbours wins, so the reported box depends on that order.

use crate::types::{AccidentConfig, Detection, Violation, ViolationType};
use std::collections::BTreeSet;
use tracing::debug;

/// Fixed confidence for cluster events; it is derived, not a model score.
pub const CLUSTER_CONFIDENCE: f32 = 0.9;
pub const CLUSTER_SUBJECT: &str = "cluster";
const DETAILS: &str = "Possible accident: multiple vehicles in collision zone";

#[derive(Debug, Clone)]
pub struct ClusterRule {
    vehicles: BTreeSet<String>,
    min_vehicles: usize,
    min_iou: f32,
}

impl ClusterRule {
    pub fn new(vehicles: BTreeSet<String>, config: AccidentConfig) -> Self {
        Self {
            vehicles,
            min_vehicles: config.min_vehicles.max(2),
            min_iou: config.min_iou,
        }
    }

    /// At most one accident per frame.
    pub fn evaluate(&self, detections: &[Detection]) -> Option<Violation> {
        let vehicles: Vec<&Detection> = detections
            .iter()
            .filter(|d| self.vehicles.contains(&d.label))
            .collect();

        if vehicles.len() < self.min_vehicles {
            return None;
        }

        let needed = self.min_vehicles - 1;

        for (i, anchor) in vehicles.iter().enumerate() {
            let overlaps = vehicles
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && anchor.bbox.iou(&other.bbox) >= self.min_iou)
                .count();

            if overlaps >= needed {
                debug!(
                    "Cluster rule: box {} overlaps {} vehicles (iou >= {:.2})",
                    i, overlaps, self.min_iou
                );
                return Some(Violation::new(
                    ViolationType::Accident,
                    CLUSTER_SUBJECT,
                    CLUSTER_CONFIDENCE,
                    anchor.bbox,
                    DETAILS,
                ));
            }
        }

        None
    }
}
