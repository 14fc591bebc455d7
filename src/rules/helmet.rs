// src/rules/helmet.rs

use crate::detection::RawDetection;
use crate::types::{Violation, ViolationType};
use std::collections::BTreeSet;

pub const RIDER_SUBJECT: &str = "rider";
const DETAILS: &str = "Rider without helmet detected";

/// Turns helmet-model output into `no_helmet` violations.
#[derive(Debug, Clone)]
pub struct HelmetRule {
    no_helmet_labels: BTreeSet<String>,
}

impl HelmetRule {
    pub fn new(labels: &BTreeSet<String>) -> Self {
        Self {
            no_helmet_labels: labels.iter().map(|l| l.to_lowercase()).collect(),
        }
    }

    pub fn is_no_helmet(&self, label: &str) -> bool {
        self.no_helmet_labels.contains(&label.to_lowercase())
    }

    pub fn evaluate(&self, detections: &[RawDetection], width: u32, height: u32) -> Vec<Violation> {
        detections
            .iter()
            .filter(|d| self.is_no_helmet(&d.label))
            .filter_map(|d| d.validate(width, height))
            .map(|d| {
                Violation::new(
                    ViolationType::NoHelmet,
                    RIDER_SUBJECT,
                    d.confidence,
                    d.bbox,
                    DETAILS,
                )
            })
            .collect()
    }
}
