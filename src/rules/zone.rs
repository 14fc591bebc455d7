// src/rules/zone.rs

use crate::types::{Detection, Violation, ViolationType, ZoneConfig};
use tracing::debug;

const DETAILS: &str = "Vehicle in lane termination / no-entry zone";

/// Zone in pixel coordinates for one frame size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelZone {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl PixelZone {
    /// Inclusive on every edge.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.x1 <= x && x <= self.x2 && self.y1 <= y && y <= self.y2
    }
}

/// Flags every detection whose box center lies in the lane-termination zone.
#[derive(Debug, Clone)]
pub struct ZoneRule {
    zone: ZoneConfig,
}

impl ZoneRule {
    pub fn new(zone: ZoneConfig) -> Self {
        Self { zone }
    }

    /// Scale the fractional zone to a frame. Never cached, frame sizes vary.
    pub fn pixel_zone(&self, width: u32, height: u32) -> PixelZone {
        let (w, h) = (width as f32, height as f32);
        PixelZone {
            x1: self.zone.x_min * w,
            y1: self.zone.y_min * h,
            x2: self.zone.x_max * w,
            y2: self.zone.y_max * h,
        }
    }

    pub fn evaluate(&self, detections: &[Detection], width: u32, height: u32) -> Vec<Violation> {
        let zone = self.pixel_zone(width, height);

        let violations: Vec<Violation> = detections
            .iter()
            .filter(|det| {
                let (cx, cy) = det.bbox.center();
                zone.contains(cx, cy)
            })
            .map(|det| {
                Violation::new(
                    ViolationType::LaneTermination,
                    det.label.clone(),
                    det.confidence,
                    det.bbox,
                    DETAILS,
                )
            })
            .collect();

        if !violations.is_empty() {
            debug!(
                "Zone rule: {} of {} detections inside {:?}",
                violations.len(),
                detections.len(),
                zone
            );
        }

        violations
    }
}
