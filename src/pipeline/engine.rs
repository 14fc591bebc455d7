// src/pipeline/engine.rs
//
// Owns every piece of mutable engine state. Each structure sits behind its
// own lock; a frame's results are computed first and committed afterwards,
// so a failed frame leaves no trace.

use super::event_bus::{EngineEvent, EventBus};
use super::frame_context::{FrameOutcome, HelmetCheck};
use super::metrics::{EngineMetrics, MetricsSummary};
use crate::analytics::{TrafficState, TrafficStateEstimator};
use crate::challan::{Challan, ChallanManager};
use crate::detection::{Detector, FrameDetections, FrameRecord, HelmetDetector};
use crate::document::{ChallanDocument, DocumentRenderer, UnavailableRenderer};
use crate::error::{DetectorError, EngineError};
use crate::evidence::{EvidenceStore, NoEvidence};
use crate::priority::PriorityTracker;
use crate::rules::{ClusterRule, HelmetRule, ZoneRule};
use crate::types::{now_secs, BBox, Config, Frame, Violation, ViolationId, ViolationSummary};
use crate::violation_store::ViolationStore;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Dashboard snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    pub state: TrafficState,
    pub recent_totals: Vec<u32>,
    pub by_class: BTreeMap<String, u32>,
    pub accident_alert: bool,
    pub ambulance_priority: bool,
}

pub struct TrafficEngine {
    counted: BTreeSet<String>,
    ambulance: BTreeSet<String>,
    zone_rule: ZoneRule,
    cluster_rule: ClusterRule,
    helmet_rule: HelmetRule,

    helmet_detector: Option<Box<dyn HelmetDetector>>,
    evidence: Box<dyn EvidenceStore>,
    renderer: Box<dyn DocumentRenderer>,

    store: RwLock<ViolationStore>,
    estimator: RwLock<TrafficStateEstimator>,
    priority: Mutex<PriorityTracker>,
    challans: Mutex<ChallanManager>,
    accident_alert: Mutex<Option<f64>>,
    events: Mutex<EventBus>,
    metrics: EngineMetrics,
}

impl TrafficEngine {
    pub fn new(config: &Config) -> Self {
        info!(
            "Traffic engine: zone=({:.2},{:.2})-({:.2},{:.2}) accident={}@{:.2} window={} store={}",
            config.zone.x_min,
            config.zone.y_min,
            config.zone.x_max,
            config.zone.y_max,
            config.accident.min_vehicles,
            config.accident.min_iou,
            config.analytics.window_capacity,
            config.store.violation_capacity
        );

        Self {
            counted: config.classes.counted.clone(),
            ambulance: config.classes.ambulance.clone(),
            zone_rule: ZoneRule::new(config.zone),
            cluster_rule: ClusterRule::new(config.classes.vehicles.clone(), config.accident),
            helmet_rule: HelmetRule::new(&config.classes.no_helmet),
            helmet_detector: None,
            evidence: Box::new(NoEvidence),
            renderer: Box::new(UnavailableRenderer),
            store: RwLock::new(ViolationStore::with_capacity(
                config.store.violation_capacity,
            )),
            estimator: RwLock::new(TrafficStateEstimator::new(config.analytics)),
            priority: Mutex::new(PriorityTracker::new()),
            challans: Mutex::new(ChallanManager::new(&config.challan)),
            accident_alert: Mutex::new(None),
            events: Mutex::new(EventBus::new(config.store.event_bus_capacity)),
            metrics: EngineMetrics::new(),
        }
    }

    pub fn with_helmet_detector(mut self, detector: Box<dyn HelmetDetector>) -> Self {
        self.helmet_detector = Some(detector);
        self
    }

    pub fn with_evidence_store(mut self, evidence: Box<dyn EvidenceStore>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    // ========================================================================
    // FRAME PROCESSING
    // ========================================================================

    /// Run `detector` on `frame` and commit the results. Decode failures are
    /// returned untouched and leave all state unchanged.
    pub fn process_frame(
        &self,
        detector: &mut dyn Detector,
        frame: &Frame,
    ) -> Result<FrameOutcome, EngineError> {
        let detections = match detector.detect(frame) {
            Ok(d) => d,
            Err(e) => {
                self.metrics.inc(&self.metrics.frames_rejected);
                warn!("Frame {} rejected: {}", frame.frame_id, e);
                return Err(e.into());
            }
        };
        Ok(self.ingest(frame, detections))
    }

    /// Evaluate all rules on already-detected boxes and commit the batch.
    pub fn ingest(&self, frame: &Frame, detections: FrameDetections) -> FrameOutcome {
        let record = FrameRecord::build(
            detections.frame_id,
            detections.width,
            detections.height,
            &detections.detections,
            &self.counted,
        );

        let ambulance_detected = record
            .detections
            .iter()
            .any(|d| self.ambulance.contains(&d.label));

        // Zone, then accident, then helmet: this is the append order.
        let mut batch: Vec<Violation> =
            self.zone_rule
                .evaluate(&record.detections, record.width, record.height);
        let accident = self.cluster_rule.evaluate(&record.detections);
        let accident_bbox = accident.as_ref().map(|v| v.bbox());
        batch.extend(accident);
        let (helmet_violations, helmet) = self.check_helmets(frame, &record);
        batch.extend(helmet_violations);

        let evidence = if batch.is_empty() {
            None
        } else {
            self.evidence.attach(frame, &batch)
        };

        // ---- commit ----
        if !batch.is_empty() {
            let mut store = self.store.write();
            if batch.len() > store.capacity() {
                warn!(
                    "Frame {}: {} violations exceed store capacity {}",
                    record.frame_id,
                    batch.len(),
                    store.capacity()
                );
            }
            store.append(batch.clone(), evidence.clone());
        }
        self.estimator.write().push(record.counts.clone());

        if let Some(ev) = &evidence {
            for v in &mut batch {
                v.attach_evidence(ev.clone());
            }
        }

        // Lock order: priority, then events.
        let priority = {
            let mut tracker = self.priority.lock();
            let changed = tracker.set_auto_detected(ambulance_detected);
            let active = tracker.is_priority();
            self.publish_frame_events(
                record.frame_id,
                &batch,
                accident_bbox,
                changed.then_some((active, tracker.manual_override())),
            );
            active
        };

        self.metrics.inc(&self.metrics.frames_processed);
        self.metrics
            .add(&self.metrics.boxes_rejected, record.rejected as u64);
        for v in &batch {
            self.metrics.record_violation(v.kind());
        }

        FrameOutcome {
            frame_id: record.frame_id,
            width: record.width,
            height: record.height,
            counts: record.counts,
            violations: batch,
            accident_detected: accident_bbox.is_some(),
            ambulance_detected,
            priority,
            helmet,
            rejected_boxes: record.rejected,
        }
    }

    fn check_helmets(&self, frame: &Frame, record: &FrameRecord) -> (Vec<Violation>, HelmetCheck) {
        let detector = match &self.helmet_detector {
            Some(d) => d,
            None => return (Vec::new(), HelmetCheck::Disabled),
        };

        match detector.detect_helmets(frame) {
            Ok(dets) => {
                let violations = self
                    .helmet_rule
                    .evaluate(&dets, record.width, record.height);
                let found = violations.len();
                (violations, HelmetCheck::Checked { found })
            }
            Err(DetectorError::Unavailable(reason)) => {
                debug!("Helmet check skipped on frame {}: {}", record.frame_id, reason);
                (Vec::new(), HelmetCheck::Unavailable(reason))
            }
            Err(DetectorError::Failed(reason)) => {
                self.metrics.inc(&self.metrics.helmet_failures);
                warn!("Helmet check failed on frame {}: {}", record.frame_id, reason);
                (Vec::new(), HelmetCheck::Failed(reason))
            }
        }
    }

    fn publish_frame_events(
        &self,
        frame_id: u64,
        batch: &[Violation],
        accident: Option<BBox>,
        priority_change: Option<(bool, bool)>,
    ) {
        let mut events = self.events.lock();

        if !batch.is_empty() {
            info!(
                "🚦 Frame {}: {} violation(s) recorded",
                frame_id,
                batch.len()
            );
            events.publish(EngineEvent::ViolationsRecorded {
                frame_id,
                types: batch.iter().map(|v| v.kind()).collect(),
            });
        }

        if let Some(bbox) = accident {
            let timestamp = now_secs();
            *self.accident_alert.lock() = Some(timestamp);
            warn!("🚨 Possible accident on frame {} at {:?}", frame_id, bbox);
            events.publish(EngineEvent::AccidentAlert {
                frame_id,
                timestamp,
                bbox,
            });
        }

        if let Some((active, manual_override)) = priority_change {
            info!(
                "🚑 Priority signal {}",
                if active { "ON" } else { "off" }
            );
            events.publish(EngineEvent::PriorityChanged {
                active,
                manual_override,
            });
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn recent_violations(&self, limit: usize) -> Vec<Violation> {
        self.store.read().list_recent(limit)
    }

    pub fn violation_summaries(&self, limit: usize) -> Vec<ViolationSummary> {
        self.store
            .read()
            .list_recent(limit)
            .iter()
            .map(Violation::summary)
            .collect()
    }

    pub fn find_violation(&self, id: ViolationId) -> Result<Violation, EngineError> {
        self.store
            .read()
            .find_by_id(id)
            .cloned()
            .ok_or_else(|| EngineError::violation_not_found(id))
    }

    pub fn violation_count(&self) -> usize {
        self.store.read().len()
    }

    pub fn traffic_state(&self) -> TrafficState {
        self.estimator.read().state()
    }

    pub fn recent_totals(&self) -> Vec<u32> {
        self.estimator.read().recent_totals()
    }

    pub fn stats(&self) -> EngineStats {
        let (state, recent_totals, by_class) = {
            let est = self.estimator.read();
            (
                est.state(),
                est.recent_totals(),
                est.latest()
                    .map(|c| c.by_class().clone())
                    .unwrap_or_default(),
            )
        };
        EngineStats {
            state,
            recent_totals,
            by_class,
            accident_alert: self.accident_alert.lock().is_some(),
            ambulance_priority: self.is_priority(),
        }
    }

    /// Timestamp of the latest accident alert.
    pub fn accident_alert(&self) -> Option<f64> {
        *self.accident_alert.lock()
    }

    // ========================================================================
    // PRIORITY
    // ========================================================================

    /// Operator override. Returns the combined priority flag.
    pub fn set_manual_priority(&self, enable: bool) -> bool {
        let mut tracker = self.priority.lock();
        if tracker.set_manual_override(enable) {
            self.events.lock().publish(EngineEvent::PriorityChanged {
                active: tracker.is_priority(),
                manual_override: enable,
            });
        }
        tracker.is_priority()
    }

    pub fn is_priority(&self) -> bool {
        self.priority.lock().is_priority()
    }

    // ========================================================================
    // CHALLANS
    // ========================================================================

    pub fn create_challan(&self, violation_id: ViolationId) -> Result<Challan, EngineError> {
        let challan = {
            let store = self.store.read();
            self.challans.lock().create(&store, violation_id)?
        };

        self.metrics.inc(&self.metrics.challans_issued);
        self.events.lock().publish(EngineEvent::ChallanIssued {
            challan_id: challan.id.clone(),
            violation_id,
            amount: challan.amount,
        });
        Ok(challan)
    }

    /// Challans for every violation of `outcome` still in the store.
    /// Violations already evicted are skipped.
    pub fn issue_challans(&self, outcome: &FrameOutcome) -> Vec<Challan> {
        let mut issued = Vec::with_capacity(outcome.violations.len());
        for violation in &outcome.violations {
            match self.create_challan(violation.id()) {
                Ok(challan) => issued.push(challan),
                Err(e) => warn!(
                    "Frame {}: no challan for violation {}: {}",
                    outcome.frame_id,
                    violation.id(),
                    e
                ),
            }
        }
        issued
    }

    /// All challans, most recent first.
    pub fn challans(&self) -> Vec<Challan> {
        self.challans.lock().list()
    }

    /// Rendered document bytes for a challan.
    pub fn challan_document(&self, challan_id: &str) -> Result<Vec<u8>, EngineError> {
        let doc = {
            let challans = self.challans.lock();
            let challan = challans
                .find(challan_id)
                .ok_or_else(|| EngineError::challan_not_found(challan_id))?;
            ChallanDocument::from_challan(challan)
        };
        self.renderer.render(&doc)
    }

    pub fn document_extension(&self) -> &'static str {
        self.renderer.extension()
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    pub fn drain_events(&self) -> Vec<EngineEvent> {
        self.events.lock().drain()
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Consume the engine and report what it did.
    pub fn shutdown(self) -> MetricsSummary {
        let summary = self.metrics.summary();
        info!(
            "Traffic engine stopped: {} frames, {} violations ({} kept), {} challans",
            summary.frames_processed,
            summary.total_violations(),
            self.store.read().len(),
            self.challans.lock().len()
        );
        summary
    }
}
