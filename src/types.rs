// src/types.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub classes: ClassConfig,
    pub zone: ZoneConfig,
    pub accident: AccidentConfig,
    pub challan: ChallanConfig,
    pub analytics: AnalyticsConfig,
    pub store: StoreConfig,
    pub heartbeat: HeartbeatConfig,
    pub replay: ReplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassConfig {
    /// Road-user labels that are counted and passed to the rule engines
    pub counted: BTreeSet<String>,
    /// Labels that take part in the accident cluster check
    pub vehicles: BTreeSet<String>,
    /// Labels that raise the automatic priority signal
    pub ambulance: BTreeSet<String>,
    /// Helmet-model labels that mean "rider without helmet" (case-insensitive)
    pub no_helmet: BTreeSet<String>,
}

impl Default for ClassConfig {
    fn default() -> Self {
        let set = |labels: &[&str]| labels.iter().map(|s| s.to_string()).collect();
        Self {
            counted: set(&[
                "person",
                "bicycle",
                "car",
                "motorcycle",
                "airplane",
                "bus",
                "train",
                "truck",
            ]),
            vehicles: set(&["car", "truck", "bus", "motorcycle", "bicycle"]),
            ambulance: set(&["bus"]),
            no_helmet: set(&["without_helmet", "no_helmet", "no helmet"]),
        }
    }
}

/// Lane-termination zone as fractions of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        // Top strip of the frame
        Self {
            x_min: 0.0,
            y_min: 0.0,
            x_max: 1.0,
            y_max: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AccidentConfig {
    pub min_vehicles: usize,
    pub min_iou: f32,
}

impl Default for AccidentConfig {
    fn default() -> Self {
        Self {
            min_vehicles: 3,
            min_iou: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallanConfig {
    /// Amount per violation type name
    pub amounts: BTreeMap<String, u32>,
    /// Amount for types missing from `amounts`
    pub default_amount: u32,
}

impl Default for ChallanConfig {
    fn default() -> Self {
        let amounts = [
            ("lane_termination", 500),
            ("no_helmet", 1000),
            ("accident", 0),
            ("over_speeding", 1000),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            amounts,
            default_amount: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub window_capacity: usize,
    /// Average total at which traffic becomes `medium`
    pub medium_from: f64,
    /// Average total at which traffic becomes `high`
    pub high_from: f64,
    /// Average total at which traffic becomes `congested`
    pub congested_from: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_capacity: 30,
            medium_from: 5.0,
            high_from: 15.0,
            congested_from: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub violation_capacity: usize,
    pub event_bus_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            violation_capacity: 500,
            event_bus_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub sweep_interval_secs: u64,
    pub offline_after_secs: u64,
    pub persist_path: Option<String>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 30,
            offline_after_secs: 120,
            persist_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub issue_challans: bool,
    pub attach_evidence: bool,
    pub system_id: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            input_dir: "recordings".to_string(),
            output_dir: "output".to_string(),
            issue_challans: false,
            attach_evidence: true,
            system_id: "replay-node".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "traffic_enforcement=info".to_string(),
        }
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Axis-aligned box in pixel coordinates. Always `x1 < x2` and `y1 < y2`
/// once it has passed through `FrameRecord` validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union. Disjoint or touching boxes score 0.
    pub fn iou(&self, other: &BBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;

        intersection / union.max(1e-6)
    }
}

// ============================================================================
// DETECTIONS
// ============================================================================

/// One validated object in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BBox,
    pub label: String,
    pub confidence: f32,
}

/// Per-class counts for one frame. Only constructible from detections, so
/// `total` always equals the sum of `by_class`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameCounts {
    by_class: BTreeMap<String, u32>,
    total: u32,
}

impl FrameCounts {
    pub fn from_detections<'a>(detections: impl IntoIterator<Item = &'a Detection>) -> Self {
        let mut by_class: BTreeMap<String, u32> = BTreeMap::new();
        for det in detections {
            *by_class.entry(det.label.clone()).or_insert(0) += 1;
        }
        let total = by_class.values().sum();
        Self { by_class, total }
    }

    pub fn by_class(&self) -> &BTreeMap<String, u32> {
        &self.by_class
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn get(&self, label: &str) -> u32 {
        self.by_class.get(label).copied().unwrap_or(0)
    }
}

/// Opaque encoded frame as handed to a `Detector`.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_id: u64,
    pub data: Vec<u8>,
}

// ============================================================================
// VIOLATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    LaneTermination,
    Accident,
    NoHelmet,
}

impl ViolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::LaneTermination => "lane_termination",
            ViolationType::Accident => "accident",
            ViolationType::NoHelmet => "no_helmet",
        }
    }

    /// "lane_termination" -> "Lane Termination"
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationId(Uuid);

impl ViolationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ViolationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a stored frame snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceRef(pub String);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    id: ViolationId,
    kind: ViolationType,
    subject: String,
    confidence: f32,
    bbox: BBox,
    details: String,
    timestamp: f64,
    evidence: Option<EvidenceRef>,
}

impl Violation {
    pub fn new(
        kind: ViolationType,
        subject: impl Into<String>,
        confidence: f32,
        bbox: BBox,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: ViolationId::generate(),
            kind,
            subject: subject.into(),
            confidence: confidence.clamp(0.0, 1.0),
            bbox,
            details: details.into(),
            timestamp: now_secs(),
            evidence: None,
        }
    }

    pub fn id(&self) -> ViolationId {
        self.id
    }

    pub fn kind(&self) -> ViolationType {
        self.kind
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn evidence(&self) -> Option<&EvidenceRef> {
        self.evidence.as_ref()
    }

    /// Evidence can be attached once; later calls are ignored.
    pub(crate) fn attach_evidence(&mut self, evidence: EvidenceRef) {
        if self.evidence.is_none() {
            self.evidence = Some(evidence);
        }
    }

    pub fn summary(&self) -> ViolationSummary {
        ViolationSummary {
            id: self.id,
            kind: self.kind,
            vehicle_class: self.subject.clone(),
            confidence: (self.confidence * 100.0).round() / 100.0,
            details: self.details.clone(),
            timestamp: self.timestamp,
            has_evidence: self.evidence.is_some(),
        }
    }
}

/// Listing projection of a violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationSummary {
    pub id: ViolationId,
    #[serde(rename = "type")]
    pub kind: ViolationType,
    pub vehicle_class: String,
    pub confidence: f32,
    pub details: String,
    pub timestamp: f64,
    pub has_evidence: bool,
}

/// Wall-clock seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str) -> Detection {
        Detection {
            bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            label: label.to_string(),
            confidence: 0.8,
        }
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_and_touching() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(20.0, 20.0, 30.0, 30.0);
        let touching = BBox::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.iou(&touching), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        // Intersection 50, union 150
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_counts_total_matches_sum() {
        let dets = vec![det("car"), det("car"), det("bus"), det("person")];
        let counts = FrameCounts::from_detections(&dets);
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.total(), counts.by_class().values().sum::<u32>());
        assert_eq!(counts.get("car"), 2);
        assert_eq!(counts.get("truck"), 0);
    }

    #[test]
    fn test_counts_empty() {
        let counts = FrameCounts::from_detections(&[]);
        assert_eq!(counts.total(), 0);
        assert!(counts.by_class().is_empty());
    }

    #[test]
    fn test_violation_type_title() {
        assert_eq!(ViolationType::LaneTermination.title(), "Lane Termination");
        assert_eq!(ViolationType::NoHelmet.title(), "No Helmet");
    }

    #[test]
    fn test_evidence_attaches_once() {
        let mut v = Violation::new(
            ViolationType::Accident,
            "cluster",
            0.9,
            BBox::new(0.0, 0.0, 1.0, 1.0),
            "x",
        );
        v.attach_evidence(EvidenceRef("first".into()));
        v.attach_evidence(EvidenceRef("second".into()));
        assert_eq!(v.evidence(), Some(&EvidenceRef("first".into())));
    }

    #[test]
    fn test_summary_rounds_confidence() {
        let v = Violation::new(
            ViolationType::NoHelmet,
            "rider",
            0.876,
            BBox::new(0.0, 0.0, 1.0, 1.0),
            "Rider without helmet detected",
        );
        let s = v.summary();
        assert!((s.confidence - 0.88).abs() < 1e-6);
        assert!(!s.has_evidence);
    }
}
