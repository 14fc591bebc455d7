// src/challan.rs
//
// Violation -> challan (citation). Creation copies everything it needs
// from the violation, so a challan outlives eviction of its violation.

use crate::error::EngineError;
use crate::types::{now_secs, ChallanConfig, Violation, ViolationId, ViolationType};
use crate::violation_store::ViolationStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChallanId(String);

impl ChallanId {
    fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string().to_uppercase();
        Self(format!("CHL-{}", &hex[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChallanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallanStatus {
    Pending,
    Paid,
}

impl ChallanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallanStatus::Pending => "pending",
            ChallanStatus::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Challan {
    pub id: ChallanId,
    pub violation_id: ViolationId,
    pub violation_type: ViolationType,
    pub amount: u32,
    pub vehicle_info: String,
    pub status: ChallanStatus,
    pub created_at: f64,
    pub details: String,
}

/// Fine per violation type.
#[derive(Debug, Clone)]
pub struct AmountSchedule {
    amounts: BTreeMap<String, u32>,
    default_amount: u32,
}

impl AmountSchedule {
    pub fn new(config: &ChallanConfig) -> Self {
        if let Some(amount) = config.amounts.get(ViolationType::Accident.as_str()) {
            if *amount != 0 {
                warn!(
                    "Ignoring configured accident fine {}; accidents are informational",
                    amount
                );
            }
        }
        Self {
            amounts: config.amounts.clone(),
            default_amount: config.default_amount,
        }
    }

    pub fn amount_for(&self, kind: ViolationType) -> u32 {
        // Accident challans are informational and never billed
        if kind == ViolationType::Accident {
            return 0;
        }
        self.amounts
            .get(kind.as_str())
            .copied()
            .unwrap_or(self.default_amount)
    }
}

/// Append-only challan log. Unbounded: it is the audit trail.
pub struct ChallanManager {
    challans: Vec<Challan>,
    schedule: AmountSchedule,
}

impl ChallanManager {
    pub fn new(config: &ChallanConfig) -> Self {
        Self {
            challans: Vec::new(),
            schedule: AmountSchedule::new(config),
        }
    }

    /// Issue a challan for a live violation in `store`.
    pub fn create(
        &mut self,
        store: &ViolationStore,
        violation_id: ViolationId,
    ) -> Result<Challan, EngineError> {
        let violation = store
            .find_by_id(violation_id)
            .ok_or_else(|| EngineError::violation_not_found(violation_id))?;
        Ok(self.create_from(violation))
    }

    pub fn create_from(&mut self, violation: &Violation) -> Challan {
        let challan = Challan {
            id: self.fresh_id(),
            violation_id: violation.id(),
            violation_type: violation.kind(),
            amount: self.schedule.amount_for(violation.kind()),
            vehicle_info: violation.subject().to_string(),
            status: ChallanStatus::Pending,
            created_at: now_secs(),
            details: violation.details().to_string(),
        };

        info!(
            "🧾 Challan {} issued: {} for {} (amount {})",
            challan.id, challan.violation_type, challan.vehicle_info, challan.amount
        );

        self.challans.push(challan.clone());
        challan
    }

    // 8 hex digits can collide; never hand out an id twice.
    fn fresh_id(&self) -> ChallanId {
        loop {
            let id = ChallanId::generate();
            if !self.challans.iter().any(|c| c.id == id) {
                return id;
            }
        }
    }

    /// All challans, most recent first.
    pub fn list(&self) -> Vec<Challan> {
        self.challans.iter().rev().cloned().collect()
    }

    pub fn find(&self, id: &str) -> Option<&Challan> {
        self.challans.iter().find(|c| c.id.as_str() == id)
    }

    pub fn len(&self) -> usize {
        self.challans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BBox;

    fn violation(kind: ViolationType) -> Violation {
        Violation::new(
            kind,
            "motorcycle",
            0.8,
            BBox::new(0.0, 0.0, 10.0, 10.0),
            "Vehicle in lane termination / no-entry zone",
        )
    }

    fn store_with(violations: Vec<Violation>) -> ViolationStore {
        let mut store = ViolationStore::new();
        store.append(violations, None);
        store
    }

    #[test]
    fn test_create_copies_violation_fields() {
        let v = violation(ViolationType::LaneTermination);
        let id = v.id();
        let store = store_with(vec![v]);
        let mut mgr = ChallanManager::new(&ChallanConfig::default());

        let c = mgr.create(&store, id).unwrap();
        assert_eq!(c.violation_id, id);
        assert_eq!(c.violation_type, ViolationType::LaneTermination);
        assert_eq!(c.amount, 500);
        assert_eq!(c.vehicle_info, "motorcycle");
        assert_eq!(c.status, ChallanStatus::Pending);
        assert_eq!(c.details, "Vehicle in lane termination / no-entry zone");
        assert!(c.id.as_str().starts_with("CHL-"));
        assert_eq!(c.id.as_str().len(), 12);
        assert_ne!(c.id.as_str(), id.to_string());
    }

    #[test]
    fn test_unknown_violation_is_not_found_and_list_unchanged() {
        let store = store_with(vec![violation(ViolationType::NoHelmet)]);
        let mut mgr = ChallanManager::new(&ChallanConfig::default());

        let err = mgr.create(&store, ViolationId::generate()).unwrap_err();
        assert!(err.is_not_found());
        assert!(mgr.is_empty());
        assert!(mgr.list().is_empty());
    }

    #[test]
    fn test_accident_is_never_billed() {
        let mut config = ChallanConfig::default();
        config.amounts.insert("accident".to_string(), 2500);
        let schedule = AmountSchedule::new(&config);
        assert_eq!(schedule.amount_for(ViolationType::Accident), 0);
    }

    #[test]
    fn test_unscheduled_type_uses_default() {
        let config = ChallanConfig {
            amounts: BTreeMap::new(),
            default_amount: 500,
        };
        let schedule = AmountSchedule::new(&config);
        assert_eq!(schedule.amount_for(ViolationType::LaneTermination), 500);
        assert_eq!(schedule.amount_for(ViolationType::NoHelmet), 500);
    }

    #[test]
    fn test_no_helmet_amount() {
        let schedule = AmountSchedule::new(&ChallanConfig::default());
        assert_eq!(schedule.amount_for(ViolationType::NoHelmet), 1000);
    }

    #[test]
    fn test_list_most_recent_first() {
        let a = violation(ViolationType::LaneTermination);
        let b = violation(ViolationType::NoHelmet);
        let mut mgr = ChallanManager::new(&ChallanConfig::default());
        let first = mgr.create_from(&a);
        let second = mgr.create_from(&b);

        let listed = mgr.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert_eq!(mgr.list(), listed);
        assert_eq!(mgr.find(first.id.as_str()), Some(&first));
    }

    #[test]
    fn test_challan_survives_violation_eviction() {
        let v = violation(ViolationType::LaneTermination);
        let id = v.id();
        let mut store = ViolationStore::with_capacity(1);
        store.append(vec![v], None);
        let mut mgr = ChallanManager::new(&ChallanConfig::default());
        let c = mgr.create(&store, id).unwrap();

        store.append(vec![violation(ViolationType::NoHelmet)], None);
        assert!(store.find_by_id(id).is_none());
        assert_eq!(mgr.find(c.id.as_str()).map(|c| c.violation_id), Some(id));
    }
}
