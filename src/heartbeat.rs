// src/heartbeat.rs
//
// Liveness registry for remote cameras / edge nodes. Systems report in
// with heartbeats; a background sweep marks silent ones offline. Runs on
// its own schedule and never touches the frame path.

use crate::types::now_secs;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub id: String,
    pub area: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub meta: BTreeMap<String, serde_json::Value>,
    pub last_seen: f64,
    pub status: SystemStatus,
}

/// Fields reported with a heartbeat. Missing fields keep their last value.
#[derive(Debug, Clone, Default)]
pub struct Heartbeat {
    pub area: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub meta: Option<BTreeMap<String, serde_json::Value>>,
}

pub struct HeartbeatRegistry {
    systems: Mutex<BTreeMap<String, SystemInfo>>,
    persist_path: Option<PathBuf>,
}

impl HeartbeatRegistry {
    pub fn in_memory() -> Self {
        Self {
            systems: Mutex::new(BTreeMap::new()),
            persist_path: None,
        }
    }

    /// Registry persisted to `path`, loading whatever is already there.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let systems = if path.is_file() {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let systems: BTreeMap<String, SystemInfo> = serde_json::from_str(&data)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            info!("Loaded {} systems from {}", systems.len(), path.display());
            systems
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            systems: Mutex::new(systems),
            persist_path: Some(path),
        })
    }

    pub fn register(&self, system_id: &str, heartbeat: Heartbeat) -> Result<()> {
        self.register_at(system_id, heartbeat, now_secs())
    }

    pub fn register_at(&self, system_id: &str, heartbeat: Heartbeat, now: f64) -> Result<()> {
        {
            let mut systems = self.systems.lock();
            let info = systems
                .entry(system_id.to_string())
                .or_insert_with(|| SystemInfo {
                    id: system_id.to_string(),
                    area: None,
                    lat: None,
                    lon: None,
                    meta: BTreeMap::new(),
                    last_seen: now,
                    status: SystemStatus::Online,
                });

            if heartbeat.area.is_some() {
                info.area = heartbeat.area;
            }
            if heartbeat.lat.is_some() {
                info.lat = heartbeat.lat;
            }
            if heartbeat.lon.is_some() {
                info.lon = heartbeat.lon;
            }
            if let Some(meta) = heartbeat.meta {
                info.meta = meta;
            }
            info.last_seen = now;
            if info.status != SystemStatus::Online {
                info!("📡 System {} back online", system_id);
            }
            info.status = SystemStatus::Online;
        }
        debug!("Heartbeat from {}", system_id);
        self.persist()
    }

    /// Snapshot of all systems.
    pub fn systems(&self) -> Vec<SystemInfo> {
        self.systems.lock().values().cloned().collect()
    }

    pub fn get(&self, system_id: &str) -> Option<SystemInfo> {
        self.systems.lock().get(system_id).cloned()
    }

    /// Mark systems silent for longer than `threshold` offline. Returns the
    /// ids that changed.
    pub fn sweep_offline(&self, threshold: Duration) -> Vec<String> {
        self.sweep_offline_at(now_secs(), threshold)
    }

    pub fn sweep_offline_at(&self, now: f64, threshold: Duration) -> Vec<String> {
        let limit = threshold.as_secs_f64();
        let mut changed = Vec::new();
        {
            let mut systems = self.systems.lock();
            for info in systems.values_mut() {
                if now - info.last_seen > limit && info.status != SystemStatus::Offline {
                    info.status = SystemStatus::Offline;
                    changed.push(info.id.clone());
                }
            }
        }
        changed
    }

    /// Write to a temp file, then rename over the target.
    pub fn persist(&self) -> Result<()> {
        let path = match &self.persist_path {
            Some(p) => p,
            None => return Ok(()),
        };
        let json = {
            let systems = self.systems.lock();
            serde_json::to_string_pretty(&*systems)?
        };
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically sweep `registry` on the tokio runtime. Persistence runs on
/// the blocking pool.
pub fn spawn_sweeper(
    registry: Arc<HeartbeatRegistry>,
    interval: Duration,
    threshold: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_SWEEP_INTERVAL));
        loop {
            ticker.tick().await;
            let offline = registry.sweep_offline(threshold);
            if offline.is_empty() {
                continue;
            }
            for id in &offline {
                warn!("📴 System {} offline (no heartbeat for {:?})", id, threshold);
            }

            let reg = registry.clone();
            match tokio::task::spawn_blocking(move || reg.persist()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Failed to persist heartbeat registry: {:#}", e),
                Err(e) => warn!("Heartbeat persist task failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("systems-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_register_merges_fields() {
        let reg = HeartbeatRegistry::in_memory();
        reg.register_at(
            "cam-1",
            Heartbeat {
                area: Some("Lucknow".to_string()),
                lat: Some(26.85),
                lon: Some(80.95),
                meta: None,
            },
            100.0,
        )
        .unwrap();
        reg.register_at("cam-1", Heartbeat::default(), 150.0).unwrap();

        let info = reg.get("cam-1").unwrap();
        assert_eq!(info.area.as_deref(), Some("Lucknow"));
        assert_eq!(info.lat, Some(26.85));
        assert_eq!(info.last_seen, 150.0);
        assert_eq!(info.status, SystemStatus::Online);
    }

    #[test]
    fn test_sweep_marks_silent_systems_once() {
        let reg = HeartbeatRegistry::in_memory();
        reg.register_at("old", Heartbeat::default(), 0.0).unwrap();
        reg.register_at("fresh", Heartbeat::default(), 190.0).unwrap();

        let changed = reg.sweep_offline_at(200.0, Duration::from_secs(120));
        assert_eq!(changed, vec!["old".to_string()]);
        assert_eq!(reg.get("old").unwrap().status, SystemStatus::Offline);
        assert_eq!(reg.get("fresh").unwrap().status, SystemStatus::Online);

        assert_eq!(
            reg.sweep_offline_at(320.0, Duration::from_secs(120)),
            vec!["fresh".to_string()]
        );
        assert!(reg.sweep_offline_at(400.0, Duration::from_secs(120)).is_empty());
    }

    #[test]
    fn test_heartbeat_brings_system_back() {
        let reg = HeartbeatRegistry::in_memory();
        reg.register_at("cam", Heartbeat::default(), 0.0).unwrap();
        reg.sweep_offline_at(500.0, Duration::from_secs(120));
        reg.register_at("cam", Heartbeat::default(), 501.0).unwrap();
        assert_eq!(reg.get("cam").unwrap().status, SystemStatus::Online);
    }

    #[test]
    fn test_persist_and_reload() {
        let path = temp_path();
        {
            let reg = HeartbeatRegistry::open(&path).unwrap();
            reg.register_at(
                "edge-7",
                Heartbeat {
                    area: Some("Ring Road".to_string()),
                    ..Heartbeat::default()
                },
                42.0,
            )
            .unwrap();
        }

        let reloaded = HeartbeatRegistry::open(&path).unwrap();
        let info = reloaded.get("edge-7").unwrap();
        assert_eq!(info.area.as_deref(), Some("Ring Road"));
        assert_eq!(info.last_seen, 42.0);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let path = temp_path();
        fs::write(&path, "not json").unwrap();
        assert!(HeartbeatRegistry::open(&path).is_err());
        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_sweeper_runs_in_background() {
        let reg = Arc::new(HeartbeatRegistry::in_memory());
        reg.register_at("stale", Heartbeat::default(), 0.0).unwrap();

        let handle = spawn_sweeper(
            reg.clone(),
            Duration::from_millis(10),
            Duration::from_secs(1),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(reg.get("stale").unwrap().status, SystemStatus::Offline);
    }

    #[tokio::test]
    async fn test_sweeper_survives_zero_interval() {
        let reg = Arc::new(HeartbeatRegistry::in_memory());
        reg.register_at("stale", Heartbeat::default(), 0.0).unwrap();

        let handle = spawn_sweeper(reg.clone(), Duration::ZERO, Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        handle.abort();

        assert_eq!(reg.get("stale").unwrap().status, SystemStatus::Offline);
    }

    #[tokio::test]
    async fn test_sweeper_persists_offline_systems() {
        let path = temp_path();
        let reg = Arc::new(HeartbeatRegistry::open(&path).unwrap());
        reg.register_at("stale", Heartbeat::default(), 0.0).unwrap();

        let handle = spawn_sweeper(
            reg.clone(),
            Duration::from_millis(10),
            Duration::from_secs(1),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        let reloaded = HeartbeatRegistry::open(&path).unwrap();
        assert_eq!(reloaded.get("stale").unwrap().status, SystemStatus::Offline);
        let _ = fs::remove_file(&path);
    }
}
