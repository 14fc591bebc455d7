// src/main.rs

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use traffic_enforcement::detection::{ReplayDetector, ReplayHelmetDetector};
use traffic_enforcement::document::TextChallanRenderer;
use traffic_enforcement::evidence::InlineEvidenceStore;
use traffic_enforcement::heartbeat::{spawn_sweeper, Heartbeat, HeartbeatRegistry};
use traffic_enforcement::replay::{find_recordings, read_recording};
use traffic_enforcement::types::{Config, ViolationType};
use traffic_enforcement::{EngineEvent, HelmetCheck, TrafficEngine};

const DEFAULT_CONFIG: &str = "config.yaml";

#[derive(Debug, Default)]
struct ReplayStats {
    total_frames: u64,
    rejected_frames: u64,
    rejected_boxes: u64,
    lane_termination: usize,
    accidents: usize,
    no_helmet: usize,
    helmet_failures: u64,
    ambulance_frames: u64,
    challans_issued: usize,
    challans_skipped: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TRAFFIC_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = Config::load_or_default(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚦 Traffic Enforcement Engine Starting");
    info!("✓ Configuration loaded from {}", config_path);

    let registry = Arc::new(match &config.heartbeat.persist_path {
        Some(path) => HeartbeatRegistry::open(path)?,
        None => HeartbeatRegistry::in_memory(),
    });
    let sweeper = spawn_sweeper(
        registry.clone(),
        Duration::from_secs(config.heartbeat.sweep_interval_secs),
        Duration::from_secs(config.heartbeat.offline_after_secs),
    );
    registry.register(
        &config.replay.system_id,
        Heartbeat {
            area: Some(config.replay.input_dir.clone()),
            ..Heartbeat::default()
        },
    )?;

    let mut engine = TrafficEngine::new(&config)
        .with_helmet_detector(Box::new(ReplayHelmetDetector))
        .with_renderer(Box::new(TextChallanRenderer));
    if config.replay.attach_evidence {
        engine = engine.with_evidence_store(Box::new(InlineEvidenceStore::json()));
    }
    info!("✓ Engine ready");

    let recordings = find_recordings(&config.replay.input_dir)?;
    if recordings.is_empty() {
        error!("No recordings found in {}", config.replay.input_dir);
        sweeper.abort();
        return Ok(());
    }

    if config.replay.issue_challans {
        fs::create_dir_all(&config.replay.output_dir).with_context(|| {
            format!("failed to create output dir {}", config.replay.output_dir)
        })?;
    }

    for (idx, path) in recordings.iter().enumerate() {
        info!("========================================");
        info!(
            "Replaying {}/{}: {}",
            idx + 1,
            recordings.len(),
            path.display()
        );
        info!("========================================");

        match replay_file(path, &engine, &config) {
            Ok(stats) => log_stats(&stats),
            Err(e) => error!("Failed to replay {}: {:#}", path.display(), e),
        }

        for event in engine.drain_events() {
            log_event(&event);
        }

        if let Err(e) = registry.register(&config.replay.system_id, Heartbeat::default()) {
            warn!("Heartbeat failed: {:#}", e);
        }
    }

    let state = engine.traffic_state();
    info!("🚗 Traffic: {} | {}", state.message, state.suggestion);

    sweeper.abort();
    let summary = engine.shutdown();
    info!(
        "✓ Done: {} frames ({} rejected), {} violations, {} challans, {:.1} FPS",
        summary.frames_processed,
        summary.frames_rejected,
        summary.total_violations(),
        summary.challans_issued,
        summary.fps
    );
    Ok(())
}

fn replay_file(path: &Path, engine: &TrafficEngine, config: &Config) -> Result<ReplayStats> {
    let frames = read_recording(path)?;
    let mut detector = ReplayDetector::new();
    let mut stats = ReplayStats::default();

    for frame in &frames {
        stats.total_frames += 1;
        let outcome = match engine.process_frame(&mut detector, frame) {
            Ok(o) => o,
            Err(e) => {
                stats.rejected_frames += 1;
                debug!("Skipping frame {}: {}", frame.frame_id, e);
                continue;
            }
        };

        stats.rejected_boxes += outcome.rejected_boxes as u64;
        stats.lane_termination += outcome.count_of(ViolationType::LaneTermination);
        stats.accidents += outcome.count_of(ViolationType::Accident);
        stats.no_helmet += outcome.count_of(ViolationType::NoHelmet);
        if matches!(outcome.helmet, HelmetCheck::Failed(_)) {
            stats.helmet_failures += 1;
        }
        if outcome.ambulance_detected {
            stats.ambulance_frames += 1;
        }

        if !config.replay.issue_challans || !outcome.has_violations() {
            continue;
        }
        let challans = engine.issue_challans(&outcome);
        stats.challans_skipped += outcome.violations.len() - challans.len();
        for challan in challans {
            let bytes = engine.challan_document(challan.id.as_str())?;
            let out = Path::new(&config.replay.output_dir).join(format!(
                "{}.{}",
                challan.id,
                engine.document_extension()
            ));
            fs::write(&out, bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            stats.challans_issued += 1;
        }
    }

    Ok(stats)
}

fn log_stats(stats: &ReplayStats) {
    info!("✓ Recording replayed");
    info!(
        "  Frames: {} ({} rejected)",
        stats.total_frames, stats.rejected_frames
    );
    if stats.rejected_boxes > 0 {
        warn!("  Malformed boxes dropped: {}", stats.rejected_boxes);
    }
    info!("  🚧 Lane termination: {}", stats.lane_termination);
    if stats.accidents > 0 {
        warn!("  🚨 Accident clusters: {}", stats.accidents);
    } else {
        info!("  🚨 Accident clusters: 0");
    }
    info!("  🪖 No helmet: {}", stats.no_helmet);
    if stats.helmet_failures > 0 {
        warn!("  Helmet check failures: {}", stats.helmet_failures);
    }
    info!("  🚑 Frames with ambulance: {}", stats.ambulance_frames);
    if stats.challans_issued > 0 {
        info!("  🧾 Challans issued: {}", stats.challans_issued);
    }
    if stats.challans_skipped > 0 {
        warn!("  Challans skipped (violation evicted): {}", stats.challans_skipped);
    }
}

fn log_event(event: &EngineEvent) {
    match serde_json::to_string(event) {
        Ok(json) => debug!("event {}", json),
        Err(e) => warn!("Unserializable event {:?}: {}", event, e),
    }
}
