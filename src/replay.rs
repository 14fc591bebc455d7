// src/replay.rs
//
// Recorded detector output on disk: one JSON object per line, one line per
// frame. Feeds the engine the same way a live camera would.

use crate::types::Frame;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const RECORDING_EXTENSIONS: [&str; 2] = ["jsonl", "JSONL"];

/// All recordings under `input_dir`, sorted by path.
pub fn find_recordings(input_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let input_dir = input_dir.as_ref();
    if !input_dir.is_dir() {
        anyhow::bail!("Recording directory {} does not exist", input_dir.display());
    }

    let mut recordings = Vec::new();
    for entry in WalkDir::new(input_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if RECORDING_EXTENSIONS.contains(&ext) {
                recordings.push(path.to_path_buf());
            }
        }
    }
    recordings.sort();

    info!("Found {} recording(s)", recordings.len());
    Ok(recordings)
}

/// Split a recording into frames. Blank lines are skipped; frame ids count
/// the non-blank lines from 1. Line contents are not decoded here.
pub fn read_recording(path: impl AsRef<Path>) -> Result<Vec<Frame>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read recording {}", path.display()))?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| Frame {
            frame_id: i as u64 + 1,
            data: line.as_bytes().to_vec(),
        })
        .collect())
}
