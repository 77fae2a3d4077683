//! JSON persistence of the pipeline progress snapshot.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use fuse_model::PipelineState;

/// Loads a persisted snapshot, or `None` when no file exists yet.
pub fn load_state(path: &Path) -> Result<Option<PipelineState>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("read state file {}", path.display()))?;
    let state: PipelineState = serde_json::from_str(&text)
        .with_context(|| format!("parse state file {}", path.display()))?;
    debug!(path = %path.display(), "loaded pipeline state");
    Ok(Some(state))
}

pub fn save_state(path: &Path, state: &PipelineState) -> Result<()> {
    let json = serde_json::to_string_pretty(state).context("serialize pipeline state")?;
    fs::write(path, json).with_context(|| format!("write state file {}", path.display()))?;
    debug!(path = %path.display(), "saved pipeline state");
    Ok(())
}

/// Removes the snapshot. Returns whether a file existed.
pub fn remove_state(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).with_context(|| format!("remove state file {}", path.display()))?;
    Ok(true)
}
