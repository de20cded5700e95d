//! Resumable crawl snapshots, written when a scan is interrupted.

use crate::config::ScanConfig;
use crate::error::{BurrowError, Result};
use crate::scan::UnitKey;
use crate::tree::{DiscoveryTree, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeState {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub config: ScanConfig,
    /// Raw words the interrupted plan was compiled from
    pub words: Vec<String>,
    /// Depth whose frontier was being expanded
    pub depth: usize,
    pub tree: DiscoveryTree,
    /// Units of `depth` that already ran and must not be requested again
    pub completed: Vec<UnitKey>,
}

impl ResumeState {
    pub fn new(
        config: ScanConfig,
        words: Vec<String>,
        depth: usize,
        tree: DiscoveryTree,
        completed: Vec<UnitKey>,
    ) -> Self {
        Self {
            version: STATE_VERSION,
            saved_at: Utc::now(),
            config,
            words,
            depth,
            tree,
            completed,
        }
    }

    /// Nodes still waiting to be expanded
    pub fn frontier(&self) -> Vec<NodeId> {
        self.tree.nodes_at_depth(self.depth)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Saved scan state to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BurrowError::State(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let state: ResumeState = serde_json::from_str(&content)?;

        if state.version != STATE_VERSION {
            return Err(BurrowError::State(format!(
                "Unsupported state version {} (expected {})",
                state.version, STATE_VERSION
            )));
        }
        if state.tree.root().is_none() {
            return Err(BurrowError::State("State file has no root node".to_string()));
        }
        state
            .tree
            .check_integrity()
            .map_err(|reason| BurrowError::State(format!("Corrupt discovery tree: {}", reason)))?;
        if let Some(key) = state.completed.iter().find(|k| state.tree.get(k.parent).is_none()) {
            return Err(BurrowError::State(format!(
                "Completed unit '{}' refers to unknown node {}",
                key.word, key.parent
            )));
        }
        if state.tree.is_sealed() {
            return Err(BurrowError::State(
                "State file belongs to a completed scan".to_string(),
            ));
        }

        Ok(state)
    }
}
