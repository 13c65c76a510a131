//! Loop and compositor settings, loadable from JSON.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Color;

/// Game loop cadence and thread naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Budget per tick. 33 ms is roughly 30 Hz.
    pub tick_interval_ms: u64,
    pub thread_name: String,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 33,
            thread_name: "glyphgrid-loop".to_string(),
        }
    }
}

impl LoopConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Compositor behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Root background; also the color of blank cells written over erased content.
    pub background: Option<Color>,
    /// Rewrite every cell after the root changes size.
    pub full_redraw_on_resize: bool,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            background: None,
            full_redraw_on_resize: true,
        }
    }
}

impl CompositorConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
