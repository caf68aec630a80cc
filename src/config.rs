//! Editor configuration.
//!
//! Colours, undo depth and viewport size, stored as JSON. A missing file gives
//! the defaults; a corrupt one gives the defaults plus a warning.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::editor::canvas::Color;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Colour of the block rectangle.
    pub block_color: Color,
    /// Colour of item outlines following the cursor.
    pub ghost_color: Color,
    /// Colour used when items are drawn normally.
    pub item_color: Color,
    /// Maximum number of undo entries kept.
    pub undo_depth: usize,
    /// Visible canvas size in pixels, used by window zoom.
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            block_color: Color::BROWN,
            ghost_color: Color::GHOST,
            item_color: Color::GREEN,
            undo_depth: 200,
            viewport_width: 1024,
            viewport_height: 768,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON; absent keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parse editor configuration")
    }

    /// Read a configuration file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
        Self::from_json(&json).with_context(|| format!("Failed to parse {}", path))
    }

    /// Read a configuration file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load_or_default(path: &Utf8Path) -> Self {
        if !path.exists() {
            tracing::debug!(%path, "no configuration file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                tracing::info!(%path, "loaded configuration");
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load config file: {:#}", e);
                Self::default()
            }
        }
    }
}
