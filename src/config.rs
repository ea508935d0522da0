//! Surface defaults persisted across sessions
//!
//! Stored in `~/.config/flyout/config.yaml`. Every field is optional in the
//! file; missing fields take their defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::geometry::Size;

/// Host-wide defaults applied to every surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDefaults {
    /// Distance surfaces keep from the viewport edges before flipping
    #[serde(default = "default_viewport_margin")]
    pub viewport_margin: f64,
    /// How long transient feedback (e.g. "Copied!") stays visible
    #[serde(default = "default_feedback_timeout_ms")]
    pub feedback_timeout_ms: u64,
    /// Advance width used to measure text content
    #[serde(default = "default_char_width")]
    pub char_width: f64,
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    /// Inner padding around text content
    #[serde(default = "default_padding")]
    pub padding: f64,
}

fn default_viewport_margin() -> f64 {
    16.0
}

fn default_feedback_timeout_ms() -> u64 {
    2000
}

fn default_char_width() -> f64 {
    8.0
}

fn default_line_height() -> f64 {
    16.0
}

fn default_padding() -> f64 {
    8.0
}

impl Default for SurfaceDefaults {
    fn default() -> Self {
        Self {
            viewport_margin: default_viewport_margin(),
            feedback_timeout_ms: default_feedback_timeout_ms(),
            char_width: default_char_width(),
            line_height: default_line_height(),
            padding: default_padding(),
        }
    }
}

impl SurfaceDefaults {
    /// Load config from the user config directory, or return defaults
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from `path`; unreadable or invalid files yield defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    Self::sanitized(config)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Replace metrics that are negative or not finite with their defaults
    fn sanitized(mut self) -> Self {
        let fields: [(&str, &mut f64, f64); 4] = [
            ("viewport_margin", &mut self.viewport_margin, default_viewport_margin()),
            ("char_width", &mut self.char_width, default_char_width()),
            ("line_height", &mut self.line_height, default_line_height()),
            ("padding", &mut self.padding, default_padding()),
        ];
        for (name, value, default) in fields {
            if !value.is_finite() || *value < 0.0 {
                tracing::warn!(field = name, value = *value, "Invalid config value, using {}", default);
                *value = default;
            }
        }
        self
    }

    /// Save config to the user config directory
    pub fn save(&self) -> Result<()> {
        let path = crate::config_paths::config_file().context("No config directory available")?;
        self.save_to(&path)
    }

    /// Save config to `path`, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn feedback_timeout(&self) -> Duration {
        Duration::from_millis(self.feedback_timeout_ms)
    }

    /// Laid-out size of a plain text block
    pub fn measure_text(&self, text: &str) -> Size {
        let lines = text.lines().count().max(1);
        let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        Size::new(
            longest as f64 * self.char_width + self.padding * 2.0,
            lines as f64 * self.line_height + self.padding * 2.0,
        )
    }
}
