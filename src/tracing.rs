//! Logging setup and debug-build state snapshots
//!
//! # Usage
//!
//! Configure via the RUST_LOG environment variable:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=surface=debug,message=debug` - scoped filtering
//! - `RUST_LOG=flyout::lifecycle=trace` - module-level filtering
//!
//! # Log Files
//!
//! Logs are written to `~/.config/flyout/logs/flyout.log` with daily rotation.
//! File logging uses debug level by default.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::document::NodeId;
use crate::lifecycle::SurfaceManager;
use crate::surface::{LifecycleState, SurfaceId};

/// Initialize the tracing subscriber with console and file logging
///
/// Console output respects RUST_LOG and defaults to `warn`. The file layer is
/// skipped with a warning when the log directory cannot be created.
pub fn init() {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // Console goes to stderr; stdout carries the scenario report
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_filter(console_filter);

    let file_layer = match crate::config_paths::ensure_logs_dir() {
        Ok(logs_dir) => {
            let file_appender = tracing_appender::rolling::daily(logs_dir, "flyout.log");
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        Err(e) => {
            eprintln!("Warning: Could not initialize file logging: {:#}", e);
            None
        }
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

/// Lightweight snapshot of surface states for diffing
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSnapshot {
    pub surfaces: Vec<(SurfaceId, LifecycleState)>,
    pub registered: usize,
    pub focused: Option<NodeId>,
}

impl SurfaceSnapshot {
    pub fn capture(manager: &SurfaceManager) -> Self {
        Self {
            surfaces: manager
                .live_surfaces()
                .into_iter()
                .map(|h| (h.id(), manager.state(h)))
                .collect(),
            registered: manager.registry().len(),
            focused: manager.document().active_element(),
        }
    }

    /// Describe what changed between two snapshots
    pub fn diff(&self, other: &SurfaceSnapshot) -> Option<String> {
        let mut changes = Vec::new();

        for (id, before) in &self.surfaces {
            match other.surfaces.iter().find(|(other_id, _)| other_id == id) {
                Some((_, after)) if after != before => {
                    changes.push(format!("#{}: {} → {}", id.0, before.as_str(), after.as_str()))
                }
                Some(_) => {}
                None => changes.push(format!("#{}: {} → closed", id.0, before.as_str())),
            }
        }
        for (id, state) in &other.surfaces {
            if !self.surfaces.iter().any(|(before_id, _)| before_id == id) {
                changes.push(format!("#{}: new, {}", id.0, state.as_str()));
            }
        }

        if self.registered != other.registered {
            changes.push(format!(
                "registry: {} → {}",
                self.registered, other.registered
            ));
        }
        if self.focused != other.focused {
            changes.push(format!("focus: {:?} → {:?}", self.focused, other.focused));
        }

        if changes.is_empty() {
            None
        } else {
            Some(changes.join("; "))
        }
    }
}
