//! Command-line argument parsing for the scenario runner
//!
//! Supports:
//! - Running a YAML scenario file
//! - Compact (single-line) JSON output
//! - An explicit config file instead of the user config directory

use clap::Parser;
use std::path::PathBuf;

use crate::config::SurfaceDefaults;

/// Replay surface scenarios against a headless document
#[derive(Parser, Debug)]
#[command(
    name = "flyout",
    version,
    about = "Replay dialog, menu and popover scenarios headlessly"
)]
pub struct CliArgs {
    /// Scenario file to run
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Print the report as a single JSON line
    #[arg(short = 'c', long)]
    pub compact: bool,

    /// Read surface defaults from this file instead of the config directory
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// Surface defaults for this run
    pub fn defaults(&self) -> SurfaceDefaults {
        match &self.config {
            Some(path) => SurfaceDefaults::load_from(path),
            None => SurfaceDefaults::load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_is_required() {
        assert!(CliArgs::try_parse_from(["flyout"]).is_err());
    }

    #[test]
    fn test_defaults_to_pretty_output() {
        let args = CliArgs::try_parse_from(["flyout", "menu.yaml"]).unwrap();
        assert_eq!(args.scenario, PathBuf::from("menu.yaml"));
        assert!(!args.compact);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_compact_and_config() {
        let args =
            CliArgs::try_parse_from(["flyout", "-c", "--config", "alt.yaml", "menu.yaml"]).unwrap();
        assert!(args.compact);
        assert_eq!(args.config, Some(PathBuf::from("alt.yaml")));
    }

    #[test]
    fn test_missing_config_file_gives_defaults() {
        let args = CliArgs {
            scenario: PathBuf::from("menu.yaml"),
            compact: false,
            config: Some(PathBuf::from("/nonexistent/flyout/config.yaml")),
        };
        assert_eq!(args.defaults(), SurfaceDefaults::default());
    }
}
