//! Configuration system tests
//!
//! Tests for config paths and surface defaults loading/saving.

use std::time::Duration;

use flyout::config::SurfaceDefaults;
use flyout::config_paths;
use tempfile::TempDir;

// ========================================================================
// Config Paths Tests
// ========================================================================

#[test]
fn test_config_dir_ends_with_app_dir() {
    if let Some(dir) = config_paths::config_dir() {
        assert!(dir.ends_with("flyout"));
    }
}

#[test]
fn test_config_file_and_logs_live_in_config_dir() {
    let (Some(dir), Some(file), Some(logs)) = (
        config_paths::config_dir(),
        config_paths::config_file(),
        config_paths::logs_dir(),
    ) else {
        return;
    };
    assert_eq!(file, dir.join("config.yaml"));
    assert_eq!(logs, dir.join("logs"));
}

#[test]
fn test_ensure_dir_creates_nested_dirs() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a").join("b");
    config_paths::ensure_dir(&path).unwrap();
    assert!(path.is_dir());
}

#[test]
fn test_ensure_dir_under_file_reports_path() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("taken");
    std::fs::write(&file, "").unwrap();

    let err = config_paths::ensure_dir(&file.join("logs")).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to create directory"));
}

// ========================================================================
// SurfaceDefaults Tests
// ========================================================================

#[test]
fn test_defaults() {
    let defaults = SurfaceDefaults::default();
    assert_eq!(defaults.viewport_margin, 16.0);
    assert_eq!(defaults.feedback_timeout(), Duration::from_millis(2000));
}

#[test]
fn test_save_and_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("config.yaml");

    let defaults = SurfaceDefaults {
        viewport_margin: 8.0,
        feedback_timeout_ms: 500,
        ..SurfaceDefaults::default()
    };
    defaults.save_to(&path).unwrap();

    assert!(path.exists());
    assert_eq!(SurfaceDefaults::load_from(&path), defaults);
}

#[test]
fn test_missing_file_gives_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.yaml");
    assert_eq!(SurfaceDefaults::load_from(&path), SurfaceDefaults::default());
}

#[test]
fn test_invalid_yaml_gives_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.yaml");
    std::fs::write(&path, "viewport_margin: [not, a, number]\n").unwrap();

    assert_eq!(SurfaceDefaults::load_from(&path), SurfaceDefaults::default());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.yaml");
    std::fs::write(&path, "feedback_timeout_ms: 750\n").unwrap();

    let loaded = SurfaceDefaults::load_from(&path);
    assert_eq!(loaded.feedback_timeout_ms, 750);
    assert_eq!(loaded.viewport_margin, 16.0);
    assert_eq!(loaded.char_width, 8.0);
}

#[test]
fn test_non_finite_or_negative_metrics_fall_back() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.yaml");
    std::fs::write(
        &path,
        "viewport_margin: .nan\nchar_width: -2\nline_height: .inf\npadding: 4\n",
    )
    .unwrap();

    let loaded = SurfaceDefaults::load_from(&path);
    assert_eq!(loaded.viewport_margin, 16.0);
    assert_eq!(loaded.char_width, 8.0);
    assert_eq!(loaded.line_height, 16.0);
    assert_eq!(loaded.padding, 4.0);
}
