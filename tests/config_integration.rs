//! Integration tests for configuration loading and environment overrides

use hybrid_directory::cli;
use hybrid_directory::{ContainerDescriptor, HybridConfig, ProviderMode};
use serial_test::serial;
use tempfile::TempDir;

const OVERRIDES: [&str; 4] = [
    "HYBRID_LOCAL_ROOT",
    "HYBRID_BLOB_ROOT",
    "HYBRID_MODE",
    "HYBRID_MARKER_NAME",
];

fn clear_overrides() {
    for var in OVERRIDES {
        // SAFETY: tests touching the environment are serialized
        unsafe { std::env::remove_var(var) };
    }
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    clear_overrides();
    let temp = TempDir::new().unwrap();
    let config = cli::load_config(temp.path().join("hybrid.yml")).unwrap();
    assert_eq!(config, HybridConfig::default());
}

#[test]
#[serial]
fn test_file_then_env_overrides() {
    clear_overrides();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("hybrid.yml");

    let mut config = HybridConfig::with_local_root("/srv/site");
    config.add_container(ContainerDescriptor::new("media", "media", false));
    config.write(&path).unwrap();

    unsafe {
        std::env::set_var("HYBRID_MODE", "local");
        std::env::set_var("HYBRID_MARKER_NAME", ".keep");
    }
    let loaded = cli::load_config(&path).unwrap();
    clear_overrides();

    assert_eq!(loaded.local_root, "/srv/site");
    assert_eq!(loaded.mode, ProviderMode::Local);
    assert_eq!(loaded.marker_name, ".keep");
    assert_eq!(loaded.containers.len(), 1);
}

#[test]
#[serial]
fn test_invalid_env_override_is_rejected() {
    clear_overrides();
    let temp = TempDir::new().unwrap();

    unsafe { std::env::set_var("HYBRID_MODE", "cloud") };
    let result = cli::load_config(temp.path().join("hybrid.yml"));
    clear_overrides();
    assert!(result.is_err());

    unsafe { std::env::set_var("HYBRID_MARKER_NAME", "a/b") };
    let result = cli::load_config(temp.path().join("hybrid.yml"));
    clear_overrides();
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_yaml_container_roots_are_normalized() {
    clear_overrides();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("hybrid.yml");
    std::fs::write(
        &path,
        "local_root: C:\\site\ncontainers:\n  - name: media\n    root: \\media\\\n    case_sensitive: false\n",
    )
    .unwrap();

    let config = cli::load_config(&path).unwrap();
    let info = cli::locate_key(&config, "media\\Images\\2024");
    assert_eq!(info.container, "media");
    assert_eq!(info.key, "images/2024");
    assert_eq!(info.local_path, "C:\\site\\media\\images\\2024");
}
