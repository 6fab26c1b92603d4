use std::io::Write;

use butterfly_graph::{Error, ReaderConfig};
use tempfile::NamedTempFile;

#[test]
fn test_load_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "worker_threads = 4\nmax_way_point_distance = 0.5\nelevation_max_way_point_distance = 2.0"
    )
    .unwrap();

    let config = ReaderConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.worker_threads, 4);
    assert_eq!(config.max_way_point_distance, 0.5);
    assert_eq!(config.elevation_max_way_point_distance, Some(2.0));
    // untouched keys keep their defaults
    assert_eq!(config.queue_capacity, ReaderConfig::default().queue_capacity);
}

#[test]
fn test_unknown_key_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "workers = 4").unwrap();
    assert!(matches!(
        ReaderConfig::from_toml_file(file.path()),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_negative_distance_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "max_way_point_distance = -1.0").unwrap();
    assert!(matches!(
        ReaderConfig::from_toml_file(file.path()),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reader.toml");
    assert!(matches!(
        ReaderConfig::from_toml_file(&path),
        Err(Error::FileNotFound(p)) if p == path
    ));
}
