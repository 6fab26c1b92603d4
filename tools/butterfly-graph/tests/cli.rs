use std::process::Command;

fn butterfly_graph() -> Command {
    Command::new(env!("CARGO_BIN_EXE_butterfly-graph"))
}

#[test]
fn test_cli_help_works() {
    let output = butterfly_graph()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command should exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "Help output should contain usage information");
    assert!(stdout.contains("build"), "Help output should list the build command");
}

#[test]
fn test_cli_prints_default_config() {
    let output = butterfly_graph()
        .arg("config")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Config command should exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("worker_threads = 2"), "Output should show the default workers");
}

#[test]
fn test_cli_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = butterfly_graph()
        .arg("build")
        .arg(dir.path().join("missing.osm.pbf"))
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Reading a missing file should fail");
}
