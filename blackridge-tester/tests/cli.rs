use std::process::Command;

use tempfile::TempDir;

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_blackridge-tester");
    let dir = TempDir::new().unwrap();
    let output_path = dir.path().join("list.txt");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("save-load-resume"));
}

#[test]
fn cli_smoke_writes_json_report() {
    let exe = env!("CARGO_BIN_EXE_blackridge-tester");
    let dir = TempDir::new().unwrap();
    let output_path = dir.path().join("report.json");
    let status = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "smoke",
            "--iterations",
            "1",
            "--seeds",
            "1,0x2",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    let entries = report.as_array().expect("array report");
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|entry| entry["passed"] == true));
}

#[test]
fn cli_rejects_unknown_scenario() {
    let exe = env!("CARGO_BIN_EXE_blackridge-tester");
    let output = Command::new(exe)
        .args(["--scenarios", "does-not-exist", "--report", "markdown"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown scenario"));
}
