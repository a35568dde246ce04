use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "cultsim-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_cultsim");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("cooldown-4day-badpill"));
}

#[test]
fn cli_json_report_is_reproducible() {
    let exe = env!("CARGO_BIN_EXE_cultsim");
    let run = |label: &str| {
        let output_path = temp_path(label);
        let status = Command::new(exe)
            .args(["40", "--seed", "12", "--report", "json", "--output"])
            .arg(&output_path)
            .status()
            .expect("run cli");
        assert!(status.success());
        let content = std::fs::read_to_string(output_path).expect("read output");
        serde_json::from_str::<serde_json::Value>(&content).expect("valid json")
    };
    let first = run("json-a");
    let second = run("json-b");
    assert_eq!(first, second);
    assert_eq!(first["trials"], 40);
    assert_eq!(first["seed"], 12);
    assert_eq!(first["sections"].as_array().map(Vec::len), Some(5));
}

#[test]
fn cli_console_report_prints_histograms() {
    let exe = env!("CARGO_BIN_EXE_cultsim");
    let output = Command::new(exe)
        .args(["25", "--seed", "3", "--scenario", "odds", "--max-days", "150"])
        .env("NO_COLOR", "1")
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("successes"));
    assert!(stdout.contains("Final day:"));
    assert!(stdout.contains("Number failures:"));
    assert!(stdout.contains("Seed: 3"));
}

#[test]
fn cli_verbose_includes_first_trial_log() {
    let exe = env!("CARGO_BIN_EXE_cultsim");
    let output = Command::new(exe)
        .args(["5", "--seed", "9", "--verbose", "--report", "json"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is json");
    assert_eq!(json["first_trial_log"][0], "Day 1");
}

#[test]
fn cli_rejects_invalid_override() {
    let exe = env!("CARGO_BIN_EXE_cultsim");
    let output = Command::new(exe)
        .args(["5", "--set", "pill_cooldown=0"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pill_cooldown"));
}

#[test]
fn cli_rejects_unknown_scenario() {
    let exe = env!("CARGO_BIN_EXE_cultsim");
    let output = Command::new(exe)
        .args(["5", "--scenario", "moonlight"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("moonlight"));
}
