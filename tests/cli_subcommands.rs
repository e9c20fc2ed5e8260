mod common;

use predicates::str::{contains, diff};

#[test]
fn show_config_prints_resolved_defaults() {
    let expected = concat!(
        "Target: http://localhost:8080/api/v1/quotes\n",
        "Transport: http\n",
        "Mode: smoke\n",
        "Scenario: constant 2 VUs for 10s\n",
        "Traffic mix: replay 2%, conflict 1%\n",
        "Thresholds:\n",
        "- http_req_failed rate<0.01\n",
        "- http_req_duration p(95)<500\n",
        "- checks_rate rate>0.99\n",
        "Think time: 200ms\n",
        "Request timeout: 5s\n",
        "Setup timeout: 10s\n",
        "Generated at: 2026-03-01T12:00:00.000Z\n",
        "Debug: false\n",
    );

    let mut cmd = common::loadgen();
    cmd.args(["show-config", "--generated-at", "2026-03-01T12:00:00Z"]);
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn show_config_reads_load_settings_from_env() {
    let mut cmd = common::loadgen();
    cmd.env("TEST_MODE", "load")
        .env("LOAD_STAGES", "5s:2, 20s:8 ,5s:0")
        .env("P95_MS", "250")
        .env("BASE_URL", "https://staging.example.com/")
        .env("DEBUG", "TRUE");
    cmd.args(["show-config", "--offline"]);
    cmd.assert()
        .success()
        .stdout(contains(
            "Target: https://staging.example.com/api/v1/quotes\n",
        ))
        .stdout(contains("Transport: offline\n"))
        .stdout(contains("Mode: load\n"))
        .stdout(contains(
            "Scenario: ramping from 0 VUs, 5s -> 2, 20s -> 8, 5s -> 0\n",
        ))
        .stdout(contains("- http_req_duration p(95)<250\n"))
        .stdout(contains("Debug: true\n"));
}

#[test]
fn debug_env_only_accepts_true() {
    let mut cmd = common::loadgen();
    cmd.env("DEBUG", "1").env("OFFLINE", "yes");
    cmd.args(["show-config"]);
    cmd.assert()
        .success()
        .stdout(contains("Transport: http\n"))
        .stdout(contains("Debug: false\n"));
}

#[test]
fn flags_before_subcommand_apply() {
    let mut cmd = common::loadgen();
    cmd.args(["--offline", "--replay-pct", "7", "show-config"]);
    cmd.assert()
        .success()
        .stdout(contains("Transport: offline\n"))
        .stdout(contains("Traffic mix: replay 7%, conflict 1%\n"));
}

#[test]
fn flags_override_env() {
    let mut cmd = common::loadgen();
    cmd.env("REPLAY_PCT", "50");
    cmd.args(["show-config", "--replay-pct", "5"]);
    cmd.assert()
        .success()
        .stdout(contains("Traffic mix: replay 5%, conflict 1%\n"));
}

#[test]
fn show_config_json_is_machine_readable() {
    let mut cmd = common::loadgen();
    cmd.args([
        "show-config",
        "--format",
        "json",
        "--generated-at",
        "2026-03-01T12:00:00Z",
    ]);
    cmd.assert()
        .success()
        .stdout(contains("\"executor\": \"constant-vus\""))
        .stdout(contains("\"think_time_ms\": 200"))
        .stdout(contains("\"replay_pct\": 2"));
}

#[test]
fn config_file_supplies_settings() {
    let path = std::env::temp_dir().join(format!(
        "quote-loadgen-cli-{}.toml",
        std::process::id()
    ));
    std::fs::write(
        &path,
        "base_url = \"http://from-file:9000\"\nconflict_pct = 4\nthink_time_ms = 25\n",
    )
    .expect("config write should succeed");

    let mut cmd = common::loadgen();
    cmd.args(["show-config", "--config", path.to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(contains("Target: http://from-file:9000/api/v1/quotes\n"))
        .stdout(contains("Traffic mix: replay 2%, conflict 4%\n"))
        .stdout(contains("Think time: 25ms\n"));
}

#[test]
fn fixtures_lists_reserved_keys() {
    let expected = concat!(
        "replay-prewarm: 11111111-1111-4111-8111-111111111111\n",
        "conflict-prewarm: 22222222-2222-4222-8222-222222222222\n",
    );
    let mut cmd = common::loadgen();
    cmd.args(["fixtures", "--format", "summary"]);
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn fixtures_human_output_includes_payloads() {
    let mut cmd = common::loadgen();
    cmd.args(["fixtures", "--generated-at", "2026-03-01T12:00:00Z"]);
    cmd.assert()
        .success()
        .stdout(contains("\"documentId\":\"DOC-REPLAY-000001\""))
        .stdout(contains("\"customer\":{\"id\":\"CUST-CONFLICT\""))
        .stdout(contains("\"expiresAt\":\"2026-03-17T12:00:00.000Z\""));
}
