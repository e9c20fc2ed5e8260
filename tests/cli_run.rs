mod common;

use predicates::str::contains;

#[test]
fn offline_smoke_run_succeeds() {
    let mut cmd = common::loadgen();
    cmd.args([
        "run",
        "--offline",
        "--smoke-vus",
        "2",
        "--smoke-duration",
        "300ms",
        "--think-time-ms",
        "10",
        "--format",
        "summary",
    ]);
    cmd.assert()
        .success()
        .stdout(contains("mode: smoke\n"))
        .stdout(contains("scenario: constant 2 VUs for 300ms\n"))
        .stdout(contains("target: http://localhost:8080/api/v1/quotes (offline)\n"))
        .stdout(contains("failed: 0\n"))
        .stdout(contains("checks_rate rate>0.99: ok"));
}

#[test]
fn default_command_is_run() {
    let mut cmd = common::loadgen();
    cmd.env("OFFLINE", "true")
        .env("SMOKE_DURATION", "200ms")
        .env("THINK_TIME_MS", "10");
    cmd.args(["--format", "json"]);
    cmd.assert()
        .success()
        .stdout(contains("\"transport\": \"offline\""))
        .stdout(contains("\"name\": \"setup replay-prewarm: status 201\""));
}

#[test]
fn threshold_breach_exits_with_dedicated_code() {
    let mut cmd = common::loadgen();
    cmd.args([
        "run",
        "--offline",
        "--smoke-vus",
        "1",
        "--smoke-duration",
        "200ms",
        "--think-time-ms",
        "10",
        "--p95-ms",
        "0.000001",
        "--format",
        "summary",
    ]);
    cmd.assert()
        .failure()
        .code(99)
        .stdout(contains("http_req_duration p(95)<0.000001: FAILED"))
        .stderr(contains(
            "Error: thresholds breached: http_req_duration p(95)<0.000001",
        ));
}
