use assert_cmd::Command;

const HARNESS_ENV: [&str; 16] = [
    "BASE_URL",
    "ENDPOINT",
    "P95_MS",
    "REPLAY_PCT",
    "CONFLICT_PCT",
    "TEST_MODE",
    "LOAD_STAGES",
    "SMOKE_VUS",
    "SMOKE_DURATION",
    "THINK_TIME_MS",
    "REQUEST_TIMEOUT_MS",
    "SETUP_TIMEOUT_MS",
    "GENERATED_AT",
    "DEBUG",
    "OFFLINE",
    "RUST_LOG",
];

/// Binary with every harness variable cleared from the inherited env.
pub fn loadgen() -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("quote-loadgen");
    for name in HARNESS_ENV {
        cmd.env_remove(name);
    }
    cmd
}
