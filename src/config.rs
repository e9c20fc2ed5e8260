use chrono::{DateTime, Utc};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classifier::TrafficMix;
use crate::error::{Error, Result};
use crate::metrics::Thresholds;
use crate::models::FileConfig;
use crate::protocol::ProtocolConfig;
use crate::scenario::{
    parse_stages, serialize_millis, Scenario, TestMode, DEFAULT_LOAD_STAGES,
    DEFAULT_SMOKE_DURATION, DEFAULT_SMOKE_VUS, MAX_VUS,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_ENDPOINT: &str = "/api/v1/quotes";
pub const DEFAULT_P95_MS: f64 = 500.0;
pub const DEFAULT_REPLAY_PCT: f64 = 2.0;
pub const DEFAULT_CONFLICT_PCT: f64 = 1.0;
pub const DEFAULT_THINK_TIME_MS: u64 = 200;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_SETUP_TIMEOUT_MS: u64 = 10_000;

#[derive(Parser, Debug)]
#[command(
    name = "quote-loadgen",
    version,
    about = "Deterministic load harness for an idempotent create-quote endpoint"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
    #[command(flatten)]
    pub args: HarnessArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the fixtures, then drive the configured schedule (default).
    Run,
    /// Print the request a coordinate maps to without sending anything.
    Preview(PreviewArgs),
    /// Print the resolved configuration.
    ShowConfig,
    /// Print the replay and conflict fixtures.
    Fixtures,
}

#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    #[arg(long, default_value_t = 1)]
    pub vu: u32,
    #[arg(long, default_value_t = 0)]
    pub iter: u32,
    /// Number of consecutive iterations to print, starting at --iter.
    #[arg(long, default_value_t = 1)]
    pub count: u32,
}

/// Settings shared by every subcommand. All of them are global, so they
/// may appear before or after the subcommand name.
#[derive(Args, Debug, Clone)]
pub struct HarnessArgs {
    /// TOML or JSON file with the same settings; flags and env win.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, env = "BASE_URL")]
    pub base_url: Option<String>,
    #[arg(long, global = true, env = "ENDPOINT")]
    pub endpoint: Option<String>,
    /// p95 latency budget in milliseconds.
    #[arg(long, global = true, env = "P95_MS", allow_negative_numbers = true)]
    pub p95_ms: Option<String>,
    #[arg(long, global = true, env = "REPLAY_PCT", allow_negative_numbers = true)]
    pub replay_pct: Option<String>,
    #[arg(long, global = true, env = "CONFLICT_PCT", allow_negative_numbers = true)]
    pub conflict_pct: Option<String>,
    /// smoke or load.
    #[arg(long, global = true, env = "TEST_MODE")]
    pub test_mode: Option<String>,
    /// Comma-separated duration:target stages for load mode.
    #[arg(long, global = true, env = "LOAD_STAGES")]
    pub load_stages: Option<String>,
    #[arg(long, global = true, env = "SMOKE_VUS")]
    pub smoke_vus: Option<u32>,
    #[arg(long, global = true, env = "SMOKE_DURATION")]
    pub smoke_duration: Option<String>,
    /// Pause after every iteration.
    #[arg(long, global = true, env = "THINK_TIME_MS")]
    pub think_time_ms: Option<u64>,
    #[arg(long, global = true, env = "REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,
    #[arg(long, global = true, env = "SETUP_TIMEOUT_MS")]
    pub setup_timeout_ms: Option<u64>,
    /// RFC 3339 anchor for expiresAt; defaults to the run start.
    #[arg(long, global = true, env = "GENERATED_AT")]
    pub generated_at: Option<String>,
    /// Verbose logging. From the environment only `true` enables it.
    #[arg(long, global = true, env = "DEBUG", value_parser = parse_switch)]
    pub debug: bool,
    /// Use the in-process target instead of HTTP.
    #[arg(long, global = true, env = "OFFLINE", value_parser = parse_switch)]
    pub offline: bool,
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub format: FormatArg,
}

/// Boolean switches are on only for a case-insensitive `true`.
fn parse_switch(raw: &str) -> std::result::Result<bool, String> {
    Ok(raw.trim().eq_ignore_ascii_case("true"))
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Human,
    Summary,
    Json,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HarnessConfig {
    pub base_url: String,
    pub endpoint: String,
    pub mode: TestMode,
    pub scenario: Scenario,
    pub mix: TrafficMix,
    pub thresholds: Thresholds,
    #[serde(rename = "think_time_ms", serialize_with = "serialize_millis")]
    pub think_time: Duration,
    #[serde(rename = "request_timeout_ms", serialize_with = "serialize_millis")]
    pub request_timeout: Duration,
    #[serde(rename = "setup_timeout_ms", serialize_with = "serialize_millis")]
    pub setup_timeout: Duration,
    pub generated_at: DateTime<Utc>,
    pub debug: bool,
    pub offline: bool,
}

impl HarnessConfig {
    /// Full URL of the create-quote endpoint.
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, self.endpoint)
    }

    pub fn protocol(&self) -> ProtocolConfig {
        ProtocolConfig {
            url: self.url(),
            mix: self.mix,
            request_timeout: self.request_timeout,
            setup_timeout: self.setup_timeout,
            generated_at: self.generated_at,
        }
    }
}

pub fn parse_args() -> Result<Cli> {
    match Cli::try_parse() {
        Ok(cli) => Ok(cli),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => Err(Error::Cli(err.to_string())),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::ConfigIo(format!(
            "failed to read config '{}': {}",
            path.display(),
            err
        ))
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or("");

    match ext {
        "toml" => toml::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse TOML: {}", err))),
        "json" => serde_json::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse JSON: {}", err))),
        "" => Err(Error::UnsupportedConfigFormat("unknown".to_string())),
        _ => Err(Error::UnsupportedConfigFormat(ext.to_string())),
    }
}

/// Resolves flags and env over the optional config file over defaults.
pub fn build_config(args: HarnessArgs) -> Result<(HarnessConfig, FormatArg)> {
    let file = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };

    let base_url = validate_base_url(
        &args
            .base_url
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
    )?;
    let endpoint = normalize_endpoint(
        &args
            .endpoint
            .or(file.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
    );

    let replay_pct = percentage(
        "REPLAY_PCT",
        args.replay_pct,
        file.replay_pct,
        DEFAULT_REPLAY_PCT,
    )?;
    let conflict_pct = percentage(
        "CONFLICT_PCT",
        args.conflict_pct,
        file.conflict_pct,
        DEFAULT_CONFLICT_PCT,
    )?;
    let mix = TrafficMix::new(replay_pct, conflict_pct)?;

    let (raw_p95, p95_ms) = resolve_number(args.p95_ms, file.p95_ms, DEFAULT_P95_MS);
    let p95_ms = match p95_ms {
        Some(value) if value.is_finite() && value > 0.0 => value,
        _ => return Err(Error::InvalidLatencyBudget(raw_p95)),
    };

    let mode = match args.test_mode.or(file.test_mode) {
        Some(raw) if !raw.trim().is_empty() => raw.parse()?,
        _ => TestMode::default(),
    };
    let scenario = match mode {
        TestMode::Smoke => {
            let vus = args
                .smoke_vus
                .or(file.smoke_vus)
                .unwrap_or(DEFAULT_SMOKE_VUS);
            if vus == 0 || vus > MAX_VUS {
                return Err(Error::InvalidSmokeVus(vus));
            }
            let duration = match args.smoke_duration.or(file.smoke_duration) {
                Some(raw) => parse_smoke_duration(&raw)?,
                None => DEFAULT_SMOKE_DURATION,
            };
            Scenario::smoke(vus, duration)
        }
        TestMode::Load => {
            let stages = args
                .load_stages
                .or(file.load_stages)
                .unwrap_or_else(|| DEFAULT_LOAD_STAGES.to_string());
            Scenario::load(parse_stages(&stages)?)
        }
    };

    let think_time = Duration::from_millis(
        args.think_time_ms
            .or(file.think_time_ms)
            .unwrap_or(DEFAULT_THINK_TIME_MS),
    );
    let request_timeout = timeout(
        "REQUEST_TIMEOUT_MS",
        args.request_timeout_ms.or(file.request_timeout_ms),
        DEFAULT_REQUEST_TIMEOUT_MS,
    )?;
    let setup_timeout = timeout(
        "SETUP_TIMEOUT_MS",
        args.setup_timeout_ms.or(file.setup_timeout_ms),
        DEFAULT_SETUP_TIMEOUT_MS,
    )?;

    let generated_at = match args.generated_at.or(file.generated_at) {
        Some(raw) if !raw.trim().is_empty() => parse_generated_at(&raw)?,
        _ => Utc::now(),
    };

    let config = HarnessConfig {
        base_url,
        endpoint,
        mode,
        scenario,
        mix,
        thresholds: Thresholds::new(p95_ms),
        think_time,
        request_timeout,
        setup_timeout,
        generated_at,
        debug: args.debug || file.debug.unwrap_or(false),
        offline: args.offline || file.offline.unwrap_or(false),
    };

    Ok((config, args.format))
}

/// Raw text for error messages plus the parsed value, if it parses.
fn resolve_number(
    flag: Option<String>,
    file: Option<f64>,
    default: f64,
) -> (String, Option<f64>) {
    match flag {
        Some(raw) if !raw.trim().is_empty() => {
            let parsed = raw.trim().parse::<f64>().ok();
            (raw, parsed)
        }
        _ => {
            let value = file.unwrap_or(default);
            (value.to_string(), Some(value))
        }
    }
}

fn percentage(
    name: &'static str,
    flag: Option<String>,
    file: Option<f64>,
    default: f64,
) -> Result<u32> {
    let (raw, value) = resolve_number(flag, file, default);
    match value {
        Some(value) if value.is_finite() && (0.0..=100.0).contains(&value) => {
            Ok(value.floor() as u32)
        }
        _ => Err(Error::InvalidPercentage { name, value: raw }),
    }
}

fn timeout(name: &'static str, value: Option<u64>, default: u64) -> Result<Duration> {
    let value = value.unwrap_or(default);
    if value == 0 {
        return Err(Error::InvalidTimeout { name, value });
    }
    Ok(Duration::from_millis(value))
}

fn validate_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));
    match host {
        Some(host) if !host.is_empty() && !host.contains(char::is_whitespace) => {
            Ok(trimmed.to_string())
        }
        _ => Err(Error::InvalidBaseUrl(raw.to_string())),
    }
}

fn normalize_endpoint(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_smoke_duration(raw: &str) -> Result<Duration> {
    match humantime::parse_duration(raw.trim()) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(Error::InvalidSmokeDuration(raw.to_string())),
    }
}

fn parse_generated_at(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|_| Error::InvalidGeneratedAt(raw.to_string()))
}
