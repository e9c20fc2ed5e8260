use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{name} must be a finite number between 0 and 100 (got '{value}')")]
    InvalidPercentage { name: &'static str, value: String },
    #[error("REPLAY_PCT + CONFLICT_PCT must be <= 100 (got {replay} + {conflict})")]
    PercentageSum { replay: u32, conflict: u32 },
    #[error("LOAD_STAGES must not be empty")]
    EmptyStages,
    #[error("invalid stage '{0}': expected duration:target")]
    InvalidStage(String),
    #[error("invalid target VUs in stage '{0}': expected 0 to {}", crate::scenario::MAX_VUS)]
    InvalidStageTarget(String),
    #[error("invalid duration in stage '{0}'")]
    InvalidStageDuration(String),
    #[error("invalid base url '{0}'")]
    InvalidBaseUrl(String),
    #[error("P95_MS must be a finite number > 0 (got '{0}')")]
    InvalidLatencyBudget(String),
    #[error("{name} must be > 0 (got {value})")]
    InvalidTimeout { name: &'static str, value: u64 },
    #[error("invalid GENERATED_AT '{0}': expected an RFC 3339 timestamp")]
    InvalidGeneratedAt(String),
    #[error("unknown test mode '{0}': expected smoke or load")]
    InvalidTestMode(String),
    #[error("SMOKE_VUS must be between 1 and {} (got {0})", crate::scenario::MAX_VUS)]
    InvalidSmokeVus(u32),
    #[error("invalid SMOKE_DURATION '{0}'")]
    InvalidSmokeDuration(String),
    #[error("virtual user {0} panicked")]
    VirtualUser(u32),
    #[error("failed to start virtual user {vu}: {reason}")]
    SpawnVirtualUser { vu: u32, reason: String },
    #[error("{0}")]
    ConfigIo(String),
    #[error("{0}")]
    ConfigParse(String),
    #[error("unsupported config format '{0}'")]
    UnsupportedConfigFormat(String),
    #[error("{0}")]
    Cli(String),
    #[error("failed to encode request body: {0}")]
    Encode(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
    #[error("fixture setup '{label}' failed: expected status {expected}, got {actual}")]
    FixtureStatus {
        label: String,
        expected: u16,
        actual: u16,
    },
    #[error("fixture setup '{label}' failed: {reason}")]
    FixtureTransport { label: String, reason: String },
    #[error("thresholds breached: {}", .0.join(", "))]
    ThresholdsBreached(Vec<String>),
}

impl Error {
    /// Process exit code: 99 for threshold breaches, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ThresholdsBreached(_) => 99,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn threshold_breach_uses_dedicated_exit_code() {
        let err = Error::ThresholdsBreached(vec!["http_req_failed".to_string()]);
        assert_eq!(err.exit_code(), 99);
        assert_eq!(err.to_string(), "thresholds breached: http_req_failed");
        assert_eq!(Error::EmptyStages.exit_code(), 1);
    }

    #[test]
    fn percentage_sum_message_names_both_values() {
        let err = Error::PercentageSum {
            replay: 60,
            conflict: 41,
        };
        assert_eq!(
            err.to_string(),
            "REPLAY_PCT + CONFLICT_PCT must be <= 100 (got 60 + 41)"
        );
    }
}
