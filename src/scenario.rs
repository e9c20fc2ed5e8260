use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_LOAD_STAGES: &str = "10s:5,30s:20,10s:0";
pub const DEFAULT_SMOKE_VUS: u32 = 2;
pub const DEFAULT_SMOKE_DURATION: Duration = Duration::from_secs(10);
/// Upper bound on concurrent virtual users; each one is an OS thread.
pub const MAX_VUS: u32 = 10_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    #[default]
    Smoke,
    Load,
}

impl FromStr for TestMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "smoke" => Ok(TestMode::Smoke),
            "load" => Ok(TestMode::Load),
            _ => Err(Error::InvalidTestMode(value.to_string())),
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestMode::Smoke => f.write_str("smoke"),
            TestMode::Load => f.write_str("load"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stage {
    /// Duration exactly as written in the stage spec.
    pub duration_label: String,
    #[serde(skip)]
    pub duration: Duration,
    pub target: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "executor", rename_all = "kebab-case")]
pub enum Scenario {
    ConstantVus {
        vus: u32,
        #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
        duration: Duration,
    },
    RampingVus {
        start_vus: u32,
        stages: Vec<Stage>,
    },
}

impl Scenario {
    pub fn smoke(vus: u32, duration: Duration) -> Self {
        Scenario::ConstantVus { vus, duration }
    }

    pub fn load(stages: Vec<Stage>) -> Self {
        Scenario::RampingVus {
            start_vus: 0,
            stages,
        }
    }

    pub fn total_duration(&self) -> Duration {
        match self {
            Scenario::ConstantVus { duration, .. } => *duration,
            Scenario::RampingVus { stages, .. } => stages.iter().map(|stage| stage.duration).sum(),
        }
    }

    /// Highest concurrency the schedule ever asks for.
    pub fn max_vus(&self) -> u32 {
        match self {
            Scenario::ConstantVus { vus, .. } => *vus,
            Scenario::RampingVus { start_vus, stages } => stages
                .iter()
                .map(|stage| stage.target)
                .fold(*start_vus, u32::max),
        }
    }

    /// Active virtual users `elapsed` into the run. Ramping stages move
    /// linearly from the previous target to their own.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        match self {
            Scenario::ConstantVus { vus, duration } => {
                if elapsed < *duration {
                    *vus
                } else {
                    0
                }
            }
            Scenario::RampingVus { start_vus, stages } => {
                let mut from = *start_vus;
                let mut stage_start = Duration::ZERO;
                for stage in stages {
                    let stage_end = stage_start + stage.duration;
                    if elapsed < stage_end {
                        let progress = (elapsed - stage_start).as_secs_f64()
                            / stage.duration.as_secs_f64();
                        let delta = f64::from(stage.target) - f64::from(from);
                        return (f64::from(from) + delta * progress).round() as u32;
                    }
                    from = stage.target;
                    stage_start = stage_end;
                }
                from
            }
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::ConstantVus { vus, duration } => write!(
                f,
                "constant {} VUs for {}",
                vus,
                humantime::format_duration(*duration)
            ),
            Scenario::RampingVus { start_vus, stages } => {
                write!(f, "ramping from {} VUs", start_vus)?;
                for stage in stages {
                    write!(f, ", {} -> {}", stage.duration_label, stage.target)?;
                }
                Ok(())
            }
        }
    }
}

pub(crate) fn serialize_millis<S>(
    value: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}

/// Parses `duration:target` tokens separated by commas, e.g.
/// `10s:5,30s:20,10s:0`. Blank tokens are skipped.
pub fn parse_stages(spec: &str) -> Result<Vec<Stage>> {
    let tokens: Vec<&str> = spec
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(Error::EmptyStages);
    }

    tokens.into_iter().map(parse_stage).collect()
}

fn parse_stage(token: &str) -> Result<Stage> {
    let mut parts = token.split(':').map(str::trim);
    let duration_label = parts.next().unwrap_or("");
    let target_str = match parts.next() {
        Some(target) => target,
        None => return Err(Error::InvalidStage(token.to_string())),
    };
    if parts.next().is_some() || duration_label.is_empty() {
        return Err(Error::InvalidStage(token.to_string()));
    }

    let target: f64 = target_str
        .parse()
        .map_err(|_| Error::InvalidStageTarget(token.to_string()))?;
    if !target.is_finite() || target < 0.0 || target.floor() > f64::from(MAX_VUS) {
        return Err(Error::InvalidStageTarget(token.to_string()));
    }

    let duration = humantime::parse_duration(duration_label)
        .map_err(|_| Error::InvalidStageDuration(token.to_string()))?;

    Ok(Stage {
        duration_label: duration_label.to_string(),
        duration,
        target: target.floor() as u32,
    })
}
