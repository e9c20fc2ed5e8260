//! Named observations: pass/fail checks, boolean rates and latency trends,
//! all tagged with the phase or request kind that produced them.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::classifier::RequestKind;

pub const CHECKS_RATE: &str = "checks_rate";
pub const REPLAY_OK: &str = "idempotency_replay_ok";
pub const CONFLICT_OK: &str = "idempotency_conflict_ok";
pub const CREATED_OK: &str = "quote_created_ok";
pub const QUOTE_POST_DURATION: &str = "quote_post_duration";
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
pub const HTTP_REQ_DURATION: &str = "http_req_duration";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Setup,
    Normal,
    Replay,
    Conflict,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Setup => "setup",
            Tag::Normal => "normal",
            Tag::Replay => "replay",
            Tag::Conflict => "conflict",
        }
    }
}

impl From<RequestKind> for Tag {
    fn from(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Normal => Tag::Normal,
            RequestKind::Replay => Tag::Replay,
            RequestKind::Conflict => Tag::Conflict,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Recorder: Send + Sync {
    fn check(&self, name: &str, tag: Tag, passed: bool);
    fn rate(&self, metric: &str, tag: Tag, hit: bool);
    fn trend(&self, metric: &str, tag: Tag, millis: f64);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Counter {
    hits: u64,
    total: u64,
}

impl Counter {
    fn add(&mut self, hit: bool) {
        self.total += 1;
        if hit {
            self.hits += 1;
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    checks: BTreeMap<(String, Tag), Counter>,
    rates: BTreeMap<String, BTreeMap<Tag, Counter>>,
    trends: BTreeMap<String, BTreeMap<Tag, Vec<f64>>>,
}

/// In-memory recorder shared by every virtual user.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    store: Mutex<Store>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> RunSummary {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);

        let checks = store
            .checks
            .iter()
            .map(|((name, tag), counter)| CheckSummary {
                name: name.clone(),
                tag: *tag,
                passes: counter.hits,
                fails: counter.total - counter.hits,
            })
            .collect();

        let rates = store
            .rates
            .iter()
            .map(|(name, by_tag)| {
                let hits = by_tag.values().map(|counter| counter.hits).sum();
                let total = by_tag.values().map(|counter| counter.total).sum();
                RateSummary {
                    name: name.clone(),
                    hits,
                    total,
                    rate: ratio(hits, total),
                    by_tag: by_tag
                        .iter()
                        .map(|(tag, counter)| (*tag, ratio(counter.hits, counter.total)))
                        .collect(),
                }
            })
            .collect();

        let trends = store
            .trends
            .iter()
            .map(|(name, by_tag)| TrendSummary::from_tagged(name, by_tag))
            .collect();

        RunSummary {
            checks,
            rates,
            trends,
        }
    }
}

impl Recorder for MetricsRegistry {
    fn check(&self, name: &str, tag: Tag, passed: bool) {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        store
            .checks
            .entry((name.to_string(), tag))
            .or_default()
            .add(passed);
    }

    fn rate(&self, metric: &str, tag: Tag, hit: bool) {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        store
            .rates
            .entry(metric.to_string())
            .or_default()
            .entry(tag)
            .or_default()
            .add(hit);
    }

    fn trend(&self, metric: &str, tag: Tag, millis: f64) {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        store
            .trends
            .entry(metric.to_string())
            .or_default()
            .entry(tag)
            .or_default()
            .push(millis);
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    pub checks: Vec<CheckSummary>,
    pub rates: Vec<RateSummary>,
    pub trends: Vec<TrendSummary>,
}

impl RunSummary {
    pub fn rate(&self, name: &str) -> Option<&RateSummary> {
        self.rates.iter().find(|rate| rate.name == name)
    }

    pub fn trend(&self, name: &str) -> Option<&TrendSummary> {
        self.trends.iter().find(|trend| trend.name == name)
    }

    pub fn failed_checks(&self) -> u64 {
        self.checks.iter().map(|check| check.fails).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub tag: Tag,
    pub passes: u64,
    pub fails: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RateSummary {
    pub name: String,
    pub hits: u64,
    pub total: u64,
    pub rate: Option<f64>,
    pub by_tag: BTreeMap<Tag, Option<f64>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendSummary {
    pub name: String,
    pub count: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    /// p95 per tag.
    pub by_tag: BTreeMap<Tag, f64>,
}

impl TrendSummary {
    fn from_tagged(name: &str, by_tag: &BTreeMap<Tag, Vec<f64>>) -> Self {
        let mut sorted: Vec<f64> = by_tag.values().flatten().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();
        let avg = if count == 0 {
            0.0
        } else {
            sorted.iter().sum::<f64>() / count as f64
        };
        Self {
            name: name.to_string(),
            count,
            avg: round_to(avg, 2),
            min: sorted.first().copied().unwrap_or(0.0),
            max: sorted.last().copied().unwrap_or(0.0),
            p50: nearest_rank_percentile(&sorted, 50.0).unwrap_or(0.0),
            p90: nearest_rank_percentile(&sorted, 90.0).unwrap_or(0.0),
            p95: nearest_rank_percentile(&sorted, 95.0).unwrap_or(0.0),
            p99: nearest_rank_percentile(&sorted, 99.0).unwrap_or(0.0),
            by_tag: by_tag
                .iter()
                .map(|(tag, values)| {
                    let mut values = values.clone();
                    values.sort_by(f64::total_cmp);
                    (*tag, nearest_rank_percentile(&values, 95.0).unwrap_or(0.0))
                })
                .collect(),
        }
    }
}

/// Pass/fail gates evaluated over a finished run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Thresholds {
    pub max_failure_rate: f64,
    pub p95_budget_ms: f64,
    pub min_check_rate: f64,
}

impl Thresholds {
    pub fn new(p95_budget_ms: f64) -> Self {
        Self {
            max_failure_rate: 0.01,
            p95_budget_ms,
            min_check_rate: 0.99,
        }
    }

    /// `metric expression` pairs in evaluation order.
    pub fn expressions(&self) -> Vec<String> {
        self.gates()
            .into_iter()
            .map(|(metric, expression)| format!("{} {}", metric, expression))
            .collect()
    }

    fn gates(&self) -> [(&'static str, String); 3] {
        [
            (HTTP_REQ_FAILED, format!("rate<{}", self.max_failure_rate)),
            (HTTP_REQ_DURATION, format!("p(95)<{}", self.p95_budget_ms)),
            (CHECKS_RATE, format!("rate>{}", self.min_check_rate)),
        ]
    }

    pub fn evaluate(&self, summary: &RunSummary) -> ThresholdReport {
        let failure_rate = summary.rate(HTTP_REQ_FAILED).and_then(|rate| rate.rate);
        let p95 = summary
            .trend(HTTP_REQ_DURATION)
            .filter(|trend| trend.count > 0)
            .map(|trend| trend.p95);
        let check_rate = summary.rate(CHECKS_RATE).and_then(|rate| rate.rate);

        let [failed, duration, checks] = self.gates();
        let results = vec![
            ThresholdResult::new(failed, failure_rate, |value| {
                value < self.max_failure_rate
            }),
            ThresholdResult::new(duration, p95, |value| value < self.p95_budget_ms),
            ThresholdResult::new(checks, check_rate, |value| value > self.min_check_rate),
        ];

        ThresholdReport { results }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub observed: Option<f64>,
    pub passed: bool,
}

impl ThresholdResult {
    fn new(
        (metric, expression): (&str, String),
        observed: Option<f64>,
        gate: impl Fn(f64) -> bool,
    ) -> Self {
        // No samples means nothing to hold against the gate.
        let passed = observed.map_or(true, gate);
        Self {
            metric: metric.to_string(),
            expression,
            observed,
            passed,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ThresholdReport {
    pub results: Vec<ThresholdResult>,
}

impl ThresholdReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|result| result.passed)
    }

    pub fn breached(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|result| !result.passed)
            .map(|result| format!("{} {}", result.metric, result.expression))
            .collect()
    }
}

fn ratio(hits: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(hits as f64 / total as f64)
    }
}

fn nearest_rank_percentile(sorted: &[f64], percentile: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((percentile / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    Some(sorted[idx])
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}
