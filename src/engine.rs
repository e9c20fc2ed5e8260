use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::classifier::RequestKind;
use crate::config::HarnessConfig;
use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use crate::metrics::{MetricsRegistry, Recorder, RunSummary, ThresholdReport};
use crate::protocol::{self, IterationOutcome, Prepared, RunContext};
use crate::scenario::{Scenario, TestMode};
use crate::transport::Transport;

/// How long an idle virtual user waits before re-reading the target.
const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IterationCounts {
    pub total: u64,
    pub normal: u64,
    pub replay: u64,
    pub conflict: u64,
    pub failed: u64,
}

impl IterationCounts {
    fn record(&mut self, outcome: &IterationOutcome) {
        self.total += 1;
        match outcome.kind {
            RequestKind::Normal => self.normal += 1,
            RequestKind::Replay => self.replay += 1,
            RequestKind::Conflict => self.conflict += 1,
        }
        if !outcome.passed() {
            self.failed += 1;
        }
    }

    fn merge(&mut self, other: IterationCounts) {
        self.total += other.total;
        self.normal += other.normal;
        self.replay += other.replay;
        self.conflict += other.conflict;
        self.failed += other.failed;
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunMetadata {
    pub mode: TestMode,
    pub scenario: String,
    pub target: String,
    pub transport: &'static str,
    pub generated_at: String,
    pub duration_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub iterations: IterationCounts,
    pub summary: RunSummary,
    pub thresholds: ThresholdReport,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.thresholds.passed()
    }
}

/// Creates the fixtures, drives the schedule, then evaluates thresholds.
/// Setup failures abort before any virtual user starts.
pub fn run_load(config: &HarnessConfig, transport: &dyn Transport) -> Result<RunReport> {
    let registry = MetricsRegistry::new();
    let prepared = Prepared::new(config.protocol())?;
    debug!(config = ?config, "resolved configuration");

    let ctx = protocol::setup(prepared, transport, &registry)?;

    info!(
        scenario = %config.scenario,
        max_vus = config.scenario.max_vus(),
        "starting measured phase"
    );
    let started = Instant::now();
    let iterations = drive(&ctx, transport, &registry, &config.scenario, config.think_time)?;
    let elapsed = started.elapsed();
    info!(
        iterations = iterations.total,
        failed = iterations.failed,
        duration_ms = elapsed.as_millis() as u64,
        "measured phase finished"
    );

    let summary = registry.summary();
    let thresholds = config.thresholds.evaluate(&summary);

    Ok(RunReport {
        metadata: RunMetadata {
            mode: config.mode,
            scenario: config.scenario.to_string(),
            target: config.url(),
            transport: transport.name(),
            generated_at: config
                .generated_at
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        },
        iterations,
        summary,
        thresholds,
    })
}

/// Runs one thread per virtual user until the schedule ends.
pub fn drive(
    ctx: &RunContext,
    transport: &dyn Transport,
    recorder: &dyn Recorder,
    scenario: &Scenario,
    think_time: Duration,
) -> Result<IterationCounts> {
    let started = Instant::now();
    let deadline = scenario.total_duration();

    thread::scope(|scope| {
        let mut handles = Vec::new();
        for vu in 1..=scenario.max_vus() {
            let handle = thread::Builder::new()
                .name(format!("vu-{}", vu))
                .spawn_scoped(scope, move || {
                    virtual_user(
                        vu, ctx, transport, recorder, scenario, think_time, started, deadline,
                    )
                })
                .map_err(|err| Error::SpawnVirtualUser {
                    vu,
                    reason: err.to_string(),
                })?;
            handles.push((vu, handle));
        }

        let mut totals = IterationCounts::default();
        for (vu, handle) in handles {
            let counts = handle.join().map_err(|_| Error::VirtualUser(vu))?;
            totals.merge(counts);
        }
        Ok(totals)
    })
}

#[allow(clippy::too_many_arguments)]
fn virtual_user(
    vu: u32,
    ctx: &RunContext,
    transport: &dyn Transport,
    recorder: &dyn Recorder,
    scenario: &Scenario,
    think_time: Duration,
    started: Instant,
    deadline: Duration,
) -> IterationCounts {
    let mut counts = IterationCounts::default();
    let mut iter = 0u32;

    loop {
        let elapsed = started.elapsed();
        if elapsed >= deadline {
            break;
        }
        let remaining = deadline - elapsed;
        if vu > scenario.target_at(elapsed) {
            thread::sleep(IDLE_POLL.min(remaining));
            continue;
        }

        let coord = Coordinate::new(vu, iter);
        let outcome = protocol::run_iteration(ctx, transport, recorder, coord);
        counts.record(&outcome);
        iter = iter.wrapping_add(1);

        if !think_time.is_zero() {
            let remaining = deadline.saturating_sub(started.elapsed());
            thread::sleep(think_time.min(remaining));
        }
    }

    debug!(vu, iterations = counts.total, "virtual user finished");
    counts
}
