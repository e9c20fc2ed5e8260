use serde::Serialize;
use std::fmt::Write as _;

use crate::config::{FormatArg, HarnessConfig};
use crate::engine::RunReport;
use crate::error::{Error, Result};
use crate::fixtures::FixtureRegistry;
use crate::protocol::PlannedRequest;

pub trait Formatter {
    fn write(&self, report: &RunReport) -> Result<String>;
}

pub struct HumanFormatter;
pub struct SummaryFormatter;
pub struct JsonFormatter;

pub fn formatter_for(format: FormatArg) -> Box<dyn Formatter> {
    match format {
        FormatArg::Human => Box::new(HumanFormatter),
        FormatArg::Summary => Box::new(SummaryFormatter),
        FormatArg::Json => Box::new(JsonFormatter),
    }
}

impl Formatter for HumanFormatter {
    fn write(&self, report: &RunReport) -> Result<String> {
        let mut out = String::new();
        write_metadata(&mut out, report);
        write_iterations(&mut out, report);

        out.push_str("Checks:\n");
        for check in &report.summary.checks {
            let _ = writeln!(
                out,
                "[{}] {}: {} passed, {} failed",
                check.tag, check.name, check.passes, check.fails
            );
        }

        out.push_str("Metrics:\n");
        for rate in &report.summary.rates {
            let _ = writeln!(
                out,
                "{}: {} ({}/{})",
                rate.name,
                percent(rate.rate),
                rate.hits,
                rate.total
            );
        }
        for trend in &report.summary.trends {
            let _ = writeln!(
                out,
                "{}: avg={:.2}ms min={:.2}ms p(50)={:.2}ms p(90)={:.2}ms p(95)={:.2}ms p(99)={:.2}ms max={:.2}ms",
                trend.name,
                trend.avg,
                trend.min,
                trend.p50,
                trend.p90,
                trend.p95,
                trend.p99,
                trend.max
            );
        }

        write_thresholds(&mut out, report);
        Ok(out)
    }
}

impl Formatter for SummaryFormatter {
    fn write(&self, report: &RunReport) -> Result<String> {
        let mut out = String::new();
        write_metadata(&mut out, report);
        write_iterations(&mut out, report);
        write_thresholds(&mut out, report);
        Ok(out)
    }
}

impl Formatter for JsonFormatter {
    fn write(&self, report: &RunReport) -> Result<String> {
        to_json(report)
    }
}

fn write_metadata(out: &mut String, report: &RunReport) {
    let meta = &report.metadata;
    out.push_str("Metadata:\n");
    let _ = writeln!(out, "mode: {}", meta.mode);
    let _ = writeln!(out, "scenario: {}", meta.scenario);
    let _ = writeln!(out, "target: {} ({})", meta.target, meta.transport);
    let _ = writeln!(out, "generated_at: {}", meta.generated_at);
    let _ = writeln!(out, "duration_ms: {}", meta.duration_ms);
}

fn write_iterations(out: &mut String, report: &RunReport) {
    let counts = &report.iterations;
    out.push_str("Iterations:\n");
    let _ = writeln!(
        out,
        "total: {} (normal: {}, replay: {}, conflict: {})",
        counts.total, counts.normal, counts.replay, counts.conflict
    );
    let _ = writeln!(out, "failed: {}", counts.failed);
}

fn write_thresholds(out: &mut String, report: &RunReport) {
    out.push_str("Thresholds:\n");
    for result in &report.thresholds.results {
        let observed = match result.observed {
            Some(value) => format!("{:.4}", value),
            None => "no samples".to_string(),
        };
        let _ = writeln!(
            out,
            "{} {}: {} (observed {})",
            result.metric,
            result.expression,
            if result.passed { "ok" } else { "FAILED" },
            observed
        );
    }
}

fn percent(rate: Option<f64>) -> String {
    match rate {
        Some(value) => format!("{:.2}%", value * 100.0),
        None => "n/a".to_string(),
    }
}

pub fn render_config(config: &HarnessConfig, format: FormatArg) -> Result<String> {
    if format == FormatArg::Json {
        return to_json(config);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Target: {}", config.url());
    let _ = writeln!(
        out,
        "Transport: {}",
        if config.offline { "offline" } else { "http" }
    );
    let _ = writeln!(out, "Mode: {}", config.mode);
    let _ = writeln!(out, "Scenario: {}", config.scenario);
    let _ = writeln!(
        out,
        "Traffic mix: replay {}%, conflict {}%",
        config.mix.replay_pct(),
        config.mix.conflict_pct()
    );
    out.push_str("Thresholds:\n");
    for expression in config.thresholds.expressions() {
        let _ = writeln!(out, "- {}", expression);
    }
    let _ = writeln!(
        out,
        "Think time: {}",
        humantime::format_duration(config.think_time)
    );
    let _ = writeln!(
        out,
        "Request timeout: {}",
        humantime::format_duration(config.request_timeout)
    );
    let _ = writeln!(
        out,
        "Setup timeout: {}",
        humantime::format_duration(config.setup_timeout)
    );
    let _ = writeln!(
        out,
        "Generated at: {}",
        config
            .generated_at
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    );
    let _ = writeln!(out, "Debug: {}", config.debug);
    Ok(out)
}

pub fn render_preview(plans: &[PlannedRequest], format: FormatArg) -> Result<String> {
    if format == FormatArg::Json {
        return to_json(&plans);
    }

    let mut out = String::new();
    for plan in plans {
        let _ = writeln!(
            out,
            "vu={} iter={} kind={} expected={}",
            plan.vu, plan.iter, plan.kind, plan.expected_status
        );
        if format == FormatArg::Summary {
            continue;
        }
        let _ = writeln!(out, "Idempotency-Key: {}", plan.idempotency_key);
        let _ = writeln!(out, "X-Correlation-Id: {}", plan.correlation_id);
        let _ = writeln!(out, "{}", to_json(&plan.body)?);
    }
    Ok(out)
}

#[derive(Serialize)]
struct FixtureView<'a> {
    label: &'a str,
    key: &'a str,
    payload: &'a str,
}

pub fn render_fixtures(fixtures: &FixtureRegistry, format: FormatArg) -> Result<String> {
    let views: Vec<FixtureView<'_>> = fixtures
        .iter()
        .map(|fixture| FixtureView {
            label: fixture.label,
            key: fixture.key,
            payload: &fixture.payload,
        })
        .collect();
    if format == FormatArg::Json {
        return to_json(&views);
    }

    let mut out = String::new();
    for view in views {
        let _ = writeln!(out, "{}: {}", view.label, view.key);
        if format == FormatArg::Human {
            let _ = writeln!(out, "{}", view.payload);
        }
    }
    Ok(out)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|err| Error::Encode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{IterationCounts, RunMetadata};
    use crate::metrics::{MetricsRegistry, Recorder, Tag, Thresholds, CHECKS_RATE};
    use crate::scenario::TestMode;

    fn report() -> RunReport {
        let registry = MetricsRegistry::new();
        registry.check("status is expected", Tag::Normal, true);
        registry.rate(CHECKS_RATE, Tag::Normal, true);
        let summary = registry.summary();
        let thresholds = Thresholds::new(500.0).evaluate(&summary);
        RunReport {
            metadata: RunMetadata {
                mode: TestMode::Smoke,
                scenario: "constant 2 VUs for 10s".to_string(),
                target: "http://localhost:8080/api/v1/quotes".to_string(),
                transport: "offline",
                generated_at: "2026-03-01T12:00:00.000Z".to_string(),
                duration_ms: 10_000,
            },
            iterations: IterationCounts {
                total: 1,
                normal: 1,
                replay: 0,
                conflict: 0,
                failed: 0,
            },
            summary,
            thresholds,
        }
    }

    #[test]
    fn summary_output_is_stable() {
        let expected = concat!(
            "Metadata:\n",
            "mode: smoke\n",
            "scenario: constant 2 VUs for 10s\n",
            "target: http://localhost:8080/api/v1/quotes (offline)\n",
            "generated_at: 2026-03-01T12:00:00.000Z\n",
            "duration_ms: 10000\n",
            "Iterations:\n",
            "total: 1 (normal: 1, replay: 0, conflict: 0)\n",
            "failed: 0\n",
            "Thresholds:\n",
            "http_req_failed rate<0.01: ok (observed no samples)\n",
            "http_req_duration p(95)<500: ok (observed no samples)\n",
            "checks_rate rate>0.99: ok (observed 1.0000)\n",
        );
        assert_eq!(SummaryFormatter.write(&report()).unwrap(), expected);
    }

    #[test]
    fn human_output_lists_checks_and_rates() {
        let output = HumanFormatter.write(&report()).unwrap();
        assert!(output.contains("[normal] status is expected: 1 passed, 0 failed\n"));
        assert!(output.contains("checks_rate: 100.00% (1/1)\n"));
    }

    #[test]
    fn json_output_parses_back() {
        let output = JsonFormatter.write(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["metadata"]["mode"], "smoke");
        assert_eq!(value["iterations"]["total"], 1);
        assert_eq!(value["thresholds"]["results"][2]["passed"], true);
    }
}
