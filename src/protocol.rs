//! Two-phase run protocol.
//!
//! `Prepared` holds everything derivable without the network: target
//! settings and the fixture registry. `setup` turns it into a `RunContext`
//! by creating both fixtures on the target; `run_iteration` only accepts a
//! `RunContext`, so no measured request can be issued before setup has
//! confirmed both fixtures.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::classifier::{classify, RequestKind, TrafficMix};
use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use crate::fixtures::{encode, Fixture, FixtureRegistry};
use crate::generator::build_quote_request;
use crate::identifier::uuid_from;
use crate::metrics::{
    Recorder, Tag, CHECKS_RATE, CONFLICT_OK, CREATED_OK, HTTP_REQ_DURATION, HTTP_REQ_FAILED,
    QUOTE_POST_DURATION, REPLAY_OK,
};
use crate::models::QuoteRequest;
use crate::transport::{
    PostRequest, PostResponse, Transport, JSON_CONTENT_TYPE, LOCATION, PROBLEM_CONTENT_TYPE,
};

pub const CHECK_STATUS: &str = "status is expected";
pub const CHECK_SUCCESS_CONTENT_TYPE: &str = "success: content-type is application/json";
pub const CHECK_ERROR_CONTENT_TYPE: &str = "errors: content-type is problem+json (preferred)";
pub const CHECK_HAS_ID: &str = "success: response has id";
pub const CHECK_HAS_CREATED_AT: &str = "success: response has createdAt";
pub const CHECK_REPLAY_NO_LOCATION: &str = "replay: should not return Location header";
pub const CHECK_TRANSPORT: &str = "transport: response received";
pub const CHECK_BODY_ENCODED: &str = "request: body encoded";

pub const STATUS_CREATED: u16 = 201;
pub const STATUS_REPLAYED: u16 = 200;
pub const STATUS_CONFLICT: u16 = 409;

const MIN_ID_LEN: usize = 8;
const SETUP_BODY_LOG_LIMIT: usize = 500;
const FAILURE_BODY_LOG_LIMIT: usize = 1000;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProtocolConfig {
    pub url: String,
    pub mix: TrafficMix,
    pub request_timeout: Duration,
    pub setup_timeout: Duration,
    pub generated_at: DateTime<Utc>,
}

/// Request fully derived from one coordinate, before it is sent.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedRequest {
    pub vu: u32,
    pub iter: u32,
    pub kind: RequestKind,
    pub idempotency_key: String,
    pub correlation_id: String,
    pub expected_status: u16,
    pub body: QuoteRequest,
    #[serde(skip)]
    pub payload: String,
}

#[derive(Clone, Debug)]
pub struct Prepared {
    config: ProtocolConfig,
    fixtures: FixtureRegistry,
}

impl Prepared {
    pub fn new(config: ProtocolConfig) -> Result<Self> {
        let fixtures = FixtureRegistry::new(config.generated_at)?;
        Ok(Self { config, fixtures })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn fixtures(&self) -> &FixtureRegistry {
        &self.fixtures
    }

    pub fn plan(&self, coord: Coordinate) -> Result<PlannedRequest> {
        let kind = classify(coord, &self.config.mix);
        let (key, body, payload, expected_status) = match kind {
            RequestKind::Replay => {
                let fixture = &self.fixtures.replay;
                (
                    fixture.key.to_string(),
                    fixture.body.clone(),
                    fixture.payload.clone(),
                    STATUS_REPLAYED,
                )
            }
            RequestKind::Conflict => {
                let body = self.fixtures.conflict_variant(coord);
                let payload = encode(&body)?;
                (
                    self.fixtures.conflict.key.to_string(),
                    body,
                    payload,
                    STATUS_CONFLICT,
                )
            }
            RequestKind::Normal => {
                let seed = coord.seed();
                let body = build_quote_request(
                    seed,
                    &format!("DOC-{}", coord.label()),
                    &format!("CUST-{:03}", coord.vu),
                    self.config.generated_at,
                );
                let payload = encode(&body)?;
                (uuid_from(seed), body, payload, STATUS_CREATED)
            }
        };

        Ok(PlannedRequest {
            vu: coord.vu,
            iter: coord.iter,
            kind,
            idempotency_key: key,
            correlation_id: format!("loadgen-{}", coord.label()),
            expected_status,
            body,
            payload,
        })
    }
}

/// Proof that both fixtures exist on the target. Read-only and shared by
/// every virtual user.
#[derive(Clone, Debug)]
pub struct RunContext {
    prepared: Prepared,
}

impl RunContext {
    pub fn config(&self) -> &ProtocolConfig {
        &self.prepared.config
    }

    pub fn fixtures(&self) -> &FixtureRegistry {
        &self.prepared.fixtures
    }

    pub fn plan(&self, coord: Coordinate) -> Result<PlannedRequest> {
        self.prepared.plan(coord)
    }
}

/// Creates both fixtures on the target. Any response other than 201, or a
/// transport failure, aborts the run.
pub fn setup(
    prepared: Prepared,
    transport: &dyn Transport,
    recorder: &dyn Recorder,
) -> Result<RunContext> {
    info!(
        url = %prepared.config.url,
        transport = transport.name(),
        replay_pct = prepared.config.mix.replay_pct(),
        conflict_pct = prepared.config.mix.conflict_pct(),
        "creating idempotency fixtures"
    );

    for fixture in prepared.fixtures.iter() {
        prewarm(&prepared.config, fixture, transport, recorder)?;
    }

    Ok(RunContext { prepared })
}

fn prewarm(
    config: &ProtocolConfig,
    fixture: &Fixture,
    transport: &dyn Transport,
    recorder: &dyn Recorder,
) -> Result<()> {
    let request = PostRequest::json(
        &config.url,
        fixture.key,
        &format!("loadgen-setup-{}", fixture.label),
        fixture.payload.clone(),
    )
    .with_timeout(config.setup_timeout);
    let check_name = format!("setup {}: status {}", fixture.label, STATUS_CREATED);

    let started = Instant::now();
    let result = transport.post(&request);
    let elapsed = started.elapsed();

    match result {
        Ok(response) => {
            let passed = response.status == STATUS_CREATED;
            recorder.trend(HTTP_REQ_DURATION, Tag::Setup, millis(response.duration));
            recorder.rate(HTTP_REQ_FAILED, Tag::Setup, response.status >= 400);
            recorder.check(&check_name, Tag::Setup, passed);
            recorder.rate(CHECKS_RATE, Tag::Setup, passed);
            debug!(
                setup = fixture.label,
                status = response.status,
                body = %truncate(&response.body, SETUP_BODY_LOG_LIMIT),
                "fixture response"
            );

            if !passed {
                return Err(Error::FixtureStatus {
                    label: fixture.label.to_string(),
                    expected: STATUS_CREATED,
                    actual: response.status,
                });
            }
            Ok(())
        }
        Err(err) => {
            recorder.trend(HTTP_REQ_DURATION, Tag::Setup, millis(elapsed));
            recorder.rate(HTTP_REQ_FAILED, Tag::Setup, true);
            recorder.check(&check_name, Tag::Setup, false);
            recorder.rate(CHECKS_RATE, Tag::Setup, false);
            Err(Error::FixtureTransport {
                label: fixture.label.to_string(),
                reason: err.to_string(),
            })
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IterationOutcome {
    pub coord: Coordinate,
    pub kind: RequestKind,
    pub expected_status: u16,
    pub status: Option<u16>,
    pub checks: Vec<CheckResult>,
}

impl IterationOutcome {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    pub fn failed_checks(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|check| !check.passed)
            .map(|check| check.name)
            .collect()
    }
}

/// One measured iteration: exactly one request, one timing observation and
/// a set of named checks tagged with the request kind.
pub fn run_iteration(
    ctx: &RunContext,
    transport: &dyn Transport,
    recorder: &dyn Recorder,
    coord: Coordinate,
) -> IterationOutcome {
    let plan = match ctx.plan(coord) {
        Ok(plan) => plan,
        Err(err) => {
            let kind = classify(coord, &ctx.config().mix);
            warn!(%coord, %kind, error = %err, "failed to build request");
            recorder.check(CHECK_BODY_ENCODED, kind.into(), false);
            recorder.rate(CHECKS_RATE, kind.into(), false);
            return IterationOutcome {
                coord,
                kind,
                expected_status: 0,
                status: None,
                checks: vec![CheckResult {
                    name: CHECK_BODY_ENCODED,
                    passed: false,
                }],
            };
        }
    };
    let tag = Tag::from(plan.kind);

    let request = PostRequest::json(
        &ctx.config().url,
        &plan.idempotency_key,
        &plan.correlation_id,
        plan.payload.clone(),
    )
    .with_timeout(ctx.config().request_timeout);

    let started = Instant::now();
    let result = transport.post(&request);
    let elapsed = started.elapsed();

    let (status, checks) = match &result {
        Ok(response) => {
            let duration_ms = millis(response.duration);
            recorder.trend(QUOTE_POST_DURATION, tag, duration_ms);
            recorder.trend(HTTP_REQ_DURATION, tag, duration_ms);
            recorder.rate(
                HTTP_REQ_FAILED,
                tag,
                response.status >= 400 && response.status != plan.expected_status,
            );
            let mut checks = vec![CheckResult {
                name: CHECK_TRANSPORT,
                passed: true,
            }];
            checks.extend(validate(&plan, response));
            (Some(response.status), checks)
        }
        Err(err) => {
            let duration_ms = millis(elapsed);
            recorder.trend(QUOTE_POST_DURATION, tag, duration_ms);
            recorder.trend(HTTP_REQ_DURATION, tag, duration_ms);
            recorder.rate(HTTP_REQ_FAILED, tag, true);
            warn!(%coord, kind = %plan.kind, error = %err, "request failed");
            (
                None,
                vec![
                    CheckResult {
                        name: CHECK_TRANSPORT,
                        passed: false,
                    },
                    CheckResult {
                        name: CHECK_STATUS,
                        passed: false,
                    },
                ],
            )
        }
    };

    for check in &checks {
        recorder.check(check.name, tag, check.passed);
    }
    let outcome = IterationOutcome {
        coord,
        kind: plan.kind,
        expected_status: plan.expected_status,
        status,
        checks,
    };
    recorder.rate(CHECKS_RATE, tag, outcome.passed());

    let kind_ok = status == Some(plan.expected_status);
    match plan.kind {
        RequestKind::Replay => recorder.rate(REPLAY_OK, tag, kind_ok),
        RequestKind::Conflict => recorder.rate(CONFLICT_OK, tag, kind_ok),
        RequestKind::Normal => recorder.rate(CREATED_OK, tag, kind_ok),
    }

    if !outcome.passed() {
        log_failure(&plan, &request, result.as_ref().ok(), &outcome);
    }

    outcome
}

/// Checks a response against the expectation for its request kind. Checks
/// that do not apply to the observed status pass trivially.
pub fn validate(plan: &PlannedRequest, response: &PostResponse) -> Vec<CheckResult> {
    let status = response.status;
    let is_success = status == STATUS_REPLAYED || status == STATUS_CREATED;
    let content_type = response.content_type();
    let body = if is_success { response.json() } else { None };

    let has_id = body
        .as_ref()
        .and_then(|json| json.get("id"))
        .and_then(|id| id.as_str())
        .is_some_and(|id| id.chars().count() >= MIN_ID_LEN);
    let has_created_at = body
        .as_ref()
        .and_then(|json| json.get("createdAt"))
        .and_then(|created| created.as_str())
        .is_some_and(|created| created.contains('T'));

    vec![
        CheckResult {
            name: CHECK_STATUS,
            passed: status == plan.expected_status,
        },
        CheckResult {
            name: CHECK_SUCCESS_CONTENT_TYPE,
            passed: !is_success || content_type.contains(JSON_CONTENT_TYPE),
        },
        CheckResult {
            name: CHECK_ERROR_CONTENT_TYPE,
            passed: status != STATUS_CONFLICT
                || content_type.contains(PROBLEM_CONTENT_TYPE)
                || content_type.contains(JSON_CONTENT_TYPE),
        },
        CheckResult {
            name: CHECK_HAS_ID,
            passed: !is_success || has_id,
        },
        CheckResult {
            name: CHECK_HAS_CREATED_AT,
            passed: !is_success || has_created_at,
        },
        CheckResult {
            name: CHECK_REPLAY_NO_LOCATION,
            passed: plan.expected_status != STATUS_REPLAYED || response.header(LOCATION).is_none(),
        },
    ]
}

fn log_failure(
    plan: &PlannedRequest,
    request: &PostRequest,
    response: Option<&PostResponse>,
    outcome: &IterationOutcome,
) {
    let request_headers: serde_json::Map<String, serde_json::Value> = request
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), json!(value)))
        .collect();
    let detail = json!({
        "vu": plan.vu,
        "iter": plan.iter,
        "type": plan.kind,
        "expectedStatus": plan.expected_status,
        "status": outcome.status,
        "failedChecks": outcome.failed_checks(),
        "reqHeaders": request_headers,
        "resHeaders": response.map(|response| &response.headers),
        "resBody": response.map(|response| truncate(&response.body, FAILURE_BODY_LOG_LIMIT)),
    });
    debug!(detail = %detail, "iteration failed checks");
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_string(),
    }
}
