mod common;

use predicates::prelude::PredicateBooleanExt;
use predicates::str::{contains, diff};

const ANCHOR: &str = "2026-03-01T12:00:00Z";

#[test]
fn normal_coordinate_is_reproducible() {
    let mut cmd = common::loadgen();
    cmd.args(["preview", "--vu", "7", "--iter", "42", "--generated-at", ANCHOR]);
    cmd.assert()
        .success()
        .stdout(contains("vu=7 iter=42 kind=normal expected=201\n"))
        .stdout(contains(
            "Idempotency-Key: e489ed97-49b6-44ba-9e59-a705375f3726\n",
        ))
        .stdout(contains("X-Correlation-Id: loadgen-007-000042\n"))
        .stdout(contains("\"documentId\": \"DOC-007-000042\""))
        .stdout(contains("\"sku\": \"SKU-8600\""))
        .stdout(contains("\"currency\": \"EUR\""))
        .stdout(contains("\"channel\": \"mobile\""))
        .stdout(contains("\"campaign\": \"cmp-304\""))
        .stdout(contains("\"expiresAt\": \"2026-03-20T12:00:00.000Z\""));
}

#[test]
fn replay_coordinate_reuses_fixture() {
    let mut cmd = common::loadgen();
    cmd.args(["preview", "--vu", "1", "--iter", "6", "--generated-at", ANCHOR]);
    cmd.assert()
        .success()
        .stdout(contains("kind=replay expected=200\n"))
        .stdout(contains(
            "Idempotency-Key: 11111111-1111-4111-8111-111111111111\n",
        ))
        .stdout(contains("\"documentId\": \"DOC-REPLAY-000001\""))
        .stdout(contains("\"expiresAt\": \"2026-03-04T12:00:00.000Z\""));
}

#[test]
fn conflict_coordinate_mutates_fixture() {
    let mut cmd = common::loadgen();
    cmd.args(["preview", "--vu", "2", "--iter", "21", "--generated-at", ANCHOR]);
    cmd.assert()
        .success()
        .stdout(contains("kind=conflict expected=409\n"))
        .stdout(contains(
            "Idempotency-Key: 22222222-2222-4222-8222-222222222222\n",
        ))
        .stdout(contains("\"documentId\": \"DOC-CONFLICT-002-000021\""))
        .stdout(contains("\"quantity\": 9"));
}

#[test]
fn summary_preview_lists_classifications() {
    let expected = concat!(
        "vu=1 iter=5 kind=normal expected=201\n",
        "vu=1 iter=6 kind=replay expected=200\n",
        "vu=1 iter=7 kind=normal expected=201\n",
    );
    let mut cmd = common::loadgen();
    cmd.args([
        "preview",
        "--vu",
        "1",
        "--iter",
        "5",
        "--count",
        "3",
        "--format",
        "summary",
    ]);
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn zero_mix_from_env_makes_every_request_normal() {
    let mut cmd = common::loadgen();
    cmd.env("REPLAY_PCT", "0").env("CONFLICT_PCT", "0");
    cmd.args(["preview", "--vu", "1", "--iter", "6", "--format", "summary"]);
    cmd.assert()
        .success()
        .stdout(diff("vu=1 iter=6 kind=normal expected=201\n"));
}

#[test]
fn json_preview_carries_wire_body() {
    let mut cmd = common::loadgen();
    cmd.args([
        "preview",
        "--vu",
        "7",
        "--iter",
        "42",
        "--generated-at",
        ANCHOR,
        "--format",
        "json",
    ]);
    cmd.assert()
        .success()
        .stdout(contains("\"idempotencyKey\": \"e489ed97-49b6-44ba-9e59-a705375f3726\""))
        .stdout(contains("\"expectedStatus\": 201"))
        .stdout(contains("\"payload\"").not());
}
