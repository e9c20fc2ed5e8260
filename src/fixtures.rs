//! Fixed idempotency fixtures for the replay and conflict paths.
//!
//! Both bodies are built once from fixed seeds and serialized once; the
//! registry is read-only afterwards and shared across virtual users.

use chrono::{DateTime, Utc};

use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use crate::generator::build_quote_request;
use crate::models::QuoteRequest;

pub const REPLAY_KEY: &str = "11111111-1111-4111-8111-111111111111";
pub const CONFLICT_KEY: &str = "22222222-2222-4222-8222-222222222222";

pub const REPLAY_SEED: u32 = 12345;
pub const CONFLICT_SEED: u32 = 23456;

const MIN_CONFLICT_QUANTITY: u32 = 1;
const MAX_CONFLICT_QUANTITY: u32 = 100_000;

#[derive(Clone, Debug, PartialEq)]
pub struct Fixture {
    pub label: &'static str,
    pub key: &'static str,
    pub body: QuoteRequest,
    pub payload: String,
}

impl Fixture {
    fn build(
        label: &'static str,
        key: &'static str,
        seed: u32,
        document_id: &str,
        customer_id: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<Self> {
        let body = build_quote_request(seed, document_id, customer_id, generated_at);
        let payload = encode(&body)?;
        Ok(Self {
            label,
            key,
            body,
            payload,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FixtureRegistry {
    pub replay: Fixture,
    pub conflict: Fixture,
}

impl FixtureRegistry {
    pub fn new(generated_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            replay: Fixture::build(
                "replay-prewarm",
                REPLAY_KEY,
                REPLAY_SEED,
                "DOC-REPLAY-000001",
                "CUST-REPLAY",
                generated_at,
            )?,
            conflict: Fixture::build(
                "conflict-prewarm",
                CONFLICT_KEY,
                CONFLICT_SEED,
                "DOC-CONFLICT-000001",
                "CUST-CONFLICT",
                generated_at,
            )?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fixture> {
        [&self.replay, &self.conflict].into_iter()
    }

    /// Conflict fixture body with a coordinate-specific document id and the
    /// first item's quantity bumped by one. Everything else is the fixture's.
    pub fn conflict_variant(&self, coord: Coordinate) -> QuoteRequest {
        let mut body = self.conflict.body.clone();
        body.document_id = format!("DOC-CONFLICT-{}", coord.label());
        if let Some(first) = body.items.first_mut() {
            first.quantity = first
                .quantity
                .saturating_add(1)
                .clamp(MIN_CONFLICT_QUANTITY, MAX_CONFLICT_QUANTITY);
        }
        body
    }
}

pub fn encode(body: &QuoteRequest) -> Result<String> {
    serde_json::to_string(body).map_err(|err| Error::Encode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::is_uuid_v4;

    fn anchor() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn reserved_keys_are_v4_shaped() {
        assert!(is_uuid_v4(REPLAY_KEY));
        assert!(is_uuid_v4(CONFLICT_KEY));
        assert_ne!(REPLAY_KEY, CONFLICT_KEY);
    }

    #[test]
    fn registry_is_identical_for_the_same_anchor() {
        let a = FixtureRegistry::new(anchor()).unwrap();
        let b = FixtureRegistry::new(anchor()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.replay.payload, b.replay.payload);
    }

    #[test]
    fn payload_is_the_serialized_body() {
        let registry = FixtureRegistry::new(anchor()).unwrap();
        for fixture in registry.iter() {
            let parsed: QuoteRequest = serde_json::from_str(&fixture.payload).unwrap();
            assert_eq!(parsed, fixture.body);
        }
        assert_eq!(registry.replay.body.document_id, "DOC-REPLAY-000001");
        assert_eq!(registry.conflict.body.customer.id, "CUST-CONFLICT");
    }

    #[test]
    fn conflict_variant_changes_document_and_first_quantity_only() {
        let registry = FixtureRegistry::new(anchor()).unwrap();
        let variant = registry.conflict_variant(Coordinate::new(2, 21));
        let base = &registry.conflict.body;

        assert_eq!(variant.document_id, "DOC-CONFLICT-002-000021");
        assert_eq!(variant.items[0].quantity, base.items[0].quantity + 1);
        assert_eq!(variant.items[1], base.items[1]);
        assert_eq!(variant.currency, base.currency);
        assert_eq!(variant.metadata, base.metadata);
        assert_eq!(variant.expires_at, base.expires_at);
        assert_ne!(encode(&variant).unwrap(), registry.conflict.payload);
    }

    #[test]
    fn conflict_variant_does_not_mutate_fixture() {
        let registry = FixtureRegistry::new(anchor()).unwrap();
        let before = registry.conflict.clone();
        let _ = registry.conflict_variant(Coordinate::new(1, 1));
        assert_eq!(registry.conflict, before);
    }

    #[test]
    fn conflict_quantity_is_clamped() {
        let mut registry = FixtureRegistry::new(anchor()).unwrap();
        registry.conflict.body.items[0].quantity = MAX_CONFLICT_QUANTITY;
        let variant = registry.conflict_variant(Coordinate::new(1, 1));
        assert_eq!(variant.items[0].quantity, MAX_CONFLICT_QUANTITY);

        registry.conflict.body.items[0].quantity = 0;
        let variant = registry.conflict_variant(Coordinate::new(1, 1));
        assert_eq!(variant.items[0].quantity, MIN_CONFLICT_QUANTITY);
    }
}
