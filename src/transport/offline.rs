use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::identifier::{is_uuid_v4, uuid_from};
use crate::transport::{
    PostRequest, PostResponse, Transport, TransportError, CONTENT_TYPE, IDEMPOTENCY_KEY,
    JSON_CONTENT_TYPE, LOCATION, PROBLEM_CONTENT_TYPE,
};

/// In-process stand-in for the quotes endpoint. Keeps an idempotency store
/// keyed by `Idempotency-Key`: first use creates (201 + `Location`), the
/// same body again replays (200), a different body conflicts (409).
#[derive(Debug, Default)]
pub struct OfflineTarget {
    latency: Duration,
    store: Mutex<Store>,
}

#[derive(Debug, Default)]
struct Store {
    next_id: u32,
    entries: HashMap<String, StoredQuote>,
}

#[derive(Debug, Clone)]
struct StoredQuote {
    request: JsonValue,
    response: JsonValue,
}

impl OfflineTarget {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn stored_keys(&self) -> usize {
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    fn respond(&self, request: &PostRequest) -> (u16, Option<String>, JsonValue) {
        let key = match request.header(IDEMPOTENCY_KEY) {
            Some(key) if is_uuid_v4(key) => key.to_string(),
            _ => return problem(400, "BAD_REQUEST", "Idempotency-Key must be a UUID"),
        };
        let body: JsonValue = match serde_json::from_str(&request.body) {
            Ok(body) => body,
            Err(_) => return problem(400, "BAD_REQUEST", "malformed JSON body"),
        };

        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = store.entries.get(&key) {
            if existing.request != body {
                return problem(
                    409,
                    "IDEMPOTENCY_CONFLICT",
                    &format!("Idempotency-Key {} was used with a different body", key),
                );
            }
            return (200, None, existing.response.clone());
        }

        store.next_id = store.next_id.wrapping_add(1);
        let id = uuid_from(store.next_id);
        let response = json!({
            "id": id,
            "documentId": body.get("documentId").cloned().unwrap_or(JsonValue::Null),
            "status": "ISSUED",
            "currency": body.get("currency").cloned().unwrap_or(JsonValue::Null),
            "items": body.get("items").cloned().unwrap_or(JsonValue::Null),
            "expiresAt": body.get("expiresAt").cloned().unwrap_or(JsonValue::Null),
            "createdAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        store.entries.insert(
            key,
            StoredQuote {
                request: body,
                response: response.clone(),
            },
        );
        (201, Some(format!("/api/v1/quotes/{}", id)), response)
    }
}

impl Transport for OfflineTarget {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn post(&self, request: &PostRequest) -> Result<PostResponse, TransportError> {
        let started = Instant::now();
        if self.latency > request.timeout {
            thread::sleep(request.timeout);
            return Err(TransportError::Timeout(request.timeout));
        }
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        let (status, location, body) = self.respond(request);
        let content_type = if status >= 400 {
            PROBLEM_CONTENT_TYPE
        } else {
            JSON_CONTENT_TYPE
        };
        let mut headers = BTreeMap::new();
        headers.insert(CONTENT_TYPE.to_string(), content_type.to_string());
        if let Some(location) = location {
            headers.insert(LOCATION.to_string(), location);
        }

        Ok(PostResponse {
            status,
            headers,
            body: body.to_string(),
            duration: started.elapsed(),
        })
    }
}

fn problem(status: u16, code: &str, message: &str) -> (u16, Option<String>, JsonValue) {
    (status, None, json!({ "code": code, "message": message }))
}
