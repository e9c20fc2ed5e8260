use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub document_id: String,
    pub customer: Customer,
    pub currency: Currency,
    pub items: Vec<LineItem>,
    pub expires_at: String,
    pub metadata: Metadata,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Customer {
    pub id: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub tax_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Metadata {
    pub channel: Channel,
    pub campaign: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Currency {
    #[serde(rename = "CLP")]
    Clp,
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Clp, Currency::Usd, Currency::Eur];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Clp => "CLP",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Web,
    Mobile,
    Partner,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Web, Channel::Mobile, Channel::Partner];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Web => "web",
            Channel::Mobile => "mobile",
            Channel::Partner => "partner",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Harness settings as read from a `--config` file. Every field is optional;
/// flags and environment variables override whatever is set here.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub endpoint: Option<String>,
    pub p95_ms: Option<f64>,
    pub replay_pct: Option<f64>,
    pub conflict_pct: Option<f64>,
    pub test_mode: Option<String>,
    pub load_stages: Option<String>,
    pub debug: Option<bool>,
    pub think_time_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub setup_timeout_ms: Option<u64>,
    pub generated_at: Option<String>,
    pub smoke_vus: Option<u32>,
    pub smoke_duration: Option<String>,
    pub offline: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QuoteRequest {
        QuoteRequest {
            document_id: "DOC-001-000002".to_string(),
            customer: Customer {
                id: "CUST-001".to_string(),
                email: "customer.cust-001@example.com".to_string(),
            },
            currency: Currency::Clp,
            items: vec![LineItem {
                sku: "SKU-0042".to_string(),
                name: "Item 1".to_string(),
                quantity: 3,
                unit_price: 1234.5,
                tax_rate: 0.19,
            }],
            expires_at: "2026-01-02T03:04:05.000Z".to_string(),
            metadata: Metadata {
                channel: Channel::Partner,
                campaign: "cmp-007".to_string(),
            },
        }
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["documentId"], "DOC-001-000002");
        assert_eq!(value["currency"], "CLP");
        assert_eq!(value["expiresAt"], "2026-01-02T03:04:05.000Z");
        assert_eq!(value["items"][0]["unitPrice"], 1234.5);
        assert_eq!(value["items"][0]["taxRate"], 0.19);
        assert_eq!(value["metadata"]["channel"], "partner");
        assert_eq!(value["customer"]["email"], "customer.cust-001@example.com");
    }

    #[test]
    fn parses_integral_tax_rate() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["items"][0]["taxRate"] = serde_json::json!(0);
        let parsed: QuoteRequest = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.items[0].tax_rate, 0.0);
    }

    #[test]
    fn file_config_rejects_unknown_keys() {
        let err = toml::from_str::<FileConfig>("replay = 2").unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }
}
