//! Request builder: turns a seed into a structurally valid quote request.
//!
//! Draw order is fixed: currency, item count, then per item quantity, unit
//! price, tax rate and SKU number, then expiry offset, channel and campaign
//! suffix. Reordering draws changes every body derived from a seed.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::models::{Channel, Currency, Customer, LineItem, Metadata, QuoteRequest};
use crate::rng::{pick, rand_float, rand_int, round2, Mulberry32};

pub const MIN_ITEMS: u32 = 1;
pub const MAX_ITEMS: u32 = 3;
pub const MIN_QUANTITY: u32 = 1;
pub const MAX_QUANTITY: u32 = 10;
pub const MIN_UNIT_PRICE: f64 = 100.0;
pub const MAX_UNIT_PRICE: f64 = 50_000.0;
pub const TAX_RATES: [f64; 2] = [0.0, 0.19];
pub const MIN_EXPIRY_DAYS: u32 = 1;
pub const MAX_EXPIRY_DAYS: u32 = 30;

pub fn build_quote_request(
    seed: u32,
    document_id: &str,
    customer_id: &str,
    generated_at: DateTime<Utc>,
) -> QuoteRequest {
    let mut rng = Mulberry32::new(seed);

    let currency = *pick(&mut rng, &Currency::ALL);
    let item_count = rand_int(&mut rng, MIN_ITEMS, MAX_ITEMS);

    let items = (0..item_count)
        .map(|idx| {
            let quantity = rand_int(&mut rng, MIN_QUANTITY, MAX_QUANTITY);
            let unit_price = round2(rand_float(&mut rng, MIN_UNIT_PRICE, MAX_UNIT_PRICE));
            let tax_rate = *pick(&mut rng, &TAX_RATES);
            let sku = format!("SKU-{:04}", rand_int(&mut rng, 1, 9999));
            LineItem {
                sku,
                name: format!("Item {}", idx + 1),
                quantity,
                unit_price,
                tax_rate,
            }
        })
        .collect();

    let days_ahead = rand_int(&mut rng, MIN_EXPIRY_DAYS, MAX_EXPIRY_DAYS);
    let channel = *pick(&mut rng, &Channel::ALL);
    let campaign = format!("cmp-{:03}", rand_int(&mut rng, 1, 999));

    QuoteRequest {
        document_id: document_id.to_string(),
        customer: Customer {
            id: customer_id.to_string(),
            email: customer_email(customer_id),
        },
        currency,
        items,
        expires_at: expires_at(generated_at, days_ahead),
        metadata: Metadata { channel, campaign },
    }
}

pub fn customer_email(customer_id: &str) -> String {
    format!("customer.{}@example.com", customer_id.to_lowercase())
}

fn expires_at(generated_at: DateTime<Utc>, days_ahead: u32) -> String {
    (generated_at + Duration::days(i64::from(days_ahead)))
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
