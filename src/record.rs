//! Reservation record types and wire-payload normalization.
//!
//! Incoming payloads arrive as loosely-typed JSON maps (from either the JSON
//! or the XML decoder); they are normalized and validated in map form, and
//! converted into the typed [`Reservation`] only once validation has passed.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Generic record map used at the wire-parsing boundary.
pub type JsonMap = serde_json::Map<String, Value>;

/// String-valued fields that get trimmed during normalization.
pub const STRING_FIELDS: &[&str] = &[
    "guest_name",
    "email",
    "phone",
    "street_address",
    "municipality",
    "region",
    "country",
    "resort_name",
    "checkin_date",
    "checkout_date",
    "payment_gateway",
];

/// Optional fields that default to an empty string when absent.
pub const OPTIONAL_FIELDS: &[&str] = &[
    "phone",
    "street_address",
    "municipality",
    "region",
    "country",
    "payment_gateway",
];

/// One stored reservation.
///
/// `id`, `created_at` and `updated_at` are assigned by the store; everything
/// else comes from the client payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reservation {
    #[serde(deserialize_with = "lenient_id")]
    pub id: u64,
    pub guest_name: String,
    pub email: String,
    pub phone: String,
    pub street_address: String,
    pub municipality: String,
    pub region: String,
    pub country: String,
    pub resort_name: String,
    pub checkin_date: String,
    pub checkout_date: String,
    pub guests: i64,
    pub payment_gateway: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Reservation {
    /// Map view of the record, in stable (alphabetical) key order.
    pub fn to_map(&self) -> JsonMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => JsonMap::new(),
        }
    }

    /// Case-insensitive substring search over the searchable fields.
    pub fn matches_query(&self, query_lower: &str) -> bool {
        self.guest_name.to_lowercase().contains(query_lower)
            || self.email.to_lowercase().contains(query_lower)
            || self.resort_name.to_lowercase().contains(query_lower)
    }
}

/// Accepts legacy stringified integer IDs alongside plain integers.
fn lenient_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom("id must be a non-negative integer")),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom("id is not a numeric string")),
        _ => Err(serde::de::Error::custom("id must be an integer")),
    }
}

/// Trims every string field and coerces `guests` toward an integer.
///
/// Non-string scalars supplied for string fields are rendered via their
/// string representation before trimming. A `guests` value that cannot be
/// coerced is left untouched for the validator to reject.
pub fn normalize_payload(mut payload: JsonMap) -> JsonMap {
    for &field in STRING_FIELDS {
        if let Some(value) = payload.get_mut(field) {
            if value.is_null() {
                continue;
            }
            let trimmed = match value {
                Value::String(s) => s.trim().to_string(),
                ref other => other.to_string().trim().to_string(),
            };
            *value = Value::String(trimmed);
        }
    }

    if let Some(guests) = payload.get("guests") {
        if let Some(n) = coerce_guests(guests) {
            payload.insert("guests".to_string(), Value::Number(n.into()));
        }
    }

    payload
}

/// Integer coercion shared by normalization and validation.
pub fn coerce_guests(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
