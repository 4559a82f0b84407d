//! Schema-driven validation with domain rules for reservation records.
//!
//! The structural part is driven by a declarative schema loaded from a JSON
//! file at startup (required fields plus per-field type / length / minimum /
//! format constraints). On top of that sit the domain rules: Philippine
//! phone format and the approved resort / payment gateway enumerations.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::record::{coerce_guests, JsonMap};

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const PHONE_PATTERN: &str = r"^09\d{9}$";

/// Bundled copy of the schema file, used by tests and benches.
const BUILTIN_SCHEMA: &str = include_str!("../schema/reservation_schema.json");

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("failed to read schema file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse schema file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A validation failure, carrying the human-readable field/rule message.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Accepted JSON types for one schema property, e.g. `"string"` or
/// `["string", "number"]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    One(String),
    Many(Vec<String>),
}

impl TypeSpec {
    fn allows(&self, value: &Value) -> bool {
        match self {
            TypeSpec::One(name) => type_matches(name, value),
            TypeSpec::Many(names) => names.iter().any(|name| type_matches(name, value)),
        }
    }

    fn describe(&self) -> String {
        match self {
            TypeSpec::One(name) => name.clone(),
            TypeSpec::Many(names) => names.join(" or "),
        }
    }
}

fn type_matches(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.as_i64().is_some() || value.as_u64().is_some(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => false,
    }
}

/// Constraints for a single schema property.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type", default)]
    pub type_spec: Option<TypeSpec>,
    #[serde(rename = "minLength", default)]
    pub min_length: Option<u64>,
    #[serde(default)]
    pub minimum: Option<i64>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Declarative reservation schema loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationSchema {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub properties: BTreeMap<String, FieldSpec>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl ReservationSchema {
    /// Loads the schema from disk. Missing or corrupt files are fatal.
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let text = fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SchemaError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The schema bundled with the crate.
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_SCHEMA).expect("bundled schema is valid JSON")
    }
}

/// Fixed allow-lists for resorts and payment gateways.
#[derive(Debug, Clone)]
pub struct ApprovedLists {
    pub resorts: Vec<String>,
    pub gateways: Vec<String>,
}

impl Default for ApprovedLists {
    fn default() -> Self {
        Self {
            resorts: [
                "Arcadia Beach Resort",
                "Kuya Boy Beach Resort",
                "Blue Horizon Resort",
                "White Sand Paradise",
                "Mountain View Villa",
            ]
            .map(String::from)
            .to_vec(),
            gateways: [
                "Credit Card",
                "GCash",
                "PayPal",
                "Bank Transfer",
                "BANCO DE ORO",
                "Metrobank",
                "BDO",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Validates candidate record maps against the schema plus domain rules.
pub struct Validator {
    schema: ReservationSchema,
    approved: ApprovedLists,
    email_re: Regex,
    phone_re: Regex,
}

impl Validator {
    pub fn new(schema: ReservationSchema, approved: ApprovedLists) -> Self {
        Self {
            schema,
            approved,
            email_re: Regex::new(EMAIL_PATTERN).expect("email pattern compiles"),
            phone_re: Regex::new(PHONE_PATTERN).expect("phone pattern compiles"),
        }
    }

    pub fn approved(&self) -> &ApprovedLists {
        &self.approved
    }

    /// Validates a candidate record map.
    ///
    /// Pure over its input: coercions run against a private working copy.
    /// Callers are expected to have normalized the payload already; the
    /// re-trimming here is a safety net.
    pub fn validate(&self, record: &JsonMap) -> Result<(), ValidationError> {
        let mut data = record.clone();

        if let Some(id) = data.get("id") {
            if !id.is_string() {
                let stringified = id.to_string();
                data.insert("id".to_string(), Value::String(stringified));
            }
        }

        if let Some(guests) = data.get("guests") {
            match coerce_guests(guests) {
                Some(n) => {
                    data.insert("guests".to_string(), Value::Number(n.into()));
                }
                None => {
                    return Err(ValidationError::new("guests must be a valid integer"));
                }
            }
        }

        self.check_phone(&data)?;
        self.check_enumeration(&data, "resort_name", &self.approved.resorts)?;
        self.check_enumeration(&data, "payment_gateway", &self.approved.gateways)?;
        self.check_schema(&data)
    }

    fn check_phone(&self, data: &JsonMap) -> Result<(), ValidationError> {
        if let Some(phone) = data.get("phone").and_then(Value::as_str) {
            let phone = phone.trim();
            if !phone.is_empty() && !self.phone_re.is_match(phone) {
                return Err(ValidationError::new(
                    "phone must be in Philippine format: 11 digits starting with 09 \
                     (e.g., 09171234567)",
                ));
            }
        }
        Ok(())
    }

    fn check_enumeration(
        &self,
        data: &JsonMap,
        field: &str,
        allowed: &[String],
    ) -> Result<(), ValidationError> {
        if let Some(value) = data.get(field).and_then(Value::as_str) {
            let value = value.trim();
            if !value.is_empty() && !allowed.iter().any(|entry| entry == value) {
                return Err(ValidationError::new(format!(
                    "{field} must be one of: {}",
                    allowed.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn check_schema(&self, data: &JsonMap) -> Result<(), ValidationError> {
        for field in &self.schema.required {
            match data.get(field) {
                None | Some(Value::Null) => {
                    return Err(ValidationError::new(format!(
                        "schema validation failed at {field}: '{field}' is a required property"
                    )));
                }
                Some(Value::String(s)) if s.trim().is_empty() => {
                    return Err(ValidationError::new(format!(
                        "schema validation failed at {field}: must not be empty"
                    )));
                }
                Some(_) => {}
            }
        }

        for (field, spec) in &self.schema.properties {
            let Some(value) = data.get(field) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            if let Some(type_spec) = &spec.type_spec {
                if !type_spec.allows(value) {
                    return Err(ValidationError::new(format!(
                        "schema validation failed at {field}: expected {}",
                        type_spec.describe()
                    )));
                }
            }

            if let (Some(min_length), Some(s)) = (spec.min_length, value.as_str()) {
                if (s.trim().chars().count() as u64) < min_length {
                    return Err(ValidationError::new(format!(
                        "schema validation failed at {field}: shorter than \
                         minimum length {min_length}"
                    )));
                }
            }

            if let (Some(minimum), Some(n)) = (spec.minimum, value.as_i64()) {
                if n < minimum {
                    return Err(ValidationError::new(format!(
                        "schema validation failed at {field}: must be at least {minimum}"
                    )));
                }
            }

            if spec.format.as_deref() == Some("email") {
                if let Some(s) = value.as_str() {
                    if !self.email_re.is_match(s.trim()) {
                        return Err(ValidationError::new(format!(
                            "schema validation failed at {field}: not a valid email address"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn validator() -> Validator {
        Validator::new(ReservationSchema::builtin(), ApprovedLists::default())
    }

    fn valid_record() -> JsonMap {
        match json!({
            "id": 1,
            "guest_name": "Ana Cruz",
            "email": "ana@example.com",
            "phone": "",
            "street_address": "",
            "municipality": "",
            "region": "",
            "country": "",
            "resort_name": "Blue Horizon Resort",
            "checkin_date": "2025-03-01",
            "checkout_date": "2025-03-05",
            "guests": 2,
            "payment_gateway": "",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn accepts_a_fully_valid_record() {
        assert_eq!(validator().validate(&valid_record()), Ok(()));
    }

    #[test_case("09171234567", true; "valid mobile number")]
    #[test_case("", true; "empty phone is optional")]
    #[test_case("123456", false; "too short and wrong prefix")]
    #[test_case("091712345678", false; "twelve digits")]
    #[test_case("0917-123-4567", false; "separators rejected")]
    #[test_case("63171234567", false; "wrong prefix")]
    fn phone_rules(phone: &str, ok: bool) {
        let mut record = valid_record();
        record.insert("phone".to_string(), json!(phone));
        assert_eq!(validator().validate(&record).is_ok(), ok);
    }

    #[test_case("Arcadia Beach Resort", true)]
    #[test_case("Kuya Boy Beach Resort", true)]
    #[test_case("Blue Horizon Resort", true)]
    #[test_case("White Sand Paradise", true)]
    #[test_case("Mountain View Villa", true)]
    #[test_case("Random Resort", false)]
    #[test_case("blue horizon resort", false; "match is case sensitive")]
    fn resort_enumeration(resort: &str, ok: bool) {
        let mut record = valid_record();
        record.insert("resort_name".to_string(), json!(resort));
        assert_eq!(validator().validate(&record).is_ok(), ok);
    }

    #[test_case("GCash", true)]
    #[test_case("BDO", true)]
    #[test_case("BANCO DE ORO", true)]
    #[test_case("", true; "empty gateway is optional")]
    #[test_case("Bitcoin", false)]
    fn gateway_enumeration(gateway: &str, ok: bool) {
        let mut record = valid_record();
        record.insert("payment_gateway".to_string(), json!(gateway));
        assert_eq!(validator().validate(&record).is_ok(), ok);
    }

    #[test]
    fn rejection_message_lists_approved_resorts() {
        let mut record = valid_record();
        record.insert("resort_name".to_string(), json!("Random Resort"));
        let err = validator().validate(&record).unwrap_err();
        assert!(err.0.contains("resort_name must be one of"));
        assert!(err.0.contains("Mountain View Villa"));
    }

    #[test_case("guest_name")]
    #[test_case("email")]
    #[test_case("resort_name")]
    #[test_case("checkin_date")]
    #[test_case("checkout_date")]
    #[test_case("guests")]
    fn missing_required_field_fails(field: &str) {
        let mut record = valid_record();
        record.remove(field);
        let err = validator().validate(&record).unwrap_err();
        assert!(err.0.contains(field), "message should name {field}: {err}");
    }

    #[test]
    fn empty_required_string_fails() {
        let mut record = valid_record();
        record.insert("guest_name".to_string(), json!("   "));
        assert!(validator().validate(&record).is_err());
    }

    #[test_case("ana@example.com", true)]
    #[test_case("a.b-c@mail.example.co", true)]
    #[test_case("not-an-email", false)]
    #[test_case("missing@domain", false)]
    #[test_case("two@@example.com", false)]
    fn email_shape(email: &str, ok: bool) {
        let mut record = valid_record();
        record.insert("email".to_string(), json!(email));
        assert_eq!(validator().validate(&record).is_ok(), ok);
    }

    #[test]
    fn unparseable_guests_is_a_hard_failure() {
        let mut record = valid_record();
        record.insert("guests".to_string(), json!("three"));
        let err = validator().validate(&record).unwrap_err();
        assert_eq!(err.0, "guests must be a valid integer");
    }

    #[test_case(0, false)]
    #[test_case(-1, false)]
    #[test_case(1, true)]
    #[test_case(12, true)]
    fn guests_minimum(guests: i64, ok: bool) {
        let mut record = valid_record();
        record.insert("guests".to_string(), json!(guests));
        assert_eq!(validator().validate(&record).is_ok(), ok);
    }

    #[test]
    fn guests_supplied_as_numeric_string_is_coerced() {
        let mut record = valid_record();
        record.insert("guests".to_string(), json!("4"));
        assert_eq!(validator().validate(&record), Ok(()));
    }

    #[test]
    fn validation_does_not_mutate_the_input() {
        let mut record = valid_record();
        record.insert("guests".to_string(), json!("4"));
        let before = record.clone();
        validator().validate(&record).unwrap();
        assert_eq!(record, before);
    }

    #[test]
    fn builtin_schema_names_the_required_fields() {
        let schema = ReservationSchema::builtin();
        assert_eq!(schema.title, "Resort Reservation");
        assert_eq!(schema.required.len(), 6);
        assert!(schema.properties.contains_key("guests"));
    }
}
