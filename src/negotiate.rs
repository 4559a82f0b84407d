//! Content negotiation: which format to parse requests as, and which format
//! to serialize responses in.

use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use serde_json::Value;

use crate::error::ApiError;
use crate::record::JsonMap;
use crate::xml;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Xml,
}

/// Response format: `format` query parameter first, then the Accept header,
/// defaulting to JSON.
pub fn response_format(query: &HashMap<String, String>, headers: &HeaderMap) -> BodyFormat {
    if let Some(format) = query.get("format") {
        match format.to_ascii_lowercase().as_str() {
            "xml" => return BodyFormat::Xml,
            "json" => return BodyFormat::Json,
            _ => {}
        }
    }

    let accept = header_value(headers, header::ACCEPT);
    if accept.contains("application/xml") || accept.contains("text/xml") {
        return BodyFormat::Xml;
    }
    if accept.contains("application/json") {
        return BodyFormat::Json;
    }

    BodyFormat::Json
}

/// Request body format: XML whenever the Content-Type mentions it.
pub fn payload_format(headers: &HeaderMap) -> BodyFormat {
    if header_value(headers, header::CONTENT_TYPE).contains("xml") {
        BodyFormat::Xml
    } else {
        BodyFormat::Json
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Decodes a request body into a record map in the given format.
pub fn parse_body(format: BodyFormat, body: &[u8]) -> Result<JsonMap, ApiError> {
    match format {
        BodyFormat::Xml => {
            let text = std::str::from_utf8(body)
                .map_err(|e| ApiError::Parse(format!("request body is not valid UTF-8: {e}")))?;
            Ok(xml::xml_to_record(text)?)
        }
        BodyFormat::Json => {
            if body.is_empty() {
                return Err(ApiError::Parse("invalid or empty request body".into()));
            }
            let value: Value = serde_json::from_slice(body)
                .map_err(|e| ApiError::Parse(format!("JSON parse error: {e}")))?;
            match value {
                Value::Object(map) if !map.is_empty() => Ok(map),
                _ => Err(ApiError::Parse("invalid or empty request body".into())),
            }
        }
    }
}
