//! Bidirectional conversion between generic record maps and XML documents.
//!
//! Outgoing responses render any record (or list of records) as a
//! pretty-printed document; incoming request bodies parse one level deep
//! back into a record map. Neither direction enforces schema rules.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::Value;
use thiserror::Error;

use crate::record::JsonMap;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("XML write error: {0}")]
    Write(String),
}

/// Renders a single record as a pretty-printed XML document.
///
/// Each field becomes a child element of `root`. Null values are omitted,
/// nested maps go one level deep, and list entries become `item` children.
pub fn record_to_xml(record: &JsonMap, root: &str) -> Result<String, CodecError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_map(&mut writer, root, record)?;
    into_document(writer)
}

/// Renders a list of records, each wrapped in `item_root`, inside a
/// `list_root` container element.
pub fn records_to_xml(
    records: &[JsonMap],
    list_root: &str,
    item_root: &str,
) -> Result<String, CodecError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Start(BytesStart::new(list_root)))
        .map_err(write_err)?;
    for record in records {
        write_map(&mut writer, item_root, record)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(list_root)))
        .map_err(write_err)?;
    into_document(writer)
}

fn into_document(writer: Writer<Vec<u8>>) -> Result<String, CodecError> {
    String::from_utf8(writer.into_inner()).map_err(|e| CodecError::Write(e.to_string()))
}

fn write_err(e: impl std::fmt::Display) -> CodecError {
    CodecError::Write(e.to_string())
}

fn write_map(writer: &mut Writer<Vec<u8>>, name: &str, map: &JsonMap) -> Result<(), CodecError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(write_err)?;
    for (key, value) in map {
        write_field(writer, key, value)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_err)
}

fn write_field(writer: &mut Writer<Vec<u8>>, key: &str, value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Null => Ok(()),
        Value::Object(nested) => {
            writer
                .write_event(Event::Start(BytesStart::new(key)))
                .map_err(write_err)?;
            for (sub_key, sub_value) in nested {
                if !sub_value.is_null() {
                    write_scalar(writer, sub_key, sub_value)?;
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new(key)))
                .map_err(write_err)
        }
        Value::Array(items) => {
            writer
                .write_event(Event::Start(BytesStart::new(key)))
                .map_err(write_err)?;
            for item in items {
                match item {
                    Value::Object(entries) => {
                        writer
                            .write_event(Event::Start(BytesStart::new("item")))
                            .map_err(write_err)?;
                        for (sub_key, sub_value) in entries {
                            if !sub_value.is_null() {
                                write_scalar(writer, sub_key, sub_value)?;
                            }
                        }
                        writer
                            .write_event(Event::End(BytesEnd::new("item")))
                            .map_err(write_err)?;
                    }
                    scalar => write_scalar(writer, "item", scalar)?,
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new(key)))
                .map_err(write_err)
        }
        scalar => write_scalar(writer, key, scalar),
    }
}

fn write_scalar(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<(), CodecError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(write_err)?;
    writer
        .write_event(Event::Text(BytesText::new(&scalar_text(value))))
        .map_err(write_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_err)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_err(e: impl std::fmt::Display) -> CodecError {
    CodecError::Parse(e.to_string())
}

/// Parses an incoming XML document one level deep into a record map.
///
/// Text children become trimmed strings, except `guests`, which parses as
/// an integer and falls back to 1 on non-integer text. A child whose
/// content is further elements becomes a one-level nested map. Children
/// with neither text nor elements are omitted.
pub fn xml_to_record(xml: &str) -> Result<JsonMap, CodecError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event().map_err(parse_err)? {
            Event::Start(_) => break,
            Event::Empty(_) => return Ok(JsonMap::new()),
            Event::Eof => return Err(CodecError::Parse("document has no root element".into())),
            _ => {}
        }
    }

    let mut record = JsonMap::new();
    loop {
        match reader.read_event().map_err(parse_err)? {
            Event::Start(child) => {
                let tag = String::from_utf8_lossy(child.name().as_ref()).into_owned();
                if let Some(value) = read_field(&mut reader, &tag)? {
                    record.insert(tag, value);
                }
            }
            // Self-closing children carry no text and are omitted.
            Event::Empty(_) => {}
            Event::End(_) => break,
            Event::Eof => {
                return Err(CodecError::Parse("unexpected end of document".into()));
            }
            _ => {}
        }
    }

    Ok(record)
}

/// Consumes events through the closing tag of the field named `tag`.
fn read_field(reader: &mut Reader<&[u8]>, tag: &str) -> Result<Option<Value>, CodecError> {
    let mut text = String::new();
    let mut nested: Option<JsonMap> = None;

    loop {
        match reader.read_event().map_err(parse_err)? {
            Event::Text(t) => {
                text.push_str(&t.unescape().map_err(parse_err)?);
            }
            Event::Start(sub) => {
                let sub_tag = String::from_utf8_lossy(sub.name().as_ref()).into_owned();
                let sub_text = reader.read_text(sub.name()).map_err(parse_err)?;
                nested
                    .get_or_insert_with(JsonMap::new)
                    .insert(sub_tag, Value::String(sub_text.trim().to_string()));
            }
            Event::Empty(_) => {}
            Event::End(end) if end.name().as_ref() == tag.as_bytes() => break,
            Event::Eof => {
                return Err(CodecError::Parse(format!("unclosed element <{tag}>")));
            }
            _ => {}
        }
    }

    let text = text.trim().to_string();
    if !text.is_empty() {
        if tag == "guests" {
            let guests = text.parse::<i64>().unwrap_or(1);
            return Ok(Some(Value::Number(guests.into())));
        }
        return Ok(Some(Value::String(text)));
    }
    Ok(nested.map(Value::Object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> JsonMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn record_renders_with_one_element_per_field() {
        let record = map(json!({
            "guest_name": "Ana Cruz",
            "guests": 2,
            "resort_name": "Blue Horizon Resort",
        }));

        let xml = record_to_xml(&record, "reservation").unwrap();
        assert!(xml.starts_with("<reservation>"));
        assert!(xml.contains("<guest_name>Ana Cruz</guest_name>"));
        assert!(xml.contains("<guests>2</guests>"));
        assert!(xml.trim_end().ends_with("</reservation>"));
    }

    #[test]
    fn null_fields_are_omitted_entirely() {
        let record = map(json!({ "guest_name": "Ana", "phone": null }));
        let xml = record_to_xml(&record, "reservation").unwrap();
        assert!(!xml.contains("phone"));
    }

    #[test]
    fn nested_maps_render_one_level_deep() {
        let record = map(json!({
            "guest_name": "Ana",
            "address": { "municipality": "El Nido", "region": "Palawan" },
        }));
        let xml = record_to_xml(&record, "reservation").unwrap();
        assert!(xml.contains("<address>"));
        assert!(xml.contains("<municipality>El Nido</municipality>"));
        assert!(xml.contains("<region>Palawan</region>"));
    }

    #[test]
    fn lists_render_as_item_children() {
        let record = map(json!({
            "supported_formats": ["json", "xml"],
            "endpoints": [{ "method": "GET", "path": "/reservations" }],
        }));
        let xml = record_to_xml(&record, "health").unwrap();
        assert!(xml.contains("<item>json</item>"));
        assert!(xml.contains("<item>xml</item>"));
        assert!(xml.contains("<method>GET</method>"));
        assert!(xml.contains("<path>/reservations</path>"));
    }

    #[test]
    fn text_content_is_escaped() {
        let record = map(json!({ "guest_name": "Cruz & Reyes <family>" }));
        let xml = record_to_xml(&record, "reservation").unwrap();
        assert!(xml.contains("Cruz &amp; Reyes &lt;family&gt;"));
    }

    #[test]
    fn list_of_records_wraps_in_a_container() {
        let records = vec![
            map(json!({ "guest_name": "Ana Cruz" })),
            map(json!({ "guest_name": "Ben Reyes" })),
        ];
        let xml = records_to_xml(&records, "reservations", "reservation").unwrap();
        assert!(xml.starts_with("<reservations>"));
        assert_eq!(xml.matches("<reservation>").count(), 2);
        assert!(xml.contains("Ben Reyes"));
    }

    #[test]
    fn empty_list_renders_an_empty_container() {
        let xml = records_to_xml(&[], "reservations", "reservation").unwrap();
        assert!(xml.starts_with("<reservations>"));
        assert!(xml.trim_end().ends_with("</reservations>"));
        assert!(!xml.contains("<reservation>"));
    }

    #[test]
    fn parses_scalar_fields_with_trimming() {
        let xml = r#"
            <reservation>
                <guest_name>  Ana Cruz </guest_name>
                <email>ana@example.com</email>
                <guests>2</guests>
            </reservation>
        "#;
        let record = xml_to_record(xml).unwrap();
        assert_eq!(record["guest_name"], "Ana Cruz");
        assert_eq!(record["email"], "ana@example.com");
        assert_eq!(record["guests"], json!(2));
    }

    #[test]
    fn non_integer_guests_defaults_to_one() {
        let record = xml_to_record("<reservation><guests>several</guests></reservation>").unwrap();
        assert_eq!(record["guests"], json!(1));
    }

    #[test]
    fn nested_elements_become_a_one_level_map() {
        let xml = r#"
            <reservation>
                <guest_name>Ana</guest_name>
                <address>
                    <municipality>El Nido</municipality>
                    <region>Palawan</region>
                </address>
            </reservation>
        "#;
        let record = xml_to_record(xml).unwrap();
        assert_eq!(record["address"]["municipality"], "El Nido");
        assert_eq!(record["address"]["region"], "Palawan");
    }

    #[test]
    fn childless_textless_elements_are_omitted() {
        let record =
            xml_to_record("<reservation><phone/><guest_name>Ana</guest_name></reservation>")
                .unwrap();
        assert!(!record.contains_key("phone"));
        assert_eq!(record["guest_name"], "Ana");
    }

    #[test]
    fn escaped_text_is_unescaped_on_parse() {
        let record = xml_to_record(
            "<reservation><guest_name>Cruz &amp; Reyes</guest_name></reservation>",
        )
        .unwrap();
        assert_eq!(record["guest_name"], "Cruz & Reyes");
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let result = xml_to_record("<reservation><guest_name>Ana</reservation>");
        assert!(matches!(result, Err(CodecError::Parse(_))));
    }

    #[test]
    fn empty_input_is_a_parse_error() {
        let result = xml_to_record("   ");
        assert!(matches!(result, Err(CodecError::Parse(_))));
    }

    #[test]
    fn round_trip_preserves_scalar_fields() {
        let record = map(json!({
            "guest_name": "Ana Cruz",
            "email": "ana@example.com",
            "resort_name": "Blue Horizon Resort",
            "checkin_date": "2025-03-01",
            "checkout_date": "2025-03-05",
            "guests": 2,
        }));

        let xml = record_to_xml(&record, "reservation").unwrap();
        let parsed = xml_to_record(&xml).unwrap();

        assert_eq!(parsed["guest_name"], "Ana Cruz");
        assert_eq!(parsed["resort_name"], "Blue Horizon Resort");
        assert_eq!(parsed["guests"], json!(2));
        assert_eq!(parsed.len(), record.len());
    }
}
