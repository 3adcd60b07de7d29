use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use serde_json::Value;
use std::io::Cursor;

use csrmatch_lib::{MatchRecord, Ngo};

/// Child element name for items of a list field.
fn list_item_tag(list_tag: &str) -> &str {
    match list_tag {
        "strengths" => "strength",
        "risk_factors" => "risk",
        "issues" => "issue",
        "sdgs" => "sdg",
        "focus_areas" => "focus_area",
        "schedule_vii_categories" => "category",
        "preferred_geographies" => "location",
        "districts" => "district",
        "match_ids" => "match_id",
        other => other,
    }
}

/// Write one JSON value as an element named `tag`. Nulls produce nothing.
fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &Value,
) -> Result<(), quick_xml::Error> {
    let scalar = match value {
        Value::Null => return Ok(()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    };

    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    match (scalar, value) {
        (Some(text), _) => {
            writer.write_event(Event::Text(BytesText::new(&text)))?;
        }
        (None, Value::Array(items)) => {
            let child = list_item_tag(tag);
            for item in items {
                write_element(writer, child, item)?;
            }
        }
        (None, Value::Object(fields)) => {
            for (key, field) in fields {
                write_element(writer, key, field)?;
            }
        }
        (None, _) => {}
    }
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Serialize a slice of Serialize items into an XML string.
fn items_to_xml<T: Serialize>(root_tag: &str, item_tag: &str, items: &[T]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    if items.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(root_tag)))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new(root_tag)))?;
        for item in items {
            let val = serde_json::to_value(item)?;
            write_element(&mut writer, item_tag, &val)?;
        }
        writer.write_event(Event::End(BytesEnd::new(root_tag)))?;
    }

    let buf = writer.into_inner().into_inner();
    Ok(String::from_utf8(buf)?)
}

pub fn matches_to_xml(matches: &[MatchRecord]) -> Result<String> {
    items_to_xml("matches", "match", matches)
}

pub fn ngos_to_xml(ngos: &[Ngo]) -> Result<String> {
    items_to_xml("ngos", "ngo", ngos)
}

pub fn summary_to_xml<T: Serialize>(root_tag: &str, item_tag: &str, items: &[T]) -> Result<String> {
    items_to_xml(root_tag, item_tag, items)
}
