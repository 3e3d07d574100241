//! Interpreting model responses
//!
//! Responses arrive already stripped of Markdown fences and reasoning
//! blocks. Models still wrap JSON in prose now and then, so parsing first
//! tries the whole text and then the outermost bracketed span.

use lorekeeper_domain::{ExtractionCategory, ResultShape, SegmentMetadata, SEGMENT_METADATA_KEY};
use serde_json::{json, Map, Value};

/// Parse the JSON value embedded in `text`, if any
///
/// # Examples
///
/// ```
/// use lorekeeper_parser::response::extract_json;
/// use serde_json::json;
///
/// let value = extract_json("Here you go: {\"setting\": \"X\"} Hope it helps.").unwrap();
/// assert_eq!(value, json!({"setting": "X"}));
/// assert!(extract_json("no json here").is_none());
/// ```
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let object = span(trimmed, '{', '}');
    let array = span(trimmed, '[', ']');
    let mut candidates: Vec<(usize, &str)> = object.into_iter().chain(array).collect();
    candidates.sort_by_key(|(start, _)| *start);

    candidates
        .into_iter()
        .find_map(|(_, candidate)| serde_json::from_str(candidate).ok())
}

fn span(text: &str, open: char, close: char) -> Option<(usize, &str)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| (start, &text[start..=end]))
}

/// Parse `text` as a result of `category`'s shape
///
/// A characters response wrapped as `{"characters": [...]}` is unwrapped
/// and a bare `{}` counts as an empty list. Non-object list items are
/// dropped; a non-empty list with no objects at all is rejected.
pub fn parse_structured(category: ExtractionCategory, text: &str) -> Option<Value> {
    let value = extract_json(text)?;

    match category.shape() {
        ResultShape::Mapping => value.is_object().then_some(value),
        ResultShape::List => {
            let items = match value {
                Value::Array(items) => items,
                Value::Object(map) if map.is_empty() => Vec::new(),
                Value::Object(mut map) => match map.remove(category.as_str()) {
                    Some(Value::Array(items)) => items,
                    _ => return None,
                },
                _ => return None,
            };

            let had_items = !items.is_empty();
            let objects: Vec<Value> = items.into_iter().filter(Value::is_object).collect();
            if had_items && objects.is_empty() {
                return None;
            }
            Some(Value::Array(objects))
        }
    }
}

/// Wrap unparseable text so it is carried forward instead of dropped
///
/// # Examples
///
/// ```
/// use lorekeeper_domain::ExtractionCategory;
/// use lorekeeper_parser::response::textual_fallback;
/// use serde_json::json;
///
/// assert_eq!(
///     textual_fallback(ExtractionCategory::Plot, "free text"),
///     json!({"raw_content": "free text", "parsed": false})
/// );
/// assert!(textual_fallback(ExtractionCategory::Characters, "free text").is_array());
/// ```
pub fn textual_fallback(category: ExtractionCategory, text: &str) -> Value {
    let wrapped = json!({
        "raw_content": text,
        "parsed": false,
    });
    match category.shape() {
        ResultShape::Mapping => wrapped,
        ResultShape::List => Value::Array(vec![wrapped]),
    }
}

/// Whether `value` is a textual-fallback entry
pub fn is_unparsed(value: &Value) -> bool {
    value.get("parsed") == Some(&Value::Bool(false))
}

/// Attach segment provenance to a result
///
/// List results get the metadata on every object element, mappings at the
/// top level.
pub fn attach_metadata(value: &mut Value, metadata: &SegmentMetadata) {
    match value {
        Value::Array(items) => {
            for item in items.iter_mut() {
                if let Value::Object(map) = item {
                    insert_metadata(map, metadata);
                }
            }
        }
        Value::Object(map) => insert_metadata(map, metadata),
        _ => {}
    }
}

fn insert_metadata(map: &mut Map<String, Value>, metadata: &SegmentMetadata) {
    map.insert(SEGMENT_METADATA_KEY.to_string(), metadata.to_value());
}
