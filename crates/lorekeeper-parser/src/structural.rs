//! Deterministic merge used when a model-assisted merge is unavailable
//!
//! Mappings are deep-merged. Character lists are keyed by name: a known
//! name merges into the existing entry in place, a new name is appended.

use crate::response::is_unparsed;
use lorekeeper_domain::{ExtractionCategory, ResultShape};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Deep-merge `incoming` into `base`
///
/// - lists are concatenated, skipping elements already present
/// - mappings are merged key by key
/// - a string not already contained in the base string is appended on a new line
/// - anything else is replaced by the incoming value
///
/// # Examples
///
/// ```
/// use lorekeeper_parser::structural::merge_values;
/// use serde_json::json;
///
/// let mut base = json!({"setting": "X", "tags": ["a"]});
/// merge_values(&mut base, json!({"setting": "Y", "tags": ["a", "b"]}));
/// assert_eq!(base, json!({"setting": "X\nY", "tags": ["a", "b"]}));
/// ```
pub fn merge_values(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Array(base_items), Value::Array(items)) => {
            for item in items {
                let key = item.to_string();
                if !base_items.iter().any(|existing| existing.to_string() == key) {
                    base_items.push(item);
                }
            }
        }
        (Value::Object(base_map), Value::Object(map)) => merge_mappings(base_map, map),
        (Value::String(base_text), Value::String(text)) => {
            if base_text.is_empty() {
                *base_text = text;
            } else if !base_text.contains(text.as_str()) {
                base_text.push('\n');
                base_text.push_str(&text);
            }
        }
        (base, incoming) => *base = incoming,
    }
}

/// Deep-merge the fields of `incoming` into `base`
pub fn merge_mappings(base: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match base.get_mut(&key) {
            Some(existing) => merge_values(existing, value),
            None => {
                base.insert(key, value);
            }
        }
    }
}

fn character_name(value: &Value) -> Option<String> {
    let name = value.get("name")?.as_str()?.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Trimmed names of the named characters in `characters`
pub fn character_names<'a>(characters: impl IntoIterator<Item = &'a Value>) -> HashSet<String> {
    characters.into_iter().filter_map(character_name).collect()
}

/// Merge `incoming` characters into `base`, keeping names unique
///
/// Nameless entries are dropped unless they carry unparsed text.
pub fn merge_character_lists(base: &mut Vec<Value>, incoming: Vec<Value>) {
    let mut positions: HashMap<String, usize> = base
        .iter()
        .enumerate()
        .filter_map(|(i, c)| character_name(c).map(|name| (name, i)))
        .collect();

    for character in incoming {
        match character_name(&character) {
            Some(name) => match positions.get(&name) {
                Some(&i) => merge_values(&mut base[i], character),
                None => {
                    positions.insert(name, base.len());
                    base.push(character);
                }
            },
            None if is_unparsed(&character) => base.push(character),
            None => {}
        }
    }
}

/// Collapse characters sharing a name into one entry each
pub fn dedup_characters(characters: Vec<Value>) -> Vec<Value> {
    let mut unique = Vec::with_capacity(characters.len());
    merge_character_lists(&mut unique, characters);
    unique
}

/// Structurally merge two results of the same category
pub fn merge_pair(category: ExtractionCategory, base: &mut Value, incoming: Value) {
    match (category.shape(), base, incoming) {
        (ResultShape::List, Value::Array(base_items), Value::Array(items)) => {
            merge_character_lists(base_items, items)
        }
        (ResultShape::Mapping, Value::Object(base_map), Value::Object(map)) => {
            merge_mappings(base_map, map)
        }
        // Shapes are validated upstream; keep the base if one slips through.
        _ => {}
    }
}

/// Merge a whole group left to right
///
/// An empty group yields the category's empty value.
pub fn fallback_merge_group(category: ExtractionCategory, items: Vec<Value>) -> Value {
    let mut items = items.into_iter().filter(|item| category.matches_shape(item));
    let mut merged = match items.next() {
        Some(Value::Array(characters)) => Value::Array(dedup_characters(characters)),
        Some(first) => first,
        None => return category.empty_value(),
    };
    for item in items {
        merge_pair(category, &mut merged, item);
    }
    merged
}
