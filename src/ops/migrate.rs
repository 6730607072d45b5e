//! Bring a stored document of any earlier shape up to the current schema.
//!
//! Migration runs on the raw JSON value, one step per schema transition,
//! and only then converts to typed structs. Every step checks before it
//! writes, so migrating a current document changes nothing.

use serde_json::{Map, Value, json};

use crate::model::document::{CURRENT_SCHEMA_VERSION, DEFAULT_TAG_COLOR, Document};

/// Error type for migration
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error("document must be a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("unsupported schema version {0}")]
    UnknownVersion(u64),
    #[error("document does not fit the current schema: {0}")]
    Shape(#[source] serde_json::Error),
}

/// Shapes the stored document has had
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SchemaVersion {
    /// Bare `{phases}`; tasks may carry a `notes` string or a `videoUrl`
    V1,
    /// Rich tasks, tag registry, archive
    V2,
    /// Materials and timer on the day
    V3,
}

impl SchemaVersion {
    /// Read the version from a raw document. An explicit `schemaVersion`
    /// wins; otherwise the V2-only top-level sections give it away.
    pub fn detect(value: &Map<String, Value>) -> Result<Self, MigrateError> {
        match value.get("schemaVersion").and_then(Value::as_u64) {
            Some(1) => Ok(SchemaVersion::V1),
            Some(2) => Ok(SchemaVersion::V2),
            Some(3) => Ok(SchemaVersion::V3),
            Some(n) => Err(MigrateError::UnknownVersion(n)),
            None if value.contains_key("tags") || value.contains_key("archive") => {
                Ok(SchemaVersion::V2)
            }
            None => Ok(SchemaVersion::V1),
        }
    }

    pub fn number(self) -> u32 {
        match self {
            SchemaVersion::V1 => 1,
            SchemaVersion::V2 => 2,
            SchemaVersion::V3 => 3,
        }
    }
}

/// Parse and migrate a stored blob
pub fn migrate_str(text: &str) -> Result<Document, MigrateError> {
    let value: Value = serde_json::from_str(text).map_err(MigrateError::Syntax)?;
    migrate(value)
}

/// Migrate a raw document to the current schema
pub fn migrate(value: Value) -> Result<Document, MigrateError> {
    let mut root = match value {
        Value::Object(map) => map,
        other => return Err(MigrateError::NotAnObject(json_kind(&other))),
    };
    let from = SchemaVersion::detect(&root)?;

    merge_defaults(&mut root);
    if from < SchemaVersion::V2 {
        tracing::info!(from = from.number(), "migrating checklist items to v2");
    }
    // The item and day steps are guards, so they run on every load: a
    // hand-edited current document gets the same backfill an old one does.
    v1_to_v2(&mut root);
    v2_to_v3(&mut root);
    root.insert("schemaVersion".into(), json!(CURRENT_SCHEMA_VERSION));

    serde_json::from_value(Value::Object(root)).map_err(MigrateError::Shape)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// Shallow merge over the current defaults: missing sections get their
/// empty value, present ones are kept as they are.
fn merge_defaults(root: &mut Map<String, Value>) {
    ensure(root, "phases", json!([]));
    ensure(root, "tags", json!([]));
    ensure(root, "archive", json!([]));
    ensure(root, "settings", json!({}));

    if let Some(settings) = root.get_mut("settings").and_then(Value::as_object_mut) {
        match settings.get("theme").and_then(Value::as_str) {
            Some("dark") | Some("light") => {}
            _ => {
                settings.insert("theme".into(), json!("dark"));
            }
        }
        if !settings.get("lastActivity").is_some_and(Value::is_string) {
            settings.insert("lastActivity".into(), Value::Null);
        }
    }
}

fn ensure(map: &mut Map<String, Value>, key: &str, default: Value) {
    let keep = match (map.get(key), &default) {
        (Some(Value::Array(_)), Value::Array(_)) => true,
        (Some(Value::Object(_)), Value::Object(_)) => true,
        (Some(Value::String(_)), Value::String(_)) => true,
        (Some(Value::Bool(_)), Value::Bool(_)) => true,
        (Some(v), Value::Number(_)) => v.as_u64().is_some(),
        (Some(v), Value::Null) => v.is_null() || v.is_string(),
        _ => false,
    };
    if !keep {
        map.insert(key.to_string(), default);
    }
}

fn objects_mut<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a mut Map<String, Value>> {
    map.get_mut(key)
        .and_then(Value::as_array_mut)
        .into_iter()
        .flat_map(|arr| arr.iter_mut())
        .filter_map(Value::as_object_mut)
}

/// Drop array elements that are not objects, so every later step can treat
/// the collection as a list of records.
fn retain_objects(map: &mut Map<String, Value>, key: &str) {
    if let Some(arr) = map.get_mut(key).and_then(Value::as_array_mut) {
        arr.retain(Value::is_object);
    }
}

/// Visit every phase: active ones and the ones inside archive entries
fn for_each_phase(root: &mut Map<String, Value>, f: &mut dyn FnMut(&mut Map<String, Value>)) {
    retain_objects(root, "phases");
    for phase in objects_mut(root, "phases") {
        f(phase);
    }
    retain_objects(root, "archive");
    for entry in objects_mut(root, "archive") {
        if let Some(phase) = entry.get_mut("phase").and_then(Value::as_object_mut) {
            f(phase);
        }
    }
}

// ---------------------------------------------------------------------------
// V1 → V2: structure backfill and checklist item normalization
// ---------------------------------------------------------------------------

fn v1_to_v2(root: &mut Map<String, Value>) {
    normalize_tags(root);
    normalize_archive(root);
    for_each_phase(root, &mut |phase: &mut Map<String, Value>| {
        normalize_node(phase, &["title"], "subtitle", "New Phase");
        normalize_items(phase, "goals");
        retain_objects(phase, "weeks");
        ensure(phase, "weeks", json!([]));
        for week in objects_mut(phase, "weeks") {
            normalize_node(week, &["title"], "subtitle", "New Week");
            normalize_items(week, "objectives");
            retain_objects(week, "days");
            ensure(week, "days", json!([]));
            for day in objects_mut(week, "days") {
                normalize_id(day);
                ensure(day, "title", json!(""));
                normalize_items(day, "tasks");
            }
        }
    });
}

fn normalize_id(node: &mut Map<String, Value>) {
    let id = match node.get("id") {
        Some(Value::String(_)) => return,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    node.insert("id".into(), json!(id));
}

fn normalize_node(node: &mut Map<String, Value>, text_keys: &[&str], subtitle_key: &str, subtitle: &str) {
    normalize_id(node);
    for key in text_keys {
        ensure(node, key, json!(""));
    }
    ensure(node, subtitle_key, json!(subtitle));
}

fn normalize_items(node: &mut Map<String, Value>, key: &str) {
    retain_objects(node, key);
    ensure(node, key, json!([]));
    for item in objects_mut(node, key) {
        normalize_item(item);
    }
}

/// Backfill one goal/objective/task and fold legacy single-value fields
/// into their list form.
pub(crate) fn normalize_item(item: &mut Map<String, Value>) {
    ensure(item, "text", json!(""));
    let completed = item.get("completed").is_some_and(truthy);
    item.insert("completed".into(), json!(completed));

    // notes: "text" → ["text"], "" → []
    match item.get("notes") {
        Some(Value::String(s)) => {
            let notes = if s.is_empty() { vec![] } else { vec![s.clone()] };
            item.insert("notes".into(), json!(notes));
        }
        Some(Value::Array(_)) => keep_strings(item, "notes"),
        _ => {
            item.insert("notes".into(), json!([]));
        }
    }

    if !item.get("videos").is_some_and(Value::is_array) {
        item.insert("videos".into(), json!([]));
    }
    keep_strings(item, "videos");
    if let Some(url) = item.remove("videoUrl") {
        if let Some(url) = url.as_str().filter(|u| !u.is_empty()) {
            if let Some(videos) = item.get_mut("videos").and_then(Value::as_array_mut) {
                videos.push(json!(url));
            }
        }
    }

    match item.get("priority").and_then(Value::as_str) {
        Some("low") | Some("medium") | Some("high") => {}
        _ => {
            item.insert("priority".into(), json!("medium"));
        }
    }
    ensure(item, "tags", json!([]));
    keep_strings(item, "tags");
    normalize_seconds(item, "timeSpent");
    ensure(item, "dueDate", Value::Null);
    ensure(item, "lastCompleted", Value::Null);

    let recurring = match item.get("recurring") {
        Some(Value::String(s)) if matches!(s.as_str(), "none" | "daily" | "weekly" | "monthly") => {
            return;
        }
        Some(Value::Bool(true)) => "daily",
        _ => "none",
    };
    item.insert("recurring".into(), json!(recurring));
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn keep_strings(map: &mut Map<String, Value>, key: &str) {
    if let Some(arr) = map.get_mut(key).and_then(Value::as_array_mut) {
        arr.retain(Value::is_string);
    }
}

/// Whole non-negative seconds; fractional values are truncated
fn normalize_seconds(map: &mut Map<String, Value>, key: &str) {
    let secs = match map.get(key) {
        Some(v) if v.is_u64() => return,
        Some(Value::Number(n)) => n.as_f64().filter(|f| *f > 0.0).map_or(0, |f| f as u64),
        _ => 0,
    };
    map.insert(key.into(), json!(secs));
}

fn normalize_tags(root: &mut Map<String, Value>) {
    let Some(tags) = root.get_mut("tags").and_then(Value::as_array_mut) else {
        return;
    };
    let mut seen = Vec::new();
    tags.retain_mut(|tag| {
        let Some(obj) = tag.as_object_mut() else {
            return false;
        };
        let Some(name) = obj.get("name").and_then(Value::as_str).map(str::to_string) else {
            return false;
        };
        if name.is_empty() || seen.contains(&name) {
            return false;
        }
        seen.push(name);
        ensure(obj, "color", json!(DEFAULT_TAG_COLOR));
        true
    });
}

fn normalize_archive(root: &mut Map<String, Value>) {
    let Some(entries) = root.get_mut("archive").and_then(Value::as_array_mut) else {
        return;
    };
    entries.retain_mut(|entry| {
        let Some(obj) = entry.as_object_mut() else {
            return false;
        };
        if !obj.get("phase").is_some_and(Value::is_object) {
            return false;
        }
        ensure(obj, "archivedAt", json!(""));
        true
    });
}

// ---------------------------------------------------------------------------
// V2 → V3: materials and timer live on the day
// ---------------------------------------------------------------------------

fn v2_to_v3(root: &mut Map<String, Value>) {
    for_each_phase(root, &mut |phase: &mut Map<String, Value>| {
        for week in objects_mut(phase, "weeks") {
            for day in objects_mut(week, "days") {
                normalize_day(day);
            }
        }
    });
}

fn normalize_day(day: &mut Map<String, Value>) {
    let date = day
        .get("assignedDate")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    day.insert("assignedDate".into(), json!(date));

    match day.get("notes") {
        Some(Value::String(s)) => {
            let notes = if s.is_empty() { vec![] } else { vec![s.clone()] };
            day.insert("notes".into(), json!(notes));
        }
        _ => ensure(day, "notes", json!([])),
    }
    keep_strings(day, "notes");
    ensure(day, "videos", json!([]));
    keep_strings(day, "videos");
    ensure(day, "links", json!([]));
    keep_strings(day, "links");
    ensure(day, "files", json!([]));
    if let Some(files) = day.get_mut("files").and_then(Value::as_array_mut) {
        files.retain(|f| {
            f.get("name").is_some_and(Value::is_string) && f.get("data").is_some_and(Value::is_string)
        });
        for file in files.iter_mut().filter_map(Value::as_object_mut) {
            ensure(file, "mimeType", json!("application/octet-stream"));
            normalize_seconds(file, "sizeBytes");
        }
    }
    normalize_seconds(day, "timeSpent");
}
