use rand::Rng;
use serde_json::{Map, Value};

use super::fields::int_field;
use super::rng::SpawnRng;
use super::types::SPAWN_GROUPS_KEY;

pub const SPAWN_ID_PREFIX: &str = "spn-";

const LEGACY_GROUPS_KEY: &str = "assets";
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";
const SPAWN_ID_HEX_LEN: usize = 12;
const PERIMETER_MIN_COUNT: i64 = 2;

pub fn generate_spawn_id(rng: &mut SpawnRng) -> String {
    let mut id = String::with_capacity(SPAWN_ID_PREFIX.len() + SPAWN_ID_HEX_LEN);
    id.push_str(SPAWN_ID_PREFIX);
    for _ in 0..SPAWN_ID_HEX_LEN {
        id.push(HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char);
    }
    id
}

/// The spawn-group array of a document, falling back to the legacy `assets`
/// key. Read-only; nothing is migrated.
pub fn find_spawn_groups(doc: &Value) -> Option<&Vec<Value>> {
    doc.get(SPAWN_GROUPS_KEY)
        .and_then(Value::as_array)
        .or_else(|| doc.get(LEGACY_GROUPS_KEY).and_then(Value::as_array))
}

/// Returns the document's `spawn_groups` array, moving a legacy `assets` array
/// under the new key or creating an empty one. The flag reports whether the
/// document was modified. `None` when `doc` is not an object.
pub fn ensure_spawn_groups(doc: &mut Value) -> Option<(&mut Vec<Value>, bool)> {
    let object = doc.as_object_mut()?;
    let mut modified = migrate_legacy_groups(object);
    let has_groups = object
        .get(SPAWN_GROUPS_KEY)
        .map(Value::is_array)
        .unwrap_or(false);
    if !has_groups {
        object.insert(SPAWN_GROUPS_KEY.to_string(), Value::Array(Vec::new()));
        modified = true;
    }
    match object.get_mut(SPAWN_GROUPS_KEY) {
        Some(Value::Array(groups)) => Some((groups, modified)),
        _ => None,
    }
}

pub(crate) fn migrate_legacy_groups(object: &mut Map<String, Value>) -> bool {
    let has_groups = object
        .get(SPAWN_GROUPS_KEY)
        .map(Value::is_array)
        .unwrap_or(false);
    if has_groups || !matches!(object.get(LEGACY_GROUPS_KEY), Some(Value::Array(_))) {
        return false;
    }
    if let Some(legacy) = object.remove(LEGACY_GROUPS_KEY) {
        object.insert(SPAWN_GROUPS_KEY.to_string(), legacy);
        return true;
    }
    false
}

pub fn normalize_position(raw: Option<&str>) -> String {
    match raw {
        None | Some("") => "Random".to_string(),
        Some("Exact Position") => "Exact".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Perimeter groups need at least two spawns to trace a ring. Rewrites
/// `min_number`/`max_number` of every perimeter entry and reports whether any
/// value had to change.
pub fn sanitize_perimeter_spawn_groups(groups: &mut [Value]) -> bool {
    let mut changed = false;
    for entry in groups.iter_mut() {
        if !entry.is_object() {
            continue;
        }
        let position = entry.get("position").and_then(Value::as_str);
        if normalize_position(position) != "Perimeter" {
            continue;
        }
        let raw_max = int_field(entry, "max_number");
        let mut min_number = int_field(entry, "min_number")
            .or(raw_max)
            .unwrap_or(PERIMETER_MIN_COUNT);
        let mut max_number = raw_max.unwrap_or(min_number);
        if min_number < PERIMETER_MIN_COUNT {
            min_number = PERIMETER_MIN_COUNT;
            changed = true;
        }
        if max_number < PERIMETER_MIN_COUNT {
            max_number = PERIMETER_MIN_COUNT;
            changed = true;
        }
        if max_number < min_number {
            max_number = min_number;
            changed = true;
        }
        entry["min_number"] = Value::from(min_number);
        entry["max_number"] = Value::from(max_number);
    }
    changed
}
