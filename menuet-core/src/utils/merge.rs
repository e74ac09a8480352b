//! Deep merging of JSON documents.

use serde_json::Value;

/// Return `base` with `overlay` merged over it.
///
/// Objects merge key by key, recursively. Every other overlay value
/// (scalars, arrays, `null`) replaces what `base` holds. Neither input is
/// modified.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let next = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Assign `source` into `target` in place.
///
/// Differs from [`deep_merge`] in one respect: keys whose current target
/// value is an array are left untouched.
pub fn deep_assign(target: &mut Value, source: &Value) {
    let (Value::Object(target_map), Value::Object(source_map)) = (target, source) else {
        return;
    };

    for (key, value) in source_map {
        match target_map.get_mut(key) {
            Some(existing) if existing.is_array() => {}
            Some(existing) if existing.is_object() && value.is_object() => {
                deep_assign(existing, value)
            }
            Some(existing) => *existing = value.clone(),
            None => {
                target_map.insert(key.clone(), value.clone());
            }
        }
    }
}
