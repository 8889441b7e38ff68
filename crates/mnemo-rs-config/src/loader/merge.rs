//! JSON merge for layered configuration.

use serde_json::Value;

/// Merge overlay values into the base. Objects merge key by key; any other
/// value in the overlay replaces the base value outright.
pub(super) fn merge_json_values(base: &mut Value, overlay: &Value) {
    let (Value::Object(base_map), Value::Object(overlay_map)) = (&mut *base, overlay) else {
        *base = overlay.clone();
        return;
    };
    for (key, value) in overlay_map {
        if let Some(existing) = base_map.get_mut(key) {
            merge_json_values(existing, value);
        } else {
            base_map.insert(key.clone(), value.clone());
        }
    }
}
