//! Identity and merge traits for synchronized items.
//!
//! The collection layer is generic over anything that can name its own
//! stable key ([`Keyed`]) and absorb a newer version of itself
//! ([`Merge`]). Push payloads are frequently partial, so record types
//! keep their previously-known optional fields when the newer copy
//! omits them; raw JSON payloads go through [`merge_json`].

use serde_json::Value;

/// An item with a stable identity used for upsert equality.
pub trait Keyed {
    /// The key type. Two items are "the same" when their keys are equal.
    type Key: PartialEq;

    /// Return the item's stable key.
    fn key(&self) -> Self::Key;
}

/// An item that can absorb a newer version of itself in place.
pub trait Merge {
    /// Merge `newer` into `self`. The default replaces `self` wholesale;
    /// record types override this to retain known values for fields the
    /// newer copy omits.
    fn merge(&mut self, newer: Self)
    where
        Self: Sized,
    {
        *self = newer;
    }
}

/// Recursively merge `newer` into `base` for JSON values.
///
/// Object fields are merged key by key; every other value kind (arrays
/// included) is replaced outright. This matches how partial push
/// payloads overlay a previously-fetched resource.
pub fn merge_json(base: &mut Value, newer: Value) {
    match (base, newer) {
        (Value::Object(base_map), Value::Object(newer_map)) => {
            for (key, value) in newer_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base_slot, newer_value) => *base_slot = newer_value,
    }
}

impl Merge for Value {
    fn merge(&mut self, newer: Self) {
        merge_json(self, newer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_json_overlays_object_fields() {
        let mut base = json!({"id": 1, "status": "queued", "meta": {"a": 1, "b": 2}});
        merge_json(&mut base, json!({"status": "finished", "meta": {"b": 3}}));
        assert_eq!(
            base,
            json!({"id": 1, "status": "finished", "meta": {"a": 1, "b": 3}})
        );
    }

    #[test]
    fn merge_json_replaces_non_objects() {
        let mut base = json!({"tags": ["a", "b"]});
        merge_json(&mut base, json!({"tags": ["c"]}));
        assert_eq!(base, json!({"tags": ["c"]}));

        let mut scalar = json!(1);
        merge_json(&mut scalar, json!({"now": "object"}));
        assert_eq!(scalar, json!({"now": "object"}));
    }

    #[test]
    fn merge_json_is_idempotent() {
        let patch = json!({"status": "finished", "meta": {"b": 3}});
        let mut once = json!({"id": 1, "meta": {"a": 1}});
        merge_json(&mut once, patch.clone());
        let mut twice = once.clone();
        merge_json(&mut twice, patch);
        assert_eq!(once, twice);
    }
}
