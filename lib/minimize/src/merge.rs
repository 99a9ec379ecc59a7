//! Deep merge of option trees.
use serde_json::{Map, Value};

/// Merge every override into `base`, left to right, and return the accumulated tree.
///
/// Sequences on both sides are concatenated, mappings on both sides merge recursively and any
/// other pairing is won by the override. A falsy base (`null`, `false`, `0`, `""`) starts from an
/// empty mapping; overrides that are not mappings contribute nothing. The overrides are only read,
/// values taken from them are cloned into the result.
pub fn merge<'a>(base: Value, overrides: impl IntoIterator<Item = &'a Value>) -> Value {
    let mut base = if is_falsy(&base) {
        Value::Object(Map::new())
    } else {
        base
    };

    for item in overrides {
        merge_into(&mut base, item);
    }

    base
}

/// Merge a single override into `base` in place.
pub fn merge_into(base: &mut Value, item: &Value) {
    let Value::Object(entries) = item else {
        return;
    };

    if let Value::Object(target) = base {
        merge_maps(target, entries);
        return;
    }

    let mut target = Map::new();
    merge_maps(&mut target, entries);
    *base = Value::Object(target);
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

fn merge_maps(target: &mut Map<String, Value>, entries: &Map<String, Value>) {
    for (key, value) in entries {
        match (target.get_mut(key), value) {
            (Some(Value::Array(existing)), Value::Array(more)) => {
                existing.extend(more.iter().cloned());
            }
            (Some(Value::Object(existing)), Value::Object(more)) => {
                merge_maps(existing, more);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_are_replaced() {
        let merged = merge(json!({ "a": 1, "b": "x" }), [&json!({ "a": 2 })]);
        assert_eq!(merged, json!({ "a": 2, "b": "x" }));
    }

    #[test]
    fn later_overrides_win() {
        let merged = merge(json!({}), [&json!({ "a": 1 }), &json!({ "a": 3 })]);
        assert_eq!(merged, json!({ "a": 3 }));
    }

    #[test]
    fn sequences_concatenate_in_order() {
        let merged = merge(
            json!({ "list": [1, 2] }),
            [&json!({ "list": [3] }), &json!({ "list": [[4, 5]] })],
        );
        assert_eq!(merged, json!({ "list": [1, 2, 3, [4, 5]] }));
    }

    #[test]
    fn nested_mappings_merge() {
        let merged = merge(
            json!({ "compress": { "drop_console": true, "passes": 1 } }),
            [&json!({ "compress": { "passes": 2, "unsafe": false } })],
        );
        assert_eq!(
            merged,
            json!({ "compress": { "drop_console": true, "passes": 2, "unsafe": false } })
        );
    }

    #[test]
    fn mismatched_types_take_the_override() {
        let merged = merge(
            json!({ "a": [1], "b": { "x": 1 }, "c": 1 }),
            [&json!({ "a": "scalar", "b": [2], "c": { "y": 2 } })],
        );
        assert_eq!(merged, json!({ "a": "scalar", "b": [2], "c": { "y": 2 } }));
    }

    #[test]
    fn null_base_is_an_empty_mapping() {
        let merged = merge(Value::Null, [&json!({ "a": 1 })]);
        assert_eq!(merged, json!({ "a": 1 }));
    }

    #[test]
    fn falsy_base_is_an_empty_mapping() {
        for base in [json!(false), json!(0), json!("")] {
            assert_eq!(merge(base.clone(), []), json!({}), "base {base}");
            assert_eq!(merge(base, [&json!({ "a": 1 })]), json!({ "a": 1 }));
        }

        assert_eq!(merge(json!(true), []), json!(true));
    }

    #[test]
    fn non_mapping_base_is_replaced_by_a_mapping_override() {
        let mut base = json!([1, 2]);
        merge_into(&mut base, &json!({ "a": 1 }));
        assert_eq!(base, json!({ "a": 1 }));
    }

    #[test]
    fn non_mapping_overrides_are_skipped() {
        let merged = merge(json!({ "a": 1 }), [&Value::Null, &json!(5), &json!({ "b": 2 })]);
        assert_eq!(merged, json!({ "a": 1, "b": 2 }));
    }

    #[test]
    fn overrides_are_left_untouched() {
        let first = json!({ "nested": { "list": [1] } });
        let second = json!({ "nested": { "list": [2], "flag": true } });
        let before = (first.clone(), second.clone());

        let mut merged = merge(json!({}), [&first, &second]);
        merge_into(&mut merged, &json!({ "nested": { "list": [3] } }));

        assert_eq!((first, second), before);
        assert_eq!(merged, json!({ "nested": { "list": [1, 2, 3], "flag": true } }));
    }

    #[test]
    fn merge_is_associative() {
        let a = json!({ "s": 1, "l": [1], "o": { "x": 1, "l": ["a"] } });
        let b = json!({ "s": 2, "l": [2], "o": { "y": 2, "l": ["b"] } });
        let c = json!({ "l": [3], "o": { "x": 3, "l": ["c"] }, "t": "c" });

        let stepwise = merge(merge(a.clone(), [&b]), [&c]);
        let at_once = merge(a, [&b, &c]);

        assert_eq!(stepwise, at_once);
        assert_eq!(
            at_once,
            json!({
                "s": 2,
                "l": [1, 2, 3],
                "o": { "x": 3, "y": 2, "l": ["a", "b", "c"] },
                "t": "c"
            })
        );
    }
}
