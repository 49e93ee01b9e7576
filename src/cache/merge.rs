//! Combining a new fetch result with the cached value of the same kind

use serde_json::Value;

use super::key::MergeStrategy;

/// Merge `new` into `old` according to the kind's merge class.
///
/// `Union` works on top-level fields: a field present in `new` wins, a field
/// only in `old` is carried over. If either side is not an object there are
/// no fields to union and `new` is returned as-is.
pub fn merge(old: Option<Value>, new: Value, strategy: MergeStrategy) -> Value {
    let Some(old) = old else {
        return new;
    };

    match (strategy, old, new) {
        (MergeStrategy::Union, Value::Object(mut merged), Value::Object(fresh)) => {
            for (field, value) in fresh {
                merged.insert(field, value);
            }
            Value::Object(merged)
        }
        (_, _, new) => new,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_union_preserves_untouched_fields() {
        let merged = merge(
            Some(json!({"A": 1, "B": 2})),
            json!({"A": 5}),
            MergeStrategy::Union,
        );
        assert_eq!(merged, json!({"A": 5, "B": 2}));
    }

    #[test]
    fn test_replace_drops_removed_fields() {
        let merged = merge(
            Some(json!({"A": 1, "B": 2})),
            json!({"A": 5}),
            MergeStrategy::Replace,
        );
        assert_eq!(merged, json!({"A": 5}));
    }

    #[test]
    fn test_first_fetch_returns_new_unchanged() {
        for strategy in [MergeStrategy::Union, MergeStrategy::Replace] {
            let merged = merge(None, json!({"A": 5}), strategy);
            assert_eq!(merged, json!({"A": 5}));
        }
    }

    #[test]
    fn test_union_replaces_nested_section_whole() {
        let merged = merge(
            Some(json!({"wifi": {"ssid": "home", "rssi": -60}, "cloud": {"connected": true}})),
            json!({"wifi": {"ssid": "home"}}),
            MergeStrategy::Union,
        );
        assert_eq!(
            merged,
            json!({"wifi": {"ssid": "home"}, "cloud": {"connected": true}})
        );
    }

    #[test]
    fn test_union_with_non_object_takes_new() {
        let merged = merge(Some(json!([1, 2])), json!({"A": 1}), MergeStrategy::Union);
        assert_eq!(merged, json!({"A": 1}));

        let merged = merge(Some(json!({"A": 1})), json!(null), MergeStrategy::Union);
        assert_eq!(merged, json!(null));
    }
}
