use serde_json::{Map, Value};

use crate::error::{GenesisError, Result};

pub const DEFAULT_CHAIN_ID: &str = "localjuno";
pub const DEFAULT_INPUT_GENESIS: &str = "state_export.json";
pub const DEFAULT_OUTPUT_GENESIS: &str = "testnet_genesis.json";

pub const NATIVE_DENOM: &str = "ujuno";
pub const GOVERNANCE_VOTING_PERIOD: &str = "180s";

// /cosmos.auth.v1beta1.ModuleAccount "bonded_tokens_pool"
pub const BONDED_TOKENS_POOL_MODULE_ADDRESS: &str = "juno1fl48vsnmsdzcv85q5d2q4z5ajdha8yu3rf257t";

pub const TOKEN_DELTA: u64 = 1_000_000_000_000_000;
pub const POWER_DELTA: u64 = 1_000_000_000;

pub const NEW_VALIDATOR_MONIKER: &str = "val";

pub const IBC_CHANNEL_STATE_KEYS: [&str; 7] = [
    "ack_sequences",
    "acknowledgements",
    "channels",
    "commitments",
    "receipts",
    "recv_sequences",
    "send_sequences",
];
pub const IBC_CLIENT_STATE_KEYS: [&str; 3] = ["clients", "clients_consensus", "clients_metadata"];

/// Replace every scalar leaf equal to `old` with `new`, at any depth.
///
/// Object keys are left alone and a non-scalar `old` never matches.
/// Returns the number of leaves replaced.
pub fn replace_value(node: &mut Value, old: &Value, new: &Value) -> usize {
    if old.is_array() || old.is_object() {
        return 0;
    }
    match node {
        Value::Object(map) => map.values_mut().map(|v| replace_value(v, old, new)).sum(),
        Value::Array(items) => items.iter_mut().map(|v| replace_value(v, old, new)).sum(),
        leaf if *leaf == *old => {
            *leaf = new.clone();
            1
        }
        _ => 0,
    }
}

pub fn replace_str(node: &mut Value, old: &str, new: &str) -> usize {
    replace_value(node, &Value::from(old), &Value::from(new))
}

pub fn display_path(path: &[&str]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}

/// Walk `path` through nested objects, failing on the first missing key.
pub fn field_mut<'a>(value: &'a mut Value, path: &[&str]) -> Result<&'a mut Value> {
    let mut current = value;
    for (i, key) in path.iter().enumerate() {
        current = current
            .as_object_mut()
            .ok_or_else(|| GenesisError::UnexpectedType {
                path: display_path(&path[..i]),
                expected: "object",
            })?
            .get_mut(*key)
            .ok_or_else(|| GenesisError::MissingField {
                path: display_path(&path[..=i]),
            })?;
    }
    Ok(current)
}

pub fn field<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut current = value;
    for (i, key) in path.iter().enumerate() {
        current = current
            .as_object()
            .ok_or_else(|| GenesisError::UnexpectedType {
                path: display_path(&path[..i]),
                expected: "object",
            })?
            .get(*key)
            .ok_or_else(|| GenesisError::MissingField {
                path: display_path(&path[..=i]),
            })?;
    }
    Ok(current)
}

pub fn object_mut<'a>(value: &'a mut Value, path: &[&str]) -> Result<&'a mut Map<String, Value>> {
    field_mut(value, path)?
        .as_object_mut()
        .ok_or_else(|| GenesisError::UnexpectedType {
            path: display_path(path),
            expected: "object",
        })
}

pub fn array_mut<'a>(value: &'a mut Value, path: &[&str]) -> Result<&'a mut Vec<Value>> {
    field_mut(value, path)?
        .as_array_mut()
        .ok_or_else(|| GenesisError::UnexpectedType {
            path: display_path(path),
            expected: "array",
        })
}

pub fn array<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Vec<Value>> {
    field(value, path)?
        .as_array()
        .ok_or_else(|| GenesisError::UnexpectedType {
            path: display_path(path),
            expected: "array",
        })
}

pub fn str_field<'a>(value: &'a Value, path: &[&str]) -> Result<&'a str> {
    field(value, path)?
        .as_str()
        .ok_or_else(|| GenesisError::UnexpectedType {
            path: display_path(path),
            expected: "string",
        })
}

/// Overwrite the string at `path` and hand back the previous value.
pub fn set_str(value: &mut Value, path: &[&str], new: &str) -> Result<String> {
    let slot = field_mut(value, path)?;
    let previous = slot
        .as_str()
        .ok_or_else(|| GenesisError::UnexpectedType {
            path: display_path(path),
            expected: "string",
        })?
        .to_string();
    *slot = Value::from(new);
    Ok(previous)
}

/// Rewrite the string at `path` through `update`, returning the new value.
pub fn update_str(
    value: &mut Value,
    path: &[&str],
    update: impl FnOnce(&str, &str) -> Result<String>,
) -> Result<String> {
    let slot = field_mut(value, path)?;
    let current = slot.as_str().ok_or_else(|| GenesisError::UnexpectedType {
        path: display_path(path),
        expected: "string",
    })?;
    let updated = update(&display_path(path), current)?;
    *slot = Value::from(updated.as_str());
    Ok(updated)
}

/// First entry whose string at `key_path` equals `expected`.
///
/// Entries lacking the key are skipped rather than treated as errors.
pub fn find_entry_mut<'a>(
    entries: &'a mut [Value],
    key_path: &[&str],
    expected: &str,
) -> Option<&'a mut Value> {
    entries
        .iter_mut()
        .find(|entry| str_field(entry, key_path).is_ok_and(|s| s == expected))
}

pub fn find_entry<'a>(entries: &'a [Value], key_path: &[&str], expected: &str) -> Option<&'a Value> {
    entries
        .iter()
        .find(|entry| str_field(entry, key_path).is_ok_and(|s| s == expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_replace_nested_shapes() {
        let mut doc = json!({
            "a": "old",
            "b": {"c": ["old", {"d": "old"}, ["x", "old"]]},
            "old": "kept-key",
            "e": [1, true, null, "older"]
        });
        let replaced = replace_str(&mut doc, "old", "new");
        assert_eq!(replaced, 4);
        assert_eq!(
            doc,
            json!({
                "a": "new",
                "b": {"c": ["new", {"d": "new"}, ["x", "new"]]},
                "old": "kept-key",
                "e": [1, true, null, "older"]
            })
        );
    }

    #[test]
    fn test_replace_distinguishes_strings_from_numbers() {
        let mut doc = json!({"n": 5, "s": "5"});
        assert_eq!(replace_value(&mut doc, &json!(5), &json!(6)), 1);
        assert_eq!(doc, json!({"n": 6, "s": "5"}));
    }

    #[test]
    fn test_replace_ignores_non_scalar_old() {
        let mut doc = json!({"a": [1], "b": {"c": 1}});
        let original = doc.clone();
        assert_eq!(replace_value(&mut doc, &json!([1]), &json!("x")), 0);
        assert_eq!(replace_value(&mut doc, &json!({"c": 1}), &json!("x")), 0);
        assert_eq!(doc, original);
    }

    #[test]
    fn test_field_errors_name_the_path() {
        let mut doc = json!({"app_state": {"gov": 3}});
        match field_mut(&mut doc, &["app_state", "staking", "validators"]) {
            Err(GenesisError::MissingField { path }) => assert_eq!(path, "app_state.staking"),
            other => panic!("unexpected {other:?}"),
        }
        match field(&doc, &["app_state", "gov", "params"]) {
            Err(GenesisError::UnexpectedType { path, expected }) => {
                assert_eq!(path, "app_state.gov");
                assert_eq!(expected, "object");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_find_entry_first_match_wins() {
        let mut entries = vec![
            json!({"name": "b", "n": 0}),
            json!({"other": "a"}),
            json!({"name": "a", "n": 1}),
            json!({"name": "a", "n": 2}),
        ];
        let hit = find_entry_mut(&mut entries, &["name"], "a").unwrap();
        assert_eq!(hit["n"], 1);
        assert!(find_entry(&entries, &["name"], "zzz").is_none());
    }

    fn leaf_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-d]{0,3}".prop_map(Value::from),
        ]
    }

    fn tree_strategy() -> impl Strategy<Value = Value> {
        leaf_strategy().prop_recursive(4, 64, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-d]{1,3}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn count(node: &Value, target: &Value) -> usize {
        match node {
            Value::Object(map) => map.values().map(|v| count(v, target)).sum(),
            Value::Array(items) => items.iter().map(|v| count(v, target)).sum(),
            leaf => usize::from(leaf == target),
        }
    }

    fn leaves(node: &Value, out: &mut Vec<Value>) {
        match node {
            Value::Object(map) => map.values().for_each(|v| leaves(v, out)),
            Value::Array(items) => items.iter().for_each(|v| leaves(v, out)),
            leaf => out.push(leaf.clone()),
        }
    }

    proptest! {
        #[test]
        fn prop_replace_leaves_no_occurrence(tree in tree_strategy(), old in leaf_strategy()) {
            let new = Value::from("\u{2603}replacement");
            let mut replaced = tree.clone();
            let n = replace_value(&mut replaced, &old, &new);

            prop_assert_eq!(n, count(&tree, &old));
            prop_assert_eq!(count(&replaced, &old), 0);

            let mut before = Vec::new();
            let mut after = Vec::new();
            leaves(&tree, &mut before);
            leaves(&replaced, &mut after);
            prop_assert_eq!(before.len(), after.len());
            for (b, a) in before.iter().zip(&after) {
                if *b == old {
                    prop_assert_eq!(a, &new);
                } else {
                    prop_assert_eq!(a, b);
                }
            }
        }
    }
}
