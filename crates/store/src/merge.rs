use serde_json::Value;

/// Merge `patch` into `target` the way document stores do for
/// "set with merge".
///
/// Objects are merged key by key, recursively; fields of `target` that
/// `patch` doesn't mention survive untouched. Everything else (arrays
/// included) is replaced wholesale.
///
/// # Examples
///
/// ```
/// use binge_store::merge_into;
/// use serde_json::json;
///
/// let mut document = json!({"settings": {"theme": "dark"}, "watchlists": {"movies": {"watched": [1, 2]}}});
/// merge_into(&mut document, json!({"watchlists": {"movies": {"watched": [3]}}}));
/// assert_eq!(document, json!({"settings": {"theme": "dark"}, "watchlists": {"movies": {"watched": [3]}}}));
/// ```
pub fn merge_into(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        target.insert(key, value);
                    },
                }
            }
        },
        (target, patch) => *target = patch,
    }
}
