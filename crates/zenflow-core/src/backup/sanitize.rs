//! Deep sanitization of untrusted JSON
//!
//! Backup files and remote payloads are produced outside this process.
//! Keys that act as prototype hooks in JavaScript clients sharing the same
//! backups are stripped at every depth before a record is stored.

use serde_json::Value;

/// Object keys removed from every untrusted record
pub const FORBIDDEN_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Return `value` with every forbidden key removed, recursively.
#[must_use]
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !FORBIDDEN_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key, sanitize_value(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn strips_forbidden_keys_at_every_depth() {
        let dirty = json!({
            "id": "h1",
            "__proto__": {"isAdmin": true},
            "reminders": [
                {"time": "08:00", "constructor": {"prototype": {"polluted": 1}}}
            ],
            "meta": {"prototype": "x", "kept": true}
        });

        assert_eq!(
            sanitize_value(dirty),
            json!({
                "id": "h1",
                "reminders": [{"time": "08:00"}],
                "meta": {"kept": true}
            })
        );
    }

    #[test]
    fn leaves_scalars_untouched() {
        assert_eq!(sanitize_value(json!("__proto__")), json!("__proto__"));
        assert_eq!(sanitize_value(json!(3)), json!(3));
    }
}
