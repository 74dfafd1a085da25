/// Deterministic cache keys
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Build a cache key from a prefix and a set of named parameters.
///
/// Parameters are sorted by name and rendered as `name=value` segments joined
/// with `:`, so field order never affects the key. Nulls are skipped and
/// RFC 3339 timestamps are truncated to their UTC day.
///
/// ```text
/// cache_key("tasks:42", &json!({"page": 1, "dueDate": "2024-05-01T10:00:00Z"}))
///     == "tasks:42:dueDate=2024-05-01:page=1"
/// ```
pub fn cache_key<P: Serialize + ?Sized>(prefix: &str, params: &P) -> String {
    let value = match serde_json::to_value(params) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Cache key parameters failed to serialize: {}", e);
            Value::Null
        }
    };

    let mut segments: Vec<String> = match value {
        Value::Object(map) => map
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(name, v)| format!("{}={}", name, render(&v)))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![render(&other)],
    };
    segments.sort();

    let mut key = prefix.to_string();
    for segment in segments {
        key.push(':');
        key.push_str(&segment);
    }
    key
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => dt.with_timezone(&Utc).format("%Y-%m-%d").to_string(),
            Err(_) => s.clone(),
        },
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        nested => nested.to_string(),
    }
}

/// Key prefixes, one per cached resource family
pub mod prefixes {
    /// Single task
    pub const TASK: &str = "task";
    pub const USER: &str = "user";
    /// Paginated user listings
    pub const USERS: &str = "users";
    pub const ADMIN: &str = "admin";
    pub const ADMINS: &str = "admins";

    /// Task listings of one owner
    pub fn tasks(user_id: &str) -> String {
        format!("tasks:{}", user_id)
    }
}
