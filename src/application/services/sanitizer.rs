//! Recursive payload sanitization.
//!
//! Works on [`serde_json::Value`] trees and always returns a new tree with the
//! same shape: object keys and their order are kept, arrays keep their length and
//! order, and only string leaves change.
//!
//! # String transform
//!
//! 1. `<script>…</script>` and `<style>…</style>` blocks are removed together with their content.
//! 2. `<` becomes `&lt;` and `>` becomes `&gt;`.
//!
//! `&` is left alone, so existing entities are not escaped twice and applying the
//! transform to its own output changes nothing.

use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::LazyLock;

/// Key prefix used by query operators in document stores (`$where`, `$gt`, ...).
pub const OPERATOR_PREFIX: char = '$';

static EXECUTABLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*(script|style)\b[^>]*>.*?<\s*/\s*(script|style)\s*>").unwrap()
});

/// Sanitizes user-facing data (request bodies, query values).
pub fn sanitize(value: &Value) -> Value {
    walk(value, false)
}

/// Sanitizes a value destined for a query-style store.
///
/// Same as [`sanitize`], and additionally drops every object key starting with
/// [`OPERATOR_PREFIX`] at any depth.
///
/// For handlers that pass request data into a document-store filter
/// (`{"$where": ...}`, `{"$gt": ...}`). The request pipeline itself uses
/// [`sanitize`], since stripping keys from ordinary bodies would change their
/// meaning.
pub fn sanitize_keyed_query(value: &Value) -> Value {
    walk(value, true)
}

/// The string-leaf transform.
pub fn sanitize_str(input: &str) -> String {
    let stripped = EXECUTABLE_BLOCK.replace_all(input, "");

    if !stripped.contains(['<', '>']) {
        return stripped.into_owned();
    }

    let mut out = String::with_capacity(stripped.len() + 8);
    for c in stripped.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Returns `Cow::Borrowed` when the transform leaves `input` unchanged.
pub fn sanitize_cow(input: &str) -> Cow<'_, str> {
    let sanitized = sanitize_str(input);
    if sanitized == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(sanitized)
    }
}

fn walk(value: &Value, strip_operators: bool) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(s)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| walk(item, strip_operators))
                .collect(),
        ),
        Value::Object(fields) => {
            let mut out = Map::with_capacity(fields.len());
            for (key, field) in fields {
                if strip_operators && key.starts_with(OPERATOR_PREFIX) {
                    continue;
                }
                out.insert(key.clone(), walk(field, strip_operators));
            }
            Value::Object(out)
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
    }
}
