/*!
translate.rs - turn a tool call's JSON arguments back into command-line syntax.

Input object (all members optional, unknown members ignored):
  { "args": [..], "flags": { "flag_name": bool|string|number|array }, "limit": n, "offset": n }

Output:
  - argv: flag tokens in the node's declaration order, then positionals
  - ResponseConfig: limit / offset for the paginator

Translation never fails: malformed or unknown entries are dropped.
Zero and false are both treated as "not set" (see `format_value`).
*/

use serde_json::{Map, Value};

use super::schema::{DEFAULT_LIMIT, DEFAULT_OFFSET};
use crate::tree::FlagDescriptor;

/// How much of the captured output to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseConfig {
    pub limit: i64,
    pub offset: i64,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

/// Result of translating one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    pub argv: Vec<String>,
    pub config: ResponseConfig,
}

/// Translate call parameters against the node's effective flag table.
///
/// Flag tokens are followed directly by the positionals, except that a `--`
/// separator goes in between when any positional starts with `-`, so a value
/// like `-1` stays positional instead of being read as an option.
pub fn translate(params: &Map<String, Value>, flags: &[FlagDescriptor]) -> Translated {
    let positionals = extract_positionals(params.get("args"));

    let mut config = ResponseConfig::default();
    if let Some(n) = params.get("limit").and_then(as_integer) {
        config.limit = n;
    }
    if let Some(n) = params.get("offset").and_then(as_integer) {
        config.offset = n;
    }

    // (declaration index, tokens) so the final order does not depend on map order
    let mut emitted: Vec<(usize, Vec<String>)> = Vec::new();
    if let Some(Value::Object(call_flags)) = params.get("flags") {
        for (key, value) in call_flags {
            let resolved = resolve_flag(key, flags);
            let tokens = flag_tokens(resolved.map(|(_, f)| f.name.as_str()), value);
            if let (Some((index, _)), false) = (resolved, tokens.is_empty()) {
                emitted.push((index, tokens));
            }
        }
    }
    emitted.sort_by_key(|(index, _)| *index);

    let mut argv: Vec<String> = emitted.into_iter().flat_map(|(_, t)| t).collect();
    if positionals.iter().any(|p| p.starts_with('-')) {
        argv.push("--".to_string());
    }
    argv.extend(positionals);

    Translated { argv, config }
}

fn extract_positionals(args: Option<&Value>) -> Vec<String> {
    match args {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Integral numbers as-is; fractional numbers truncate toward zero.
fn as_integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
}

/// Look a call key up by its kebab form first, then literally.
fn resolve_flag<'a>(key: &str, flags: &'a [FlagDescriptor]) -> Option<(usize, &'a FlagDescriptor)> {
    let kebab = key.replace('_', "-");
    flags
        .iter()
        .enumerate()
        .find(|(_, f)| f.name == kebab)
        .or_else(|| flags.iter().enumerate().find(|(_, f)| f.name == key))
}

/// Tokens for one flag value. Values are converted even when `name` is
/// unresolved, but `--name` is only ever emitted for a resolved flag.
fn flag_tokens(name: Option<&str>, value: &Value) -> Vec<String> {
    let mut tokens = Vec::new();
    match value {
        Value::Bool(true) => {
            if let Some(name) = name {
                tokens.push(format!("--{name}"));
            }
        }
        Value::Array(items) => {
            for item in items.iter().filter_map(Value::as_str).filter(|s| !s.is_empty()) {
                if let Some(name) = name {
                    tokens.push(format!("--{name}"));
                    tokens.push(item.to_string());
                }
            }
        }
        other => {
            if let (Some(text), Some(name)) = (format_value(other), name) {
                tokens.push(format!("--{name}"));
                tokens.push(text);
            }
        }
    }
    tokens
}

/// Text form of a scalar flag value, or `None` when it reads as "unset"
/// (`false`, `0`, empty string, null).
pub fn format_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::Bool(false) | Value::Null => return None,
        Value::Bool(true) => "true".to_string(),
        Value::String(s) => {
            if s.is_empty() {
                return None;
            }
            return Some(s.clone());
        }
        Value::Number(n) => format_number(n)?,
        other => other.to_string(),
    };
    if text.is_empty() || text == "0" || text == "false" {
        None
    } else {
        Some(text)
    }
}

/// Integers print without a decimal point or exponent; other values use the
/// shortest round-trip decimal form.
pub fn format_number(n: &serde_json::Number) -> Option<String> {
    if let Some(i) = n.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.to_string());
    }
    let f = n.as_f64()?;
    if f == 0.0 {
        return Some("0".to_string());
    }
    if f.fract() == 0.0 {
        Some(format!("{f:.0}"))
    } else {
        Some(f.to_string())
    }
}
