//! Human-readable, deterministic call-signature encoding.
//!
//! The encoding names a cell's cache file. Required parameters always
//! appear; optional parameters appear only when the bound value differs
//! from the declared default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use labkit_core::errors::{ErrorInfo, LabError};
use labkit_core::hash::dict_hash;

/// Encoding used when no parameter contributes a token.
pub const EMPTY_SIGNATURE: &str = "_";

/// An optional parameter with its declared default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptParam {
    /// Parameter name.
    pub name: String,
    /// Declared default value.
    pub default: Value,
}

/// Statically declared parameter descriptor for a callable.
///
/// Replaces runtime signature introspection: the caller states which
/// parameters are required and which carry defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArgSpec {
    /// Required parameter names in declaration order.
    pub required: Vec<String>,
    /// Optional parameters with their defaults, in declaration order.
    pub optional: Vec<OptParam>,
}

impl ArgSpec {
    /// Creates a descriptor with the given required parameter names.
    pub fn new<S: Into<String>>(required: impl IntoIterator<Item = S>) -> Self {
        Self {
            required: required.into_iter().map(Into::into).collect(),
            optional: Vec::new(),
        }
    }

    /// Adds an optional parameter with its declared default.
    pub fn optional(mut self, name: impl Into<String>, default: Value) -> Self {
        self.optional.push(OptParam {
            name: name.into(),
            default,
        });
        self
    }
}

/// Renders a bound call as a filesystem-safe, stable signature string.
///
/// Required values are comma-joined in declaration order. An optional
/// parameter contributes a token only when bound to a non-default value:
/// `name=value` in general, `no_name` when a `true` default is overridden
/// to `false`, and bare `name` when a `false` default is overridden to
/// `true`. Differing-optional tokens come first, underscore-joined, then
/// the required half; either half is omitted when empty, and a fully empty
/// encoding collapses to [`EMPTY_SIGNATURE`].
pub fn signature_string(
    spec: &ArgSpec,
    bound: &BTreeMap<String, Value>,
) -> Result<String, LabError> {
    let mut arg_strs = Vec::with_capacity(spec.required.len());
    for name in &spec.required {
        let value = bound.get(name).ok_or_else(|| {
            LabError::Signature(
                ErrorInfo::new("sig_unbound", "required parameter is not bound")
                    .with_context("param", name.clone()),
            )
        })?;
        arg_strs.push(render_value(value)?);
    }

    let mut kw_strs = Vec::new();
    for opt in &spec.optional {
        let value = match bound.get(&opt.name) {
            Some(value) if *value != opt.default => value,
            _ => continue,
        };
        match &opt.default {
            Value::Bool(true) => kw_strs.push(format!("no_{}", opt.name)),
            Value::Bool(false) => kw_strs.push(opt.name.clone()),
            _ => kw_strs.push(format!("{}={}", opt.name, render_value(value)?)),
        }
    }

    let mut out = String::new();
    if !kw_strs.is_empty() {
        out.push_str(&kw_strs.join("_"));
    }
    if !arg_strs.is_empty() {
        let args = arg_strs.join(",");
        if out.is_empty() {
            out = args;
        } else {
            out.push('_');
            out.push_str(&args);
        }
    } else if out.is_empty() {
        out.push_str(EMPTY_SIGNATURE);
    }
    Ok(out)
}

/// Renders a single value as a path-safe token.
///
/// Scalars render plainly (strings are sanitized); composite values render
/// as a short digest so arbitrarily nested payloads still produce bounded,
/// stable filenames.
fn render_value(value: &Value) -> Result<String, LabError> {
    Ok(match value {
        Value::Null => "none".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => sanitize(s),
        composite => {
            let digest = dict_hash(composite, None)?;
            digest[..16].to_string()
        }
    })
}

fn sanitize(token: &str) -> String {
    token
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+') {
                c
            } else {
                '-'
            }
        })
        .collect()
}
