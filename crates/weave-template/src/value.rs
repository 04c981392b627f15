//! Dynamic values bound into a template scope.
//!
//! # Invariants
//!
//! 1. **Missing is empty**: `Null` (and anything that resolves to nothing)
//!    renders as the empty string at the top level of an interpolation.
//!
//! 2. **Structural composites**: maps and lists render as `{k: v, ...}` and
//!    `[v, ...]` literals, recursively, with strings quoted inside them.
//!
//! 3. **Helpers are opaque**: a helper nested inside a composite renders as
//!    `[helper]` and is never invoked during stringification.

use core::fmt;
use std::borrow::Cow;

use indexmap::IndexMap;

use crate::helpers::Helper;

/// Insertion-ordered mapping from name to value.
pub type Map = IndexMap<String, Value>;

/// Variable bindings supplied to a single render call.
pub type Scope = Map;

/// A value that can be interpolated into a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Absent or explicitly null.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(Map),
    /// A render-time function.
    Helper(Helper),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::Float(_) => "number",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Helper(_) => "helper",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_helper(&self) -> Option<&Helper> {
        match self {
            Self::Helper(h) => Some(h),
            _ => None,
        }
    }

    /// Look up one path segment: a key of a map or a numeric index of a list.
    ///
    /// Returns `None` for anything else, which callers treat as empty.
    #[must_use]
    pub fn member(&self, segment: &str) -> Option<&Value> {
        match self {
            Self::Map(m) => m.get(segment),
            Self::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Top-level textual form used by interpolation.
    #[must_use]
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(""),
            Self::Str(s) => Cow::Borrowed(s.as_str()),
            Self::Bool(true) => Cow::Borrowed("true"),
            Self::Bool(false) => Cow::Borrowed("false"),
            Self::Int(n) => Cow::Owned(n.to_string()),
            Self::Float(f) => Cow::Owned(format_float(*f)),
            Self::List(_) | Self::Map(_) | Self::Helper(_) => {
                let mut out = String::new();
                self.write_literal(&mut out);
                Cow::Owned(out)
            }
        }
    }

    /// Literal form used inside composites (strings are quoted).
    pub fn write_literal(&self, out: &mut String) {
        match self {
            Self::Null => out.push_str("null"),
            Self::Str(s) => quote_into(s, out),
            Self::Bool(_) | Self::Int(_) | Self::Float(_) => out.push_str(&self.to_text()),
            Self::Helper(_) => out.push_str("[helper]"),
            Self::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_literal(out);
                }
                out.push(']');
            }
            Self::Map(map) => {
                out.push('{');
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(key);
                    out.push_str(": ");
                    value.write_literal(out);
                }
                out.push('}');
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Canonical number form: integral floats print without a fraction.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if f == 0.0 {
        "0".to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        format!("{f:.0}")
    } else {
        format!("{f}")
    }
}

fn quote_into(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        i64::try_from(n).map_or(Self::Float(n as f64), Self::Int)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Map(map)
    }
}

impl From<Helper> for Value {
    fn from(helper: Helper) -> Self {
        Self::Helper(helper)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            Json::String(s) => Self::Str(s),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Json::Object(obj) => Self::Map(obj.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

/// Build a [`Scope`] from `key => value` pairs.
///
/// ```
/// use weave_template::{scope, Value};
///
/// let data = scope! { "x" => 5, "name" => "Ada" };
/// assert_eq!(data.get("x"), Some(&Value::Int(5)));
/// ```
#[macro_export]
macro_rules! scope {
    () => {
        $crate::Scope::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut scope = $crate::Scope::new();
        $(
            scope.insert(::std::string::String::from($key), $crate::Value::from($value));
        )+
        scope
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_render_canonically() {
        assert_eq!(Value::Int(5).to_text(), "5");
        assert_eq!(Value::Float(1.5).to_text(), "1.5");
        assert_eq!(Value::Float(2.0).to_text(), "2");
        assert_eq!(Value::Float(-0.0).to_text(), "0");
        assert_eq!(Value::Float(f64::NAN).to_text(), "NaN");
        assert_eq!(Value::Float(f64::NEG_INFINITY).to_text(), "-Infinity");
        assert_eq!(Value::Bool(false).to_text(), "false");
        assert_eq!(Value::Str("plain".into()).to_text(), "plain");
        assert_eq!(Value::Null.to_text(), "");
    }

    #[test]
    fn composites_render_structurally() {
        let value = Value::from(scope! {
            "title" => "X",
            "tags" => vec![1, 2],
            "nested" => scope! { "ok" => true },
        });
        assert_eq!(
            value.to_text(),
            r#"{title: "X", tags: [1, 2], nested: {ok: true}}"#
        );
        assert_eq!(Value::List(vec![]).to_text(), "[]");
        assert_eq!(Value::Map(Map::new()).to_text(), "{}");
    }

    #[test]
    fn nested_helper_is_not_invoked() {
        let helper = Helper::new(|_| panic!("must not be called"));
        let value = Value::List(vec![Value::Helper(helper), Value::Null]);
        assert_eq!(value.to_text(), "[[helper], null]");
    }

    #[test]
    fn strings_are_escaped_inside_composites() {
        let value = Value::from(vec!["a\"b", "c\\d\n"]);
        assert_eq!(value.to_text(), r#"["a\"b", "c\\d\n"]"#);
    }

    #[test]
    fn member_lookup() {
        let value = Value::from(scope! { "list" => vec!["a", "b"] });
        let list = value.member("list").unwrap();
        assert_eq!(list.member("1"), Some(&Value::from("b")));
        assert_eq!(list.member("7"), None);
        assert_eq!(list.member("x"), None);
        assert_eq!(Value::Int(1).member("x"), None);
    }

    #[cfg(feature = "json")]
    #[test]
    fn converts_json_documents() {
        let json = serde_json::json!({ "a": [1, 2.5, null], "b": { "c": "d" } });
        let value = Value::from(json);
        assert_eq!(value.to_text(), r#"{a: [1, 2.5, null], b: {c: "d"}}"#);
    }
}
