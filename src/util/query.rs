//! Query-string construction and deconstruction.

use std::fmt::Write;

/// A query parameter value: a scalar, or a nested map rendered with
/// `name[key]=value` bracket syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Value(String),
    Nested(Vec<(String, QueryValue)>),
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        Self::Value(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        Self::Value(s)
    }
}

/// Percent-encode a query component. Unreserved characters
/// (`A-Z a-z 0-9 - _ . ~`) pass through.
pub fn url_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}

/// Build a query string from mapped parameters.
///
/// # Examples
///
/// ```
/// use fedibase::util::query::{build_querystring, QueryValue};
///
/// let params = vec![
///     ("page".to_string(), QueryValue::from("2")),
///     (
///         "filter".to_string(),
///         QueryValue::Nested(vec![("network".to_string(), QueryValue::from("dfrn"))]),
///     ),
/// ];
/// assert_eq!(build_querystring(&params), "page=2&filter[network]=dfrn");
/// ```
pub fn build_querystring(params: &[(String, QueryValue)]) -> String {
    let mut pairs = Vec::new();
    collect_pairs(params, None, &mut pairs);
    pairs.join("&")
}

fn collect_pairs(params: &[(String, QueryValue)], name: Option<&str>, out: &mut Vec<String>) {
    for (key, value) in params {
        let qualified = match name {
            Some(name) => format!("{}[{}]", name, key),
            None => key.clone(),
        };
        match value {
            QueryValue::Value(v) => out.push(format!("{}={}", qualified, url_encode(v))),
            QueryValue::Nested(inner) => collect_pairs(inner, Some(&qualified), out),
        }
    }
}

/// Split a query into its base and its non-empty `&`-separated arguments.
///
/// When the query carries no `?`, the first argument is promoted to the
/// base.
pub fn explode_querystring(query: &str) -> (String, Vec<String>) {
    let (base, args_part) = match query.find('?') {
        Some(pos) => (&query[..pos], &query[pos + 1..]),
        None => ("", query),
    };

    let mut args: Vec<String> = args_part
        .split('&')
        .filter(|arg| !arg.is_empty())
        .map(String::from)
        .collect();

    let base = if base.is_empty() && !args.is_empty() {
        args.remove(0)
    } else {
        base.to_string()
    };

    (base, args)
}
