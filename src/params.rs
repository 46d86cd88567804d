//! Caller filters to wire query parameters.
//!
//! Filters are kept as a JSON object so that "not supplied" (`null`) and
//! "explicitly empty" (`""`) stay distinguishable until [`normalize`] runs.

use serde_json::{Map, Value};

/// Caller-supplied filters keyed by name, in insertion order.
pub type Params = Map<String, Value>;

/// Prefix of transport-level control keys such as [`REQUEST_TIMEOUT_KEY`].
pub const CONTROL_PREFIX: char = '_';

/// Per-call timeout in seconds, consumed by the client and never sent on the wire.
pub const REQUEST_TIMEOUT_KEY: &str = "_request_timeout";

/// Drops unset values, comma-joins lists and rewrites camelCase keys to snake_case.
///
/// Keys starting with [`CONTROL_PREFIX`] keep their name and value untouched.
pub fn normalize(params: &Params) -> Params {
    let mut normalized = Params::new();
    for (key, value) in params {
        if value.is_null() {
            continue;
        }
        if key.starts_with(CONTROL_PREFIX) {
            normalized.insert(key.clone(), value.clone());
            continue;
        }
        let value = match value {
            Value::Array(items) => match join_values(items.iter().map(scalar_text)) {
                Some(joined) => Value::String(joined),
                None => continue,
            },
            other => other.clone(),
        };
        normalized.insert(to_snake_case(key), value);
    }
    normalized
}

/// `speciesAcronym` -> `species_acronym`. Keys without uppercase letters are returned as is.
pub fn to_snake_case(key: &str) -> String {
    if !key.chars().any(char::is_uppercase) {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len() + 4);
    for (idx, ch) in key.chars().enumerate() {
        if idx > 0 && ch.is_uppercase() {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
    }
    out
}

/// Joins multi-valued filters with `,`. Empty input yields `None` so no parameter is sent.
pub fn join_values<I, S>(values: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parts = values
        .into_iter()
        .map(|value| value.as_ref().to_string())
        .collect::<Vec<_>>();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(","))
    }
}

/// Wire query pairs for already normalized params. Control keys are left out.
pub fn query_pairs(params: &Params) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(key, value)| !key.starts_with(CONTROL_PREFIX) && !value.is_null())
        .map(|(key, value)| (key.clone(), scalar_text(value)))
        .collect()
}

pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Builder for [`Params`] that keeps the unset/empty distinction explicit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters(Params);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// `None` is recorded as unset and later dropped by [`normalize`].
    pub fn set_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self.set(key, Value::Null),
        }
    }

    pub fn set_list<I, S>(self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = join_values(values);
        self.set_opt(key, joined)
    }

    pub fn params(&self) -> &Params {
        &self.0
    }

    pub fn into_params(self) -> Params {
        self.0
    }
}

impl From<Filters> for Params {
    fn from(filters: Filters) -> Self {
        filters.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("speciesAcronym"), "species_acronym");
        assert_eq!(to_snake_case("perPage"), "per_page");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("Query"), "query");
    }

    #[test]
    fn lists_are_comma_joined() {
        let params = Filters::new()
            .set("isolates", json!(["BU_ATCC_1", "BU_2243"]))
            .set("empty", json!([]))
            .into_params();
        let normalized = normalize(&params);
        assert_eq!(normalized.get("isolates"), Some(&json!("BU_ATCC_1,BU_2243")));
        assert!(!normalized.contains_key("empty"));
    }

    #[test]
    fn query_pairs_skip_control_keys() {
        let params = Filters::new()
            .set("page", 2)
            .set(REQUEST_TIMEOUT_KEY, 10)
            .into_params();
        let pairs = query_pairs(&normalize(&params));
        assert_eq!(pairs, vec![("page".to_string(), "2".to_string())]);
    }
}
