use std::fmt;

use clap::ValueEnum;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PortalError;
use crate::params::{Params, normalize, query_pairs};

/// Wire format the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Tsv,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Tsv => "tsv",
        }
    }

    pub fn accept(self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Tsv => "text/tab-separated-values",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Json(Value),
}

/// Everything the transport needs to issue one HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    /// Path relative to the configured base URL, always starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub format: Option<Format>,
}

impl RequestSpec {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            format: None,
        }
    }

    pub fn builder(method: &str, path: &str) -> RequestBuilder {
        RequestBuilder {
            method: method.to_string(),
            path: path.to_string(),
            ..RequestBuilder::default()
        }
    }

    pub fn with_params(mut self, params: &Params) -> Self {
        self.query.extend(query_pairs(&normalize(params)));
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Validating builder behind the generic `api request` escape hatch.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    method: String,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    text_body: Option<String>,
    json_body: Option<Value>,
    json_literal: Option<String>,
    format: Option<Format>,
}

impl RequestBuilder {
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn queries(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn headers(mut self, pairs: Vec<(String, String)>) -> Self {
        self.headers.extend(pairs);
        self
    }

    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.text_body = Some(body.into());
        self
    }

    pub fn json_body(mut self, body: Value) -> Self {
        self.json_body = Some(body);
        self
    }

    /// JSON given as text; parsed when the request is built.
    pub fn json_literal(mut self, body: impl Into<String>) -> Self {
        self.json_literal = Some(body.into());
        self
    }

    pub fn format(mut self, format: Option<Format>) -> Self {
        self.format = format;
        self
    }

    pub fn build(self) -> Result<RequestSpec, PortalError> {
        let method = parse_method(&self.method)?;
        if !self.path.starts_with('/') {
            return Err(PortalError::InvalidPath(format!(
                "{} (must start with '/')",
                self.path
            )));
        }

        let has_json = self.json_body.is_some() || self.json_literal.is_some();
        if self.text_body.is_some() && has_json {
            return Err(PortalError::ConflictingBody);
        }
        if self.json_body.is_some() && self.json_literal.is_some() {
            return Err(PortalError::ConflictingBody);
        }

        let body = match (self.text_body, self.json_body, self.json_literal) {
            (Some(text), _, _) => Some(Body::Text(text)),
            (None, Some(json), _) => Some(Body::Json(json)),
            (None, None, Some(literal)) => Some(Body::Json(
                serde_json::from_str(&literal)
                    .map_err(|err| PortalError::InvalidJsonBody(err.to_string()))?,
            )),
            (None, None, None) => None,
        };

        Ok(RequestSpec {
            method,
            path: self.path,
            query: self.query,
            headers: self.headers,
            body,
            format: self.format,
        })
    }
}

pub fn parse_method(value: &str) -> Result<Method, PortalError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "HEAD" => Ok(Method::HEAD),
        "OPTIONS" => Ok(Method::OPTIONS),
        _ => Err(PortalError::InvalidMethod(value.to_string())),
    }
}

/// Parses `KEY=VALUE` arguments. The value may itself contain `=`.
pub fn parse_query_pairs<S: AsRef<str>>(
    items: &[S],
) -> Result<Vec<(String, String)>, PortalError> {
    items
        .iter()
        .map(|item| {
            split_pair(item.as_ref(), '=')
                .ok_or_else(|| PortalError::InvalidQueryPair(item.as_ref().to_string()))
        })
        .collect()
}

/// Parses `KEY:VALUE` arguments; whitespace around the value is dropped.
pub fn parse_header_pairs<S: AsRef<str>>(
    items: &[S],
) -> Result<Vec<(String, String)>, PortalError> {
    items
        .iter()
        .map(|item| {
            split_pair(item.as_ref(), ':')
                .ok_or_else(|| PortalError::InvalidHeaderPair(item.as_ref().to_string()))
        })
        .collect()
}

fn split_pair(item: &str, separator: char) -> Option<(String, String)> {
    let (key, value) = item.split_once(separator)?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn builder_rejects_both_bodies() {
        let err = RequestSpec::builder("POST", "/api/genes/search")
            .text_body("raw")
            .json_literal("{\"a\": 1}")
            .build()
            .unwrap_err();
        assert_matches!(err, PortalError::ConflictingBody);
    }

    #[test]
    fn builder_parses_json_literal() {
        let spec = RequestSpec::builder("post", "/api/genes/search")
            .json_literal("{\"locus_tag\": \"BU_ATCC8492_00001\"}")
            .build()
            .unwrap();
        assert_eq!(spec.method, Method::POST);
        assert_eq!(
            spec.body,
            Some(Body::Json(json!({"locus_tag": "BU_ATCC8492_00001"})))
        );
    }

    #[test]
    fn builder_rejects_bad_json_and_paths() {
        let err = RequestSpec::builder("POST", "/api/x")
            .json_literal("{not json")
            .build()
            .unwrap_err();
        assert_matches!(err, PortalError::InvalidJsonBody(_));

        let err = RequestSpec::builder("GET", "api/x").build().unwrap_err();
        assert_matches!(err, PortalError::InvalidPath(_));

        let err = RequestSpec::builder("FETCH", "/api/x").build().unwrap_err();
        assert_matches!(err, PortalError::InvalidMethod(_));
    }

    #[test]
    fn pair_parsing() {
        let pairs = parse_query_pairs(&["query=dnaA", "filter=a=b"]).unwrap();
        assert_eq!(pairs[1], ("filter".to_string(), "a=b".to_string()));

        let headers = parse_header_pairs(&["X-Trace: abc"]).unwrap();
        assert_eq!(headers[0], ("X-Trace".to_string(), "abc".to_string()));

        assert_matches!(
            parse_query_pairs(&["novalue"]),
            Err(PortalError::InvalidQueryPair(_))
        );
        assert_matches!(
            parse_header_pairs(&[":value"]),
            Err(PortalError::InvalidHeaderPair(_))
        );
    }
}
