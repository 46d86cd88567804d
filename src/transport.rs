use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{
    ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::PortalError;
use crate::request::{Body, Format, RequestSpec};

/// Status, content type and body text of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True when the server labelled the body as tab-separated values.
    pub fn declares_tsv(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|value| {
                let value = value.to_ascii_lowercase();
                value.contains("tab-separated-values") || value.contains("text/tsv")
            })
            .unwrap_or(false)
    }
}

/// Issues one HTTP call. Non-2xx statuses are returned as responses, not errors;
/// [`check_status`] turns them into the error taxonomy.
pub trait Transport: Send + Sync {
    fn send(&self, request: &RequestSpec, timeout: Duration) -> Result<RawResponse, PortalError>;
}

/// Maps 401/403 to [`PortalError::Authentication`] and other non-2xx statuses to
/// [`PortalError::Api`].
pub fn check_status(response: RawResponse) -> Result<RawResponse, PortalError> {
    if response.is_success() {
        return Ok(response);
    }
    let body = response.body.trim();
    match response.status {
        401 | 403 => Err(PortalError::Authentication {
            status: response.status,
            message: if body.is_empty() {
                "Authentication failed".to_string()
            } else {
                body.to_string()
            },
        }),
        status => Err(PortalError::Api {
            status: Some(status),
            message: if body.is_empty() {
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|code| code.canonical_reason())
                    .unwrap_or("API request failed")
                    .to_string()
            } else {
                body.to_string()
            },
        }),
    }
}

/// Headers sent with every request: user agent, JSON `Accept` and, when a
/// credential is configured, `Authorization: Bearer` with the JWT preferred.
pub fn default_headers(config: &ClientConfig) -> Result<HeaderMap, PortalError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent).map_err(|_| {
            PortalError::InvalidConfigValue {
                key: "user_agent".to_string(),
                value: config.user_agent.clone(),
            }
        })?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static(Format::Json.accept()));
    if let Some(token) = config.bearer_token() {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            PortalError::InvalidConfigValue {
                key: "credential".to_string(),
                value: "<redacted>".to_string(),
            }
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

/// Blocking reqwest session shared by every call of one client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, PortalError> {
        let headers = default_headers(config)?;
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|err| PortalError::api(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-request headers layered over [`default_headers`]. reqwest only fills in
    /// a default when the request does not set the same header.
    pub fn request_headers(request: &RequestSpec) -> Result<HeaderMap, PortalError> {
        let mut headers = HeaderMap::new();
        if let Some(format) = request.format {
            headers.insert(ACCEPT, HeaderValue::from_static(format.accept()));
        }
        for (key, value) in &request.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| PortalError::InvalidHeaderPair(format!("{key}:{value}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| PortalError::InvalidHeaderPair(format!("{key}:{value}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &RequestSpec, timeout: Duration) -> Result<RawResponse, PortalError> {
        let url = format!("{}{}", self.base_url, request.path);
        let headers = Self::request_headers(request)?;

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .query(&request.query)
            .headers(headers)
            .timeout(timeout);
        builder = match &request.body {
            Some(Body::Json(value)) => builder.json(value),
            Some(Body::Text(text)) => {
                let has_content_type = request
                    .headers
                    .iter()
                    .any(|(key, _)| key.eq_ignore_ascii_case("content-type"));
                if has_content_type {
                    builder.body(text.clone())
                } else {
                    builder
                        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                        .body(text.clone())
                }
            }
            None => builder,
        };

        let started = Instant::now();
        debug!(method = %request.method, %url, "sending request");
        let response = builder.send().map_err(|err| {
            warn!(method = %request.method, %url, error = %err, "request failed");
            PortalError::Api {
                status: err.status().map(|status| status.as_u16()),
                message: format!("request to {url} failed: {err}"),
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().map_err(|err| PortalError::Api {
            status: Some(status),
            message: format!("failed to read response body: {err}"),
        })?;
        debug!(
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = body.len(),
            "received response"
        );

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn auth_statuses_become_authentication_errors() {
        for status in [401, 403] {
            let err = check_status(RawResponse::new(status, None, "")).unwrap_err();
            assert_matches!(err, PortalError::Authentication { status: s, .. } if s == status);
        }
    }

    #[test]
    fn other_failures_carry_body_or_reason() {
        let err =
            check_status(RawResponse::new(500, None, "{\"detail\":\"boom\"}")).unwrap_err();
        assert_matches!(
            err,
            PortalError::Api { status: Some(500), ref message } if message.contains("boom")
        );

        let err = check_status(RawResponse::new(404, None, "")).unwrap_err();
        assert_matches!(
            err,
            PortalError::Api { status: Some(404), ref message } if message == "Not Found"
        );
    }

    fn credentialed() -> ClientConfig {
        ClientConfig {
            api_key: Some("portal-key".to_string()),
            jwt_token: Some("jwt-token".to_string()),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn default_headers_carry_bearer_accept_and_user_agent() {
        let headers = default_headers(&credentialed()).unwrap();
        let auth = headers.get(AUTHORIZATION).unwrap();
        assert_eq!(auth, "Bearer jwt-token");
        assert!(auth.is_sensitive());
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(
            headers.get(USER_AGENT).unwrap().to_str().unwrap(),
            crate::config::default_user_agent()
        );
    }

    #[test]
    fn api_key_is_used_without_jwt() {
        let config = ClientConfig {
            jwt_token: None,
            ..credentialed()
        };
        let headers = default_headers(&config).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer portal-key");
    }

    #[test]
    fn no_credential_means_no_authorization() {
        let headers = default_headers(&ClientConfig::default()).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn bad_header_values_are_config_errors() {
        let config = ClientConfig {
            jwt_token: Some("line\nbreak".to_string()),
            ..ClientConfig::default()
        };
        assert_matches!(
            default_headers(&config),
            Err(PortalError::InvalidConfigValue { ref key, .. }) if key == "credential"
        );
    }

    #[test]
    fn request_headers_follow_format_and_extras() {
        let tsv = RequestSpec::get("/api/genomes/search").with_format(Format::Tsv);
        let headers = HttpTransport::request_headers(&tsv).unwrap();
        assert_eq!(headers.get(ACCEPT).unwrap(), "text/tab-separated-values");

        let json = RequestSpec::get("/api/genes/search").with_format(Format::Json);
        let headers = HttpTransport::request_headers(&json).unwrap();
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");

        let plain = RequestSpec::builder("GET", "/api/x")
            .header("X-Trace", "abc")
            .build()
            .unwrap();
        let headers = HttpTransport::request_headers(&plain).unwrap();
        assert!(headers.get(ACCEPT).is_none());
        assert_eq!(headers.get("x-trace").unwrap(), "abc");

        let broken = RequestSpec::builder("GET", "/api/x")
            .header("bad header", "v")
            .build()
            .unwrap();
        assert_matches!(
            HttpTransport::request_headers(&broken),
            Err(PortalError::InvalidHeaderPair(_))
        );
    }

    #[test]
    fn http_transport_trims_base_url() {
        let config = ClientConfig {
            base_url: "https://api.example.org/".to_string(),
            ..credentialed()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.base_url(), "https://api.example.org");
    }

    #[test]
    fn tsv_content_type_detection() {
        let tsv = RawResponse::new(200, Some("text/tab-separated-values; charset=utf-8"), "");
        assert!(tsv.declares_tsv());
        let json = RawResponse::new(200, Some("application/json"), "");
        assert!(!json.declares_tsv());
        assert!(!RawResponse::new(200, None, "").declares_tsv());
    }
}
