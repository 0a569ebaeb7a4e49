//! HTTP transport for the people client.
//!
//! This module defines the request/response types, the [`HttpTransport`]
//! seam implemented by the reqwest client (and by scripted fakes in tests),
//! and the two wrappers every API call goes through:
//!
//! - [`fetch_with_timeout`]: bounds a single request by a deadline. The timer
//!   lives inside the returned future and is dropped when it completes, fails,
//!   or expires, so no timer outlives its request.
//! - [`with_retries`]: bounded retries with exponential backoff and jitter.

mod http;
mod retry;

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::person::Person;

pub use http::ReqwestTransport;
pub use retry::{with_retries, BackoffPolicy, RetryPolicy};

/// MIME type used for every body and `Accept` header.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP methods used by the people API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read a collection or a record.
    Get,
    /// Create a record.
    Post,
    /// Replace a record.
    Put,
    /// Remove a record.
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Serialized body, if any.
    pub body: Option<String>,
}

impl HttpRequest {
    /// A read request; asks for JSON.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: vec![("Accept".to_string(), JSON_CONTENT_TYPE.to_string())],
            body: None,
        }
    }

    /// A request carrying a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `payload` cannot be serialized.
    pub fn json<T: serde::Serialize>(
        method: Method,
        url: impl Into<String>,
        payload: &T,
    ) -> Result<Self> {
        Ok(Self {
            method,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string())],
            body: Some(serde_json::to_string(payload)?),
        })
    }

    /// A `DELETE` request without body.
    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Look up a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Short description used in logs and timeout errors.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// A response as received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body text (possibly empty).
    pub text: String,
}

impl HttpResponse {
    /// Create a response.
    #[must_use]
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The permissively parsed body.
    #[must_use]
    pub fn body(&self) -> Body {
        Body::parse(&self.text)
    }
}

/// A response body parsed without ever failing.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Empty body.
    Null,
    /// Valid JSON.
    Json(Value),
    /// Anything else, passed through verbatim.
    Text(String),
}

impl Body {
    /// Parse `text`: empty becomes [`Body::Null`], valid JSON becomes
    /// [`Body::Json`], everything else is kept as [`Body::Text`].
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self::Null;
        }
        match serde_json::from_str(text) {
            Ok(value) => Self::Json(value),
            Err(e) => {
                debug!(error = %e, "Response body is not JSON; keeping raw text");
                Self::Text(text.to_string())
            }
        }
    }

    /// The server's `error` field, when the body is a JSON object carrying one.
    ///
    /// Blank values (`""`, `false`, `0`, `null`) count as absent.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let Self::Json(Value::Object(map)) = self else {
            return None;
        };
        match map.get("error")? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if n.as_f64().is_some_and(|f| f.abs() < f64::EPSILON) => None,
            other => Some(other.to_string()),
        }
    }

    /// Interpret the body as a single person record.
    #[must_use]
    pub fn person(&self) -> Option<Person> {
        match self {
            Self::Json(value @ Value::Object(_)) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    /// Interpret the body as a list of people.
    ///
    /// Returns `None` unless the body is a JSON array. Elements that are not
    /// valid records are skipped with a warning.
    #[must_use]
    pub fn people(&self) -> Option<Vec<Person>> {
        let Self::Json(Value::Array(items)) = self else {
            return None;
        };
        let people = items
            .iter()
            .filter_map(|item| match serde_json::from_value(item.clone()) {
                Ok(person) => Some(person),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed person record");
                    None
                }
            })
            .collect();
        Some(people)
    }
}

/// The seam between the API client and the network.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return whatever the server answered.
    ///
    /// Non-success statuses are *not* errors at this level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the request could not complete, or
    /// [`Error::Timeout`] if the underlying client gave up waiting.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Send `request`, aborting it if no response arrives within `timeout`.
///
/// # Errors
///
/// Returns [`Error::Timeout`] when the deadline passes, or whatever the
/// transport reported.
pub async fn fetch_with_timeout<T>(
    transport: &T,
    request: HttpRequest,
    timeout: Duration,
) -> Result<HttpResponse>
where
    T: HttpTransport + ?Sized,
{
    let label = request.label();
    debug!(request = %label, timeout_ms = timeout.as_millis(), "Sending request");

    if let Ok(result) = tokio::time::timeout(timeout, transport.send(request)).await {
        result
    } else {
        warn!(request = %label, "Request timed out");
        Err(Error::timeout(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Scripted, ScriptedTransport};

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Post.to_string(), "POST");
        assert_eq!(Method::Put.to_string(), "PUT");
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_get_request_accepts_json() {
        let req = HttpRequest::get("http://api.test/people");
        assert_eq!(req.header("accept"), Some("application/json"));
        assert!(req.body.is_none());
    }

    #[test]
    fn test_json_request_sets_content_type() {
        let req = HttpRequest::json(Method::Post, "http://api.test/people", &Person::new("Ana", "1", 30))
            .unwrap();
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(r#"{"name":"Ana","dni":"1","age":30}"#));
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(409, "").is_success());
    }

    #[test]
    fn test_body_parse_is_permissive() {
        assert_eq!(Body::parse(""), Body::Null);
        assert_eq!(Body::parse("[1]"), Body::Json(serde_json::json!([1])));
        assert_eq!(Body::parse("<html>oops"), Body::Text("<html>oops".to_string()));
    }

    #[test]
    fn test_body_error_message() {
        assert_eq!(
            Body::parse(r#"{"error":"DNI duplicado"}"#).error_message(),
            Some("DNI duplicado".to_string())
        );
        assert_eq!(Body::parse(r#"{"ok":true}"#).error_message(), None);
        assert_eq!(Body::parse("plain failure").error_message(), None);
        assert_eq!(Body::Null.error_message(), None);
    }

    #[test]
    fn test_body_blank_error_field_is_absent() {
        assert_eq!(Body::parse(r#"{"error":""}"#).error_message(), None);
        assert_eq!(Body::parse(r#"{"error":false}"#).error_message(), None);
        assert_eq!(Body::parse(r#"{"error":0}"#).error_message(), None);
        assert_eq!(Body::parse(r#"{"error":null}"#).error_message(), None);
        assert_eq!(
            Body::parse(r#"{"error":true}"#).error_message(),
            Some("true".to_string())
        );
        assert_eq!(
            Body::parse(r#"{"error":503}"#).error_message(),
            Some("503".to_string())
        );
    }

    #[test]
    fn test_body_people_skips_malformed_entries() {
        let body = Body::parse(r#"[{"name":"Ana","dni":"1","age":30},{"nope":1}]"#);
        assert_eq!(body.people(), Some(vec![Person::new("Ana", "1", 30)]));
        assert_eq!(Body::parse(r#"{"name":"Ana"}"#).people(), None);
        assert_eq!(Body::Text("x".to_string()).people(), None);
    }

    #[test]
    fn test_body_person() {
        let body = Body::parse(r#"{"name":"Ana","dni":"1","age":30}"#);
        assert_eq!(body.person(), Some(Person::new("Ana", "1", 30)));
        assert_eq!(Body::Null.person(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_with_timeout_passes_response_through() {
        let transport = ScriptedTransport::new([Scripted::respond(200, "[]")]);
        let response = fetch_with_timeout(
            &transport,
            HttpRequest::get("http://api.test/people"),
            Duration::from_millis(8_000),
        )
        .await
        .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_with_timeout_expires() {
        let transport = ScriptedTransport::new([Scripted::Hang]);
        let err = fetch_with_timeout(
            &transport,
            HttpRequest::get("http://api.test/people"),
            Duration::from_millis(8_000),
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("GET http://api.test/people"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_response_within_deadline() {
        let transport = ScriptedTransport::new([Scripted::delayed(
            Duration::from_millis(7_999),
            200,
            "[]",
        )]);
        let result = fetch_with_timeout(
            &transport,
            HttpRequest::get("http://api.test/people"),
            Duration::from_millis(8_000),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_is_not_timeout() {
        let transport = ScriptedTransport::new([Scripted::network("connection refused")]);
        let err = fetch_with_timeout(
            &transport,
            HttpRequest::get("http://api.test/people"),
            Duration::from_millis(8_000),
        )
        .await
        .unwrap_err();
        assert!(!err.is_timeout());
        assert!(matches!(err, Error::Network { .. }));
    }
}
