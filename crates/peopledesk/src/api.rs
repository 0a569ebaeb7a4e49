//! Typed client for the people REST resource.
//!
//! | Operation | Request              | Retried |
//! |-----------|----------------------|---------|
//! | list      | `GET {base}`         | yes     |
//! | get_one   | `GET {base}/{dni}`   | no      |
//! | create    | `POST {base}`        | yes     |
//! | update    | `PUT {base}/{dni}`   | yes     |
//! | delete    | `DELETE {base}/{dni}`| no      |
//!
//! Every call is bounded by the request timeout. Non-success statuses become
//! errors carrying the server's `error` field when the body has one, or a
//! fixed fallback message otherwise.

use std::time::Duration;

use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{Error, Result, CONFLICT_STATUS};
use crate::person::Person;
use crate::transport::{
    fetch_with_timeout, with_retries, Body, HttpRequest, HttpResponse, HttpTransport, Method,
    RetryPolicy,
};

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8_000);

/// Fallback message for a create rejected as duplicate.
pub const DUPLICATE_DNI_MESSAGE: &str = "DNI already exists";

/// Client for the people collection at `base_url`.
#[derive(Debug, Clone)]
pub struct PeopleApi<T> {
    transport: T,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl<T: HttpTransport> PeopleApi<T> {
    /// Create a client with the default timeout and retry policy.
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Create a client configured from `config`.
    pub fn from_config(transport: T, config: &Config) -> Self {
        Self::new(transport, config.base_url())
            .with_timeout(config.request_timeout())
            .with_retry_policy(config.retry_policy())
    }

    /// Set the per-request deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy for list, create and update.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The collection URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the record `dni`, with the identifier percent-encoded.
    #[must_use]
    pub fn record_url(&self, dni: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(dni))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        fetch_with_timeout(&self.transport, request, self.timeout).await
    }

    /// Fetch the whole collection.
    ///
    /// Resolves to the parsed body: normally a JSON array, but raw text is
    /// passed through untouched when the server does not send JSON.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's timeout, network or HTTP error.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Body> {
        with_retries(&self.retry, || async move {
            let response = self.send(HttpRequest::get(&self.base_url)).await?;
            expect_success(&response, || format!("GET failed {}", response.status))
        })
        .await
    }

    /// Fetch a single record.
    ///
    /// # Errors
    ///
    /// Returns a timeout, network or HTTP error. Not retried.
    #[instrument(skip(self))]
    pub async fn get_one(&self, dni: &str) -> Result<Body> {
        let response = self.send(HttpRequest::get(self.record_url(dni))).await?;
        expect_success(&response, || format!("GET {dni} failed {}", response.status))
    }

    /// Create a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] with code 409 when the identifier is taken,
    /// or a timeout, network or HTTP error.
    #[instrument(skip(self, person), fields(dni = %person.dni))]
    pub async fn create(&self, person: &Person) -> Result<Body> {
        with_retries(&self.retry, || async move {
            let request = HttpRequest::json(Method::Post, &self.base_url, person)?;
            let response = self.send(request).await?;
            if response.status == CONFLICT_STATUS {
                let message = response
                    .body()
                    .error_message()
                    .unwrap_or_else(|| DUPLICATE_DNI_MESSAGE.to_string());
                debug!(dni = %person.dni, "Create rejected as duplicate");
                return Err(Error::conflict(message));
            }
            expect_success(&response, || format!("POST failed {}", response.status))
        })
        .await
    }

    /// Replace the record `dni`.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's timeout, network or HTTP error.
    #[instrument(skip(self, person))]
    pub async fn update(&self, dni: &str, person: &Person) -> Result<Body> {
        with_retries(&self.retry, || async move {
            let request = HttpRequest::json(Method::Put, self.record_url(dni), person)?;
            let response = self.send(request).await?;
            expect_success(&response, || format!("PUT failed {}", response.status))
        })
        .await
    }

    /// Remove the record `dni`.
    ///
    /// # Errors
    ///
    /// Returns a timeout, network or HTTP error. Not retried.
    #[instrument(skip(self))]
    pub async fn delete(&self, dni: &str) -> Result<Body> {
        let response = self.send(HttpRequest::delete(self.record_url(dni))).await?;
        expect_success(&response, || format!("DELETE failed {}", response.status))
    }
}

fn expect_success(response: &HttpResponse, fallback: impl FnOnce() -> String) -> Result<Body> {
    let body = response.body();
    if response.is_success() {
        Ok(body)
    } else {
        let message = body.error_message().unwrap_or_else(fallback);
        Err(Error::http(response.status, message))
    }
}
