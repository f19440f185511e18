//! HTTP fetch wrapper with normalized failures.
//!
//! [`FetchClient`] sends a request and splits the outcome into two disjoint
//! channels: a decoded [`Payload`] on 2xx, or a [`NormalizedError`] for
//! transport errors and non-2xx responses. Failures are logged through
//! `tracing` and, when attached, an [`ErrorSink`].

mod result;

pub use result::{ApiResult, Payload};

use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{
    parse, parse_response, ErrorContext, ErrorKind, ErrorLogEntry, ErrorSink, NormalizedError,
};

/// Per-call behaviour of the fetch wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchConfig {
    /// Log failures through `tracing` and the attached error log.
    pub log_errors: bool,
    /// Return failures as `Err`. When false, [`FetchClient::fetch`] returns
    /// them as [`ApiResult::Failure`] instead.
    pub throw_on_error: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            log_errors: true,
            throw_on_error: true,
        }
    }
}

impl FetchConfig {
    pub fn silent() -> Self {
        Self {
            log_errors: false,
            ..Self::default()
        }
    }

    pub fn with_log_errors(mut self, enabled: bool) -> Self {
        self.log_errors = enabled;
        self
    }

    pub fn with_throw_on_error(mut self, enabled: bool) -> Self {
        self.throw_on_error = enabled;
        self
    }
}

/// Builder for [`FetchClient`].
#[derive(Default)]
pub struct FetchClientBuilder {
    timeout: Option<Duration>,
    error_log: Option<Arc<dyn ErrorSink>>,
    user_agent: Option<String>,
}

impl FetchClientBuilder {
    /// Per-request deadline. Expiry is reported as a timeout failure.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn error_log(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.error_log = Some(sink);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> reqwest::Result<FetchClient> {
        let mut builder = reqwest::Client::builder().user_agent(
            self.user_agent
                .unwrap_or_else(|| format!("storefront/{}", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(FetchClient {
            client: builder.build()?,
            error_log: self.error_log,
        })
    }
}

/// HTTP client whose failures are always [`NormalizedError`] values.
#[derive(Clone)]
pub struct FetchClient {
    client: reqwest::Client,
    error_log: Option<Arc<dyn ErrorSink>>,
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("error_log", &self.error_log.is_some())
            .finish()
    }
}

impl FetchClient {
    pub fn builder() -> FetchClientBuilder {
        FetchClientBuilder::default()
    }

    /// Wraps an existing client with no error log attached.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            error_log: None,
        }
    }

    /// Starts a GET request.
    pub fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Sends `request` and returns the decoded payload or the normalized failure.
    ///
    /// `config.throw_on_error` is ignored here; failures are always `Err`.
    pub async fn fetch_checked<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        config: &FetchConfig,
    ) -> Result<Payload<T>, NormalizedError> {
        self.execute(request, config)
            .await
            .map(|(payload, _)| payload)
    }

    /// Sends `request` and returns an explicit [`ApiResult`].
    ///
    /// With `throw_on_error` set (the default) failures are returned as `Err`;
    /// otherwise they come back as `Ok(ApiResult::Failure)` and the caller must
    /// check.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        config: &FetchConfig,
    ) -> Result<ApiResult<Payload<T>>, NormalizedError> {
        match self.execute(request, config).await {
            Ok((data, status)) => Ok(ApiResult::Success { data, status }),
            Err(error) if config.throw_on_error => Err(error),
            Err(error) => Ok(ApiResult::failure(error)),
        }
    }

    /// GETs `url` and decodes the body as `T` with the default config.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, NormalizedError> {
        self.fetch_checked(self.get(url), &FetchConfig::default())
            .await?
            .into_value()
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        config: &FetchConfig,
    ) -> Result<(Payload<T>, u16), NormalizedError> {
        let request = match request.build() {
            Ok(request) => request,
            Err(e) => {
                let error = parse(e);
                if config.log_errors {
                    error!(kind = %error.kind(), "Failed to build request: {}", error);
                }
                return Err(error);
            }
        };

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "Sending request");

        let outcome = match self.client.execute(request).await {
            Ok(response) if response.status().is_success() => Self::decode(response).await,
            Ok(response) => Err(parse_response(response).await),
            Err(e) => Err(parse(e)),
        };

        if let Err(error) = &outcome {
            if config.log_errors {
                self.report(error, &method, &url);
            }
        }
        outcome
    }

    async fn decode<T: DeserializeOwned>(
        response: Response,
    ) -> Result<(Payload<T>, u16), NormalizedError> {
        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        let body = response.bytes().await.map_err(parse)?;
        let payload = if is_json {
            let value = serde_json::from_slice(&body).map_err(|e| {
                NormalizedError::new(ErrorKind::Unknown, format!("Unexpected response body: {}", e))
                    .with_status(status)
                    .stamped()
            })?;
            Payload::Json(value)
        } else {
            Payload::Text(String::from_utf8_lossy(&body).into_owned())
        };

        debug!(status, json = is_json, bytes = body.len(), "Request succeeded");
        Ok((payload, status))
    }

    fn report(&self, failure: &NormalizedError, method: &Method, url: &Url) {
        error!(
            kind = %failure.kind(),
            status = ?failure.status_code(),
            request_id = ?failure.request_id(),
            retryable = failure.is_retryable(),
            "{} {} failed: {}",
            method,
            url,
            failure
        );

        if let Some(sink) = &self.error_log {
            let context = ErrorContext::new()
                .with_component("fetch")
                .with_action(format!("{} {}", method, url.path()));
            sink.record(ErrorLogEntry::new(failure.clone(), context).with_url(url.as_str()));
        }
    }
}
