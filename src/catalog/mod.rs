//! Typed client for the dummyjson product catalog.
//!
//! Every call goes through the fetch wrapper and is retried with the
//! configured backoff policy, so callers only ever see a [`NormalizedError`].

pub mod types;

pub use types::{Dimensions, Product, ProductsParams, ProductsResponse, Review, ITEMS_PER_PAGE_OPTIONS};

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, StorefrontConfig};
use crate::error::{ErrorSink, NormalizedError};
use crate::fetch::{FetchClient, FetchConfig};
use crate::notification::{Notification, Notifier};
use crate::retry::RetryPolicy;

/// Errors that can occur when constructing a [`CatalogClient`].
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not a base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Client for the product catalog endpoints.
#[derive(Clone)]
pub struct CatalogClient {
    fetch: FetchClient,
    base_url: Url,
    retry: RetryPolicy,
    fetch_config: FetchConfig,
    notifier: Option<Arc<dyn Notifier>>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url.as_str())
            .field("retry", &self.retry)
            .field("fetch_config", &self.fetch_config)
            .finish()
    }
}

impl CatalogClient {
    /// Creates a client with the default retry policy and fetch config.
    pub fn new(base_url: Url, fetch: FetchClient) -> Result<Self, CatalogError> {
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            fetch,
            base_url,
            retry: RetryPolicy::default(),
            fetch_config: FetchConfig::default(),
            notifier: None,
        })
    }

    /// Builds a client, its HTTP stack and retry policy from configuration.
    pub fn from_config(
        config: &StorefrontConfig,
        error_log: Option<Arc<dyn ErrorSink>>,
    ) -> Result<Self, CatalogError> {
        let mut builder = FetchClient::builder();
        if let Some(timeout) = config.api.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(sink) = error_log {
            builder = builder.error_log(sink);
        }

        Ok(Self::new(config.base_url()?, builder.build()?)?
            .with_retry_policy(config.retry.policy())
            .with_fetch_config(config.fetch.fetch_config()))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_fetch_config(mut self, fetch_config: FetchConfig) -> Self {
        self.fetch_config = fetch_config;
        self
    }

    /// Emits a [`Notification::Retrying`] before every backoff sleep.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Lists products, optionally within one category.
    pub async fn fetch_products(
        &self,
        params: &ProductsParams,
    ) -> Result<ProductsResponse, NormalizedError> {
        let mut url = match params.category.as_deref() {
            Some(category) => self.endpoint(&["products", "category", category]),
            None => self.endpoint(&["products"]),
        };
        url.query_pairs_mut()
            .append_pair("limit", &params.limit.to_string())
            .append_pair("skip", &params.skip.to_string());

        self.get(url).await
    }

    /// Lists category names.
    ///
    /// Entries may be strings or objects carrying `name`, `slug` or `title`.
    /// Anything else is stringified. A non-array response yields no categories.
    pub async fn fetch_categories(&self) -> Result<Vec<String>, NormalizedError> {
        let data: Value = self.get(self.endpoint(&["products", "categories"])).await?;

        let Value::Array(items) = data else {
            debug!("Categories response is not an array");
            return Ok(Vec::new());
        };

        Ok(items.into_iter().map(category_name).collect())
    }

    /// Searches products by free text. A blank query returns nothing without
    /// touching the network.
    pub async fn search_products(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Product>, NormalizedError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut url = self.endpoint(&["products", "search"]);
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", &limit.to_string());

        let response: ProductsResponse = self.get(url).await?;
        Ok(response.products)
    }

    pub async fn fetch_product(&self, id: u64) -> Result<Product, NormalizedError> {
        let id = id.to_string();
        self.get(self.endpoint(&["products", id.as_str()])).await
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, NormalizedError> {
        debug!(%url, "Catalog request");

        self.retry
            .run_with_observer(
                || {
                    let request = self.fetch.get(url.clone());
                    async move {
                        self.fetch
                            .fetch_checked::<T>(request, &self.fetch_config)
                            .await?
                            .into_value()
                    }
                },
                |session, error, delay| {
                    if let Some(notifier) = &self.notifier {
                        notifier.notify(&Notification::retrying(
                            session.attempt + 1,
                            session.max_attempts,
                            delay,
                            error.user_message(),
                        ));
                    }
                },
            )
            .await
    }
}

fn category_name(item: Value) -> String {
    match item {
        Value::String(name) => name,
        Value::Object(object) => ["name", "slug", "title"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| Value::Object(object).to_string()),
        other => other.to_string(),
    }
}
