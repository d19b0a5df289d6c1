//! PostgREST (Supabase) REST client.
//!
//! Production-grade client with:
//! - Service-role key authentication
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter for reads
//! - Observability (tracing spans, metrics)

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, info_span, Instrument};
use url::Url;

use crate::datastore::Datastore;
use crate::error::{DbError, DbResult};
use crate::metrics::{record_conditional_miss, record_request};
use crate::query::{Filter, Query};
use crate::retry::{with_retry, with_retry_when, RetryConfig};

// =============================================================================
// Configuration
// =============================================================================

/// Supabase client configuration.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: Url,
    /// Service-role key; bypasses row-level security
    pub service_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl SupabaseConfig {
    pub fn new(url: &str, service_key: impl Into<String>) -> DbResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| DbError::config(format!("Invalid SUPABASE_URL '{}': {}", url, e)))?;

        Ok(Self {
            url,
            service_key: service_key.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        })
    }

    /// Create config from environment variables.
    pub fn from_env() -> DbResult<Self> {
        let url = std::env::var("SUPABASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DbError::config("SUPABASE_URL must be set"))?;

        let service_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DbError::config("SUPABASE_SERVICE_ROLE_KEY must be set"))?;

        let timeout_secs: u64 = std::env::var("DB_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let mut config = Self::new(&url, service_key)?;
        config.timeout = Duration::from_secs(timeout_secs);
        config.retry = RetryConfig::from_env();
        Ok(config)
    }
}

// =============================================================================
// Client
// =============================================================================

/// PostgREST client over the Supabase REST endpoint.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    config: SupabaseConfig,
    rest_url: String,
}

impl SupabaseClient {
    /// Create a new client.
    pub fn new(config: SupabaseConfig) -> DbResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("clipgen-db/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DbError::Network)?;

        let rest_url = format!("{}/rest/v1", config.url.as_str().trim_end_matches('/'));

        Ok(Self {
            http,
            config,
            rest_url,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> DbResult<Self> {
        Self::new(SupabaseConfig::from_env()?)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }

    async fn send_for_rows(&self, builder: RequestBuilder, url: &str) -> DbResult<Vec<Value>> {
        let response = builder.send().await?;
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let rows: Vec<Value> = response.json().await?;
                Ok(rows)
            }
            StatusCode::NO_CONTENT => Ok(Vec::new()),
            _ => Err(Self::handle_error_response(status, url, response).await),
        }
    }

    /// Run a request future with a span and request metrics.
    async fn execute_request<T, F>(&self, operation: &str, table: &str, fut: F) -> DbResult<T>
    where
        F: std::future::Future<Output = DbResult<T>>,
    {
        let span = info_span!("db_request", operation = %operation, table = %table);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, table, status, latency_ms);

        result
    }

    async fn handle_error_response(
        status: StatusCode,
        url: &str,
        response: reqwest::Response,
    ) -> DbError {
        let retry_after_ms = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| secs * 1000);

        let body = response.text().await.unwrap_or_default();
        match DbError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body)) {
            DbError::RateLimited(default_ms) => {
                DbError::RateLimited(retry_after_ms.unwrap_or(default_ms))
            }
            other => other,
        }
    }
}

#[async_trait]
impl Datastore for SupabaseClient {
    async fn select(&self, table: &str, query: &Query) -> DbResult<Vec<Value>> {
        let url = &self.table_url(table);
        let pairs = &query.to_query_pairs();

        self.execute_request("select", table, async {
            with_retry(&self.config.retry, "select", move || async move {
                let builder = self.request(Method::GET, table).query(pairs);
                self.send_for_rows(builder, url).await
            })
            .await
        })
        .await
    }

    async fn insert(&self, table: &str, row: Value) -> DbResult<Value> {
        let url = &self.table_url(table);
        let row = &row;

        self.execute_request("insert", table, async {
            let rows = with_retry_when(
                &self.config.retry,
                "insert",
                DbError::is_retryable_write,
                move || async move {
                    let builder = self
                        .request(Method::POST, table)
                        .header("Prefer", "return=representation")
                        .json(row);
                    self.send_for_rows(builder, url).await
                },
            )
            .await?;

            rows.into_iter()
                .next()
                .ok_or_else(|| DbError::invalid_response(format!("insert into {} returned no row", table)))
        })
        .await
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> DbResult<Vec<Value>> {
        if filters.is_empty() {
            return Err(DbError::request_failed(format!(
                "refusing unfiltered update of {}",
                table
            )));
        }

        let url = &self.table_url(table);
        let pairs = &filters.iter().map(Filter::to_query_pair).collect::<Vec<_>>();
        let patch = &patch;

        self.execute_request("update", table, async {
            let rows = with_retry_when(
                &self.config.retry,
                "update",
                DbError::is_retryable_write,
                move || async move {
                    let builder = self
                        .request(Method::PATCH, table)
                        .query(pairs)
                        .header("Prefer", "return=representation")
                        .json(patch);
                    self.send_for_rows(builder, url).await
                },
            )
            .await?;

            if rows.is_empty() {
                debug!(table = %table, "Conditional update matched no rows");
                record_conditional_miss(table);
            }
            Ok(rows)
        })
        .await
    }
}
