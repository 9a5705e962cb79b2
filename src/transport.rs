//! Transport to the host's query-execution endpoint.
//! The bridge itself is transport-agnostic: anything that can carry a
//! [`QueryRequest`] and answer with a [`QueryResponse`] plugs in here. The
//! shipped implementation posts JSON over HTTP.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::request::QueryRequest;
use crate::response::QueryResponse;

#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// Execute one batch. Transport-level failure fails the whole batch;
    /// per-query backend errors travel inside the response.
    async fn execute(&self, request: &QueryRequest) -> AppResult<QueryResponse>;
}

#[async_trait]
impl<T: QueryTransport + ?Sized> QueryTransport for &T {
    async fn execute(&self, request: &QueryRequest) -> AppResult<QueryResponse> {
        (**self).execute(request).await
    }
}

#[async_trait]
impl<T: QueryTransport + ?Sized> QueryTransport for std::sync::Arc<T> {
    async fn execute(&self, request: &QueryRequest) -> AppResult<QueryResponse> {
        (**self).execute(request).await
    }
}

const QUERY_PATH: &str = "/api/ds/query";

#[derive(Clone, Debug)]
pub struct HttpTransport {
    base: Url,
    client: reqwest::Client,
    bearer: Option<String>,
}

impl HttpTransport {
    pub fn connect(base: &str) -> AppResult<Self> {
        let base = Url::parse(base)
            .context("invalid base URL")
            .map_err(AppError::from)?;
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")
            .map_err(AppError::from)?;
        Ok(HttpTransport { base, client, bearer: None })
    }

    /// Attach a bearer token to every request.
    pub fn with_bearer<S: Into<String>>(mut self, token: S) -> Self {
        self.bearer = Some(token.into());
        self
    }

    fn query_url(&self) -> Result<Url> {
        self.base.join(QUERY_PATH).context("invalid query endpoint")
    }

    async fn post(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let url = self.query_url()?;
        debug!(%url, queries = request.queries.len(), "dispatching batch");
        let mut builder = self.client.post(url).json(request);
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        let resp = builder.send().await.context("request dispatch failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("remote error: HTTP {status}: {body}"));
        }
        let response: QueryResponse =
            resp.json().await.context("failed to decode query response")?;
        Ok(response)
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn execute(&self, request: &QueryRequest) -> AppResult<QueryResponse> {
        self.post(request).await.map_err(AppError::from)
    }
}
