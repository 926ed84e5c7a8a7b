//! # HTTP Backend
//!
//! [`ComplianceBackend`] over the collaborator REST API with `reqwest`.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | create / list / get / patch / delete session | `POST`/`GET /sessions?status&framework`, `GET`/`PATCH`/`DELETE /sessions/{id}` |
//! | upload | `POST /sessions/{id}/upload` (multipart: `financial_statements`, `notes`) |
//! | chunks | `GET /sessions/{id}/chunks?page&page_size&taxonomy` |
//! | standards | `GET /standards`, `GET /standards/{key}`, `GET /standards/search?q=`, `POST /standards/reload` |
//! | analysis | `POST /sessions/{id}/analyze-stream` (NDJSON response) |
//! | re-analysis | `POST /sessions/{id}/re-analyze` |
//! | overrides | `POST`/`GET /sessions/{id}/override(s)` |
//! | results | `GET /sessions/{id}/results?standard&status&page&page_size` |
//!
//! The per-request timeout applies to every call except the analysis
//! stream, whose liveness the caller polices with an inactivity window.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

use rai_catalog::{section_key, CatalogSection, SearchHit, StandardsSummary};
use rai_core::{
    ChunkPage, ChunkQuery, NewSession, OverrideRecord, OverrideRequest, ReanalyzeRequest,
    ResultsPage, ResultsQuery, Session, SessionId, SessionPatch, SessionQuery,
};

use crate::backend::{ComplianceBackend, EventChannel};
use crate::config::{ClientConfig, ConfigError};
use crate::error::ClientError;
use crate::retry::RetryPolicy;
use crate::types::{OverrideResponse, ReanalyzeResponse, UploadReceipt};
use crate::upload::{UploadDocument, UploadRequest};

/// Compliance API client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpBackend {
    /// Build a client from validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                ConfigError::InvalidValue {
                    field: "api_token",
                    value: "[REDACTED]".to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|source| ClientError::Http {
                endpoint: "client builder".to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: config.trimmed_base_url().to_string(),
            timeout,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send an idempotent request with the retry policy and the
    /// per-request timeout.
    async fn send_idempotent<F>(
        &self,
        endpoint: &str,
        build: F,
    ) -> Result<reqwest::Response, ClientError>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let resp = self
            .retry
            .send(endpoint, || build().timeout(self.timeout).send())
            .await
        .map_err(|source| ClientError::Http {
            endpoint: endpoint.to_string(),
            source,
        })?;
        check_status(endpoint, resp).await
    }

    /// Send a request that starts server-side work. No retry.
    async fn send_once(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let resp = request.send().await.map_err(|source| ClientError::Http {
            endpoint: endpoint.to_string(),
            source,
        })?;
        check_status(endpoint, resp).await
    }

    async fn get_json<T, Q>(&self, endpoint: &str, query: Option<&Q>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + Sync + ?Sized,
    {
        let url = self.url(endpoint);
        let resp = self
            .send_idempotent(endpoint, || {
                let req = self.client.get(&url);
                match query {
                    Some(q) => req.query(q),
                    None => req,
                }
            })
            .await?;
        decode(endpoint, resp).await
    }

    async fn post_json<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: serde::Serialize + Sync + ?Sized,
    {
        let request = self
            .client
            .post(self.url(endpoint))
            .timeout(self.timeout)
            .json(body);
        let resp = self.send_once(endpoint, request).await?;
        decode(endpoint, resp).await
    }
}

async fn check_status(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::debug!(endpoint, status = status.as_u16(), "compliance API error response");
    Err(ClientError::from_status(endpoint, status.as_u16(), body))
}

async fn decode<T: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    resp.json::<T>().await.map_err(|e| ClientError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

fn document_part(endpoint: &str, doc: &UploadDocument) -> Result<Part, ClientError> {
    Part::bytes(doc.bytes.clone())
        .file_name(doc.file_name.clone())
        .mime_str(doc.content_type())
        .map_err(|source| ClientError::Http {
            endpoint: endpoint.to_string(),
            source,
        })
}

// ─── Event Channel ──────────────────────────────────────────────────

/// Body of an `analyze-stream` response, read chunk by chunk.
struct HttpEventChannel {
    response: reqwest::Response,
    endpoint: String,
}

#[async_trait]
impl EventChannel for HttpEventChannel {
    async fn next_fragment(&mut self) -> Result<Option<Vec<u8>>, ClientError> {
        match self.response.chunk().await {
            Ok(Some(bytes)) => Ok(Some(bytes.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(ClientError::Transport(format!("{}: {e}", self.endpoint))),
        }
    }
}

// ─── Backend ────────────────────────────────────────────────────────

#[async_trait]
impl ComplianceBackend for HttpBackend {
    async fn create_session(&self, new: &NewSession) -> Result<Session, ClientError> {
        self.post_json("/sessions", new).await
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, ClientError> {
        self.get_json::<_, ()>(&format!("/sessions/{id}"), None).await
    }

    async fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>, ClientError> {
        self.get_json("/sessions", Some(query)).await
    }

    async fn patch_session(
        &self,
        id: SessionId,
        patch: &SessionPatch,
    ) -> Result<Session, ClientError> {
        let endpoint = format!("/sessions/{id}");
        let url = self.url(&endpoint);
        let resp = self
            .send_idempotent(&endpoint, || self.client.patch(&url).json(patch))
            .await?;
        decode(&endpoint, resp).await
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), ClientError> {
        let endpoint = format!("/sessions/{id}");
        let url = self.url(&endpoint);
        self.send_idempotent(&endpoint, || self.client.delete(&url))
            .await?;
        Ok(())
    }

    async fn upload_documents(
        &self,
        id: SessionId,
        upload: &UploadRequest,
    ) -> Result<UploadReceipt, ClientError> {
        upload.validate()?;
        let endpoint = format!("/sessions/{id}/upload");
        let mut form = Form::new();
        if let Some(doc) = &upload.financial_statements {
            form = form.part("financial_statements", document_part(&endpoint, doc)?);
        }
        if let Some(doc) = &upload.notes {
            form = form.part("notes", document_part(&endpoint, doc)?);
        }
        let request = self
            .client
            .post(self.url(&endpoint))
            .timeout(self.timeout)
            .multipart(form);
        let resp = self.send_once(&endpoint, request).await?;
        decode(&endpoint, resp).await
    }

    async fn list_chunks(&self, id: SessionId, query: &ChunkQuery) -> Result<ChunkPage, ClientError> {
        self.get_json(&format!("/sessions/{id}/chunks"), Some(query))
            .await
    }

    async fn list_standards(&self) -> Result<StandardsSummary, ClientError> {
        self.get_json::<_, ()>("/standards", None).await
    }

    async fn get_standard(&self, key: &str) -> Result<CatalogSection, ClientError> {
        let key: String = url::form_urlencoded::byte_serialize(section_key(key).as_bytes()).collect();
        self.get_json::<_, ()>(&format!("/standards/{key}"), None)
            .await
    }

    async fn search_standards(&self, query: &str) -> Result<Vec<SearchHit>, ClientError> {
        self.get_json("/standards/search", Some(&[("q", query)]))
            .await
    }

    async fn reload_standards(&self) -> Result<StandardsSummary, ClientError> {
        self.post_json("/standards/reload", &serde_json::json!({}))
            .await
    }

    async fn start_analysis(&self, id: SessionId) -> Result<Box<dyn EventChannel>, ClientError> {
        let endpoint = format!("/sessions/{id}/analyze-stream");
        let request = self
            .client
            .post(self.url(&endpoint))
            .header(ACCEPT, "application/x-ndjson");
        let response = self.send_once(&endpoint, request).await?;
        tracing::info!(session_id = %id, "analysis stream opened");
        Ok(Box::new(HttpEventChannel { response, endpoint }))
    }

    async fn reanalyze(
        &self,
        id: SessionId,
        request: &ReanalyzeRequest,
    ) -> Result<ReanalyzeResponse, ClientError> {
        self.post_json(&format!("/sessions/{id}/re-analyze"), request)
            .await
    }

    async fn apply_override(
        &self,
        id: SessionId,
        request: &OverrideRequest,
    ) -> Result<OverrideResponse, ClientError> {
        self.post_json(&format!("/sessions/{id}/override"), request)
            .await
    }

    async fn list_overrides(&self, id: SessionId) -> Result<Vec<OverrideRecord>, ClientError> {
        self.get_json::<_, ()>(&format!("/sessions/{id}/overrides"), None)
            .await
    }

    async fn list_results(
        &self,
        id: SessionId,
        query: &ResultsQuery,
    ) -> Result<ResultsPage, ClientError> {
        self.get_json(&format!("/sessions/{id}/results"), Some(query))
            .await
    }
}
