//! SignWell REST client

use super::types::{DocumentRequest, DocumentResponse, TemplateRequest, TemplateResponse};
use crate::config::SigningConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The two calls of the signing handoff
#[async_trait]
pub trait SigningService: Send + Sync {
    /// Create a template from an uploaded file
    async fn create_template(&self, request: &TemplateRequest) -> Result<TemplateResponse>;

    /// Create a signing document from a template
    async fn create_document(&self, request: &DocumentRequest) -> Result<DocumentResponse>;
}

/// HTTP client for the SignWell API
#[derive(Clone)]
pub struct SignWellClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SignWellClient {
    pub fn new(config: &SigningConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::HttpRequest)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("accept", "application/json")
            .header("X-Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::ExternalService {
                reason: format!("POST {} failed: {}", path, e),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| Error::ExternalService {
            reason: format!("POST {} body unreadable: {}", path, e),
        })?;
        tracing::debug!(path = %path, status = %status, "Signing service responded");

        if !status.is_success() {
            return Err(Error::ExternalService {
                reason: format!("POST {} returned {}: {}", path, status, text),
            });
        }

        serde_json::from_str(&text).map_err(|e| Error::ExternalService {
            reason: format!("POST {} returned malformed JSON: {}", path, e),
        })
    }
}

#[async_trait]
impl SigningService for SignWellClient {
    async fn create_template(&self, request: &TemplateRequest) -> Result<TemplateResponse> {
        self.post("/document_templates/", request).await
    }

    async fn create_document(&self, request: &DocumentRequest) -> Result<DocumentResponse> {
        self.post("/document_templates/documents/", request).await
    }
}
