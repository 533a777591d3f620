//! Template then document handoff to the signing service

use super::client::SigningService;
use super::types::{
    DocumentRequest, DocumentResponse, SigningData, SigningOutcome, SigningRequest,
    TemplateRequest, SIGN_DOCUMENT_CREATED, TEMPLATE_CREATED,
};
use crate::config::SigningConfig;
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Drives the two-call signing sequence.
///
/// The service needs time to process a new template before documents can be
/// created from it, so the workflow waits `template_wait` in between. The
/// whole sequence is bounded by `timeout`; dropping the future cancels the
/// wait.
#[derive(Clone)]
pub struct SigningWorkflow {
    service: Arc<dyn SigningService>,
    template_wait: Duration,
    document_retries: u32,
    timeout: Duration,
}

impl SigningWorkflow {
    pub fn new(service: Arc<dyn SigningService>, config: &SigningConfig) -> Self {
        Self {
            service,
            template_wait: config.template_wait,
            document_retries: config.document_retries,
            timeout: config.timeout,
        }
    }

    pub async fn run(&self, request: &SigningRequest) -> Result<SigningOutcome> {
        tokio::time::timeout(self.timeout, self.run_steps(request))
            .await
            .map_err(|_| Error::Timeout {
                operation: "signing workflow".to_string(),
                seconds: self.timeout.as_secs(),
            })?
    }

    async fn run_steps(&self, request: &SigningRequest) -> Result<SigningOutcome> {
        let template = self
            .service
            .create_template(&TemplateRequest::from(request))
            .await?;

        if template.status.as_deref() != Some(TEMPLATE_CREATED) {
            return Err(Error::ExternalService {
                reason: format!("Template status was {:?}", template.status),
            });
        }
        let template_id = template.id.ok_or_else(|| Error::ExternalService {
            reason: "Template response carried no id".to_string(),
        })?;
        tracing::info!(template_id = %template_id, "Signing template created");

        tokio::time::sleep(self.template_wait).await;

        let document = self
            .create_document(DocumentRequest::new(
                template_id.clone(),
                request.document_name.clone(),
                request.recipients.clone(),
            ))
            .await?;
        tracing::info!(
            template_id = %template_id,
            document_id = ?document.id,
            "Signing document created"
        );

        Ok(SigningOutcome {
            message: SIGN_DOCUMENT_CREATED.to_string(),
            data: SigningData {
                document_id: document.id,
                embedded_urls: document.recipients,
                template_id,
                template_link: template.template_link,
            },
        })
    }

    /// Create the document, retrying with doubling backoff when configured
    async fn create_document(&self, request: DocumentRequest) -> Result<DocumentResponse> {
        let mut delay = self.template_wait;
        let mut attempt = 0;

        loop {
            match self.service.create_document(&request).await {
                Ok(document) => return Ok(document),
                Err(e) if attempt < self.document_retries => {
                    attempt += 1;
                    tracing::warn!(error = %e, attempt, "Document creation failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
