//! Form operations: load, transform, persist, hand off for signing
//!
//! Each operation owns its document for the duration of one call. Parsing,
//! transforming and saving run on the blocking pool; fetching, storage and
//! the signing calls run on the async runtime.

use crate::config::{Config, GeometryConfig};
use crate::error::{Error, Result};
use crate::pdf::{self, FieldValue, FieldWarning, FillResult, FormDocument, RenamedField};
use crate::signing::{
    signature_anchors, Placeholder, Recipient, SignWellClient, SignatureFieldRequest,
    SigningData, SigningRequest, SigningService, SigningWorkflow,
};
use crate::source::{decode_base64, Fetcher, PdfSource};
use crate::storage::{persist, ObjectStore, S3Store};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A field as listed: kind label and fully qualified name
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ListedField {
    pub kind: String,
    pub name: String,
}

/// Outcome of a rename. Upload failures are reported here, not raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenameOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub file_url: Option<String>,
    pub renamed: Vec<RenamedField>,
    pub warnings: Vec<FieldWarning>,
}

/// Inputs of a fill-and-sign call
#[derive(Debug, Clone)]
pub struct FillRequest {
    pub source: PdfSource,
    pub field_names: Vec<String>,
    pub field_values: Vec<FieldValue>,
    pub output: String,
    pub signature_fields: Vec<SignatureFieldRequest>,
    pub placeholders: Vec<Placeholder>,
    pub recipients: Vec<Recipient>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillOutcome {
    pub message: String,
    pub data: SigningData,
    pub file_url: String,
    pub fill_results: Vec<FillResult>,
}

/// File for direct upload
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RawFile {
    /// File name used as the last segment of the object key
    pub name: String,
    /// Base64 encoded file content
    pub base64: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct UploadedFile {
    pub name: String,
    pub url: String,
}

/// Form operations bound to their storage and signing collaborators
#[derive(Clone)]
pub struct FormService {
    fetcher: Fetcher,
    store: Arc<dyn ObjectStore>,
    workflow: SigningWorkflow,
    base_url: String,
    geometry: GeometryConfig,
}

impl FormService {
    /// Build with explicit collaborators
    pub fn new(
        config: &Config,
        store: Arc<dyn ObjectStore>,
        signer: Arc<dyn SigningService>,
    ) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(&config.fetch)?,
            store,
            workflow: SigningWorkflow::new(signer, &config.signing),
            base_url: config.storage.base_url.clone(),
            geometry: config.geometry,
        })
    }

    /// Build with S3 storage and the SignWell client
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(S3Store::new(&config.storage));
        let signer = Arc::new(SignWellClient::new(&config.signing)?);
        Self::new(config, store, signer)
    }

    /// List `(kind, name)` of every field in native order
    pub async fn list_fields(&self, source: &PdfSource, text_only: bool) -> Result<Vec<ListedField>> {
        require_source(source)?;
        let data = source.resolve(&self.fetcher).await?.data;

        let fields = tokio::task::spawn_blocking(move || {
            let doc = FormDocument::from_bytes(&data)?;
            Ok::<_, Error>(
                pdf::list_fields(&doc, text_only)
                    .map(|(kind, name)| ListedField {
                        kind: kind.label().to_string(),
                        name,
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .await??;

        tracing::info!(fields = fields.len(), text_only, "Fields listed");
        Ok(fields)
    }

    /// Rename fields pairwise and store the result as `output`
    pub async fn rename_fields(
        &self,
        source: &PdfSource,
        old_fields: Option<Vec<String>>,
        new_fields: Option<Vec<String>>,
        output: &str,
    ) -> Result<RenameOutcome> {
        require_source(source)?;
        let old_fields = require(old_fields, "old_fields")?;
        let new_fields = require(new_fields, "new_fields")?;
        require_text(output, "output")?;

        let data = source.resolve(&self.fetcher).await?.data;

        let (report, bytes) = tokio::task::spawn_blocking(move || {
            let mut doc = FormDocument::from_bytes(&data)?;
            let report = pdf::rename_fields(&mut doc, &old_fields, &new_fields)?;
            let bytes = doc.save()?;
            Ok::<_, Error>((report, bytes))
        })
        .await??;

        for warning in &report.warnings {
            tracing::warn!(field = %warning.field, kind = ?warning.kind, "{}", warning.message);
        }

        match persist(self.store.as_ref(), &self.base_url, bytes, output).await {
            Ok(url) => {
                tracing::info!(renamed = report.renamed.len(), url = %url, "Fields renamed");
                Ok(RenameOutcome {
                    success: true,
                    error: None,
                    file_url: Some(url),
                    renamed: report.renamed,
                    warnings: report.warnings,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Upload of renamed document failed");
                Ok(RenameOutcome {
                    success: false,
                    error: Some(e.client_message()),
                    file_url: None,
                    renamed: report.renamed,
                    warnings: report.warnings,
                })
            }
        }
    }

    /// Fill fields, store the result and create a signing document from it
    pub async fn fill_form(&self, request: FillRequest) -> Result<FillOutcome> {
        require_source(&request.source)?;
        require_text(&request.output, "output")?;

        let FillRequest {
            source,
            field_names,
            field_values,
            output,
            signature_fields,
            placeholders,
            recipients,
        } = request;

        let data = source.resolve(&self.fetcher).await?.data;
        let geometry = self.geometry;

        let (fill_results, anchors, bytes) = tokio::task::spawn_blocking(move || {
            let mut doc = FormDocument::from_bytes(&data)?;
            let results = pdf::fill_form(&mut doc, &field_names, &field_values)?;
            let anchors = signature_anchors(&doc, &signature_fields, &geometry);
            let bytes = doc.save()?;
            Ok::<_, Error>((results, anchors, bytes))
        })
        .await??;

        let file_url = persist(self.store.as_ref(), &self.base_url, bytes, &output).await?;
        tracing::info!(
            fields = fill_results.len(),
            anchors = anchors.len(),
            url = %file_url,
            "Form filled"
        );

        let signing = SigningRequest {
            file_name: output.clone(),
            file_url: file_url.clone(),
            placeholders,
            signature_fields: anchors,
            document_name: output,
            recipients,
        };
        let outcome = self.workflow.run(&signing).await.inspect_err(|e| {
            tracing::warn!(error = %e, file_url = %file_url, "Signing handoff failed");
        })?;

        Ok(FillOutcome {
            message: outcome.message,
            data: outcome.data,
            file_url,
            fill_results,
        })
    }

    /// Store files as-is and return their public URLs
    pub async fn upload_raw(&self, files: Option<Vec<RawFile>>) -> Result<Vec<UploadedFile>> {
        let files = require(files, "files")?;

        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            require_text(&file.name, "name")?;
            let bytes = decode_base64(&file.base64)?;
            let url = persist(self.store.as_ref(), &self.base_url, bytes, &file.name).await?;
            uploaded.push(UploadedFile {
                name: file.name,
                url,
            });
        }

        tracing::info!(files = uploaded.len(), "Files uploaded");
        Ok(uploaded)
    }
}

fn require_source(source: &PdfSource) -> Result<()> {
    if source.is_empty() {
        return Err(missing("source"));
    }
    Ok(())
}

fn require_text(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(missing(name));
    }
    Ok(())
}

pub(crate) fn require<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| missing(name))
}

fn missing(name: &str) -> Error {
    Error::InvalidRequest {
        reason: format!("{} is required", name),
    }
}
