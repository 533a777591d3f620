//! MCP Server implementation using rmcp

use crate::config::Config;
use crate::error::Error;
use crate::pdf::{FieldValue, FieldWarning, FillResult, RenamedField};
use crate::service::{
    require, FillRequest, FormService, ListedField, RawFile, UploadedFile,
};
use crate::signing::{Placeholder, Recipient, SignatureFieldRequest, SigningData};
use crate::source::PdfSource;
use anyhow::Result;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// PDF Form MCP Server
#[derive(Clone)]
pub struct PdfFormServer {
    service: Arc<FormService>,
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Request/Response types for list_fields
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFieldsParams {
    /// Source PDF containing form fields
    pub source: PdfSource,
    /// Only list text fields (default: false)
    #[serde(default)]
    pub text_only: bool,
}

#[derive(Debug, Serialize)]
pub struct ListFieldsResult {
    /// Source identifier
    pub source: String,
    /// Fields in document order
    pub fields: Vec<ListedField>,
    pub total_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for rename_fields
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RenameFieldsParams {
    /// Source PDF containing form fields
    pub source: PdfSource,
    /// Current field names
    #[serde(default)]
    pub old_fields: Option<Vec<String>>,
    /// New field names, paired with `old_fields` by position
    #[serde(default)]
    pub new_fields: Option<Vec<String>>,
    /// File name of the stored result
    #[serde(default)]
    pub output: String,
}

#[derive(Debug, Serialize)]
pub struct RenameFieldsResult {
    /// Source identifier
    pub source: String,
    pub success: bool,
    /// URL of the stored document
    pub file_url: Option<String>,
    pub renamed: Vec<RenamedField>,
    pub warnings: Vec<FieldWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for fill_form
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FillFormParams {
    /// Source PDF containing form fields
    pub source: PdfSource,
    /// Names of the fields to fill
    #[serde(default)]
    pub field_names: Option<Vec<String>>,
    /// Values paired with `field_names` by position (string or boolean)
    #[serde(default)]
    pub field_values: Option<Vec<FieldValue>>,
    /// File name of the stored result
    #[serde(default)]
    pub output: String,
    /// Fields whose widgets become signature positions
    #[serde(default)]
    pub signature_fields: Option<Vec<SignatureFieldRequest>>,
    /// Signer roles of the signing template
    #[serde(default)]
    pub placeholders: Option<Vec<Placeholder>>,
    /// Signers assigned to the placeholders
    #[serde(default)]
    pub recipients: Option<Vec<Recipient>>,
}

#[derive(Debug, Serialize)]
pub struct FillFormResult {
    /// Source identifier
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SigningData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub fill_results: Vec<FillResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for upload_raw
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UploadRawParams {
    /// Files to store
    #[serde(default)]
    pub files: Option<Vec<RawFile>>,
}

#[derive(Debug, Serialize)]
pub struct UploadRawResult {
    pub uploaded_files: Vec<UploadedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[tool_router]
impl PdfFormServer {
    pub fn new(service: FormService) -> Self {
        Self {
            service: Arc::new(service),
            tool_router: Self::tool_router(),
        }
    }

    /// Create a server backed by S3 storage and SignWell
    pub fn with_config(config: &Config) -> crate::error::Result<Self> {
        Ok(Self::new(FormService::from_config(config)?))
    }

    /// List form fields
    #[tool(
        description = "List the interactive form fields of a PDF in document order. Each entry carries the field kind (text, choice, check_box, push_button, combo_box, list_box, signature, unknown) and its fully qualified name.

Source format: one of {\"url\": \"https://...\"} or {\"base64\": \"...\"}"
    )]
    async fn list_fields(&self, Parameters(params): Parameters<ListFieldsParams>) -> String {
        let result = self
            .process_list_fields(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "list_fields failed");
                ListFieldsResult {
                    source: Self::source_name(&params.source),
                    fields: vec![],
                    total_count: 0,
                    error: Some(e.client_message()),
                }
            });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Rename form fields
    #[tool(
        description = "Rename form fields. Each field in old_fields is rebuilt as the same kind under the name at the same position in new_fields, keeping every widget's page and rectangle. Missing fields are skipped with a warning. The result is stored and its URL returned.

Source format: one of {\"url\": \"https://...\"} or {\"base64\": \"...\"}"
    )]
    async fn rename_fields(&self, Parameters(params): Parameters<RenameFieldsParams>) -> String {
        let result = self
            .process_rename_fields(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "rename_fields failed");
                RenameFieldsResult {
                    source: Self::source_name(&params.source),
                    success: false,
                    file_url: None,
                    renamed: vec![],
                    warnings: vec![],
                    error: Some(e.client_message()),
                }
            });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Fill form fields and create a signing document
    #[tool(
        description = "Fill form fields, store the filled PDF and create an embedded signing document for it. Text fields take the value, choice fields select the option with that label, check boxes are checked for true or any non-empty string. Widgets of signature_fields become signature positions for the given placeholders.

Source format: one of {\"url\": \"https://...\"} or {\"base64\": \"...\"}"
    )]
    async fn fill_form(&self, Parameters(params): Parameters<FillFormParams>) -> String {
        let result = self
            .process_fill_form(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "fill_form failed");
                FillFormResult {
                    source: Self::source_name(&params.source),
                    message: None,
                    data: None,
                    file_url: None,
                    fill_results: vec![],
                    error: Some(e.client_message()),
                }
            });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Upload files as-is
    #[tool(
        description = "Store one or more base64 encoded files without modification and return the URL of each. Input: {\"files\": [{\"name\": \"a.pdf\", \"base64\": \"...\"}]}"
    )]
    async fn upload_raw(&self, Parameters(params): Parameters<UploadRawParams>) -> String {
        let result = match self.service.upload_raw(params.files).await {
            Ok(uploaded_files) => UploadRawResult {
                uploaded_files,
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "upload_raw failed");
                UploadRawResult {
                    uploaded_files: vec![],
                    error: Some(e.client_message()),
                }
            }
        };

        serde_json::to_string_pretty(&result).unwrap_or_default()
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl PdfFormServer {
    fn source_name(source: &PdfSource) -> String {
        match source {
            PdfSource::Url { url } => url.clone(),
            PdfSource::Base64 { .. } => "<base64>".to_string(),
        }
    }

    async fn process_list_fields(
        &self,
        params: &ListFieldsParams,
    ) -> crate::error::Result<ListFieldsResult> {
        let fields = self
            .service
            .list_fields(&params.source, params.text_only)
            .await?;

        Ok(ListFieldsResult {
            source: Self::source_name(&params.source),
            total_count: fields.len() as u32,
            fields,
            error: None,
        })
    }

    async fn process_rename_fields(
        &self,
        params: &RenameFieldsParams,
    ) -> crate::error::Result<RenameFieldsResult> {
        let outcome = self
            .service
            .rename_fields(
                &params.source,
                params.old_fields.clone(),
                params.new_fields.clone(),
                &params.output,
            )
            .await?;

        Ok(RenameFieldsResult {
            source: Self::source_name(&params.source),
            success: outcome.success,
            file_url: outcome.file_url,
            renamed: outcome.renamed,
            warnings: outcome.warnings,
            error: outcome.error,
        })
    }

    async fn process_fill_form(
        &self,
        params: &FillFormParams,
    ) -> crate::error::Result<FillFormResult> {
        let request = Self::fill_request(params)?;
        let outcome = self.service.fill_form(request).await?;

        Ok(FillFormResult {
            source: Self::source_name(&params.source),
            message: Some(outcome.message),
            data: Some(outcome.data),
            file_url: Some(outcome.file_url),
            fill_results: outcome.fill_results,
            error: None,
        })
    }

    /// Check presence of every fill parameter, in declaration order
    fn fill_request(params: &FillFormParams) -> crate::error::Result<FillRequest> {
        if params.source.is_empty() {
            return Err(Error::InvalidRequest {
                reason: "source is required".to_string(),
            });
        }
        let field_names = require(params.field_names.clone(), "field_names")?;
        let field_values = require(params.field_values.clone(), "field_values")?;
        if params.output.trim().is_empty() {
            return Err(Error::InvalidRequest {
                reason: "output is required".to_string(),
            });
        }

        Ok(FillRequest {
            source: params.source.clone(),
            field_names,
            field_values,
            output: params.output.clone(),
            signature_fields: require(params.signature_fields.clone(), "signature_fields")?,
            placeholders: require(params.placeholders.clone(), "placeholders")?,
            recipients: require(params.recipients.clone(), "recipients")?,
        })
    }
}

#[tool_handler]
impl ServerHandler for PdfFormServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF Form Server lists, renames and fills PDF form fields, stores the results \
                 and hands filled documents to an e-signature service."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server with configuration read from the environment
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: Config) -> Result<()> {
    let server = PdfFormServer::with_config(&config)?;

    tracing::info!("PDF Form Server ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
