//! Payloads exchanged with the e-signature service

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status the service reports for a usable template
pub const TEMPLATE_CREATED: &str = "Created";

/// Message returned once the signing document exists
pub const SIGN_DOCUMENT_CREATED: &str = "Successfully Created the Sign Document";

/// A form field whose widgets become signature anchors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SignatureFieldRequest {
    /// Name of the form field marking the signature position
    pub name: String,
    /// Placeholder (signer role) the anchor is assigned to
    pub placeholder_id: String,
    /// Anchor type understood by the signing service, e.g. "signature"
    #[serde(rename = "type")]
    pub field_type: String,
}

/// Signer role on a template. Unknown members are passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Placeholder {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Person assigned to a placeholder. Unknown members are passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Recipient {
    pub id: String,
    pub name: String,
    pub email: String,
    pub placeholder_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_email: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_email_delay: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Positioned signature field on the template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SignatureAnchor {
    /// 1-based page number
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub placeholder_id: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: bool,
    pub fixed_width: bool,
    pub lock_sign_date: bool,
}

/// Everything needed to hand a stored document to the signing service
#[derive(Debug, Clone, PartialEq)]
pub struct SigningRequest {
    pub file_name: String,
    pub file_url: String,
    pub placeholders: Vec<Placeholder>,
    pub signature_fields: Vec<SignatureAnchor>,
    pub document_name: String,
    pub recipients: Vec<Recipient>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateFile {
    pub name: String,
    pub file_url: String,
}

/// Body of the template creation call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateRequest {
    pub draft: bool,
    pub reminders: bool,
    pub apply_signing_order: bool,
    pub text_tags: bool,
    pub allow_decline: bool,
    pub allow_reassign: bool,
    pub files: Vec<TemplateFile>,
    pub name: String,
    pub placeholders: Vec<Placeholder>,
    /// One group per file; all anchors belong to the single file
    pub fields: Vec<Vec<SignatureAnchor>>,
}

impl From<&SigningRequest> for TemplateRequest {
    fn from(request: &SigningRequest) -> Self {
        Self {
            draft: false,
            reminders: true,
            apply_signing_order: false,
            text_tags: false,
            allow_decline: true,
            allow_reassign: true,
            files: vec![TemplateFile {
                name: request.file_name.clone(),
                file_url: request.file_url.clone(),
            }],
            name: template_name(&request.file_name).to_string(),
            placeholders: request.placeholders.clone(),
            fields: vec![request.signature_fields.clone()],
        }
    }
}

/// Template name: the file name up to its first `.`
pub fn template_name(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TemplateResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub template_link: Option<String>,
}

/// Body of the document-from-template call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRequest {
    pub test_mode: bool,
    pub draft: bool,
    pub embedded_signing: bool,
    pub template_id: String,
    pub name: String,
    pub recipients: Vec<Recipient>,
}

impl DocumentRequest {
    pub fn new(template_id: String, name: String, recipients: Vec<Recipient>) -> Self {
        Self {
            test_mode: false,
            draft: false,
            embedded_signing: true,
            template_id,
            name,
            recipients,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DocumentResponse {
    #[serde(default)]
    pub id: Option<String>,
    /// Recipients with their embedded signing URLs
    #[serde(default)]
    pub recipients: serde_json::Value,
}

/// Identifiers of the created signing document
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SigningData {
    pub document_id: Option<String>,
    pub embedded_urls: serde_json::Value,
    pub template_id: String,
    pub template_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SigningOutcome {
    pub message: String,
    pub data: SigningData,
}
