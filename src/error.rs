//! Error types for PDF Form Server

use thiserror::Error;

/// Result type alias for PDF Form Server
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for PDF Form Server
///
/// Only whole-document failures live here. Per-field conditions (missing
/// field, unsupported kind) are reported as [`crate::pdf::FieldWarning`]
/// values inside operation results and never abort a batch.
#[derive(Error, Debug)]
pub enum Error {
    /// Source PDF could not be fetched
    #[error("Failed to fetch source PDF: {reason}")]
    Fetch { reason: String },

    /// Source bytes are not a well-formed PDF
    #[error("Invalid PDF file: {reason}")]
    Parse { reason: String },

    /// Object storage rejected or failed the upload
    #[error("Storage error: {reason}")]
    Storage { reason: String },

    /// The e-signature service did not accept the request
    #[error("External service error: {reason}")]
    ExternalService { reason: String },

    /// Operation exceeded its time budget
    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// Missing or malformed configuration
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Required request parameter missing or inconsistent
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// PDF object graph error
    #[error("PDF structure error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Writing the document failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Blocking task failed to complete
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// SSRF blocked (URL resolves to private/reserved IP)
    #[error("SSRF blocked: {url}")]
    SsrfBlocked { url: String },

    /// Download too large
    #[error("Download too large: {size} bytes (max: {max_size} bytes)")]
    DownloadTooLarge { size: u64, max_size: u64 },
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Internal details (credentials, library errors, file sizes) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::Fetch { .. } => "Failed to fetch source PDF".to_string(),
            Error::Parse { .. } => "Invalid PDF file".to_string(),
            Error::Storage { .. } => "Failed to store PDF".to_string(),
            Error::ExternalService { .. } => "Failed to create a sign well document".to_string(),
            Error::Timeout { operation, seconds } => {
                format!("{} timed out after {}s", operation, seconds)
            }
            Error::Config { .. } => "Server is not configured for this operation".to_string(),
            Error::InvalidRequest { reason } => reason.clone(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::HttpRequest(_) => "HTTP request failed".to_string(),
            Error::Pdf(_) => "PDF processing error".to_string(),
            Error::Io(_) => "PDF processing error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
            Error::Join(_) => "PDF processing error".to_string(),
            Error::SsrfBlocked { .. } => "URL not allowed".to_string(),
            Error::DownloadTooLarge { max_size, .. } => {
                format!("Download exceeds maximum size of {} bytes", max_size)
            }
        }
    }
}
