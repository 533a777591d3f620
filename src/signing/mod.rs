//! E-signature handoff
//!
//! Converts signature form fields into positioned anchors and drives the
//! template and document calls against the signing service.

mod anchors;
mod client;
mod types;
mod workflow;

pub use anchors::signature_anchors;
pub use client::{SignWellClient, SigningService};
pub use types::{
    template_name, DocumentRequest, DocumentResponse, Placeholder, Recipient, SignatureAnchor,
    SignatureFieldRequest, SigningData, SigningOutcome, SigningRequest, TemplateFile,
    TemplateRequest, TemplateResponse, SIGN_DOCUMENT_CREATED, TEMPLATE_CREATED,
};
pub use workflow::SigningWorkflow;
