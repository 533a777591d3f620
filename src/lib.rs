//! PDF Form MCP Server Library
//!
//! This crate provides MCP tools for PDF form processing:
//! - `list_fields`: List AcroForm fields with their kinds
//! - `rename_fields`: Rebuild fields under new names, keeping their widgets
//! - `fill_form`: Fill fields and hand the result to an e-signature service
//! - `upload_raw`: Store files unmodified and return their URLs

pub mod config;
pub mod error;
pub mod pdf;
pub mod server;
pub mod service;
pub mod signing;
pub mod source;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use server::{run_server, run_server_with_config, PdfFormServer};
pub use service::{FillRequest, FormService};
