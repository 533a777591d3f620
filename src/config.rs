//! Configuration for PDF Form Server
//!
//! Built once at startup from the process environment (after loading an
//! optional `.env` file) and handed to the storage and signing clients.

use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

/// Top-level server configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub storage: StorageConfig,
    pub signing: SigningConfig,
    pub fetch: FetchConfig,
    pub geometry: GeometryConfig,
}

/// S3 object storage settings
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub bucket: String,
    /// Public URL prefix; the object key is appended verbatim
    pub base_url: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2, ...)
    pub endpoint: Option<String>,
}

/// E-signature service settings
#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub api_key: String,
    pub base_url: String,
    /// Delay between template creation and document creation
    pub template_wait: Duration,
    /// Extra attempts for document creation, with doubling backoff
    pub document_retries: u32,
    /// Upper bound for the whole template + document sequence
    pub timeout: Duration,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://www.signwell.com/api/v1".to_string(),
            template_wait: Duration::from_secs(10),
            document_retries: 0,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Source download settings
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Allow URLs that resolve to private/reserved IPs (default: false)
    pub allow_private_urls: bool,
    /// Maximum download size in bytes (default: 100MB)
    pub max_download_bytes: u64,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            allow_private_urls: false,
            max_download_bytes: 100 * 1024 * 1024, // 100MB
            timeout: Duration::from_secs(60),
        }
    }
}

/// Signature anchor geometry settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryConfig {
    /// Assumed rendering resolution in DPI
    pub resolution: f64,
    /// Horizontal calibration against the signing UI
    pub factor_x: f64,
    /// Vertical calibration against the signing UI
    pub factor_y: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            resolution: 72.0,
            factor_x: 1.37,
            factor_y: 1.32,
        }
    }
}

impl Config {
    /// Read configuration from environment variables.
    ///
    /// Credentials are required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        let fetch_defaults = FetchConfig::default();
        let signing_defaults = SigningConfig::default();

        Ok(Config {
            storage: StorageConfig {
                access_key: required("AWS_BUCKET_ACCESS_KEY_ID")?,
                secret_key: required("AWS_BUCKET_SECRET_ACCESS_KEY")?,
                region: required("AWS_S3_REGION")?,
                bucket: required("AWS_BUCKET_NAME")?,
                base_url: required("S3_BASE_URL")?,
                endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            },
            signing: SigningConfig {
                api_key: required("SIGNWELL_API_KEY")?,
                base_url: env::var("SIGNWELL_BASE_URL").unwrap_or(signing_defaults.base_url),
                template_wait: parsed("SIGNWELL_TEMPLATE_WAIT_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(signing_defaults.template_wait),
                document_retries: parsed("SIGNWELL_DOCUMENT_RETRIES")?
                    .unwrap_or(signing_defaults.document_retries),
                timeout: parsed("SIGNWELL_TIMEOUT_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(signing_defaults.timeout),
            },
            fetch: FetchConfig {
                allow_private_urls: parsed("PDF_ALLOW_PRIVATE_URLS")?
                    .unwrap_or(fetch_defaults.allow_private_urls),
                max_download_bytes: parsed("PDF_MAX_DOWNLOAD_BYTES")?
                    .unwrap_or(fetch_defaults.max_download_bytes),
                timeout: parsed("PDF_FETCH_TIMEOUT_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(fetch_defaults.timeout),
            },
            geometry: GeometryConfig {
                resolution: positive("PDF_ASSUMED_DPI")?
                    .unwrap_or(GeometryConfig::default().resolution),
                ..GeometryConfig::default()
            },
        })
    }
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config {
            reason: format!("{} is not set", name),
        }),
    }
}

fn parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map(Some).map_err(|_| Error::Config {
                reason: format!("{} has an invalid value: {}", name, raw),
            })
        }
        _ => Ok(None),
    }
}

/// A finite number greater than zero, when set
fn positive(name: &str) -> Result<Option<f64>> {
    match parsed::<f64>(name)? {
        Some(value) if !(value.is_finite() && value > 0.0) => Err(Error::Config {
            reason: format!("{} must be a positive number, got {}", name, value),
        }),
        value => Ok(value),
    }
}
