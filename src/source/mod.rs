//! Source resolution

pub mod resolver;

pub use resolver::{decode_base64, resolve_base64, Fetcher, ResolvedPdf};

use crate::error::Result;
use schemars::JsonSchema;
use serde::Serialize;

/// PDF source specification
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum PdfSource {
    /// URL to download PDF from
    Url {
        /// URL of the PDF file
        url: String,
    },
    /// Base64 encoded PDF data
    Base64 {
        /// Base64 encoded PDF content
        base64: String,
    },
}

impl PdfSource {
    /// Fetch or decode the source bytes
    pub async fn resolve(&self, fetcher: &Fetcher) -> Result<ResolvedPdf> {
        match self {
            PdfSource::Url { url } => fetcher.fetch(url).await,
            PdfSource::Base64 { base64 } => resolve_base64(base64),
        }
    }

    /// Whether the source carries no locator at all
    pub fn is_empty(&self) -> bool {
        match self {
            PdfSource::Url { url } => url.trim().is_empty(),
            PdfSource::Base64 { base64 } => base64.trim().is_empty(),
        }
    }
}

impl<'de> serde::Deserialize<'de> for PdfSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        // A bare string is taken as a URL
        if let Some(s) = value.as_str() {
            return Ok(PdfSource::Url { url: s.to_string() });
        }

        let Some(obj) = value.as_object() else {
            return Err(serde::de::Error::custom(
                "Invalid source: expected a URL string or an object with \"url\" or \"base64\"",
            ));
        };

        if let Some(v) = obj.get("url") {
            return match v.as_str() {
                Some(s) => Ok(PdfSource::Url { url: s.to_string() }),
                None => Err(serde::de::Error::custom("\"url\" must be a string")),
            };
        }
        if let Some(v) = obj.get("base64") {
            return match v.as_str() {
                Some(s) => Ok(PdfSource::Base64 {
                    base64: s.to_string(),
                }),
                None => Err(serde::de::Error::custom("\"base64\" must be a string")),
            };
        }

        let keys: Vec<&String> = obj.keys().collect();
        Err(serde::de::Error::custom(format!(
            "Invalid source: expected an object with \"url\" or \"base64\", but got keys: {:?}",
            keys
        )))
    }
}
