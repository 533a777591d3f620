//! Source resolution for PDF data

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use base64::Engine;
use futures_util::StreamExt;
use std::net::IpAddr;

/// Maximum redirects followed for one download
const MAX_REDIRECTS: usize = 10;

/// Resolved PDF data
#[derive(Debug)]
pub struct ResolvedPdf {
    pub data: Vec<u8>,
    pub source_name: String,
}

fn has_pdf_header(data: &[u8]) -> bool {
    data.len() >= 4 && &data[0..4] == b"%PDF"
}

/// Resolve base64 encoded data to PDF data
pub fn resolve_base64(base64_data: &str) -> Result<ResolvedPdf> {
    let data = decode_base64(base64_data)?;

    if !has_pdf_header(&data) {
        return Err(Error::Parse {
            reason: "Decoded data is not a valid PDF file".to_string(),
        });
    }

    Ok(ResolvedPdf {
        data,
        source_name: "<base64>".to_string(),
    })
}

/// Decode standard base64, tolerating surrounding whitespace
pub fn decode_base64(base64_data: &str) -> Result<Vec<u8>> {
    let engine = base64::engine::general_purpose::STANDARD;
    Ok(engine.decode(base64_data.trim())?)
}

/// Check if an IP address is private/reserved (loopback, link-local, private ranges, etc.)
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()                           // 127.0.0.0/8
                || v4.is_private()                     // 10/8, 172.16/12, 192.168/16
                || v4.is_link_local()                  // 169.254/16 (cloud metadata!)
                || v4.is_broadcast()                   // 255.255.255.255
                || v4.is_unspecified()                 // 0.0.0.0
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64  // CGNAT 100.64/10
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()                           // ::1
                || v6.is_unspecified()                 // ::
                || {
                    let segments = v6.segments();
                    // fc00::/7 (unique local)
                    (segments[0] & 0xFE00) == 0xFC00
                    // fe80::/10 (link-local)
                    || (segments[0] & 0xFFC0) == 0xFE80
                }
        }
    }
}

/// Downloads source documents over HTTP(S) with SSRF protection
/// and a size cap. Holds one connection pool for the server's lifetime.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    allow_private_urls: bool,
    max_download_bytes: u64,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        // Redirects are followed in `send` so every hop passes the SSRF check
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(Error::HttpRequest)?;

        Ok(Self {
            client,
            allow_private_urls: config.allow_private_urls,
            max_download_bytes: config.max_download_bytes,
        })
    }

    /// Check URL for SSRF by resolving DNS and verifying IPs are public
    async fn check_ssrf(&self, url_str: &str) -> Result<()> {
        let parsed = url::Url::parse(url_str).map_err(|e| Error::Fetch {
            reason: format!("Invalid URL: {}", e),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Fetch {
                reason: format!("Unsupported URL scheme: {}", parsed.scheme()),
            });
        }

        let host = parsed.host_str().ok_or_else(|| Error::Fetch {
            reason: "URL has no host".to_string(),
        })?;

        let port = parsed.port_or_known_default().unwrap_or(443);
        let addr_str = format!("{}:{}", host, port);

        let addrs = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::Fetch {
                reason: format!("DNS resolution failed for {}: {}", host, e),
            })?;

        for addr in addrs {
            if is_private_ip(&addr.ip()) {
                return Err(Error::SsrfBlocked {
                    url: url_str.to_string(),
                });
            }
        }

        Ok(())
    }

    /// GET `url`, following redirects and checking each hop
    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        let mut current = url.to_string();

        for _ in 0..=MAX_REDIRECTS {
            if !self.allow_private_urls {
                self.check_ssrf(&current).await?;
            }

            let response = self
                .client
                .get(&current)
                .send()
                .await
                .map_err(|e| Error::Fetch {
                    reason: e.to_string(),
                })?;

            if !response.status().is_redirection() {
                return Ok(response);
            }

            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok());
            let next = redirect_target(&current, location)?;
            tracing::debug!(from = %current, to = %next, "Following redirect");
            current = next;
        }

        Err(Error::Fetch {
            reason: format!("Too many redirects (max: {})", MAX_REDIRECTS),
        })
    }

    /// Download a URL and validate that it holds a PDF.
    ///
    /// Non-2xx responses, transport failures and empty bodies are
    /// [`Error::Fetch`]; a body without a `%PDF` header is [`Error::Parse`].
    pub async fn fetch(&self, url: &str) -> Result<ResolvedPdf> {
        let response = self.send(url).await?;

        if !response.status().is_success() {
            return Err(Error::Fetch {
                reason: format!("HTTP request failed with status: {}", response.status()),
            });
        }

        // Check Content-Length header for early rejection
        if let Some(content_length) = response.content_length() {
            if content_length > self.max_download_bytes {
                return Err(Error::DownloadTooLarge {
                    size: content_length,
                    max_size: self.max_download_bytes,
                });
            }
        }

        // Stream the response body with incremental size checking to prevent OOM
        let mut data = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Fetch {
                reason: e.to_string(),
            })?;
            data.extend_from_slice(&chunk);
            if data.len() as u64 > self.max_download_bytes {
                return Err(Error::DownloadTooLarge {
                    size: data.len() as u64,
                    max_size: self.max_download_bytes,
                });
            }
        }

        if data.is_empty() {
            return Err(Error::Fetch {
                reason: "Response body is empty".to_string(),
            });
        }

        if !has_pdf_header(&data) {
            return Err(Error::Parse {
                reason: "Downloaded data is not a valid PDF file".to_string(),
            });
        }

        tracing::debug!(url = %url, bytes = data.len(), "Source downloaded");

        Ok(ResolvedPdf {
            data,
            source_name: url.to_string(),
        })
    }
}

/// Absolute URL a redirect response points to
fn redirect_target(current: &str, location: Option<&str>) -> Result<String> {
    let location = location.ok_or_else(|| Error::Fetch {
        reason: "Redirect without Location header".to_string(),
    })?;
    let base = url::Url::parse(current).map_err(|e| Error::Fetch {
        reason: format!("Invalid URL: {}", e),
    })?;
    let next = base.join(location).map_err(|e| Error::Fetch {
        reason: format!("Invalid redirect location: {}", e),
    })?;
    Ok(next.to_string())
}
