//! Authenticated HTTP access.
//!
//! The archivers only talk to the network through the [`Transport`] trait, so
//! the pagination and record logic can be driven by scripted responses in
//! tests. [`HttpTransport`] is the real implementation, backed by a blocking
//! `reqwest` client.
//!
//! Transports never retry and never interpret payloads; rate-limit handling
//! lives in [`pagination`](crate::pagination).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::error::{DumpError, Result};

/// Minimal network surface used by the archivers.
pub trait Transport {
    /// Issues an authenticated GET and returns the body, whatever the status.
    fn fetch_text(&self, url: &str) -> Result<String>;

    /// Streams the body of `url` into a new file at `dest`.
    ///
    /// Returns the number of bytes written.
    fn fetch_binary(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// [`Transport`] over HTTPS.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use ddump::transport::{HttpTransport, Transport};
///
/// let transport = HttpTransport::new("my-token", Duration::from_secs(30))?;
/// let body = transport.fetch_text("https://discord.com/api/v9/channels/123")?;
/// # Ok::<(), ddump::DumpError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    api: Client,
    cdn: Client,
}

impl HttpTransport {
    pub fn new(credential: &str, timeout: Duration) -> Result<Self> {
        let mut auth = HeaderValue::from_str(credential)
            .map_err(|_| DumpError::configuration("token contains invalid header characters"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let api = Client::builder()
            .user_agent(user_agent())
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        // Attachment URLs are public CDN links; the credential stays off them.
        let cdn = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()?;

        Ok(Self { api, cdn })
    }
}

impl Transport for HttpTransport {
    fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.api.get(url).send()?;
        tracing::trace!(url, status = %response.status(), "GET");
        Ok(response.text()?)
    }

    fn fetch_binary(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self.cdn.get(url).send()?.error_for_status()?;
        let mut file = BufWriter::new(File::create(dest)?);
        let written = response.copy_to(&mut file)?;
        file.flush()?;
        Ok(written)
    }
}

fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
