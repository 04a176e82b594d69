//! Camera snapshot source

use image::DynamicImage;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Snapshot bodies larger than this are truncated (and then fail to decode)
pub const MAX_SNAPSHOT_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("camera request failed: {0}")]
    Request(#[source] Box<ureq::Error>),
    #[error("failed to read camera response: {0}")]
    Io(#[from] std::io::Error),
    #[error("camera response is not a decodable image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Anything that can hand the acquisition loop a fresh frame
pub trait FrameSource {
    fn fetch(&mut self) -> Result<DynamicImage, FetchError>;
}

/// Fetches single JPEG snapshots over HTTP with a bounded timeout
pub struct HttpFrameSource {
    agent: ureq::Agent,
    url: String,
}

impl HttpFrameSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FrameSource for HttpFrameSource {
    fn fetch(&mut self) -> Result<DynamicImage, FetchError> {
        let response = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| FetchError::Request(Box::new(e)))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_SNAPSHOT_BYTES)
            .read_to_end(&mut bytes)?;
        debug!("Fetched {} bytes from {}", bytes.len(), self.url);

        Ok(image::load_from_memory(&bytes)?)
    }
}
