//! The fetch seam between the import pipeline and the transport.

use crate::error::{ImportError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Blocking retrieval of a URL's body.
pub trait Fetch: Send + Sync {
    /// Fetch a URL and return the response body as bytes.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;

    /// Fetch a URL and decode the body as UTF-8.
    fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.fetch_bytes(url)?;
        String::from_utf8(bytes).map_err(|_| ImportError::InvalidSource {
            origin: url.to_string(),
        })
    }
}

impl<F: Fetch + ?Sized> Fetch for Arc<F> {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch_bytes(url)
    }
}

/// In-memory fetcher serving a fixed URL → body map.
///
/// Records every requested URL so callers can check how often the network
/// would have been hit.
#[derive(Clone, Default, Debug)]
pub struct MemoryFetcher {
    bodies: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`, replacing any previous body.
    pub fn insert(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        let mut bodies = self.bodies.lock().unwrap_or_else(|e| e.into_inner());
        bodies.insert(url.into(), body.into());
    }

    /// Builder-style [`MemoryFetcher::insert`].
    pub fn with(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.insert(url, body);
        self
    }

    /// Stop serving `url`.
    pub fn remove(&self, url: &str) {
        let mut bodies = self.bodies.lock().unwrap_or_else(|e| e.into_inner());
        bodies.remove(url);
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Fetch for MemoryFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        let bodies = self.bodies.lock().unwrap_or_else(|e| e.into_inner());
        bodies.get(url).cloned().ok_or_else(|| ImportError::Http {
            url: url.to_string(),
            status: 404,
            message: "404 Not Found".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_fetcher_serves_and_records() {
        let fetcher = MemoryFetcher::new().with("http://host/a.py", "x = 1\n");

        assert_eq!(fetcher.fetch_text("http://host/a.py").unwrap(), "x = 1\n");
        assert!(matches!(
            fetcher.fetch_bytes("http://host/b.py"),
            Err(ImportError::Http { status: 404, .. })
        ));
        assert_eq!(
            fetcher.requests(),
            vec!["http://host/a.py".to_string(), "http://host/b.py".to_string()]
        );
    }

    #[test]
    fn test_fetch_text_rejects_invalid_utf8() {
        let fetcher = MemoryFetcher::new().with("http://host/bin.py", vec![0xff, 0xfe, 0x00]);

        let err = fetcher.fetch_text("http://host/bin.py").unwrap_err();
        assert!(matches!(err, ImportError::InvalidSource { origin } if origin == "http://host/bin.py"));
    }
}
