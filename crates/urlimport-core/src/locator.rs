//! Locator hooks: deciding whether a search root is handled remotely.

use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::fetch::Fetch;
use crate::listing::scan_listing;
use crate::resolver::{Resolver, UrlResolver};
use tracing::{debug, info, warn};

/// A hook asked, per search root, whether it can provide a resolver.
pub trait Locator: Send + Sync {
    /// Return a resolver for `candidate`, `Ok(None)` to decline, or an error
    /// that aborts the import.
    fn locate(&self, candidate: &str) -> Result<Option<Box<dyn Resolver>>>;
}

/// Check whether a root string looks like an HTTP(S) URL.
pub fn is_remote_root(candidate: &str) -> bool {
    candidate.starts_with("http://") || candidate.starts_with("https://")
}

/// Locator for HTTP(S) roots that discovers module names from the root's
/// listing.
pub struct UrlLocator<F: Fetch> {
    fetcher: F,
    config: ImportConfig,
}

impl<F: Fetch> UrlLocator<F> {
    /// Create a locator with the default extension and no allow/deny rules.
    pub fn new(fetcher: F) -> Self {
        Self::with_config(fetcher, ImportConfig::default())
    }

    /// Create a locator honoring the extension and allow/deny lists of `config`.
    pub fn with_config(fetcher: F, config: ImportConfig) -> Self {
        Self { fetcher, config }
    }

    /// Locate `candidate` and return the concrete resolver type.
    pub fn locate_url(&self, candidate: &str) -> Result<Option<UrlResolver>> {
        if !is_remote_root(candidate) {
            debug!("Declining non-HTTP root: {}", candidate);
            return Ok(None);
        }

        if !self.config.is_allowed(candidate) {
            warn!("Root rejected by allow/deny configuration: {}", candidate);
            return Err(ImportError::NotAllowed(candidate.to_string()));
        }

        let listing = self.fetcher.fetch_text(candidate)?;
        let available = scan_listing(&listing, &self.config.extension);

        info!("Located {} module(s) under {}", available.len(), candidate);

        Ok(Some(UrlResolver::new(
            candidate,
            self.config.extension.clone(),
            available,
        )))
    }
}

impl<F: Fetch> Locator for UrlLocator<F> {
    fn locate(&self, candidate: &str) -> Result<Option<Box<dyn Resolver>>> {
        Ok(self
            .locate_url(candidate)?
            .map(|resolver| Box::new(resolver) as Box<dyn Resolver>))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use rstest::rstest;

    const ROOT: &str = "http://localhost:8000";

    #[rstest]
    #[case("")]
    #[case("/usr/lib/python3")]
    #[case("./modules")]
    #[case("ftp://example.com/pub")]
    #[case("httpx")]
    #[case("HTTP://localhost:8000")]
    fn test_declines_without_network(#[case] candidate: &str) {
        let fetcher = MemoryFetcher::new();
        let locator = UrlLocator::new(fetcher.clone());

        assert!(locator.locate(candidate).unwrap().is_none());
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn test_locate_builds_resolver_from_listing() {
        let fetcher = MemoryFetcher::new().with(ROOT, "<a href=\"a.py\">a.py</a> <a href=\"b.py\">b.py</a>");
        let locator = UrlLocator::new(fetcher.clone());

        let resolver = locator.locate_url(ROOT).unwrap().unwrap();
        assert_eq!(resolver.root(), ROOT);
        assert_eq!(resolver.available(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(fetcher.requests(), vec![ROOT.to_string()]);
    }

    #[test]
    fn test_empty_listing_resolves_nothing() {
        let fetcher = MemoryFetcher::new().with(ROOT, "no modules here");
        let locator = UrlLocator::new(fetcher);

        let resolver = locator.locate(ROOT).unwrap().unwrap();
        assert!(resolver.resolve("anything").is_none());
    }

    #[test]
    fn test_listing_failure_propagates() {
        let locator = UrlLocator::new(MemoryFetcher::new());

        let err = locator.locate(ROOT).unwrap_err();
        assert!(matches!(err, ImportError::Http { status: 404, .. }));
    }

    #[test]
    fn test_denied_root_is_an_error() {
        let fetcher = MemoryFetcher::new().with(ROOT, "a.py");
        let config = ImportConfig {
            deny: vec!["http://localhost:*".to_string()],
            ..Default::default()
        };
        let locator = UrlLocator::with_config(fetcher.clone(), config);

        assert!(matches!(
            locator.locate(ROOT),
            Err(ImportError::NotAllowed(_))
        ));
        assert!(fetcher.requests().is_empty());
    }
}
