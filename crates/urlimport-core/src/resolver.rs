//! Name → descriptor resolution for a located root.

use crate::descriptor::ModuleDescriptor;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Maps module names to descriptors for a single root.
pub trait Resolver: fmt::Debug + Send + Sync {
    /// The root this resolver was built for.
    fn root(&self) -> &str;

    /// Names this resolver can resolve, in sorted order.
    fn available(&self) -> Vec<String>;

    /// Resolve `name`, or return `None` so the next root can be tried.
    fn resolve(&self, name: &str) -> Option<ModuleDescriptor>;
}

/// Resolver over the names discovered in a root's listing.
///
/// The name set is captured once when the root is located and never
/// refreshed.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    root: String,
    extension: String,
    available: BTreeSet<String>,
}

impl UrlResolver {
    pub fn new(root: impl Into<String>, extension: impl Into<String>, available: BTreeSet<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            available,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.available.contains(name)
    }
}

impl Resolver for UrlResolver {
    fn root(&self) -> &str {
        &self.root
    }

    fn available(&self) -> Vec<String> {
        self.available.iter().cloned().collect()
    }

    fn resolve(&self, name: &str) -> Option<ModuleDescriptor> {
        if !self.available.contains(name) {
            debug!("'{}' not listed under {}", name, self.root);
            return None;
        }

        Some(ModuleDescriptor::new(&self.root, name, &self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> UrlResolver {
        let names = ["a", "b"].iter().map(|s| s.to_string()).collect();
        UrlResolver::new("http://localhost:8000", "py", names)
    }

    #[test]
    fn test_resolve_known_name() {
        let descriptor = resolver().resolve("a").unwrap();
        assert_eq!(descriptor.name, "a");
        assert_eq!(descriptor.origin, "http://localhost:8000/a.py");
    }

    #[test]
    fn test_resolve_unknown_name() {
        assert!(resolver().resolve("c").is_none());
        assert!(resolver().resolve("").is_none());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = resolver();
        let first = resolver.resolve("b").unwrap();
        let second = resolver.resolve("b").unwrap();
        assert_eq!(first, second);
        assert_eq!(resolver.available(), vec!["a".to_string(), "b".to_string()]);
    }
}
