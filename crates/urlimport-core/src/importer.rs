//! The importer: ordered hooks and search roots driving locate, resolve, load.

use crate::descriptor::ModuleDescriptor;
use crate::error::{ImportError, Result};
use crate::loader::{Loader, Module};
use crate::locator::Locator;
use crate::resolver::Resolver;
use std::collections::HashMap;
use tracing::debug;

/// Imports modules by asking each search root, in order, for a resolver.
///
/// Resolvers are cached per root, including roots every hook declined, so a
/// root's listing is fetched at most once until [`Importer::invalidate_caches`]
/// is called. Modules themselves are never cached: each import fetches and
/// executes the source again.
pub struct Importer<L: Loader> {
    hooks: Vec<Box<dyn Locator>>,
    roots: Vec<String>,
    loader: L,
    resolvers: HashMap<String, Option<Box<dyn Resolver>>>,
}

impl<L: Loader> Importer<L> {
    /// Create an importer with no hooks and no roots.
    pub fn new(loader: L) -> Self {
        Self {
            hooks: Vec::new(),
            roots: Vec::new(),
            loader,
            resolvers: HashMap::new(),
        }
    }

    /// Append a locator hook.
    pub fn with_hook(mut self, hook: Box<dyn Locator>) -> Self {
        self.add_hook(hook);
        self
    }

    /// Append search roots.
    pub fn with_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for root in roots {
            self.add_root(root);
        }
        self
    }

    pub fn add_hook(&mut self, hook: Box<dyn Locator>) {
        self.hooks.push(hook);
    }

    pub fn add_root(&mut self, root: impl Into<String>) {
        self.roots.push(root.into());
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Forget every cached resolver so the next lookup re-locates its root.
    pub fn invalidate_caches(&mut self) {
        self.resolvers.clear();
    }

    /// Ask each hook in order for a resolver; the first that accepts wins.
    fn locate(&self, root: &str) -> Result<Option<Box<dyn Resolver>>> {
        for hook in &self.hooks {
            if let Some(resolver) = hook.locate(root)? {
                return Ok(Some(resolver));
            }
        }
        Ok(None)
    }

    /// Resolver for `root`, locating it on first use.
    pub fn resolver_for(&mut self, root: &str) -> Result<Option<&dyn Resolver>> {
        if !self.resolvers.contains_key(root) {
            let located = self.locate(root)?;
            if located.is_none() {
                debug!("No hook accepted root {}", root);
            }
            self.resolvers.insert(root.to_string(), located);
        }

        Ok(self.resolvers.get(root).and_then(|resolver| resolver.as_deref()))
    }

    /// Find the descriptor for `name` in the first root that resolves it.
    pub fn find(&mut self, name: &str) -> Result<Option<ModuleDescriptor>> {
        let roots = self.roots.clone();

        for root in &roots {
            if let Some(resolver) = self.resolver_for(root)? {
                if let Some(descriptor) = resolver.resolve(name) {
                    debug!("Resolved '{}' to {}", name, descriptor.origin);
                    return Ok(Some(descriptor));
                }
            }
        }

        Ok(None)
    }

    /// Import `name`: resolve it, create its module and execute it.
    pub fn import(&mut self, name: &str) -> Result<Module<L::Namespace>> {
        let descriptor = self
            .find(name)?
            .ok_or_else(|| ImportError::ModuleNotFound(name.to_string()))?;

        let mut module = self.loader.create_module(&descriptor);
        self.loader.exec_module(&mut module)?;
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use crate::locator::UrlLocator;

    /// Loader recording each source line as the namespace.
    struct LinesLoader(MemoryFetcher);

    impl Loader for LinesLoader {
        type Namespace = Vec<String>;

        fn create_module(&self, descriptor: &ModuleDescriptor) -> Module<Vec<String>> {
            Module {
                descriptor: descriptor.clone(),
                namespace: Vec::new(),
            }
        }

        fn exec_module(&self, module: &mut Module<Vec<String>>) -> Result<()> {
            use crate::fetch::Fetch;
            let source = self.0.fetch_text(&module.descriptor.origin)?;
            module.namespace = source.lines().map(str::to_string).collect();
            Ok(())
        }
    }

    fn importer(fetcher: &MemoryFetcher) -> Importer<LinesLoader> {
        Importer::new(LinesLoader(fetcher.clone()))
            .with_hook(Box::new(UrlLocator::new(fetcher.clone())))
    }

    #[test]
    fn test_import_from_first_matching_root() {
        let fetcher = MemoryFetcher::new()
            .with("http://one", "a.py")
            .with("http://two", "a.py b.py")
            .with("http://two/b.py", "from two");

        let mut importer = importer(&fetcher).with_roots(["/local/path", "http://one", "http://two"]);

        let module = importer.import("b").unwrap();
        assert_eq!(module.origin(), "http://two/b.py");
        assert_eq!(module.namespace, vec!["from two".to_string()]);
    }

    #[test]
    fn test_missing_module() {
        let fetcher = MemoryFetcher::new().with("http://one", "a.py");
        let mut importer = importer(&fetcher).with_roots(["http://one"]);

        let err = importer.import("missing").unwrap_err();
        assert!(matches!(err, ImportError::ModuleNotFound(name) if name == "missing"));
    }

    #[test]
    fn test_no_hooks_finds_nothing() {
        let fetcher = MemoryFetcher::new().with("http://one", "a.py");
        let mut importer = Importer::new(LinesLoader(fetcher.clone())).with_roots(["http://one"]);

        assert!(importer.find("a").unwrap().is_none());
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn test_listing_fetched_once_per_root() {
        let fetcher = MemoryFetcher::new()
            .with("http://one", "a.py")
            .with("http://one/a.py", "x");
        let mut importer = importer(&fetcher).with_roots(["http://one"]);

        importer.import("a").unwrap();
        importer.import("a").unwrap();

        assert_eq!(
            fetcher.requests(),
            vec![
                "http://one".to_string(),
                "http://one/a.py".to_string(),
                "http://one/a.py".to_string(),
            ]
        );
    }

    #[test]
    fn test_stale_listing_until_invalidated() {
        let fetcher = MemoryFetcher::new().with("http://one", "a.py");
        let mut importer = importer(&fetcher).with_roots(["http://one"]);

        assert!(importer.find("b").unwrap().is_none());

        fetcher.insert("http://one", "a.py b.py");
        assert!(importer.find("b").unwrap().is_none());

        importer.invalidate_caches();
        let descriptor = importer.find("b").unwrap().unwrap();
        assert_eq!(descriptor.origin, "http://one/b.py");
    }

    #[test]
    fn test_listing_error_aborts_import() {
        let fetcher = MemoryFetcher::new().with("http://two", "a.py");
        let mut importer = importer(&fetcher).with_roots(["http://one", "http://two"]);

        let err = importer.import("a").unwrap_err();
        assert!(matches!(err, ImportError::Http { ref url, .. } if url == "http://one"));
    }
}
