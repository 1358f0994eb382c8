//! Loading resolved modules: fetch, compile, execute.

use crate::descriptor::ModuleDescriptor;
use crate::error::{ImportError, Result};
use crate::fetch::Fetch;
use tracing::{debug, info};

/// Compiles and executes module source.
///
/// The engine decides what fetched source may do: it only reaches the
/// capabilities it was constructed with.
pub trait ModuleEngine: Send + Sync {
    /// Compiled form of a module's source.
    type Code;

    /// Destination populated by execution.
    type Namespace: Default;

    /// Compile or execution failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Compile `source`, attributing diagnostics to `origin`.
    fn compile(&self, source: &str, origin: &str) -> std::result::Result<Self::Code, Self::Error>;

    /// Run compiled top-level code inside `namespace`.
    fn execute(
        &self,
        code: &Self::Code,
        namespace: &mut Self::Namespace,
    ) -> std::result::Result<(), Self::Error>;
}

/// A module produced by a [`Loader`].
#[derive(Debug, Clone)]
pub struct Module<N> {
    pub descriptor: ModuleDescriptor,
    pub namespace: N,
}

impl<N> Module<N> {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn origin(&self) -> &str {
        &self.descriptor.origin
    }
}

/// Populates modules from descriptors.
pub trait Loader {
    type Namespace;

    /// Create the empty module that execution fills in.
    fn create_module(&self, descriptor: &ModuleDescriptor) -> Module<Self::Namespace>;

    /// Fetch and run the module's source inside its namespace.
    fn exec_module(&self, module: &mut Module<Self::Namespace>) -> Result<()>;
}

/// Loader fetching source over a [`Fetch`] and running it with a
/// [`ModuleEngine`].
pub struct RemoteLoader<F: Fetch, E: ModuleEngine> {
    fetcher: F,
    engine: E,
}

impl<F: Fetch, E: ModuleEngine> RemoteLoader<F, E> {
    pub fn new(fetcher: F, engine: E) -> Self {
        Self { fetcher, engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<F: Fetch, E: ModuleEngine> Loader for RemoteLoader<F, E> {
    type Namespace = E::Namespace;

    fn create_module(&self, descriptor: &ModuleDescriptor) -> Module<E::Namespace> {
        Module {
            descriptor: descriptor.clone(),
            namespace: E::Namespace::default(),
        }
    }

    fn exec_module(&self, module: &mut Module<E::Namespace>) -> Result<()> {
        let origin = module.descriptor.origin.clone();

        let source = self.fetcher.fetch_text(&origin)?;
        debug!("Fetched {} bytes from {}", source.len(), origin);

        let code = self
            .engine
            .compile(&source, &origin)
            .map_err(|e| ImportError::execution(&origin, e))?;

        self.engine
            .execute(&code, &mut module.namespace)
            .map_err(|e| ImportError::execution(&origin, e))?;

        info!("Loaded module '{}' from {}", module.descriptor.name, origin);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use std::collections::BTreeMap;

    /// Engine for `key = value` lines, enough to observe the loader contract.
    struct PairEngine;

    #[derive(Debug, thiserror::Error)]
    #[error("{origin}:{line}: expected `key = value`")]
    struct PairError {
        origin: String,
        line: usize,
    }

    impl ModuleEngine for PairEngine {
        type Code = Vec<(String, String)>;
        type Namespace = BTreeMap<String, String>;
        type Error = PairError;

        fn compile(&self, source: &str, origin: &str) -> std::result::Result<Self::Code, PairError> {
            source
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(idx, line)| {
                    line.split_once('=')
                        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                        .ok_or_else(|| PairError {
                            origin: origin.to_string(),
                            line: idx + 1,
                        })
                })
                .collect()
        }

        fn execute(
            &self,
            code: &Self::Code,
            namespace: &mut Self::Namespace,
        ) -> std::result::Result<(), PairError> {
            namespace.extend(code.iter().cloned());
            Ok(())
        }
    }

    const ORIGIN: &str = "http://localhost:8000/pairs.py";

    fn descriptor() -> ModuleDescriptor {
        ModuleDescriptor::new("http://localhost:8000", "pairs", "py")
    }

    #[test]
    fn test_create_module_is_empty() {
        let loader = RemoteLoader::new(MemoryFetcher::new(), PairEngine);
        let module = loader.create_module(&descriptor());

        assert_eq!(module.name(), "pairs");
        assert_eq!(module.origin(), ORIGIN);
        assert!(module.namespace.is_empty());
    }

    #[test]
    fn test_exec_module_populates_namespace() {
        let fetcher = MemoryFetcher::new().with(ORIGIN, "a = 1\nb = two\n");
        let loader = RemoteLoader::new(fetcher.clone(), PairEngine);

        let mut module = loader.create_module(&descriptor());
        loader.exec_module(&mut module).unwrap();

        let keys: Vec<_> = module.namespace.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(fetcher.requests(), vec![ORIGIN.to_string()]);
    }

    #[test]
    fn test_compile_error_carries_origin() {
        let fetcher = MemoryFetcher::new().with(ORIGIN, "a = 1\nbroken\n");
        let loader = RemoteLoader::new(fetcher, PairEngine);

        let mut module = loader.create_module(&descriptor());
        let err = loader.exec_module(&mut module).unwrap_err();

        match err {
            ImportError::Execution { origin, source } => {
                assert_eq!(origin, ORIGIN);
                assert_eq!(source.to_string(), format!("{}:2: expected `key = value`", ORIGIN));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unreachable_origin_propagates() {
        let loader = RemoteLoader::new(MemoryFetcher::new(), PairEngine);

        let mut module = loader.create_module(&descriptor());
        let err = loader.exec_module(&mut module).unwrap_err();
        assert!(matches!(err, ImportError::Http { status: 404, .. }));
    }
}
