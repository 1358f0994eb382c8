//! Remote module loading for urlimport.
//!
//! This crate provides the plugin interface used to import modules whose
//! source lives under an HTTP root instead of the local filesystem.
//!
//! # Overview
//!
//! Importing a module walks three contracts:
//!
//! - **Locate**: a [`Locator`] decides whether a search root is something it
//!   can handle. [`UrlLocator`] accepts `http://` and `https://` roots, fetches
//!   the root's directory listing once and returns a [`Resolver`] for it.
//! - **Resolve**: a [`Resolver`] maps a module name to a [`ModuleDescriptor`]
//!   (`name`, `origin`) without touching the network.
//! - **Load**: a [`Loader`] fetches the origin and hands the source to a
//!   [`ModuleEngine`], which compiles and executes it into a fresh namespace.
//!
//! The [`Importer`] owns the ordered hooks and search roots and drives the
//! three steps. Nothing is registered globally.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use urlimport_core::{HttpFetcher, Importer, RemoteLoader, UrlLocator};
//!
//! let fetcher = Arc::new(HttpFetcher::with_defaults()?);
//! let mut importer = Importer::new(RemoteLoader::new(fetcher.clone(), engine))
//!     .with_hook(Box::new(UrlLocator::new(fetcher)));
//! importer.add_root("http://localhost:8000");
//!
//! let module = importer.import("remotePack")?;
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod fetch;
pub mod http;
pub mod importer;
pub mod listing;
pub mod loader;
pub mod locator;
pub mod resolver;

// Re-exports for convenience
pub use config::{ImportConfig, NetworkConfig, SandboxConfig, MAX_CALL_DEPTH};
pub use descriptor::ModuleDescriptor;
pub use error::{ImportError, Result};
pub use fetch::{Fetch, MemoryFetcher};
pub use http::HttpFetcher;
pub use importer::Importer;
pub use listing::scan_listing;
pub use loader::{Loader, Module, ModuleEngine, RemoteLoader};
pub use locator::{Locator, UrlLocator};
pub use resolver::{Resolver, UrlResolver};
