//! Shared setup for commands: configuration and importer construction.

use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use urlimport_core::{
    Fetch, HttpFetcher, ImportConfig, Importer, RemoteLoader, Result, UrlLocator,
};
use urlimport_script::{Capabilities, CapturedOutput, ScriptEngine};

use crate::output::OutputFormat;

/// Importer type used by every command.
pub type ScriptImporter<F> = Importer<RemoteLoader<F, ScriptEngine>>;

/// Configuration and output settings for one CLI invocation.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub config: ImportConfig,
    pub format: OutputFormat,
}

impl CliContext {
    pub fn new(config: ImportConfig, format: OutputFormat) -> Self {
        Self { config, format }
    }

    /// Load `--config`, or the discovered `urlimport.toml`, or defaults.
    pub fn load(config_path: Option<&Path>, format: OutputFormat) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = ImportConfig::load_or_default(config_path, &cwd)?;
        Ok(Self::new(config, format))
    }

    /// Blocking HTTP fetcher built from the `[network]` settings.
    pub fn http_fetcher(&self) -> Result<Arc<HttpFetcher>> {
        Ok(Arc::new(HttpFetcher::new(&self.config.network)?))
    }

    /// Engine for this invocation.
    ///
    /// In JSON mode module output is captured so stdout carries only the
    /// result document; the returned buffer holds it.
    pub fn engine(&self) -> (ScriptEngine, Option<CapturedOutput>) {
        let capabilities = Capabilities::from_config(&self.config.sandbox);
        match self.format {
            OutputFormat::Json if capabilities.output.is_some() => {
                let captured = CapturedOutput::new();
                (
                    ScriptEngine::new(capabilities.with_output(captured.clone())),
                    Some(captured),
                )
            }
            _ => (ScriptEngine::new(capabilities), None),
        }
    }

    /// Importer searching `root` first, then the configured roots.
    pub fn importer<F>(&self, fetcher: F, engine: ScriptEngine, root: &str) -> ScriptImporter<F>
    where
        F: Fetch + Clone + 'static,
    {
        let locator = UrlLocator::with_config(fetcher.clone(), self.config.clone());
        let mut importer = Importer::new(RemoteLoader::new(fetcher, engine))
            .with_hook(Box::new(locator));

        importer.add_root(root);
        for configured in &self.config.roots {
            if configured != root {
                importer.add_root(configured.clone());
            }
        }
        debug!("Search roots: {:?}", importer.roots());
        importer
    }
}
