//! Resolve Command
//!
//! Show the origin URL a module name resolves to under a root, without
//! fetching the module itself.

use crate::commands::list::locate_root;
use crate::context::CliContext;
use crate::error::CliError;
use crate::output::{print_json, ResolveResult};
use owo_colors::OwoColorize;
use starbase::AppResult;
use urlimport_core::{Fetch, ImportError, ModuleDescriptor, Resolver};

/// Resolve `module` under `root`.
pub fn resolve_module<F: Fetch>(
    ctx: &CliContext,
    fetcher: F,
    root: &str,
    module: &str,
) -> Result<ModuleDescriptor, CliError> {
    locate_root(ctx, fetcher, root)?
        .resolve(module)
        .ok_or_else(|| ImportError::ModuleNotFound(module.to_string()).into())
}

/// Run the resolve command.
pub fn run_resolve(ctx: &CliContext, root: &str, module: &str) -> AppResult {
    let descriptor = ctx
        .http_fetcher()
        .map_err(CliError::from)
        .and_then(|fetcher| resolve_module(ctx, fetcher, root, module));

    let result = match &descriptor {
        Ok(descriptor) => ResolveResult {
            success: true,
            root: root.to_string(),
            module: module.to_string(),
            origin: Some(descriptor.origin.clone()),
            error: None,
        },
        Err(e) => ResolveResult {
            success: false,
            root: root.to_string(),
            module: module.to_string(),
            origin: None,
            error: Some(e.summary()),
        },
    };

    if ctx.format.is_json() {
        print_json(&result);
    } else {
        match &descriptor {
            Ok(descriptor) => println!("{} -> {}", descriptor.name.bold(), descriptor.origin),
            Err(e) => eprintln!("{} {}", "error:".red().bold(), e.render()),
        }
    }

    Ok(if result.success { None } else { Some(1) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use urlimport_core::{ImportConfig, MemoryFetcher};

    #[test]
    fn test_resolve_module() {
        let ctx = CliContext::new(ImportConfig::default(), OutputFormat::Json);
        let fetcher = MemoryFetcher::new().with("http://localhost:8000", "remotePack.py");

        let descriptor =
            resolve_module(&ctx, fetcher.clone(), "http://localhost:8000", "remotePack").unwrap();
        assert_eq!(descriptor.origin, "http://localhost:8000/remotePack.py");
        // Resolving never fetches the module source.
        assert_eq!(fetcher.requests(), vec!["http://localhost:8000".to_string()]);

        let err = resolve_module(&ctx, fetcher, "http://localhost:8000", "other").unwrap_err();
        assert_eq!(err.to_string(), "No module named 'other'");
    }
}
