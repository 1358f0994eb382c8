//! List Command
//!
//! Show the module names a remote root's listing offers.

use crate::context::CliContext;
use crate::error::CliError;
use crate::output::{print_json, ListResult};
use owo_colors::OwoColorize;
use starbase::AppResult;
use urlimport_core::{Fetch, Resolver, UrlLocator, UrlResolver};

/// Locate `root` and return its resolver.
pub fn locate_root<F: Fetch>(ctx: &CliContext, fetcher: F, root: &str) -> Result<UrlResolver, CliError> {
    UrlLocator::with_config(fetcher, ctx.config.clone())
        .locate_url(root)?
        .ok_or_else(|| CliError::UnsupportedRoot(root.to_string()))
}

/// Run the list command.
pub fn run_list(ctx: &CliContext, root: &str) -> AppResult {
    let resolver = ctx
        .http_fetcher()
        .map_err(CliError::from)
        .and_then(|fetcher| locate_root(ctx, fetcher, root));

    match resolver {
        Ok(resolver) => {
            let modules = resolver.available();
            if ctx.format.is_json() {
                print_json(&ListResult {
                    success: true,
                    root: root.to_string(),
                    modules,
                    error: None,
                });
            } else if modules.is_empty() {
                println!("{} {}", "No modules found at".yellow(), root);
            } else {
                println!("{} {}", "Modules at".bold(), root.bold());
                for name in modules {
                    println!("  {}", name.cyan());
                }
            }
            Ok(None)
        }
        Err(e) => {
            if ctx.format.is_json() {
                print_json(&ListResult {
                    success: false,
                    root: root.to_string(),
                    modules: Vec::new(),
                    error: Some(e.summary()),
                });
            } else {
                eprintln!("{} {}", "error:".red().bold(), e.render());
            }
            Ok(Some(1))
        }
    }
}
