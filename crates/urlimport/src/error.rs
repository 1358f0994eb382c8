//! CLI error type and its rendering.

use miette::{Diagnostic, GraphicalReportHandler};
use thiserror::Error;
use urlimport_core::ImportError;
use urlimport_script::ScriptError;

/// Failure of a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Root is not an `http://` or `https://` URL.
    #[error("Root '{0}' is not an http:// or https:// URL")]
    UnsupportedRoot(String),
}

impl CliError {
    /// The script diagnostic behind this error, if module code failed.
    pub fn script_error(&self) -> Option<&ScriptError> {
        match self {
            CliError::Script(err) => Some(err),
            CliError::Import(ImportError::Execution { source, .. }) => {
                source.downcast_ref::<ScriptError>()
            }
            CliError::Import(_) | CliError::UnsupportedRoot(_) => None,
        }
    }

    /// One-line description suitable for JSON output.
    pub fn summary(&self) -> String {
        match (self, self.script_error()) {
            (CliError::Import(err), Some(script)) => format!("{}: {}", err, script),
            (CliError::Import(ImportError::Execution { source, .. }), None) => {
                format!("{}: {}", self, source)
            }
            _ => self.to_string(),
        }
    }

    /// Full report for a terminal: the summary line, then for script failures
    /// the diagnostic rendered against the remote source text.
    pub fn render(&self) -> String {
        let mut out = self.summary();
        if let Some(report) = self.script_error().and_then(|e| render_diagnostic(e)) {
            out.push('\n');
            out.push_str(&report);
        }
        out
    }
}

fn render_diagnostic(diagnostic: &dyn Diagnostic) -> Option<String> {
    let mut out = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut out, diagnostic)
        .ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use urlimport_core::ModuleEngine;
    use urlimport_script::ScriptEngine;

    const ORIGIN: &str = "http://localhost:8000/broken.py";

    fn syntax_error() -> ScriptError {
        ScriptEngine::default()
            .compile("import os\n", ORIGIN)
            .unwrap_err()
    }

    #[test]
    fn test_script_error_is_found_through_execution() {
        let err = CliError::from(ImportError::execution(ORIGIN, syntax_error()));
        assert!(err.script_error().is_some());
        assert_eq!(
            err.summary(),
            format!(
                "Failed to execute module from {ORIGIN}: {ORIGIN}:1:1: SyntaxError: import statements are not permitted in remote modules"
            )
        );
    }

    #[test]
    fn test_render_includes_source_name() {
        let err = CliError::from(ImportError::execution(ORIGIN, syntax_error()));
        let rendered = err.render();
        assert!(rendered.starts_with("Failed to execute module from"));
        assert!(rendered.contains(ORIGIN));
        assert!(rendered.contains("import os"));
    }

    #[test]
    fn test_plain_import_error() {
        let err = CliError::from(ImportError::ModuleNotFound("nope".to_string()));
        assert!(err.script_error().is_none());
        assert_eq!(err.render(), "No module named 'nope'");
    }
}
