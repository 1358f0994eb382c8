//! Run Command
//!
//! Import a module from a remote root and optionally call one of its
//! functions.

use crate::context::{CliContext, ScriptImporter};
use crate::error::CliError;
use crate::output::{print_json, RunResult};
use owo_colors::OwoColorize;
use starbase::AppResult;
use urlimport_core::{Fetch, Module};
use urlimport_script::{CapturedOutput, Namespace, Value};

/// A loaded module and the value returned by the requested call, if any.
#[derive(Debug)]
pub struct RunOutcome {
    pub module: Module<Namespace>,
    pub result: Option<Value>,
}

/// Interpret a command-line argument as a module value.
///
/// Integers, floats, `True`, `False` and `None` keep their type; anything else
/// is passed as a string.
pub fn parse_arg(raw: &str) -> Value {
    match raw {
        "True" => Value::Bool(true),
        "False" => Value::Bool(false),
        "None" => Value::None,
        _ => {
            if let Ok(i) = raw.parse::<i64>() {
                Value::Int(i)
            } else if let Some(f) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
                Value::Float(f)
            } else {
                Value::from(raw)
            }
        }
    }
}

/// Import `module` and, when `call` is given, invoke that function with
/// `args`.
pub fn import_and_call<F: Fetch>(
    importer: &mut ScriptImporter<F>,
    module: &str,
    call: Option<&str>,
    args: Vec<Value>,
) -> Result<RunOutcome, CliError> {
    let module = importer.import(module)?;

    let result = match call {
        Some(name) => Some(
            importer
                .loader()
                .engine()
                .call(&module.namespace, name, args)?,
        ),
        None => None,
    };

    Ok(RunOutcome { module, result })
}

/// Run the run command.
///
/// # Arguments
/// * `root` - Remote root searched before the configured roots
/// * `module` - Module name to import
/// * `call` - Function to call after the import
/// * `args` - Positional arguments for `call`
pub fn run_module(
    ctx: &CliContext,
    root: &str,
    module: &str,
    call: Option<&str>,
    args: &[String],
) -> AppResult {
    let fetcher = match ctx.http_fetcher() {
        Ok(fetcher) => fetcher,
        Err(e) => return Ok(Some(report_failure(ctx, module, &e.into(), None))),
    };
    let (engine, captured) = ctx.engine();
    let mut importer = ctx.importer(fetcher, engine, root);
    let args = args.iter().map(|arg| parse_arg(arg)).collect();

    match import_and_call(&mut importer, module, call, args) {
        Ok(outcome) => {
            report_success(ctx, &outcome, call, captured.as_ref());
            Ok(None)
        }
        Err(e) => Ok(Some(report_failure(ctx, module, &e, captured.as_ref()))),
    }
}

/// Longest rendering of a module value shown to the user.
const VALUE_PREVIEW_LEN: usize = 4096;

fn report_success(
    ctx: &CliContext,
    outcome: &RunOutcome,
    call: Option<&str>,
    captured: Option<&CapturedOutput>,
) {
    let module = &outcome.module;

    if ctx.format.is_json() {
        print_json(&RunResult {
            success: true,
            module: module.name().to_string(),
            origin: Some(module.origin().to_string()),
            names: module.namespace.names().map(str::to_string).collect(),
            call: call.map(str::to_string),
            result: outcome
                .result
                .as_ref()
                .map(|value| value.preview(VALUE_PREVIEW_LEN)),
            output: captured.map(CapturedOutput::contents),
            error: None,
        });
        return;
    }

    match &outcome.result {
        Some(Value::None) => {}
        Some(value) => println!("{}", value.preview(VALUE_PREVIEW_LEN)),
        None => {
            println!(
                "{} {} {}",
                "Imported".green().bold(),
                module.name().bold(),
                format!("from {}", module.origin()).dimmed()
            );
            for (name, value) in module.namespace.iter() {
                println!("  {} = {}", name.cyan(), value.preview(VALUE_PREVIEW_LEN));
            }
        }
    }
}

/// Print `error` in the selected format and return the exit code.
pub(crate) fn report_failure(
    ctx: &CliContext,
    module: &str,
    error: &CliError,
    captured: Option<&CapturedOutput>,
) -> u8 {
    if ctx.format.is_json() {
        let mut result = RunResult::error(module, error.summary());
        result.output = captured.map(CapturedOutput::contents);
        print_json(&result);
    } else {
        eprintln!("{} {}", "error:".red().bold(), error.render());
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use urlimport_core::{ImportConfig, ImportError, MemoryFetcher};
    use urlimport_script::{Capabilities, ScriptEngine};

    const ROOT: &str = "http://localhost:8000";

    fn fetcher() -> MemoryFetcher {
        MemoryFetcher::new()
            .with(ROOT, "<a href=\"remotePack.py\">remotePack.py</a>")
            .with(
                format!("{ROOT}/remotePack.py"),
                "greeting = 'hi'\ndef fun(name='world'):\n    print(greeting, name)\n    return len(name)\n",
            )
    }

    fn importer(output: &CapturedOutput) -> ScriptImporter<MemoryFetcher> {
        let ctx = CliContext::new(ImportConfig::default(), OutputFormat::Text);
        let engine = ScriptEngine::new(Capabilities::none().with_output(output.clone()));
        ctx.importer(fetcher(), engine, ROOT)
    }

    #[test]
    fn test_parse_arg() {
        assert_eq!(parse_arg("42"), Value::Int(42));
        assert_eq!(parse_arg("-1.5"), Value::Float(-1.5));
        assert_eq!(parse_arg("True"), Value::Bool(true));
        assert_eq!(parse_arg("None"), Value::None);
        assert_eq!(parse_arg("inf"), Value::from("inf"));
        assert_eq!(parse_arg("bob"), Value::from("bob"));
    }

    #[test]
    fn test_import_without_call() {
        let output = CapturedOutput::new();
        let outcome = import_and_call(&mut importer(&output), "remotePack", None, vec![]).unwrap();

        assert!(outcome.result.is_none());
        assert_eq!(outcome.module.origin(), "http://localhost:8000/remotePack.py");
        assert_eq!(
            outcome.module.namespace.names().collect::<Vec<_>>(),
            vec!["greeting", "fun"]
        );
        assert_eq!(output.contents(), "");
    }

    #[test]
    fn test_import_and_call_with_args() {
        let output = CapturedOutput::new();
        let outcome = import_and_call(
            &mut importer(&output),
            "remotePack",
            Some("fun"),
            vec![parse_arg("bob")],
        )
        .unwrap();

        assert_eq!(outcome.result, Some(Value::Int(3)));
        assert_eq!(output.contents(), "hi bob\n");
    }

    #[test]
    fn test_unknown_module() {
        let output = CapturedOutput::new();
        let err = import_and_call(&mut importer(&output), "missing", None, vec![]).unwrap_err();
        assert!(matches!(err, CliError::Import(ImportError::ModuleNotFound(ref name)) if name == "missing"));
    }

    #[test]
    fn test_unknown_function() {
        let output = CapturedOutput::new();
        let err = import_and_call(&mut importer(&output), "remotePack", Some("nope"), vec![])
            .unwrap_err();
        assert_eq!(err.to_string(), "module has no function 'nope'");
    }
}
