//! The sandboxed [`ModuleEngine`] implementation.

use crate::ast::Stmt;
use crate::capabilities::Capabilities;
use crate::error::{ScriptError, SourceFile};
use crate::interpreter::{with_eval_stack, Interpreter, Raise};
use crate::namespace::Namespace;
use crate::parser::parse_module;
use crate::value::Value;
use std::sync::Arc;
use tracing::debug;
use urlimport_core::{ModuleEngine, SandboxConfig};

/// Parsed module ready for execution.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    source: Arc<SourceFile>,
    body: Arc<Vec<Stmt>>,
}

impl CompiledModule {
    /// URL the source was fetched from.
    pub fn origin(&self) -> &str {
        &self.source.origin
    }
}

/// Runs module source with only the capabilities it was built with.
#[derive(Debug, Clone, Default)]
pub struct ScriptEngine {
    capabilities: Capabilities,
}

impl ScriptEngine {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(Capabilities::from_config(config))
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Compile and execute `source` into a fresh namespace.
    pub fn run(&self, source: &str, origin: &str) -> Result<Namespace, ScriptError> {
        let code = self.compile(source, origin)?;
        let mut namespace = Namespace::new();
        self.execute(&code, &mut namespace)?;
        Ok(namespace)
    }

    /// Call the module function `name` with positional `args`.
    ///
    /// Each call gets a fresh step budget.
    pub fn call(
        &self,
        namespace: &Namespace,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, ScriptError> {
        let function = match namespace.get(name) {
            Some(Value::Function(function)) => function.clone(),
            Some(other) => {
                return Err(ScriptError::Host(format!(
                    "'{}' is not a function (found {})",
                    name,
                    other.type_name()
                )));
            }
            None => {
                return Err(ScriptError::Host(format!(
                    "module has no function '{}'",
                    name
                )));
            }
        };

        debug!("Calling {}() from {}", name, function.source.origin);
        let caps = &self.capabilities;
        with_eval_stack(|| {
            Interpreter::new(caps, function.source.clone())
                .call_from_host(&function, args, namespace)
                .map_err(Raise::into_error)
        })?
    }
}

impl ModuleEngine for ScriptEngine {
    type Code = CompiledModule;
    type Namespace = Namespace;
    type Error = ScriptError;

    fn compile(&self, source: &str, origin: &str) -> Result<CompiledModule, ScriptError> {
        let file = SourceFile::new(origin, source);
        let body = parse_module(source).map_err(|e| file.syntax_error(e.message, e.span))?;
        debug!("Compiled {} ({} top-level statements)", origin, body.len());

        Ok(CompiledModule {
            source: Arc::new(file),
            body: Arc::new(body),
        })
    }

    fn execute(&self, code: &CompiledModule, namespace: &mut Namespace) -> Result<(), ScriptError> {
        let caps = &self.capabilities;
        with_eval_stack(|| {
            Interpreter::new(caps, code.source.clone())
                .run_module(&code.body, namespace)
                .map_err(Raise::into_error)
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapturedOutput;
    use crate::error::ErrorKind;
    use rstest::rstest;

    const ORIGIN: &str = "http://localhost:8000/remotePack.py";

    #[test]
    fn test_compile_reports_origin() {
        let engine = ScriptEngine::default();
        let err = engine.compile("x = 1\nimport os\n", ORIGIN).unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { .. }));
        assert_eq!(
            err.to_string(),
            format!("{ORIGIN}:2:1: SyntaxError: import statements are not permitted in remote modules")
        );
    }

    #[test]
    fn test_lex_error_is_syntax_error() {
        let engine = ScriptEngine::default();
        let err = engine.compile("x = $\n", ORIGIN).unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_compiled_module_runs_into_separate_namespaces() {
        let engine = ScriptEngine::default();
        let code = engine.compile("counter = 1\n", ORIGIN).unwrap();
        assert_eq!(code.origin(), ORIGIN);

        let mut first = Namespace::new();
        let mut second = Namespace::new();
        engine.execute(&code, &mut first).unwrap();
        engine.execute(&code, &mut second).unwrap();
        assert_eq!(first.get("counter"), Some(&Value::Int(1)));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_call_module_function() -> anyhow::Result<()> {
        let output = CapturedOutput::new();
        let engine = ScriptEngine::new(Capabilities::none().with_output(output.clone()));
        let source = "\
greeting = 'hello from remote'
def fun(times=1):
    for _ in range(times):
        print(greeting)
    return times
";
        let namespace = engine.run(source, ORIGIN)?;
        let result = engine.call(&namespace, "fun", vec![Value::Int(2)])?;

        assert_eq!(result, Value::Int(2));
        assert_eq!(output.contents(), "hello from remote\nhello from remote\n");
        Ok(())
    }

    #[test]
    fn test_call_errors() {
        let engine = ScriptEngine::default();
        let namespace = engine
            .run("x = 1\ndef f(a):\n    return a / 0\n", ORIGIN)
            .unwrap();

        let err = engine.call(&namespace, "missing", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "module has no function 'missing'");

        let err = engine.call(&namespace, "x", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "'x' is not a function (found int)");

        let err = engine.call(&namespace, "f", vec![]).unwrap_err();
        assert_eq!(err.message(), "f() missing required argument: 'a'");
        assert_eq!(err.line(), Some(2));

        let err = engine.call(&namespace, "f", vec![Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ZeroDivisionError));
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_from_config_without_print() {
        let config = SandboxConfig {
            allow_print: false,
            ..SandboxConfig::default()
        };
        let engine = ScriptEngine::from_config(&config);
        let err = engine.run("print(1)\n", ORIGIN).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::PermissionError));
    }

    #[rstest]
    #[case::nested_lists("x = []\nwhile True:\n    x = [x]\n", ErrorKind::RecursionError)]
    #[case::shared_nested_lists("x = []\nwhile True:\n    x = [x, x]\n", ErrorKind::RecursionError)]
    #[case::runaway_recursion("def f(n):\n    return f(n + 1)\nf(0)\n", ErrorKind::RecursionError)]
    #[case::huge_str("s = 'x' * 1000000\nt = [s] * 1000\nu = str(t)\n", ErrorKind::MemoryError)]
    #[case::huge_list("x = [0] * 10000001\n", ErrorKind::MemoryError)]
    #[case::endless_loop("while True:\n    pass\n", ErrorKind::StepLimitError)]
    fn test_hostile_modules_fail_cleanly(#[case] source: &str, #[case] kind: ErrorKind) {
        let engine = ScriptEngine::default();
        let err = engine.run(source, ORIGIN).unwrap_err();
        assert_eq!(err.kind(), Some(kind));
    }

    #[test]
    fn test_host_call_runs_deep_expressions() -> anyhow::Result<()> {
        let source = format!(
            "def f(n):\n    if n == 0:\n        return 0\n    return {}f(n - 1)\n",
            "- ".repeat(90)
        );
        let engine = ScriptEngine::default();
        let namespace = engine.run(&source, ORIGIN)?;
        assert_eq!(engine.call(&namespace, "f", vec![Value::Int(60)])?, Value::Int(0));
        Ok(())
    }
}
