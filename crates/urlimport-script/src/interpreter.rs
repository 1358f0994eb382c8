//! Tree-walking evaluator for compiled modules.

use crate::ast::{BoolOp, Expr, ExprKind, FunctionDef, Stmt, StmtKind, UnaryOp};
use crate::builtins::Builtin;
use crate::capabilities::{Budget, Capabilities};
use crate::error::{ErrorKind, Fault, ScriptError, SourceFile};
use crate::lexer::Span;
use crate::namespace::Namespace;
use crate::value::{binary_op, check_nesting, compare, negate, positive, Function, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

/// Stack reserved for the thread evaluating module code.
const EVAL_STACK_SIZE: usize = 128 * 1024 * 1024;

/// Nested statements, expressions and calls one evaluation may have in
/// flight. Sized so the deepest evaluation fits in [`EVAL_STACK_SIZE`]
/// whatever `max_depth` says.
pub(crate) const MAX_EVAL_DEPTH: usize = 10_000;

/// Run `task` on a dedicated thread whose stack fits [`MAX_EVAL_DEPTH`].
pub(crate) fn with_eval_stack<T, F>(task: F) -> Result<T, ScriptError>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name("urlimport-eval".to_string())
            .stack_size(EVAL_STACK_SIZE)
            .spawn_scoped(scope, task)
            .map_err(|e| ScriptError::Host(format!("failed to start evaluation thread: {}", e)))?;
        handle
            .join()
            .map_err(|_| ScriptError::Host("module evaluation panicked".to_string()))
    })
}

/// A runtime error unwinding through the evaluator.
#[derive(Debug)]
pub(crate) struct Raise {
    kind: ErrorKind,
    message: String,
    span: Span,
    source: Arc<SourceFile>,
    traceback: Vec<String>,
}

impl Raise {
    pub fn into_error(self) -> ScriptError {
        self.source
            .runtime_error(self.kind, self.message, self.span, self.traceback)
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

enum Scope<'s> {
    Module(&'s mut Namespace),
    Function {
        globals: &'s Namespace,
        def: &'s FunctionDef,
        locals: HashMap<String, Value>,
    },
}

impl Scope<'_> {
    fn globals(&self) -> &Namespace {
        match self {
            Scope::Module(namespace) => &**namespace,
            Scope::Function { globals, .. } => *globals,
        }
    }

    fn bind(&mut self, name: &str, value: Value) {
        match self {
            Scope::Module(namespace) => {
                namespace.insert(name, value);
            }
            Scope::Function { locals, .. } => {
                locals.insert(name.to_string(), value);
            }
        }
    }
}

pub(crate) struct Interpreter<'c> {
    caps: &'c Capabilities,
    budget: Budget,
    depth: usize,
    frames: usize,
    source: Arc<SourceFile>,
}

impl<'c> Interpreter<'c> {
    pub fn new(caps: &'c Capabilities, source: Arc<SourceFile>) -> Self {
        Self {
            caps,
            budget: Budget::new(caps.max_steps),
            depth: 0,
            frames: 0,
            source,
        }
    }

    /// Run a module body, binding its top-level names in `namespace`.
    pub fn run_module(&mut self, body: &[Stmt], namespace: &mut Namespace) -> Result<(), Raise> {
        let mut scope = Scope::Module(namespace);
        self.exec_block(body, &mut scope)?;
        Ok(())
    }

    /// Call a module function on behalf of the host.
    pub fn call_from_host(
        &mut self,
        function: &Arc<Function>,
        args: Vec<Value>,
        globals: &Namespace,
    ) -> Result<Value, Raise> {
        self.source = function.source.clone();
        self.call_function(function, args, globals, None)
    }

    fn raise(&self, fault: Fault, span: &Span) -> Raise {
        Raise {
            kind: fault.kind,
            message: fault.message,
            span: span.clone(),
            source: self.source.clone(),
            traceback: Vec::new(),
        }
    }

    fn charge(&mut self, span: &Span) -> Result<(), Raise> {
        self.budget.charge(1).map_err(|fault| self.raise(fault, span))
    }

    fn recursion_error(&self, span: &Span) -> Raise {
        self.raise(
            Fault::new(
                ErrorKind::RecursionError,
                "maximum recursion depth exceeded",
            ),
            span,
        )
    }

    /// Count one more nested frame; undone by `self.frames -= 1`.
    fn enter(&mut self, span: &Span) -> Result<(), Raise> {
        if self.frames >= MAX_EVAL_DEPTH {
            return Err(self.recursion_error(span));
        }
        self.frames += 1;
        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn exec_block(&mut self, body: &[Stmt], scope: &mut Scope<'_>) -> Result<Flow, Raise> {
        for stmt in body {
            match self.exec_stmt(stmt, scope)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &mut Scope<'_>) -> Result<Flow, Raise> {
        self.enter(&stmt.span)?;
        let flow = self.exec_stmt_inner(stmt, scope);
        self.frames -= 1;
        flow
    }

    fn exec_stmt_inner(&mut self, stmt: &Stmt, scope: &mut Scope<'_>) -> Result<Flow, Raise> {
        self.charge(&stmt.span)?;

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr, scope)?;
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value, scope)?;
                scope.bind(target, value);
            }
            StmtKind::AugAssign { target, op, value } => {
                let current = self.load(target, scope, &stmt.span)?;
                let rhs = self.eval(value, scope)?;
                let result =
                    binary_op(*op, &current, &rhs).map_err(|fault| self.raise(fault, &stmt.span))?;
                scope.bind(target, result);
            }
            StmtKind::FunctionDef(def) => {
                let mut defaults = Vec::with_capacity(def.params.len());
                for param in &def.params {
                    let default = match &param.default {
                        Some(expr) => Some(self.eval(expr, scope)?),
                        None => None,
                    };
                    defaults.push(default);
                }
                let function = Function::new(def.clone(), defaults, self.source.clone());
                let function = check_nesting(Value::Function(Arc::new(function)))
                    .map_err(|fault| self.raise(fault, &stmt.span))?;
                scope.bind(&def.name, function);
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::If { branches, orelse } => {
                for (test, body) in branches {
                    if self.eval(test, scope)?.is_truthy() {
                        return self.exec_block(body, scope);
                    }
                }
                return self.exec_block(orelse, scope);
            }
            StmtKind::While { test, body } => {
                while self.eval(test, scope)?.is_truthy() {
                    match self.exec_block(body, scope)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::For { target, iter, body } => {
                let items = self
                    .eval(iter, scope)?
                    .iterate()
                    .map_err(|fault| self.raise(fault, &iter.span))?;
                for item in items {
                    scope.bind(target, item);
                    match self.exec_block(body, scope)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Pass => {}
        }

        Ok(Flow::Normal)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn load(&self, name: &str, scope: &Scope<'_>, span: &Span) -> Result<Value, Raise> {
        let found = match scope {
            Scope::Module(namespace) => namespace.get(name).cloned(),
            Scope::Function {
                globals,
                def,
                locals,
            } => {
                if def.locals.contains(name) {
                    return locals.get(name).cloned().ok_or_else(|| {
                        self.raise(
                            Fault::new(
                                ErrorKind::UnboundLocalError,
                                format!(
                                    "cannot access local variable '{}' where it is not associated with a value",
                                    name
                                ),
                            ),
                            span,
                        )
                    });
                }
                globals.get(name).cloned()
            }
        };

        found
            .or_else(|| Builtin::lookup(name).map(Value::Builtin))
            .ok_or_else(|| {
                self.raise(
                    Fault::new(
                        ErrorKind::NameError,
                        format!("name '{}' is not defined", name),
                    ),
                    span,
                )
            })
    }

    fn eval(&mut self, expr: &Expr, scope: &mut Scope<'_>) -> Result<Value, Raise> {
        self.enter(&expr.span)?;
        let value = self.eval_inner(expr, scope);
        self.frames -= 1;
        value
    }

    fn eval_inner(&mut self, expr: &Expr, scope: &mut Scope<'_>) -> Result<Value, Raise> {
        let span = &expr.span;

        match &expr.kind {
            ExprKind::Int(value) => Ok(Value::Int(*value)),
            ExprKind::Float(value) => Ok(Value::Float(*value)),
            ExprKind::Str(value) => Ok(Value::from(value.as_str())),
            ExprKind::Bool(value) => Ok(Value::Bool(*value)),
            ExprKind::None => Ok(Value::None),
            ExprKind::Name(name) => self.load(name, scope, span),
            ExprKind::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, scope)?);
                }
                check_nesting(Value::from(values)).map_err(|fault| self.raise(fault, span))
            }
            ExprKind::Call { func, args } => {
                let callee = self.eval(func, scope)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, scope)?);
                }
                self.charge(span)?;
                self.call_value(&callee, values, scope.globals(), span)
            }
            ExprKind::Index { object, index } => {
                let object = self.eval(object, scope)?;
                let index = self.eval(index, scope)?;
                object
                    .index(&index)
                    .map_err(|fault| self.raise(fault, span))
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand, scope)?;
                let result = match op {
                    UnaryOp::Neg => negate(&value),
                    UnaryOp::Pos => positive(&value),
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                };
                result.map_err(|fault| self.raise(fault, span))
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                binary_op(*op, &left, &right).map_err(|fault| self.raise(fault, span))
            }
            ExprKind::Compare { left, ops } => {
                let mut lhs = self.eval(left, scope)?;
                for (op, rhs) in ops {
                    let rhs = self.eval(rhs, scope)?;
                    let holds =
                        compare(*op, &lhs, &rhs).map_err(|fault| self.raise(fault, span))?;
                    if !holds {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Ok(Value::Bool(true))
            }
            ExprKind::BoolOp { op, left, right } => {
                let left = self.eval(left, scope)?;
                let short_circuit = match op {
                    BoolOp::And => !left.is_truthy(),
                    BoolOp::Or => left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        globals: &Namespace,
        span: &Span,
    ) -> Result<Value, Raise> {
        match callee {
            Value::Builtin(builtin) => builtin
                .call(&args, self.caps, &mut self.budget)
                .map_err(|fault| self.raise(fault, span)),
            Value::Function(function) => self.call_function(function, args, globals, Some(span)),
            other => Err(self.raise(
                Fault::type_error(format!("'{}' object is not callable", other.type_name())),
                span,
            )),
        }
    }

    fn call_function(
        &mut self,
        function: &Arc<Function>,
        args: Vec<Value>,
        globals: &Namespace,
        call_site: Option<&Span>,
    ) -> Result<Value, Raise> {
        let def = function.def.as_ref();
        let error_span = call_site.unwrap_or(&def.span);

        if args.len() > def.params.len() {
            return Err(self.raise(
                Fault::type_error(format!(
                    "{}() takes {} positional argument{} but {} {} given",
                    def.name,
                    def.params.len(),
                    if def.params.len() == 1 { "" } else { "s" },
                    args.len(),
                    if args.len() == 1 { "was" } else { "were" }
                )),
                error_span,
            ));
        }
        if self.depth >= self.caps.max_depth {
            return Err(self.recursion_error(error_span));
        }

        let mut locals = HashMap::with_capacity(def.locals.len());
        let mut args = args.into_iter();
        for (param, default) in def.params.iter().zip(&function.defaults) {
            let value = match (args.next(), default) {
                (Some(value), _) => value,
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(self.raise(
                        Fault::type_error(format!(
                            "{}() missing required argument: '{}'",
                            def.name, param.name
                        )),
                        error_span,
                    ));
                }
            };
            locals.insert(param.name.clone(), value);
        }

        let caller_source = std::mem::replace(&mut self.source, function.source.clone());
        self.depth += 1;

        let mut scope = Scope::Function {
            globals,
            def,
            locals,
        };
        let result = self.exec_block(&def.body, &mut scope);

        self.depth -= 1;
        self.source = caller_source;

        match result {
            Ok(Flow::Return(value)) => Ok(value),
            Ok(_) => Ok(Value::None),
            Err(mut raise) => {
                if let Some(span) = call_site {
                    let (line, _) = self.source.line_column(span.start);
                    raise
                        .traceback
                        .push(format!("{}() called from line {}", def.name, line));
                }
                Err(raise)
            }
        }
    }
}
