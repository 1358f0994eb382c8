//! Runtime values and their operators.

use crate::ast::{BinOp, CmpOp, FunctionDef};
use crate::builtins::Builtin;
use crate::error::{ErrorKind, Fault, SourceFile};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Longest string or list an operation may produce.
pub(crate) const MAX_SEQUENCE_LEN: usize = 10_000_000;

/// Deepest chain of lists inside lists (or functions holding them as
/// defaults) module code may build.
pub(crate) const MAX_VALUE_NESTING: usize = 100;

/// A value produced by module code.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Arc<List>),
    Function(Arc<Function>),
    Builtin(Builtin),
}

/// Elements of a list value.
///
/// Dereferences to the element slice.
#[derive(Debug, Default)]
pub struct List {
    items: Vec<Value>,
    nesting: usize,
}

impl List {
    pub fn new(items: Vec<Value>) -> Self {
        let nesting = 1 + items.iter().map(Value::nesting).max().unwrap_or(0);
        Self { items, nesting }
    }
}

impl std::ops::Deref for List {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.items
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

/// A function defined by module code.
#[derive(Debug)]
pub struct Function {
    pub def: Arc<FunctionDef>,
    /// Evaluated default for each parameter, aligned with `def.params`.
    pub defaults: Vec<Option<Value>>,
    pub source: Arc<SourceFile>,
    nesting: usize,
}

impl Function {
    pub fn new(
        def: Arc<FunctionDef>,
        defaults: Vec<Option<Value>>,
        source: Arc<SourceFile>,
    ) -> Self {
        let nesting = 1 + defaults
            .iter()
            .flatten()
            .map(Value::nesting)
            .max()
            .unwrap_or(0);
        Self {
            def,
            defaults,
            source,
            nesting,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Arc::new(List::new(items)))
    }
}

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn to_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn partial_cmp(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.to_f64().partial_cmp(&b.to_f64()),
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Function(_) | Value::Builtin(_) => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Builtin(_))
    }

    /// Integer view of ints and bools.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<Number> {
        match self {
            Value::Float(f) => Some(Number::Float(*f)),
            other => other.as_int().map(Number::Int),
        }
    }

    /// How many container levels this value holds: zero for scalars.
    pub fn nesting(&self) -> usize {
        match self {
            Value::List(list) => list.nesting,
            Value::Function(function) => function.nesting,
            _ => 0,
        }
    }

    /// Quoted representation, as shown inside lists.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_to(&mut out, true);
        out
    }

    /// `str()` text, failing with `MemoryError` past the sequence limit.
    pub(crate) fn render(&self) -> Result<String, Fault> {
        let mut out = BoundedText::default();
        self.write_to(&mut out, false).map_err(|_| out.overflow())?;
        Ok(out.text)
    }

    /// `repr()` text cut off after roughly `max_len` bytes.
    pub fn preview(&self, max_len: usize) -> String {
        let mut out = BoundedText {
            text: String::new(),
            limit: max_len,
        };
        match self.write_to(&mut out, true) {
            Ok(()) => out.text,
            Err(_) => out.text + "...",
        }
    }

    fn write_to(&self, out: &mut dyn fmt::Write, quoted: bool) -> fmt::Result {
        match self {
            Value::None => out.write_str("None"),
            Value::Bool(true) => out.write_str("True"),
            Value::Bool(false) => out.write_str("False"),
            Value::Int(i) => write!(out, "{}", i),
            Value::Float(x) => out.write_str(&format_float(*x)),
            Value::Str(s) if quoted => write_quoted(out, s),
            Value::Str(s) => out.write_str(s),
            Value::List(items) => {
                out.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    item.write_to(out, true)?;
                }
                out.write_char(']')
            }
            Value::Function(func) => write!(out, "<function {}>", func.name()),
            Value::Builtin(builtin) => write!(out, "<built-in function {}>", builtin.name()),
        }
    }

    /// Elements visited by a `for` loop.
    pub(crate) fn iterate(&self) -> Result<Vec<Value>, Fault> {
        match self {
            Value::List(items) => Ok(items.to_vec()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
            other => Err(Fault::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn index(&self, index: &Value) -> Result<Value, Fault> {
        match self {
            Value::Str(s) => {
                let position = resolve_index(index, s.chars().count(), "string")?;
                Ok(s.chars()
                    .nth(position)
                    .map(|c| Value::from(c.to_string()))
                    .unwrap_or(Value::None))
            }
            Value::List(items) => {
                let position = resolve_index(index, items.len(), "list")?;
                Ok(items[position].clone())
            }
            other => Err(Fault::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn contains(&self, item: &Value) -> Result<bool, Fault> {
        match self {
            Value::Str(haystack) => match item {
                Value::Str(needle) => Ok(haystack.contains(needle.as_ref())),
                other => Err(Fault::type_error(format!(
                    "'in <string>' requires string as left operand, not {}",
                    other.type_name()
                ))),
            },
            Value::List(items) => Ok(items.iter().any(|candidate| candidate == item)),
            other => Err(Fault::type_error(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            ))),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(Number::Int(x)), Some(Number::Int(y))) => x == y,
                (Some(x), Some(y)) => x.to_f64() == y.to_f64(),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, false)
    }
}

/// Text sink that refuses to grow past `limit` bytes.
struct BoundedText {
    text: String,
    limit: usize,
}

impl Default for BoundedText {
    fn default() -> Self {
        Self {
            text: String::new(),
            limit: MAX_SEQUENCE_LEN,
        }
    }
}

impl BoundedText {
    fn overflow(&self) -> Fault {
        Fault::new(
            ErrorKind::MemoryError,
            format!("rendered text exceeds {} bytes", self.limit),
        )
    }
}

impl fmt::Write for BoundedText {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.text.len().saturating_add(s.len()) > self.limit {
            return Err(fmt::Error);
        }
        self.text.push_str(s);
        Ok(())
    }
}

fn write_quoted(out: &mut dyn fmt::Write, s: &str) -> fmt::Result {
    let delimiter = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    out.write_char(delimiter)?;
    for c in s.chars() {
        match c {
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\t' => out.write_str("\\t")?,
            '\r' => out.write_str("\\r")?,
            c if c == delimiter => {
                out.write_char('\\')?;
                out.write_char(c)?;
            }
            c => out.write_char(c)?,
        }
    }
    out.write_char(delimiter)
}

/// Shortest round-tripping float text, always showing a fraction or exponent.
pub(crate) fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = x.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{:e}", x);
        return match text.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => text,
        };
    }

    if x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

/// Reject values nested deeper than [`MAX_VALUE_NESTING`].
pub(crate) fn check_nesting(value: Value) -> Result<Value, Fault> {
    if value.nesting() > MAX_VALUE_NESTING {
        return Err(Fault::new(
            ErrorKind::RecursionError,
            format!("values may nest at most {} levels deep", MAX_VALUE_NESTING),
        ));
    }
    Ok(value)
}

/// Position addressed by a possibly negative index.
fn resolve_index(index: &Value, len: usize, kind: &str) -> Result<usize, Fault> {
    let Some(raw) = index.as_int() else {
        return Err(Fault::type_error(format!(
            "{} indices must be integers, not {}",
            kind,
            index.type_name()
        )));
    };

    let position = if raw < 0 {
        usize::try_from(raw.unsigned_abs())
            .ok()
            .and_then(|back| len.checked_sub(back))
    } else {
        usize::try_from(raw).ok().filter(|i| *i < len)
    };

    position.ok_or_else(|| {
        Fault::new(
            ErrorKind::IndexError,
            format!("{} index out of range", kind),
        )
    })
}

fn unsupported(op: &str, left: &Value, right: &Value) -> Fault {
    Fault::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        left.type_name(),
        right.type_name()
    ))
}

fn repeat<T: Clone>(items: &[T], count: i64) -> Result<Vec<T>, Fault> {
    let count = usize::try_from(count.max(0)).map_err(|_| Fault::overflow())?;
    let total = items.len().saturating_mul(count);
    if total > MAX_SEQUENCE_LEN {
        return Err(Fault::new(
            ErrorKind::MemoryError,
            "repeated sequence is too large",
        ));
    }
    let mut out = Vec::with_capacity(total);
    for _ in 0..count {
        out.extend_from_slice(items);
    }
    Ok(out)
}

fn concat_len(a: usize, b: usize) -> Result<(), Fault> {
    if a.saturating_add(b) > MAX_SEQUENCE_LEN {
        return Err(Fault::new(
            ErrorKind::MemoryError,
            "concatenated sequence is too large",
        ));
    }
    Ok(())
}

fn floor_div_int(a: i64, b: i64) -> Result<i64, Fault> {
    if b == 0 {
        return Err(Fault::new(
            ErrorKind::ZeroDivisionError,
            "integer division or modulo by zero",
        ));
    }
    let q = a.checked_div(b).ok_or_else(Fault::overflow)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

fn mod_int(a: i64, b: i64) -> Result<i64, Fault> {
    if b == 0 {
        return Err(Fault::new(
            ErrorKind::ZeroDivisionError,
            "integer division or modulo by zero",
        ));
    }
    let r = a.checked_rem(b).unwrap_or(0);
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

fn mod_float(a: f64, b: f64) -> Result<f64, Fault> {
    if b == 0.0 {
        return Err(Fault::new(ErrorKind::ZeroDivisionError, "float modulo"));
    }
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

/// Apply an arithmetic operator.
pub(crate) fn binary_op(op: BinOp, left: &Value, right: &Value) -> Result<Value, Fault> {
    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            concat_len(a.len(), b.len())?;
            return Ok(Value::from(format!("{}{}", a, b)));
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            concat_len(a.len(), b.len())?;
            let mut items = a.to_vec();
            items.extend(b.iter().cloned());
            return Ok(Value::from(items));
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if n.as_int().is_some() => {
            let chars: Vec<char> = s.chars().collect();
            let repeated = repeat(&chars, n.as_int().unwrap_or(0))?;
            return Ok(Value::from(repeated.into_iter().collect::<String>()));
        }
        (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items))
            if n.as_int().is_some() =>
        {
            return Ok(Value::from(repeat(items, n.as_int().unwrap_or(0))?));
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
        return Err(unsupported(op.symbol(), left, right));
    };

    match (a, b) {
        (Number::Int(a), Number::Int(b)) => match op {
            BinOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(Fault::overflow),
            BinOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(Fault::overflow),
            BinOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(Fault::overflow),
            BinOp::Div => {
                if b == 0 {
                    Err(Fault::new(ErrorKind::ZeroDivisionError, "division by zero"))
                } else {
                    Ok(Value::Float(a as f64 / b as f64))
                }
            }
            BinOp::FloorDiv => floor_div_int(a, b).map(Value::Int),
            BinOp::Mod => mod_int(a, b).map(Value::Int),
        },
        (a, b) => {
            let (a, b) = (a.to_f64(), b.to_f64());
            match op {
                BinOp::Add => Ok(Value::Float(a + b)),
                BinOp::Sub => Ok(Value::Float(a - b)),
                BinOp::Mul => Ok(Value::Float(a * b)),
                BinOp::Div => {
                    if b == 0.0 {
                        Err(Fault::new(ErrorKind::ZeroDivisionError, "float division by zero"))
                    } else {
                        Ok(Value::Float(a / b))
                    }
                }
                BinOp::FloorDiv => {
                    if b == 0.0 {
                        Err(Fault::new(
                            ErrorKind::ZeroDivisionError,
                            "float floor division by zero",
                        ))
                    } else {
                        Ok(Value::Float((a / b).floor()))
                    }
                }
                BinOp::Mod => mod_float(a, b).map(Value::Float),
            }
        }
    }
}

/// Unary minus.
pub(crate) fn negate(value: &Value) -> Result<Value, Fault> {
    match value.as_number() {
        Some(Number::Int(i)) => i.checked_neg().map(Value::Int).ok_or_else(Fault::overflow),
        Some(Number::Float(f)) => Ok(Value::Float(-f)),
        None => Err(Fault::type_error(format!(
            "bad operand type for unary -: '{}'",
            value.type_name()
        ))),
    }
}

/// Unary plus.
pub(crate) fn positive(value: &Value) -> Result<Value, Fault> {
    match value.as_number() {
        Some(Number::Int(i)) => Ok(Value::Int(i)),
        Some(Number::Float(f)) => Ok(Value::Float(f)),
        None => Err(Fault::type_error(format!(
            "bad operand type for unary +: '{}'",
            value.type_name()
        ))),
    }
}

fn cmp_symbol(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "==",
        CmpOp::NotEq => "!=",
        CmpOp::Lt => "<",
        CmpOp::LtEq => "<=",
        CmpOp::Gt => ">",
        CmpOp::GtEq => ">=",
        CmpOp::In => "in",
        CmpOp::NotIn => "not in",
    }
}

fn holds(op: CmpOp, ordering: Ordering) -> bool {
    match op {
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::LtEq => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::GtEq => ordering != Ordering::Less,
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::NotEq => ordering != Ordering::Equal,
        CmpOp::In | CmpOp::NotIn => false,
    }
}

/// Evaluate one comparison.
pub(crate) fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, Fault> {
    match op {
        CmpOp::Eq => return Ok(left == right),
        CmpOp::NotEq => return Ok(left != right),
        CmpOp::In => return right.contains(left),
        CmpOp::NotIn => return right.contains(left).map(|found| !found),
        _ => {}
    }

    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                if x != y {
                    return compare(op, x, y);
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(b),
            _ => {
                return Err(Fault::type_error(format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    cmp_symbol(op),
                    left.type_name(),
                    right.type_name()
                )));
            }
        },
    };

    Ok(ordering.is_some_and(|o| holds(op, o)))
}
