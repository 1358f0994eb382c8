//! Script errors and their diagnostics.

use crate::lexer::Span;
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::fmt;
use thiserror::Error;

/// Source text of one module, named by the URL it was fetched from.
#[derive(Debug)]
pub struct SourceFile {
    pub origin: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            text: text.into(),
        }
    }

    /// 1-based line and column of a byte offset.
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        span_to_line_column(&self.text, offset)
    }

    fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.origin, self.text.clone())
    }

    fn source_span(&self, span: &Span) -> SourceSpan {
        let start = span.start.min(self.text.len());
        let end = span.end.clamp(start, self.text.len());
        (start, end - start).into()
    }

    pub(crate) fn syntax_error(&self, message: impl Into<String>, span: Span) -> ScriptError {
        let (line, column) = self.line_column(span.start);
        ScriptError::Syntax {
            message: message.into(),
            origin: self.origin.clone(),
            line,
            column,
            src: self.named_source(),
            span: self.source_span(&span),
        }
    }

    pub(crate) fn runtime_error(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        span: Span,
        traceback: Vec<String>,
    ) -> ScriptError {
        let (line, column) = self.line_column(span.start);
        let traceback = (!traceback.is_empty()).then(|| {
            let mut help = String::from("traceback (most recent call last):");
            for frame in traceback.iter().rev() {
                help.push_str("\n  ");
                help.push_str(frame);
            }
            help
        });
        ScriptError::Runtime {
            kind,
            message: message.into(),
            origin: self.origin.clone(),
            line,
            column,
            src: self.named_source(),
            span: self.source_span(&span),
            traceback,
        }
    }
}

/// Convert byte offset to line/column
pub(crate) fn span_to_line_column(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Class of a runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NameError,
    UnboundLocalError,
    TypeError,
    ValueError,
    IndexError,
    ZeroDivisionError,
    OverflowError,
    MemoryError,
    RecursionError,
    PermissionError,
    StepLimitError,
    OutputError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors from compiling or running module source.
#[derive(Debug, Error, Diagnostic)]
pub enum ScriptError {
    #[error("{origin}:{line}:{column}: SyntaxError: {message}")]
    #[diagnostic(code(urlimport::syntax))]
    Syntax {
        message: String,
        origin: String,
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("{origin}:{line}:{column}: {kind}: {message}")]
    #[diagnostic(code(urlimport::runtime))]
    Runtime {
        kind: ErrorKind,
        message: String,
        origin: String,
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
        #[help]
        traceback: Option<String>,
    },

    /// The host asked for something the module does not provide.
    #[error("{0}")]
    #[diagnostic(code(urlimport::host))]
    Host(String),
}

impl ScriptError {
    /// Runtime error class, if this is a runtime error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ScriptError::Runtime { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// 1-based line of the error, when it points into source.
    pub fn line(&self) -> Option<usize> {
        match self {
            ScriptError::Syntax { line, .. } | ScriptError::Runtime { line, .. } => Some(*line),
            ScriptError::Host(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ScriptError::Syntax { message, .. } | ScriptError::Runtime { message, .. } => message,
            ScriptError::Host(message) => message,
        }
    }
}

/// A runtime failure before a source location is attached.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fault {
    pub kind: ErrorKind,
    pub message: String,
}

impl Fault {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValueError, message)
    }

    pub fn overflow() -> Self {
        Self::new(ErrorKind::OverflowError, "integer overflow")
    }
}
