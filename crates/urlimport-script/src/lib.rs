//! Sandboxed engine for remotely loaded modules.
//!
//! Modules are written in a small Python-style language: assignments,
//! functions, conditionals, loops, and a handful of builtins. Module code
//! cannot import anything or touch the host; the only effects available are
//! those granted through [`Capabilities`].
//!
//! ```no_run
//! use urlimport_script::{Capabilities, CapturedOutput, ScriptEngine};
//!
//! let output = CapturedOutput::new();
//! let engine = ScriptEngine::new(Capabilities::none().with_output(output.clone()));
//! let namespace = engine.run("def fun():\n    print('hi')\n", "http://localhost:8000/m.py")?;
//! engine.call(&namespace, "fun", vec![])?;
//! assert_eq!(output.contents(), "hi\n");
//! # Ok::<(), urlimport_script::ScriptError>(())
//! ```

pub mod ast;
pub mod builtins;
pub mod capabilities;
pub mod engine;
pub mod error;
mod interpreter;
pub mod lexer;
pub mod namespace;
pub mod parser;
pub mod value;

pub use capabilities::{Capabilities, CapturedOutput, OutputSink, StdoutSink};
pub use engine::{CompiledModule, ScriptEngine};
pub use error::{ErrorKind, ScriptError};
pub use namespace::Namespace;
pub use value::Value;
