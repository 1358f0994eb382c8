//! Host-granted capabilities available to executing modules.

use crate::error::{ErrorKind, Fault};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use urlimport_core::{SandboxConfig, MAX_CALL_DEPTH};

/// Destination for `print` output.
pub trait OutputSink: Send + Sync {
    fn write(&self, text: &str) -> io::Result<()>;
}

/// Writes module output to the process stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write(&self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }
}

/// Collects module output in memory.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<String>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl OutputSink for CapturedOutput {
    fn write(&self, text: &str) -> io::Result<()> {
        let mut buffer = self
            .buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        buffer.push_str(text);
        Ok(())
    }
}

/// Permissions and limits for one engine.
///
/// Module code has no filesystem, network, or process access at all; the only
/// effect it can have on the host is writing through `output`.
#[derive(Clone)]
pub struct Capabilities {
    /// Sink for `print`; `None` makes `print` a `PermissionError`.
    pub output: Option<Arc<dyn OutputSink>>,

    /// Evaluation steps allowed per execution or host call; `None` is
    /// unlimited.
    pub max_steps: Option<u64>,

    /// Maximum depth of nested function calls.
    pub max_depth: usize,
}

impl Capabilities {
    /// No output, default limits.
    pub fn none() -> Self {
        let defaults = SandboxConfig::default();
        Self {
            output: None,
            max_steps: Some(defaults.max_steps),
            max_depth: defaults.max_depth,
        }
    }

    /// Capabilities described by a `[sandbox]` config table.
    ///
    /// A `max_steps` of zero means unlimited.
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            output: config
                .allow_print
                .then(|| Arc::new(StdoutSink) as Arc<dyn OutputSink>),
            max_steps: (config.max_steps > 0).then_some(config.max_steps),
            max_depth: config.max_depth.min(MAX_CALL_DEPTH),
        }
    }

    pub fn with_output(mut self, sink: impl OutputSink + 'static) -> Self {
        self.output = Some(Arc::new(sink));
        self
    }

    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub(crate) fn write_output(&self, text: &str) -> Result<(), Fault> {
        let sink = self.output.as_ref().ok_or_else(|| {
            Fault::new(
                ErrorKind::PermissionError,
                "print is not permitted: no output capability granted",
            )
        })?;
        sink.write(text)
            .map_err(|e| Fault::new(ErrorKind::OutputError, e.to_string()))
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("output", &self.output.is_some())
            .field("max_steps", &self.max_steps)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

/// Step counter for one execution.
#[derive(Debug)]
pub(crate) struct Budget {
    used: u64,
    limit: Option<u64>,
}

impl Budget {
    pub fn new(limit: Option<u64>) -> Self {
        Self { used: 0, limit }
    }

    pub fn charge(&mut self, steps: u64) -> Result<(), Fault> {
        self.used = self.used.saturating_add(steps);
        match self.limit {
            Some(limit) if self.used > limit => Err(Fault::new(
                ErrorKind::StepLimitError,
                format!("step limit of {} exceeded", limit),
            )),
            _ => Ok(()),
        }
    }
}
