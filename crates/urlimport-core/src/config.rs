//! Configuration for remote imports.
//!
//! Loaded from `urlimport.toml`:
//!
//! ```toml
//! roots = ["http://localhost:8000"]
//! extension = "py"
//! allow = ["http://localhost:*"]
//! deny = ["*://untrusted.example.com/*"]
//!
//! [network]
//! timeout_secs = 30
//!
//! [sandbox]
//! allow_print = true
//! max_steps = 1000000
//! max_depth = 64
//! ```

use crate::error::{ImportError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up when no configuration path is given.
pub const CONFIG_FILE_NAME: &str = "urlimport.toml";

/// Largest `[sandbox] max_depth` accepted.
pub const MAX_CALL_DEPTH: usize = 1_000;

/// Top-level import configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Search roots, tried in order.
    #[serde(default)]
    pub roots: Vec<String>,

    /// Source file extension appended to module names (without the dot).
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Allow list (glob patterns). If non-empty, only matching roots are allowed.
    #[serde(default)]
    pub allow: Vec<String>,

    /// Deny list (glob patterns). Takes precedence over allow.
    #[serde(default)]
    pub deny: Vec<String>,

    /// Network settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Capabilities granted to executing modules.
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            extension: default_extension(),
            allow: Vec::new(),
            deny: Vec::new(),
            network: NetworkConfig::default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// HTTP proxy URL.
    pub http_proxy: Option<String>,

    /// HTTPS proxy URL.
    pub https_proxy: Option<String>,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// User agent string.
    pub user_agent: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            http_proxy: None,
            https_proxy: None,
            max_redirects: default_max_redirects(),
            user_agent: None,
        }
    }
}

/// Capabilities handed to the module engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Whether modules may write through `print`.
    #[serde(default = "default_allow_print")]
    pub allow_print: bool,

    /// Maximum number of evaluation steps per module execution or call.
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,

    /// Maximum function call depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            allow_print: default_allow_print(),
            max_steps: default_max_steps(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_extension() -> String {
    "py".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_redirects() -> u32 {
    10
}

fn default_allow_print() -> bool {
    true
}

fn default_max_steps() -> u64 {
    1_000_000
}

fn default_max_depth() -> usize {
    64
}

impl ImportConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ImportConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise from the discovered config file,
    /// otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>, start_dir: &Path) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::discover(start_dir) {
                Some(found) => {
                    tracing::debug!("Using configuration at {}", found.display());
                    Self::load(&found)
                }
                None => Ok(Self::default()),
            },
        }
    }

    /// Find a configuration file: `start_dir/urlimport.toml` first, then the
    /// user config directory.
    pub fn discover(start_dir: &Path) -> Option<PathBuf> {
        let local = start_dir.join(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("urlimport").join(CONFIG_FILE_NAME))
            .filter(|path| path.is_file())
    }

    /// Reject settings that can never produce a valid origin URL.
    pub fn validate(&self) -> Result<()> {
        let ext = self.extension.as_str();
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ImportError::Config(format!(
                "extension must be non-empty and alphanumeric, got '{}'",
                self.extension
            )));
        }
        let depth = self.sandbox.max_depth;
        if depth == 0 || depth > MAX_CALL_DEPTH {
            return Err(ImportError::Config(format!(
                "sandbox.max_depth must be between 1 and {}, got {}",
                MAX_CALL_DEPTH, depth
            )));
        }
        Ok(())
    }

    /// Check if a root URL matches the allow/deny patterns.
    pub fn is_allowed(&self, url: &str) -> bool {
        // Deny takes precedence
        if self.deny.iter().any(|pattern| Self::matches_pattern(pattern, url)) {
            return false;
        }

        if self.allow.is_empty() {
            return true;
        }

        self.allow.iter().any(|pattern| Self::matches_pattern(pattern, url))
    }

    /// Glob matching with a prefix/suffix fallback for patterns glob rejects.
    fn matches_pattern(pattern: &str, url: &str) -> bool {
        if let Ok(glob_pattern) = glob::Pattern::new(pattern) {
            glob_pattern.matches(url)
        } else if pattern.len() > 1 && pattern.starts_with('*') && pattern.ends_with('*') {
            url.contains(&pattern[1..pattern.len() - 1])
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            url.ends_with(suffix)
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            url.starts_with(prefix)
        } else {
            url == pattern
        }
    }
}
