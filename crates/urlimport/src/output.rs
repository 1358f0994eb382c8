//! Output format selection and JSON result documents.

use serde::Serialize;

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }

    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

/// JSON output for `run` and `demo`.
#[derive(Debug, Serialize)]
pub struct RunResult {
    pub success: bool,
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResult {
    pub fn error(module: &str, error: String) -> Self {
        Self {
            success: false,
            module: module.to_string(),
            origin: None,
            names: Vec::new(),
            call: None,
            result: None,
            output: None,
            error: Some(error),
        }
    }
}

/// JSON output for `list`.
#[derive(Debug, Serialize)]
pub struct ListResult {
    pub success: bool,
    pub root: String,
    pub modules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// JSON output for `resolve`.
#[derive(Debug, Serialize)]
pub struct ResolveResult {
    pub success: bool,
    pub root: String,
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Print a result document as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize result: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_result_omits_empty_fields() {
        let result = RunResult::error("remotePack", "No module named 'remotePack'".to_string());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "module": "remotePack",
                "error": "No module named 'remotePack'"
            })
        );
    }

    #[test]
    fn test_format_from_flag() {
        assert!(OutputFormat::from_json_flag(true).is_json());
        assert_eq!(OutputFormat::from_json_flag(false), OutputFormat::Text);
    }
}
