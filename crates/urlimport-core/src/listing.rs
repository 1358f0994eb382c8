//! Module name discovery from a root's listing text.
//!
//! The listing is whatever the root URL serves, typically a web server's
//! generated directory index. No format is assumed: the body is scanned for
//! anything that looks like `<identifier>.<ext>`.

use regex::Regex;
use std::collections::BTreeSet;

/// Build the filename pattern for a source extension.
fn filename_pattern(extension: &str) -> Regex {
    let pattern = format!(r"[A-Za-z_][A-Za-z0-9_]*\.{}\b", regex::escape(extension));
    // The extension is escaped, so the pattern is always valid.
    Regex::new(&pattern).unwrap_or_else(|e| unreachable!("invalid listing pattern: {e}"))
}

/// Scan listing text for module filenames and return their names without the
/// extension.
pub fn scan_listing(text: &str, extension: &str) -> BTreeSet<String> {
    let suffix_len = extension.len() + 1;

    filename_pattern(extension)
        .find_iter(text)
        .map(|m| {
            let filename = m.as_str();
            filename[..filename.len() - suffix_len].to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scan_directory_index() {
        let html = r#"<!DOCTYPE HTML>
<html><head><title>Directory listing for /</title></head>
<body><h1>Directory listing for /</h1><hr><ul>
<li><a href="a.py">a.py</a></li>
<li><a href="b.py">b.py</a></li>
<li><a href="notes.txt">notes.txt</a></li>
</ul><hr></body></html>"#;

        assert_eq!(scan_listing(html, "py"), names(&["a", "b"]));
    }

    #[rstest]
    #[case("", &[])]
    #[case("nothing to see here", &[])]
    #[case("remotePack.py", &["remotePack"])]
    #[case("_private.py __init__.py", &["_private", "__init__"])]
    #[case("compiled.pyc other.python", &[])]
    #[case("dir/sub_mod.py", &["sub_mod"])]
    #[case("9lives.py", &["lives"])]
    #[case("fooXpy", &[])]
    fn test_scan_cases(#[case] text: &str, #[case] expected: &[&str]) {
        assert_eq!(scan_listing(text, "py"), names(expected));
    }

    #[test]
    fn test_custom_extension() {
        let text = "alpha.mod beta.py gamma.mod";
        assert_eq!(scan_listing(text, "mod"), names(&["alpha", "gamma"]));
    }
}
