//! `.env` files and environment-variable display
//!
//! The file provides the base environment; explicit YAML entries override
//! it key by key. Values that look like secrets are masked before they
//! reach a log line.

use std::collections::BTreeMap;

/// Parse `.env` content: `KEY=VALUE`, `export KEY=VALUE`, `#` comments,
/// optional single or double quotes around the value
pub fn parse_env_file(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    // Unquoted values may carry a trailing comment
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end(),
        None => value,
    }
}

/// File entries first, explicit entries win on conflicting keys
pub fn merge_environment(
    file: BTreeMap<String, String>,
    explicit: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = file;
    merged.extend(explicit);
    merged
}

const SENSITIVE_MARKERS: &[&str] = &[
    "SECRET", "PASSWORD", "PASSWD", "TOKEN", "KEY", "CREDENTIAL", "PRIVATE", "AUTH",
];

/// Whether a variable name suggests its value is a secret
pub fn is_sensitive(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    SENSITIVE_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// First 4 + `***` + last 4; short values are hidden entirely
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}

/// Value as it may appear in logs
pub fn display_value(key: &str, value: &str) -> String {
    if is_sensitive(key) {
        mask_secret(value)
    } else {
        value.to_string()
    }
}
