//! Output formatting for CLI commands

use serde::Serialize;

/// Format output as JSON or the human-readable text based on --json flag
pub fn format_output<T: Serialize>(data: &T, json: bool, text: &str) -> String {
    if json {
        serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_output() {
        let data = serde_json::json!({"downloading": 2});
        assert_eq!(format_output(&data, false, "2 downloading"), "2 downloading");
        assert!(format_output(&data, true, "ignored").contains("\"downloading\": 2"));
    }
}
