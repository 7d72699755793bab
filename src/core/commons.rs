// Helper function to wrap a string in quotes and escape internal quotes.
pub fn wrap_value(value: &str) -> String {
    // Escape any existing double quotes and then wrap the whole string in double quotes.
    format!("\"{}\"", value.replace('"', "\\\""))
}

/// Wraps `value` in quotes only if it contains whitespace or is empty.
pub fn wrap_if_needed(value: &str) -> String {
    if value.is_empty() || value.contains(char::is_whitespace) {
        wrap_value(value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_value_escapes_inner_quotes() {
        assert_eq!(wrap_value(r#"a"b"#), r#""a\"b""#);
        assert_eq!(wrap_value(".:x.jar"), "\".:x.jar\"");
    }

    #[test]
    fn test_wrap_if_needed() {
        assert_eq!(wrap_if_needed("/usr/bin/java"), "/usr/bin/java");
        assert_eq!(wrap_if_needed("/opt/my jdk/java"), "\"/opt/my jdk/java\"");
        assert_eq!(wrap_if_needed(""), "\"\"");
    }
}
