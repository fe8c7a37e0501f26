//! Line parser for `.env` files.

/// Parse env file content into ordered key/value pairs.
///
/// Blank lines and `#` comments are skipped, each remaining line is split on
/// the first `=`, and one layer of matching quotes is stripped from the value.
/// Lines without `=` or with an empty key are ignored. Values are literal:
/// no `$VAR` expansion and no trailing `#` comments.
pub fn parse_env_file(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), strip_quotes(value.trim()).to_string()))
        })
        .collect()
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(content: &str) -> Vec<(String, String)> {
        parse_env_file(content)
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let parsed = pairs("\n# comment\n   \nFOO=1\n  # indented comment\n");
        assert_eq!(parsed, vec![("FOO".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_splits_on_first_equals() {
        let parsed = pairs("URL=postgres://u:p@h/db?a=b");
        assert_eq!(parsed[0].1, "postgres://u:p@h/db?a=b");
    }

    #[test]
    fn test_values_are_literal() {
        let parsed = pairs("KEY=a$B # c");
        assert_eq!(parsed, vec![("KEY".to_string(), "a$B # c".to_string())]);
    }

    #[test]
    fn test_strips_surrounding_quotes() {
        let parsed = pairs("A=\"double\"\nB='single'\nC=\"unbalanced\nD=\"\"");
        assert_eq!(parsed[0].1, "double");
        assert_eq!(parsed[1].1, "single");
        assert_eq!(parsed[2].1, "\"unbalanced");
        assert_eq!(parsed[3].1, "");
    }

    #[test]
    fn test_ignores_lines_without_key() {
        let parsed = pairs("no_equals_here\n=value\nKEY = spaced \n");
        assert_eq!(parsed, vec![("KEY".to_string(), "spaced".to_string())]);
    }

    #[test]
    fn test_preserves_order_and_duplicates() {
        let parsed = pairs("A=1\nB=2\nA=3");
        let keys: Vec<&str> = parsed.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "A"]);
    }
}
