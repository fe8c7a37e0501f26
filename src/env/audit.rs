//! Secret detection for loaded environment variables.
//!
//! Keys are classified against a fixed set of sensitive-name patterns. Values
//! of flagged keys are checked for weak or placeholder-looking content, masked
//! in hardened mode, and scrubbed out of error messages.

use regex_lite::Regex;
use std::path::Path;
use std::sync::LazyLock;

use super::EnvSnapshot;

/// Fixed mask shown in place of sensitive values.
pub const MASK: &str = "********";

/// Values shorter than this are reported as weak.
pub const MIN_SECRET_LEN: usize = 16;

/// Prefixes that mark a value as a placeholder.
pub const PLACEHOLDER_PREFIXES: &[&str] = &["test", "example", "dummy"];

/// A key-name rule used to flag probable secrets.
#[derive(Debug)]
pub struct SensitivePattern {
    pub name: &'static str,
    regex: Regex,
}

impl SensitivePattern {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("sensitive key pattern is valid"),
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

static SENSITIVE_PATTERNS: LazyLock<Vec<SensitivePattern>> = LazyLock::new(|| {
    vec![
        SensitivePattern::new("api key", r"(?i)api[_-]?key"),
        SensitivePattern::new("secret key", r"(?i)secret[_-]?key"),
        SensitivePattern::new("access token", r"(?i)access[_-]?token"),
        SensitivePattern::new("private key", r"(?i)private[_-]?key"),
        SensitivePattern::new("password", r"(?i)password"),
        SensitivePattern::new("secret", r"(?i)secret"),
    ]
});

// `KEY=value` / `key: value` fragments for any sensitive-looking key.
static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([A-Z0-9_\-]*(?:api[_-]?key|access[_-]?token|private[_-]?key|password|secret)[A-Z0-9_\-]*)(\s*[=:]\s*)[^\s,;]+")
        .expect("assignment pattern is valid")
});

/// The first sensitive pattern matching `key`, if any.
pub fn classify(key: &str) -> Option<&'static SensitivePattern> {
    SENSITIVE_PATTERNS.iter().find(|p| p.matches(key))
}

pub fn is_sensitive(key: &str) -> bool {
    classify(key).is_some()
}

/// Whether the value starts with a known placeholder prefix.
pub fn is_placeholder(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    PLACEHOLDER_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Weak-value heuristic: too short or placeholder-like.
pub fn is_weak(value: &str) -> bool {
    value.chars().count() < MIN_SECRET_LEN || is_placeholder(value)
}

/// A non-fatal finding produced while loading env files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvWarning {
    /// A sensitive-looking key holds a weak value.
    WeakSecret {
        key: String,
        pattern: &'static str,
        /// The value as it may be displayed (masked in hardened mode).
        shown: String,
    },
}

/// Audit a single parsed key/value pair.
pub fn audit_entry(key: &str, value: &str, hardened: bool) -> Option<EnvWarning> {
    let pattern = classify(key)?;
    if value.is_empty() || !is_weak(value) {
        return None;
    }
    let shown = if hardened {
        MASK.to_string()
    } else {
        value.to_string()
    };
    Some(EnvWarning::WeakSecret {
        key: key.to_string(),
        pattern: pattern.name,
        shown,
    })
}

/// Permission bits of an env file when it is accessible beyond its owner.
#[cfg(unix)]
pub fn insecure_mode(path: &Path) -> std::io::Result<Option<u32>> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
    Ok((mode & 0o077 != 0).then_some(mode))
}

#[cfg(not(unix))]
pub fn insecure_mode(_path: &Path) -> std::io::Result<Option<u32>> {
    Ok(None)
}

/// Keys whose names suggest a secret but whose values are placeholders.
pub fn placeholder_secrets(snapshot: &EnvSnapshot) -> Vec<String> {
    snapshot
        .iter()
        .filter(|(k, v)| is_sensitive(k) && !v.is_empty() && is_placeholder(v))
        .map(|(k, _)| k.to_string())
        .collect()
}

/// Removes sensitive values from text before it is shown.
#[derive(Debug, Clone, Default)]
pub struct Scrubber {
    /// Known secret values, longest first.
    secrets: Vec<String>,
}

impl Scrubber {
    /// Collect sensitive-named values of at least `MIN_SECRET_LEN` characters.
    ///
    /// Shorter values are only masked through `KEY=value` fragments.
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        let mut secrets: Vec<String> = snapshot
            .iter()
            .filter(|(k, v)| is_sensitive(k) && v.chars().count() >= MIN_SECRET_LEN)
            .map(|(_, v)| v.to_string())
            .collect();
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();
        Self { secrets }
    }

    pub fn scrub(&self, text: &str) -> String {
        let mut out = ASSIGNMENT.replace_all(text, format!("${{1}}${{2}}{MASK}").as_str()).into_owned();
        for secret in &self.secrets {
            out = out.replace(secret.as_str(), MASK);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_sensitive_keys() {
        assert_eq!(classify("STRIPE_API_KEY").map(|p| p.name), Some("api key"));
        assert_eq!(classify("aws_secret_key").map(|p| p.name), Some("secret key"));
        assert_eq!(classify("GITHUB_ACCESS-TOKEN").map(|p| p.name), Some("access token"));
        assert_eq!(classify("DB_PASSWORD").map(|p| p.name), Some("password"));
        assert_eq!(classify("CLIENT_SECRET").map(|p| p.name), Some("secret"));
        assert!(classify("PACKR_TARGET").is_none());
    }

    #[test]
    fn test_weak_value_heuristic() {
        assert!(is_weak("short"));
        assert!(is_weak("test-0123456789abcdef"));
        assert!(is_weak("EXAMPLE_aaaaaaaaaaaaaaaa"));
        assert!(is_weak("dummyvaluedummyvalue"));
        assert!(!is_weak("f3a9c1e07b2d4e6f8a0b"));
    }

    #[test]
    fn test_audit_entry_masks_in_hardened_mode() {
        let warning = audit_entry("API_KEY", "test", true).unwrap();
        assert_eq!(
            warning,
            EnvWarning::WeakSecret {
                key: "API_KEY".to_string(),
                pattern: "api key",
                shown: MASK.to_string(),
            }
        );

        let warning = audit_entry("API_KEY", "test", false).unwrap();
        assert!(matches!(warning, EnvWarning::WeakSecret { shown, .. } if shown == "test"));
    }

    #[test]
    fn test_audit_entry_ignores_empty_and_strong() {
        assert!(audit_entry("API_KEY", "", true).is_none());
        assert!(audit_entry("API_KEY", "f3a9c1e07b2d4e6f8a0b", true).is_none());
        assert!(audit_entry("PACKR_MINIFY", "1", true).is_none());
    }

    #[test]
    fn test_scrubber_removes_known_values_and_assignments() {
        let snapshot = EnvSnapshot::from_pairs([
            ("DB_PASSWORD", "hunter2hunter2hunter2"),
            ("PACKR_TARGET", "es2020"),
        ]);
        let scrubber = Scrubber::from_snapshot(&snapshot);

        let text = scrubber.scrub("connect failed with hunter2hunter2hunter2 for es2020");
        assert_eq!(text, format!("connect failed with {MASK} for es2020"));

        let text = scrubber.scrub("bad line API_KEY=abc123 in .env");
        assert_eq!(text, format!("bad line API_KEY={MASK} in .env"));
    }

    #[test]
    fn test_scrubber_ignores_short_values() {
        let snapshot = EnvSnapshot::from_pairs([("DB_PASSWORD", "a")]);
        let scrubber = Scrubber::from_snapshot(&snapshot);

        assert_eq!(scrubber.scrub("a path was invalid"), "a path was invalid");
        assert_eq!(
            scrubber.scrub("DB_PASSWORD=a rejected"),
            format!("DB_PASSWORD={MASK} rejected")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_insecure_mode_detects_group_readable() {
        use std::os::unix::fs::PermissionsExt;
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join(".env");
        std::fs::write(&path, "A=1").unwrap();

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert_eq!(insecure_mode(&path).unwrap(), Some(0o644));

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        assert_eq!(insecure_mode(&path).unwrap(), None);
    }
}
