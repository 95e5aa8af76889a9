//! Known-malicious input signatures.
//!
//! The credential store binds every parameter, so none of these can reach
//! a query as code. They are screened anyway because input also flows to
//! logs, to other users' screens (message bodies) and to door games.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Which family of signature an input matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlacklistRule {
    /// Markup or URL schemes that execute script in a browser terminal.
    ScriptInjection,
    /// Query fragments: `UNION SELECT`, quote tautologies, comment tails.
    QueryInjection,
    /// Parent-directory references, plain or percent-encoded.
    PathTraversal,
}

impl fmt::Display for BlacklistRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ScriptInjection => "script-injection",
            Self::QueryInjection => "query-injection",
            Self::PathTraversal => "path-traversal",
        };
        f.write_str(name)
    }
}

struct Signature {
    rule: BlacklistRule,
    pattern: Regex,
}

fn sig(rule: BlacklistRule, pattern: &str) -> Signature {
    Signature {
        rule,
        // Patterns are compile-time constants covered by the tests below.
        pattern: Regex::new(pattern).expect("blacklist pattern must compile"),
    }
}

static SIGNATURES: LazyLock<Vec<Signature>> = LazyLock::new(|| {
    use BlacklistRule::*;
    vec![
        // Script injection
        sig(ScriptInjection, r"(?i)<\s*/?\s*script\b"),
        sig(ScriptInjection, r"(?i)<\s*(?:iframe|object|embed)\b"),
        sig(ScriptInjection, r"(?i)\b(?:javascript|vbscript)\s*:"),
        sig(ScriptInjection, r"(?i)\bon[a-z]+\s*="),
        // Query injection
        sig(QueryInjection, r"(?i)\bunion\s+(?:all\s+)?select\b"),
        sig(QueryInjection, r"(?i)\b(?:drop|alter|truncate)\s+(?:table|database)\b"),
        sig(QueryInjection, r"(?i)\binsert\s+into\b"),
        sig(QueryInjection, r"(?i)\bdelete\s+from\b"),
        sig(QueryInjection, r"(?i)\bselect\s+\*\s+from\b"),
        sig(QueryInjection, r"(?i)\bupdate\s+\w+\s+set\b"),
        sig(QueryInjection, r"(?i)'\s*(?:or|and)\s+[\w']+\s*=\s*[\w']+"),
        sig(QueryInjection, r"'\s*(?:--|#|/\*)"),
        sig(QueryInjection, r"(?i);\s*(?:--|drop|delete|insert|update|select|shutdown)\b"),
        // Path traversal
        sig(PathTraversal, r"\.\.[/\\]"),
        sig(PathTraversal, r"[/\\]\.\.(?:[/\\]|$)"),
        sig(PathTraversal, r"(?i)%2e%2e(?:%2f|%5c|/|\\)"),
        sig(PathTraversal, r"(?i)\.\.(?:%2f|%5c)"),
    ]
});

/// Returns the first rule `value` trips, if any.
pub(crate) fn scan(value: &str) -> Option<BlacklistRule> {
    SIGNATURES
        .iter()
        .find(|s| s.pattern.is_match(value))
        .map(|s| s.rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_every_pattern_compiles() {
        assert!(SIGNATURES.len() > 10);
    }

    #[test]
    fn test_scan_script_markers() {
        for input in [
            "<script>alert(1)</script>",
            "< SCRIPT src=x>",
            "javascript:alert(1)",
            "VBScript:msgbox",
            "<img onerror=alert(1)>",
            "<iframe src=x>",
        ] {
            assert_eq!(scan(input), Some(BlacklistRule::ScriptInjection), "{input}");
        }
    }

    #[test]
    fn test_scan_query_tokens() {
        for input in [
            "' OR '1'='1",
            "admin' or 1=1",
            "x' --",
            "1 UNION SELECT password FROM users",
            "1; DROP TABLE users",
            "drop table users",
            "insert into users values(1)",
            "DELETE FROM messages",
            "update users set login_count=0",
        ] {
            assert_eq!(scan(input), Some(BlacklistRule::QueryInjection), "{input}");
        }
    }

    #[test]
    fn test_scan_path_traversal() {
        for input in [
            "../../etc/passwd",
            "..\\windows",
            "files/..",
            "%2e%2e%2fsecret",
            "..%2Fsecret",
        ] {
            assert_eq!(scan(input), Some(BlacklistRule::PathTraversal), "{input}");
        }
    }

    #[test]
    fn test_scan_ordinary_text_passes() {
        for input in [
            "Hello everyone, it's a nice day",
            "Please select one from the list",
            "Meet at 5... or later?",
            "Anyone up for a game of Hi-Lo?",
            "Passw0rd!",
            "I don't know",
        ] {
            assert_eq!(scan(input), None, "{input}");
        }
    }
}
