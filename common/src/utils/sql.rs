//! SQL statement classification.
//!
//! The query runner needs to know whether a statement returns rows; that
//! decision is made here from the leading keyword only.

/// Classifies SQL statements by their leading keyword.
pub struct SqlClassifier;

impl SqlClassifier {
    /// Checks whether the statement is a SELECT (case-insensitive,
    /// leading whitespace ignored).
    pub fn is_select(sql: &str) -> bool {
        Self::leading_keyword(sql)
            .map(|kw| kw.eq_ignore_ascii_case("SELECT"))
            .unwrap_or(false)
    }

    /// Returns the first keyword of the statement, if any.
    pub fn leading_keyword(sql: &str) -> Option<&str> {
        sql.trim_start()
            .split(|c: char| c.is_whitespace() || c == '(')
            .find(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_detection() {
        assert!(SqlClassifier::is_select("SELECT 1"));
        assert!(SqlClassifier::is_select("  select * from users"));
        assert!(SqlClassifier::is_select("\n\tSeLeCt name FROM t"));
    }

    #[test]
    fn test_non_select_detection() {
        assert!(!SqlClassifier::is_select("CREATE TABLE t(x int)"));
        assert!(!SqlClassifier::is_select("INSERT INTO t VALUES (1)"));
        assert!(!SqlClassifier::is_select(""));
        assert!(!SqlClassifier::is_select("   "));
    }

    #[test]
    fn test_leading_keyword() {
        assert_eq!(SqlClassifier::leading_keyword("  UPDATE t SET x=1"), Some("UPDATE"));
        assert_eq!(SqlClassifier::leading_keyword(""), None);
    }
}
