//! Statement classification.

use crate::request::StatementMode;

/// Resolved execution kind of a statement. `Schema` covers DDL and every
/// other statement routed through the generic execute path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Schema,
}

/// Keyword inference order. First substring match wins.
const KEYWORDS: [(&str, StatementKind); 5] = [
    ("SELECT", StatementKind::Select),
    ("INSERT", StatementKind::Insert),
    ("UPDATE", StatementKind::Update),
    ("DELETE", StatementKind::Delete),
    ("CREATE", StatementKind::Schema),
];

/// Resolves the effective kind for a request. An explicit mode is returned
/// unchanged; `Auto` falls back to keyword inference over the uppercased
/// statement text. `None` means no keyword matched and the statement goes
/// to the generic execute path.
pub fn resolve_kind(mode: StatementMode, statement: &str) -> Option<StatementKind> {
    match mode {
        StatementMode::Select => Some(StatementKind::Select),
        StatementMode::Insert => Some(StatementKind::Insert),
        StatementMode::Update => Some(StatementKind::Update),
        StatementMode::Delete => Some(StatementKind::Delete),
        StatementMode::Create => Some(StatementKind::Schema),
        StatementMode::Auto => infer_kind(statement),
    }
}

/// Substring detection, not token-boundary parsing: a keyword inside a
/// string literal or comment still matches. This is a deliberate
/// compatibility contract, priority order included.
fn infer_kind(statement: &str) -> Option<StatementKind> {
    let upper = statement.to_uppercase();
    KEYWORDS
        .iter()
        .find(|(keyword, _)| upper.contains(keyword))
        .map(|(_, kind)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_mode_is_returned_unchanged() {
        assert_eq!(
            resolve_kind(StatementMode::Update, "SELECT 1"),
            Some(StatementKind::Update)
        );
        assert_eq!(
            resolve_kind(StatementMode::Create, "whatever"),
            Some(StatementKind::Schema)
        );
    }

    #[test]
    fn auto_matches_keywords_case_insensitively() {
        assert_eq!(
            resolve_kind(StatementMode::Auto, "select * from t"),
            Some(StatementKind::Select)
        );
        assert_eq!(
            resolve_kind(StatementMode::Auto, "DELETE FROM t"),
            Some(StatementKind::Delete)
        );
    }

    #[test]
    fn priority_is_select_insert_update_delete_create() {
        // INSERT ... SELECT classifies as a row query because SELECT is
        // tested first.
        assert_eq!(
            resolve_kind(StatementMode::Auto, "INSERT INTO t SELECT * FROM s"),
            Some(StatementKind::Select)
        );
        assert_eq!(
            resolve_kind(StatementMode::Auto, "CREATE TRIGGER tr UPDATE OF c ON t"),
            Some(StatementKind::Update)
        );
    }

    #[test]
    fn keyword_inside_a_literal_still_matches() {
        assert_eq!(
            resolve_kind(StatementMode::Auto, "UPDATE t SET v = 'SELECT'"),
            Some(StatementKind::Select)
        );
    }

    #[test]
    fn no_keyword_leaves_the_kind_unresolved() {
        assert_eq!(resolve_kind(StatementMode::Auto, "PRAGMA user_version"), None);
        assert_eq!(resolve_kind(StatementMode::Auto, "DROP TABLE t"), None);
    }
}
