//! Request and response shapes exchanged with the host.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// One row returned by the engine, keyed by column name.
pub type Row = serde_json::Map<String, JsonValue>;

/// One unit in the response stream. Always a JSON object: a result row, a
/// collapsed result collection, a mutation result, or an acknowledgement.
pub type OutputItem = JsonValue;

/// Execution mode selector supplied by the host. `Auto` defers to keyword
/// inference over the statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementMode {
    #[default]
    Auto,
    Create,
    Delete,
    Insert,
    Select,
    Update,
}

/// One unit of work: a statement, its parameter sources, and the target
/// database file.
#[derive(Debug, Clone, Default)]
pub struct ExecRequest {
    /// Path to the SQLite database file. Must be non-empty.
    pub db_path: String,
    /// Statement text. Must be non-empty. May hold several `;`-separated
    /// statements in row-query mode.
    pub statement: String,
    pub mode: StatementMode,
    /// Structured name/value parameter pairs, in host order.
    pub field_params: Vec<(String, String)>,
    /// Raw JSON object text with additional parameters. Parse failure is
    /// recovered as an empty mapping; on name collision these win over
    /// `field_params`.
    pub blob_params: String,
    /// When set (non-blank), the whole result collection is collapsed into
    /// a single output item under this field name.
    pub collapse_into: Option<String>,
}

impl ExecRequest {
    pub fn new(db_path: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            statement: statement.into(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: StatementMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_field_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.field_params.push((name.into(), value.into()));
        self
    }

    pub fn with_blob_params(mut self, raw_json: impl Into<String>) -> Self {
        self.blob_params = raw_json.into();
        self
    }

    pub fn collapse_into(mut self, field: impl Into<String>) -> Self {
        self.collapse_into = Some(field.into());
        self
    }
}

/// Structured result of an insert/update/delete statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationResult {
    /// Rows affected by the statement.
    pub changes: u64,
    /// Rowid of the most recent successful insert on this handle, when one
    /// exists.
    pub last_id: Option<i64>,
}
