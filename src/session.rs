//! Execution session: one storage handle per unit of work.
//!
//! # Intention
//!
//! - Open exactly one SQLite handle per input unit, before any
//!   reconciliation or classification work runs.
//! - Resolve the native driver through an explicit three-tier policy
//!   instead of a hidden process-wide default.
//! - Guarantee the handle is released exactly once on every exit path and
//!   never reused across units.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::lock::Mutex;
use rusqlite::{Connection, ToSql};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{GatewayError, Result};
use crate::params::{self, ParamMap};
use crate::request::{MutationResult, Row};
use crate::value::Value;

/// Driver-selection inputs supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    /// Skip explicit driver selection and let the engine pick its default.
    pub use_default_driver: bool,
    /// Path to an alternate driver binary. Takes precedence over
    /// everything else, and must exist on disk.
    pub custom_driver_path: Option<PathBuf>,
}

/// Outcome of the three-tier driver policy: custom path, engine default,
/// or the engine statically linked into this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverSelection {
    Custom(PathBuf),
    EngineDefault,
    Bundled,
}

/// Resolves the driver policy. A configured custom path that does not
/// exist is a configuration error, never a silent fallback.
pub fn resolve_driver(options: &DriverOptions) -> Result<DriverSelection> {
    if let Some(path) = &options.custom_driver_path {
        if !path.exists() {
            return Err(GatewayError::config(format!(
                "custom driver not found: {}",
                path.display()
            )));
        }
        return Ok(DriverSelection::Custom(path.clone()));
    }
    if options.use_default_driver {
        return Ok(DriverSelection::EngineDefault);
    }
    Ok(DriverSelection::Bundled)
}

/// Owns one SQLite handle for the duration of one input unit.
///
/// The handle sits behind an async mutex so that batched statement
/// fragments can be dispatched as concurrent tasks while the actual driver
/// calls stay serialized: a rusqlite handle is not share-safe across
/// simultaneous calls.
pub struct Session {
    conn: Mutex<Connection>,
    driver: DriverSelection,
    pub(crate) close_probe: Option<Arc<AtomicUsize>>,
}

impl Session {
    /// Opens the database at `db_path` after resolving the driver policy.
    pub fn open(db_path: &str, options: &DriverOptions) -> Result<Self> {
        let driver = resolve_driver(options)?;
        debug!(path = %db_path, driver = ?driver, "opening sqlite handle");
        let conn = Connection::open(db_path)?;
        Ok(Self {
            conn: Mutex::new(conn),
            driver,
            close_probe: None,
        })
    }

    pub fn driver(&self) -> &DriverSelection {
        &self.driver
    }

    /// Executes one row-returning statement fragment with its pruned
    /// parameter view, collecting every row keyed by column name.
    pub async fn query_rows(&self, sql: &str, params: &ParamMap) -> Result<Vec<Row>> {
        let conn = self.conn.lock().await;
        let (names, values) = bind_args(sql, params);
        let args: Vec<(&str, &dyn ToSql)> =
            names.iter().map(String::as_str).zip(values).collect();
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let mut rows = stmt.query(args.as_slice())?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (i, column) in columns.iter().enumerate() {
                let cell = Value::from(row.get_ref(i)?);
                record.insert(column.clone(), JsonValue::from(cell));
            }
            collected.push(record);
        }
        Ok(collected)
    }

    /// Executes one insert/update/delete statement with its pruned
    /// parameter view.
    pub async fn run_mutation(&self, sql: &str, params: &ParamMap) -> Result<MutationResult> {
        let conn = self.conn.lock().await;
        let (names, values) = bind_args(sql, params);
        let args: Vec<(&str, &dyn ToSql)> =
            names.iter().map(String::as_str).zip(values).collect();
        let changes = conn.execute(sql, args.as_slice())? as u64;
        let rowid = conn.last_insert_rowid();
        Ok(MutationResult {
            changes,
            last_id: (rowid != 0).then_some(rowid),
        })
    }

    /// Generic execute path for schema commands and statements whose kind
    /// stayed unresolved. Parameters are not bound here.
    pub async fn run_generic(&self, sql: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Closes the handle, surfacing any close-time error. Consumes the
    /// session, so a handle can never be closed twice or reused.
    pub fn close(self) -> Result<()> {
        if let Some(probe) = &self.close_probe {
            probe.fetch_add(1, Ordering::SeqCst);
        }
        debug!(driver = ?self.driver, "closing sqlite handle");
        self.conn
            .into_inner()
            .close()
            .map_err(|(_, err)| GatewayError::from(err))
    }
}

/// Prunes the canonical map against the fragment text and shapes the
/// survivors for named binding. SQLite named parameters carry their sigil,
/// so the stripped keys are re-prefixed with `@` here.
fn bind_args<'a>(fragment: &str, params: &'a ParamMap) -> (Vec<String>, Vec<&'a dyn ToSql>) {
    let pruned = params::prune(fragment, params);
    let names = pruned.iter().map(|(key, _)| format!("@{key}")).collect();
    let values = pruned.iter().map(|(_, value)| *value as &dyn ToSql).collect();
    (names, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn custom_driver_path_wins_when_present() {
        let file = NamedTempFile::new().unwrap();
        let options = DriverOptions {
            use_default_driver: true,
            custom_driver_path: Some(file.path().to_path_buf()),
        };
        assert_eq!(
            resolve_driver(&options).unwrap(),
            DriverSelection::Custom(file.path().to_path_buf())
        );
    }

    #[test]
    fn missing_custom_driver_is_a_configuration_error() {
        let options = DriverOptions {
            use_default_driver: false,
            custom_driver_path: Some(PathBuf::from("/nonexistent/driver.so")),
        };
        let err = resolve_driver(&options).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("/nonexistent/driver.so"));
    }

    #[test]
    fn default_flag_selects_the_engine_default() {
        let options = DriverOptions {
            use_default_driver: true,
            custom_driver_path: None,
        };
        assert_eq!(resolve_driver(&options).unwrap(), DriverSelection::EngineDefault);
    }

    #[test]
    fn bundled_driver_is_the_fallback() {
        assert_eq!(
            resolve_driver(&DriverOptions::default()).unwrap(),
            DriverSelection::Bundled
        );
    }

    #[tokio::test]
    async fn over_supplied_parameters_are_pruned_before_binding() {
        let file = NamedTempFile::new().unwrap();
        let session = Session::open(file.path().to_str().unwrap(), &DriverOptions::default())
            .unwrap();
        session.run_generic("CREATE TABLE t(v TEXT)").await.unwrap();

        let mut params = ParamMap::new();
        params.insert("v".to_string(), Value::Text("x".to_string()));
        params.insert("unrelated".to_string(), Value::Integer(9));

        // Binding `unrelated` would make the engine reject the statement.
        let result = session
            .run_mutation("INSERT INTO t(v) VALUES (@v)", &params)
            .await
            .unwrap();
        assert_eq!(result.changes, 1);
        assert_eq!(result.last_id, Some(1));
        session.close().unwrap();
    }

    #[tokio::test]
    async fn close_consumes_the_session_and_reports_once() {
        let file = NamedTempFile::new().unwrap();
        let mut session =
            Session::open(file.path().to_str().unwrap(), &DriverOptions::default()).unwrap();
        let probe = Arc::new(AtomicUsize::new(0));
        session.close_probe = Some(probe.clone());
        session.close().unwrap();
        assert_eq!(probe.load(Ordering::SeqCst), 1);
    }
}
