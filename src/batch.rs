//! Splitting and concurrent execution of batched row queries.

use futures::future;

use crate::error::Result;
use crate::params::ParamMap;
use crate::request::Row;
use crate::session::Session;

/// Raw engine outcome of a row-query request: one row set for a single
/// statement, or one row set per fragment for a batch, in fragment order.
#[derive(Debug, PartialEq)]
pub enum SelectOutcome {
    Single(Vec<Row>),
    Batch(Vec<Vec<Row>>),
}

/// Splits statement text on the statement separator, discarding blank
/// fragments.
pub fn split_statements(statement: &str) -> Vec<&str> {
    statement
        .split(';')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

/// Executes a row-query statement, fanning a multi-fragment batch out as
/// one task per fragment. Each fragment is executed with its own pruned
/// parameter view. Dispatch order is unspecified; the joined results keep
/// fragment order, and the first fragment failure fails the whole request
/// with no partial results.
pub async fn run_select(
    session: &Session,
    statement: &str,
    params: &ParamMap,
) -> Result<SelectOutcome> {
    let fragments = split_statements(statement);
    match fragments.as_slice() {
        [] => Ok(SelectOutcome::Single(Vec::new())),
        [only] => Ok(SelectOutcome::Single(session.query_rows(only, params).await?)),
        many => {
            let tasks = many
                .iter()
                .map(|fragment| session.query_rows(fragment, params));
            let row_sets = future::try_join_all(tasks).await?;
            Ok(SelectOutcome::Batch(row_sets))
        }
    }
}
