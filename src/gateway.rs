//! Per-unit orchestration and the host-facing run loop.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tracing::debug;

use crate::batch;
use crate::classify::{self, StatementKind};
use crate::error::{GatewayError, Result};
use crate::normalize;
use crate::params;
use crate::request::{ExecRequest, OutputItem};
use crate::session::{DriverOptions, Session};

/// Host-level configuration shared by every input unit.
#[derive(Debug, Clone, Default)]
pub struct GatewayOptions {
    pub driver: DriverOptions,
    /// When set, a unit failure is emitted as a normal output item with an
    /// `error` field instead of aborting the whole run.
    pub continue_on_failure: bool,
}

/// Routes statements to the right execution mode and normalizes results
/// into a uniform item stream. Input units are processed strictly
/// sequentially, each against its own freshly opened storage handle.
pub struct Gateway {
    options: GatewayOptions,
    close_probe: Option<Arc<AtomicUsize>>,
}

impl Gateway {
    pub fn new(options: GatewayOptions) -> Self {
        Self {
            options,
            close_probe: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_close_probe(mut self, probe: Arc<AtomicUsize>) -> Self {
        self.close_probe = Some(probe);
        self
    }

    /// Processes every input unit in order, collecting the combined output
    /// stream. Errors propagate tagged with the originating unit index,
    /// unless the host opted to continue past per-item failures, in which
    /// case they become `{ "error": ... }` items.
    pub async fn run(&self, requests: &[ExecRequest]) -> Result<Vec<OutputItem>> {
        let mut items = Vec::new();
        for (index, request) in requests.iter().enumerate() {
            match self.run_unit(request).await {
                Ok(mut unit_items) => items.append(&mut unit_items),
                Err(err) if self.options.continue_on_failure => {
                    debug!(index, %err, "unit failed, continuing");
                    items.push(normalize::error_item(&err.to_string()));
                }
                Err(err) => return Err(err.tag(index)),
            }
        }
        Ok(items)
    }

    /// Processes a single input unit: validate, open a handle, execute,
    /// normalize, and close the handle on every exit path.
    pub async fn run_unit(&self, request: &ExecRequest) -> Result<Vec<OutputItem>> {
        if request.db_path.trim().is_empty() {
            return Err(GatewayError::config("database path must not be empty"));
        }
        if request.statement.trim().is_empty() {
            return Err(GatewayError::config("statement text must not be empty"));
        }

        let mut session = Session::open(&request.db_path, &self.options.driver)?;
        session.close_probe = self.close_probe.clone();

        // Close before any error is allowed to propagate.
        let outcome = self.process(&session, request).await;
        let closed = session.close();
        let items = outcome?;
        closed?;
        Ok(items)
    }

    async fn process(&self, session: &Session, request: &ExecRequest) -> Result<Vec<OutputItem>> {
        // Two parameter-prefix conventions arrive from hosts; the driver
        // recognizes `@`, so normalize the statement text up front.
        let statement = request.statement.replace('$', "@");
        let params = params::reconcile(&request.field_params, &request.blob_params);
        let kind = classify::resolve_kind(request.mode, &statement);
        debug!(?kind, params = params.len(), "resolved statement kind");

        match kind {
            Some(StatementKind::Select) => {
                let outcome = batch::run_select(session, &statement, &params).await?;
                Ok(normalize::normalize_select(
                    outcome,
                    request.collapse_into.as_deref(),
                ))
            }
            Some(StatementKind::Insert)
            | Some(StatementKind::Update)
            | Some(StatementKind::Delete) => {
                let result = session.run_mutation(&statement, &params).await?;
                Ok(normalize::normalize_mutation(&result))
            }
            Some(StatementKind::Schema) | None => {
                session.run_generic(&statement).await?;
                Ok(normalize::normalize_ack())
            }
        }
    }
}
