//! Error taxonomy for the gateway.

use thiserror::Error;

/// Errors raised while processing one input unit.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bad host configuration: empty database path, empty statement text,
    /// or a custom driver path that does not exist on disk. Always fatal
    /// to the current input unit.
    #[error("configuration error: {0}")]
    Config(String),

    /// The storage engine rejected the statement.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// An error tagged with the index of the input unit that raised it.
    #[error("{source} [item {index}]")]
    Unit {
        index: usize,
        #[source]
        source: Box<GatewayError>,
    },
}

impl GatewayError {
    pub fn config(message: impl Into<String>) -> Self {
        GatewayError::Config(message.into())
    }

    /// Tags the error with the originating input-unit index. An error that
    /// already carries a tag keeps its message and only has the index
    /// replaced; it is never wrapped twice.
    pub fn tag(self, index: usize) -> Self {
        match self {
            GatewayError::Unit { source, .. } => GatewayError::Unit { index, source },
            other => GatewayError::Unit {
                index,
                source: Box::new(other),
            },
        }
    }

    pub fn unit_index(&self) -> Option<usize> {
        match self {
            GatewayError::Unit { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn is_config(&self) -> bool {
        match self {
            GatewayError::Config(_) => true,
            GatewayError::Unit { source, .. } => source.is_config(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
