//! Query-execution gateway for embedded SQLite databases.
//!
//! # Intention
//!
//! - Accept, per unit of work, a SQL statement, named parameters from two
//!   independent sources, and a database file path.
//! - Route the statement to the right execution mode (row query,
//!   mutation, or schema command) and normalize the result into a uniform
//!   stream of output items.
//!
//! # Architectural Boundaries
//!
//! - All SQL semantics are deferred to the underlying engine (rusqlite).
//! - No query planning, no transaction management, no connection pooling:
//!   one storage handle is opened and closed per unit of work.

pub mod batch;
pub mod classify;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod params;
pub mod request;
pub mod session;
pub mod value;

pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayOptions};
pub use request::{ExecRequest, MutationResult, OutputItem, Row, StatementMode};
pub use session::{DriverOptions, DriverSelection, Session};
pub use value::Value;
