//! Data access for the equipment and traffic-measurement store.
//!
//! [`Executor`] is the single seam between the dashboard and the database:
//! it runs one parameterized [`Query`] and returns the rows as an in-memory
//! [`Table`]. [`MySqlExecutor`] is the production implementation; entity
//! structs decode themselves from a [`Table`] through [`FromRow`].

mod error;
mod mysql;
mod query;
mod table;
pub mod templates;

pub use error::DataError;
pub use mysql::MySqlExecutor;
pub use query::{Param, Query};
pub use table::{FromRow, RowRef, Table, Value};

use async_trait::async_trait;

/// Runs a parameterized query against the store.
///
/// Implementations must bind parameters rather than interpolate them, and a
/// query matching zero rows must produce an empty [`Table`], not an error.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, query: &Query) -> Result<Table, DataError>;
}
