//! Capability traits for the two sides of a transfer.
//!
//! The engine never talks to a driver directly. It reads through a
//! [`SourcePort`] (run a query, stream rows in bounded chunks) and writes
//! through a [`DestPort`] (insert one batch of rows as a single committed
//! unit). Anything that can provide these operations can sit on either end.

use async_trait::async_trait;

use crate::error::Result;
use crate::value::Row;

/// Read side of a transfer.
#[async_trait]
pub trait SourcePort: Send + Sync {
    /// Execute a row-returning statement and hand back a forward-only cursor.
    async fn query(&self, sql: &str) -> Result<Box<dyn RowCursor>>;

    /// Execute a single-value aggregate (COUNT) statement.
    async fn count(&self, sql: &str) -> Result<i64>;
}

/// Forward-only cursor over a query result.
#[async_trait]
pub trait RowCursor: Send {
    /// Fetch up to `max_rows` rows. The final fetch may return fewer; an
    /// empty result means the cursor is exhausted. Not restartable.
    async fn fetch(&mut self, max_rows: usize) -> Result<Vec<Row>>;
}

/// Write side of a transfer.
#[async_trait]
pub trait DestPort: Send + Sync {
    /// Execute a parameterized INSERT once per row, inside one transaction
    /// committed before returning. A failure must leave none of the batch
    /// behind. Returns the number of rows written.
    async fn write_batch(&self, sql: &str, rows: &[Row]) -> Result<u64>;
}
