//! # mysql-remap
//!
//! Mapping-driven batch transfer between MySQL databases.
//!
//! This library copies rows from a source table (or sub-query) into a
//! destination table, reshaping each row along the way:
//!
//! - **Declarative mappings**: rename, skip, default, or transform
//!   individual columns from YAML, in order
//! - **Injected columns**: constants and per-row generated values that do
//!   not exist on the source
//! - **Batched streaming** over a forward-only cursor with bounded memory
//! - **Transactional batches**: each batch commits whole or not at all,
//!   and a failure keeps every previously committed batch
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use mysql_remap::{Config, MysqlReader, MysqlWriter, TransferEngine, TransformRegistry};
//!
//! #[tokio::main]
//! async fn main() -> mysql_remap::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let specs = config.resolve_transfers(&TransformRegistry::default())?;
//!
//!     let reader = Arc::new(MysqlReader::connect(&config.source).await?);
//!     let writer = Arc::new(MysqlWriter::connect(&config.destination).await?);
//!
//!     let engine = TransferEngine::new(reader.clone(), writer.clone());
//!     for result in engine.run_all(&specs).await? {
//!         println!("{}: {} rows", result.label(), result.transferred_records);
//!     }
//!
//!     writer.close().await;
//!     reader.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod port;
pub mod value;

// Re-exports for convenient access
pub use config::{Config, EndpointConfig, RawColumnRule, RawExtraRule, TransferConfig, SAMPLE_CONFIG};
pub use drivers::{MysqlReader, MysqlWriter};
pub use engine::{ProgressFn, TransferEngine, TransferResult};
pub use error::{Result, TransferError};
pub use mapping::{
    CellTransform, Clock, ColumnRule, CompiledMapping, ExtraRule, MappingSpec, SystemClock,
    TransformRegistry, ValueGenerator, DEFAULT_BATCH_SIZE,
};
pub use port::{DestPort, RowCursor, SourcePort};
pub use value::{Row, SqlValue};
