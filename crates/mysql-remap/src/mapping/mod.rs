//! Declarative column mapping model.
//!
//! A [`MappingSpec`] describes one transfer: where rows come from, where they
//! go, and a rule per column. Rules are explicit tagged variants so that all
//! rule dispatch happens once, at compile time ([`CompiledMapping::compile`]);
//! the per-row loop never inspects rule structure again.
//!
//! # Ordering
//!
//! `column_mapping` and `extra_columns` are insertion-ordered maps, and that
//! order is load-bearing: mapping order defines the generated SELECT list,
//! and (after skips are removed) the destination column order, with extra
//! columns appended at the end. Row values are matched to rules by position,
//! not by name. Reordering entries changes both the generated SQL and the
//! positional alignment.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::value::SqlValue;

mod compiler;
mod registry;

pub use compiler::CompiledMapping;
pub use registry::{Clock, SystemClock, TransformRegistry};

/// Default number of rows moved per fetch/commit cycle.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A named per-cell transform: receives the source value, returns the
/// destination value or a fault message.
#[derive(Clone)]
pub struct CellTransform {
    name: String,
    func: Arc<dyn Fn(SqlValue) -> std::result::Result<SqlValue, String> + Send + Sync>,
}

impl CellTransform {
    /// Wrap a function as a named transform. The name shows up in error
    /// detail when the transform faults.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(SqlValue) -> std::result::Result<SqlValue, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Transform name as registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply the transform to one cell.
    pub fn apply(&self, value: SqlValue) -> std::result::Result<SqlValue, String> {
        (self.func)(value)
    }
}

impl fmt::Debug for CellTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CellTransform").field(&self.name).finish()
    }
}

/// A named niladic value producer for extra columns: invoked once per row
/// with no source input.
#[derive(Clone)]
pub struct ValueGenerator {
    name: String,
    func: Arc<dyn Fn() -> std::result::Result<SqlValue, String> + Send + Sync>,
}

impl ValueGenerator {
    /// Wrap a function as a named generator.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn() -> std::result::Result<SqlValue, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Generator name as registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produce a fresh value. Called once per row; results are never
    /// memoized, so time- or counter-based generators vary row to row.
    pub fn generate(&self) -> std::result::Result<SqlValue, String> {
        (self.func)()
    }
}

impl fmt::Debug for ValueGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValueGenerator").field(&self.name).finish()
    }
}

/// Rule for one mapped source column.
///
/// The destination name resolves to the explicit `dest` where present, else
/// the source column name. The value resolves by fixed precedence: default
/// beats transform beats raw copy (enforced when loose config rules are
/// lowered; the variants themselves are unambiguous).
#[derive(Debug, Clone)]
pub enum ColumnRule {
    /// Copy the value under the source column's own name.
    Copy,

    /// Drop the column entirely: it appears in neither the SELECT list nor
    /// the destination columns.
    Skip,

    /// Copy the value under a different destination name.
    Rename {
        /// Destination column name.
        dest: String,
    },

    /// Write a constant for every row. The source cell is still selected and
    /// read, then discarded.
    Default {
        /// Destination name; `None` keeps the source name.
        dest: Option<String>,
        /// Constant written for every row.
        value: SqlValue,
    },

    /// Pass the source cell through a transform.
    Transform {
        /// Destination name; `None` keeps the source name.
        dest: Option<String>,
        /// Transform applied to every cell.
        func: CellTransform,
    },
}

impl ColumnRule {
    /// Rename shorthand.
    pub fn rename(dest: impl Into<String>) -> Self {
        ColumnRule::Rename { dest: dest.into() }
    }

    /// Constant value, keeping the source column name.
    pub fn default_value(value: impl Into<SqlValue>) -> Self {
        ColumnRule::Default {
            dest: None,
            value: value.into(),
        }
    }

    /// Transform, keeping the source column name.
    pub fn transform(func: CellTransform) -> Self {
        ColumnRule::Transform { dest: None, func }
    }

    /// Transform written to a different destination column.
    pub fn transform_as(dest: impl Into<String>, func: CellTransform) -> Self {
        ColumnRule::Transform {
            dest: Some(dest.into()),
            func,
        }
    }

    /// True for [`ColumnRule::Skip`].
    pub fn is_skip(&self) -> bool {
        matches!(self, ColumnRule::Skip)
    }
}

/// Rule for one destination-only column with no source counterpart.
#[derive(Debug, Clone)]
pub enum ExtraRule {
    /// Constant for every row.
    Default(SqlValue),

    /// Value generated fresh per row (timestamps, identifiers).
    Generate(ValueGenerator),

    /// Plain scalar given directly in place of a structured rule.
    Literal(SqlValue),
}

/// Declarative description of one transfer, provided once per run.
#[derive(Debug, Clone)]
pub struct MappingSpec {
    /// Table name or arbitrary sub-query text, spliced verbatim into the
    /// generated SELECT and COUNT statements.
    pub source_table: String,

    /// Destination table name.
    pub dest_table: String,

    /// Optional filter fragment for the source side; `None` means all rows.
    pub where_condition: Option<String>,

    /// Rows fetched and committed per unit of work.
    pub batch_size: usize,

    /// Ordered source-column → rule entries. See the module docs for why
    /// order matters.
    pub column_mapping: IndexMap<String, ColumnRule>,

    /// Ordered destination-only columns, appended after the mapped columns.
    pub extra_columns: IndexMap<String, ExtraRule>,
}

impl MappingSpec {
    /// New spec with the default batch size, no filter, and empty mappings.
    pub fn new(source_table: impl Into<String>, dest_table: impl Into<String>) -> Self {
        Self {
            source_table: source_table.into(),
            dest_table: dest_table.into(),
            where_condition: None,
            batch_size: DEFAULT_BATCH_SIZE,
            column_mapping: IndexMap::new(),
            extra_columns: IndexMap::new(),
        }
    }

    /// Append a mapped column. Order of calls defines SELECT order.
    pub fn with_column(mut self, source: impl Into<String>, rule: ColumnRule) -> Self {
        self.column_mapping.insert(source.into(), rule);
        self
    }

    /// Append a destination-only column.
    pub fn with_extra(mut self, dest: impl Into<String>, rule: ExtraRule) -> Self {
        self.extra_columns.insert(dest.into(), rule);
        self
    }

    /// Set the source filter fragment.
    pub fn with_where_condition(mut self, condition: impl Into<String>) -> Self {
        let condition = condition.into();
        self.where_condition = if condition.trim().is_empty() {
            None
        } else {
            Some(condition)
        };
        self
    }

    /// Override the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Label used in logs and results: `source -> dest`.
    pub fn label(&self) -> String {
        format!("{} -> {}", self.source_table, self.dest_table)
    }
}
