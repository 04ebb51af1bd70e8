//! Mapping compilation and per-row application.
//!
//! [`CompiledMapping::compile`] lowers a [`MappingSpec`] into three parallel,
//! position-aligned lists: the SELECT column list, the destination column
//! list, and one resolver per destination column. Compilation is a pure
//! function of the spec; all rule dispatch happens here, once, so the per-row
//! path is a plain match on an already-decided tag.

use tracing::debug;

use crate::error::{Result, TransferError};
use crate::value::{Row, SqlValue};

use super::{CellTransform, ColumnRule, ExtraRule, MappingSpec, ValueGenerator};

/// Compiled per-column unit.
///
/// Mapped variants (`Copy`, `Constant`, `Cell`) each consume one source cell,
/// in order; extra variants (`Literal`, `Generated`) take no input. Compile
/// order guarantees every mapped resolver precedes every extra resolver.
#[derive(Debug, Clone)]
enum Resolver {
    /// Source cell passed through unchanged.
    Copy,
    /// Source cell read and discarded; the constant wins.
    Constant(SqlValue),
    /// Source cell passed through a transform.
    Cell(CellTransform),
    /// No source input; fixed value.
    Literal(SqlValue),
    /// No source input; generated fresh per row.
    Generated(ValueGenerator),
}

/// Output of compiling one [`MappingSpec`]; cached for the duration of a
/// transfer, never persisted.
#[derive(Debug, Clone)]
pub struct CompiledMapping {
    source_columns: Vec<String>,
    dest_columns: Vec<String>,
    resolvers: Vec<Resolver>,
}

impl CompiledMapping {
    /// Lower a spec into column lists and resolvers.
    ///
    /// Fails with [`TransferError::EmptyMapping`] when nothing survives:
    /// every mapped column skipped and no extra columns defined.
    pub fn compile(spec: &MappingSpec) -> Result<Self> {
        let mut source_columns = Vec::new();
        let mut dest_columns = Vec::new();
        let mut resolvers = Vec::new();

        for (source, rule) in &spec.column_mapping {
            let (dest, resolver) = match rule {
                ColumnRule::Skip => continue,
                ColumnRule::Copy => (source.clone(), Resolver::Copy),
                ColumnRule::Rename { dest } => (dest.clone(), Resolver::Copy),
                ColumnRule::Default { dest, value } => (
                    dest.clone().unwrap_or_else(|| source.clone()),
                    Resolver::Constant(value.clone()),
                ),
                ColumnRule::Transform { dest, func } => (
                    dest.clone().unwrap_or_else(|| source.clone()),
                    Resolver::Cell(func.clone()),
                ),
            };
            source_columns.push(source.clone());
            dest_columns.push(dest);
            resolvers.push(resolver);
        }

        for (dest, rule) in &spec.extra_columns {
            let resolver = match rule {
                ExtraRule::Default(value) | ExtraRule::Literal(value) => {
                    Resolver::Literal(value.clone())
                }
                ExtraRule::Generate(generator) => Resolver::Generated(generator.clone()),
            };
            dest_columns.push(dest.clone());
            resolvers.push(resolver);
        }

        if dest_columns.is_empty() {
            return Err(TransferError::EmptyMapping(spec.source_table.clone()));
        }

        debug_assert_eq!(dest_columns.len(), resolvers.len());
        debug!(
            "compiled mapping for {}: {} source columns, {} destination columns",
            spec.label(),
            source_columns.len(),
            dest_columns.len()
        );

        Ok(Self {
            source_columns,
            dest_columns,
            resolvers,
        })
    }

    /// Columns selected from the source, in SELECT order (skips removed).
    pub fn source_columns(&self) -> &[String] {
        &self.source_columns
    }

    /// Destination columns, in INSERT order: mapped columns first, then
    /// extra columns. Same length as the resolver list.
    pub fn dest_columns(&self) -> &[String] {
        &self.dest_columns
    }

    /// Number of resolvers that consume a source cell.
    pub fn mapped_len(&self) -> usize {
        self.source_columns.len()
    }

    /// Apply the compiled resolvers to one source row, producing one
    /// destination row of `dest_columns().len()` values.
    ///
    /// A row shorter than the mapped column count is tolerated: missing
    /// positions resolve to NULL instead of failing, so partial result sets
    /// from a misbehaving driver degrade instead of aborting. Extra trailing
    /// cells are ignored.
    pub fn transform_row(&self, row: Row) -> Result<Row> {
        let mut cells = row.into_iter();
        let mut out = Vec::with_capacity(self.resolvers.len());

        for (resolver, dest) in self.resolvers.iter().zip(&self.dest_columns) {
            let value = match resolver {
                Resolver::Copy => cells.next().unwrap_or(SqlValue::Null),
                Resolver::Constant(value) => {
                    cells.next();
                    value.clone()
                }
                Resolver::Cell(transform) => {
                    let cell = cells.next().unwrap_or(SqlValue::Null);
                    transform.apply(cell).map_err(|msg| {
                        TransferError::transform(
                            dest.as_str(),
                            format!("{} ({})", msg, transform.name()),
                        )
                    })?
                }
                Resolver::Literal(value) => value.clone(),
                Resolver::Generated(generator) => generator.generate().map_err(|msg| {
                    TransferError::transform(
                        dest.as_str(),
                        format!("{} ({})", msg, generator.name()),
                    )
                })?,
            };
            out.push(value);
        }

        Ok(out)
    }
}
