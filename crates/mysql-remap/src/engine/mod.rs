//! Batch transfer engine.
//!
//! Drives one transfer end to end: compile the mapping, count the matching
//! rows, stream the source through a forward-only cursor in bounded batches,
//! transform each batch, bulk insert it, and commit it as one unit of work.
//! Batches are strictly sequential; each commit is externally observable
//! before the next fetch is processed, which bounds memory and keeps
//! destination write order identical to source read order.
//!
//! Failure recovery happens at the batch boundary only: a failed batch rolls
//! back whole inside the destination port, previously committed batches stay
//! committed, and the run stops. Nothing is retried internally; a caller
//! resumes by running again with a `where_condition` narrowed to the
//! unprocessed rows.

pub mod sql;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TransferError};
use crate::mapping::{CompiledMapping, MappingSpec};
use crate::port::{DestPort, SourcePort};

/// Callback invoked after every committed batch with
/// `(transferred_records, total_records)`.
pub type ProgressFn = Arc<dyn Fn(i64, i64) + Send + Sync>;

/// Outcome of one transfer run.
///
/// Created when the run starts, updated after every committed batch, and
/// finalized at completion or on the first unrecoverable error. On failure,
/// `transferred_records` counts only committed batches.
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    /// Source table or sub-query text.
    pub source_table: String,
    /// Destination table.
    pub dest_table: String,
    /// Row count from the pre-pass COUNT. Informational: concurrent writers
    /// may change cardinality before or during the stream.
    pub total_records: i64,
    /// Rows committed to the destination.
    pub transferred_records: i64,
    /// Units of work committed.
    pub batches_committed: u64,
    /// Whether the run completed without error.
    pub succeeded: bool,
    /// Error detail for failed runs.
    pub error: Option<String>,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end, set when the result is finalized.
    pub completed_at: Option<DateTime<Utc>>,
    /// Elapsed seconds.
    pub duration_seconds: f64,
}

impl TransferResult {
    fn new(spec: &MappingSpec) -> Self {
        Self {
            source_table: spec.source_table.clone(),
            dest_table: spec.dest_table.clone(),
            total_records: 0,
            transferred_records: 0,
            batches_committed: 0,
            succeeded: false,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: 0.0,
        }
    }

    fn finish(mut self, started: Instant) -> Self {
        self.succeeded = true;
        self.seal(started);
        self
    }

    fn finish_failed(mut self, started: Instant, err: &TransferError) -> Self {
        self.succeeded = false;
        self.error = Some(err.to_string());
        self.seal(started);
        self
    }

    fn seal(&mut self, started: Instant) {
        self.completed_at = Some(Utc::now());
        self.duration_seconds = started.elapsed().as_secs_f64();
    }

    /// Throughput over the whole run, zero while unfinished.
    pub fn rows_per_second(&self) -> i64 {
        if self.duration_seconds > 0.0 {
            (self.transferred_records as f64 / self.duration_seconds) as i64
        } else {
            0
        }
    }

    /// Label used in logs: `source -> dest`.
    pub fn label(&self) -> String {
        format!("{} -> {}", self.source_table, self.dest_table)
    }

    /// Pretty-printed JSON for machine-readable output.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Executes transfers described by [`MappingSpec`]s between two ports.
///
/// The engine owns no connection state of its own. Each batch becomes one
/// committed transaction on the destination port, so destination state always
/// reflects a whole number of batches.
pub struct TransferEngine {
    source: Arc<dyn SourcePort>,
    dest: Arc<dyn DestPort>,
    progress: Option<ProgressFn>,
    cancellation: Option<CancellationToken>,
}

impl TransferEngine {
    /// New engine over a source and destination port.
    pub fn new(source: Arc<dyn SourcePort>, dest: Arc<dyn DestPort>) -> Self {
        Self {
            source,
            dest,
            progress: None,
            cancellation: None,
        }
    }

    /// Install a progress callback, invoked after each committed batch.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Install a cancellation token. Cancellation is honored between
    /// batches only, never mid-batch, so reported progress always matches
    /// committed destination state.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Run one transfer.
    ///
    /// Returns `Err` only for [`TransferError::EmptyMapping`], which is a
    /// precondition failure before any work starts. Every failure after
    /// compilation is folded into the returned [`TransferResult`] so the
    /// caller always receives the committed-batch accounting.
    pub async fn run(&self, spec: &MappingSpec) -> Result<TransferResult> {
        let compiled = CompiledMapping::compile(spec)?;

        let select_sql = sql::build_select(
            compiled.source_columns(),
            &spec.source_table,
            spec.where_condition.as_deref(),
        );
        let count_sql = sql::build_count(&spec.source_table, spec.where_condition.as_deref());

        info!(
            "Starting transfer {} ({} destination columns, batch size {})",
            spec.label(),
            compiled.dest_columns().len(),
            spec.batch_size
        );
        debug!("Source query: {}", select_sql);

        let started = Instant::now();
        let mut result = TransferResult::new(spec);

        let total = match self.source.count(&count_sql).await {
            Ok(total) => total,
            Err(e) => return Ok(self.fail(result, started, TransferError::source_query(e))),
        };
        result.total_records = total;
        info!("{} rows match in {}", total, spec.source_table);

        // Empty source is a successful no-op; no INSERT is ever prepared.
        if total == 0 {
            return Ok(result.finish(started));
        }

        let insert_sql = sql::build_insert(compiled.dest_columns(), &spec.dest_table);
        debug!("Destination statement: {}", insert_sql);

        let mut cursor = match self.source.query(&select_sql).await {
            Ok(cursor) => cursor,
            Err(e) => return Ok(self.fail(result, started, TransferError::source_query(e))),
        };

        loop {
            if let Some(token) = &self.cancellation {
                if token.is_cancelled() {
                    warn!(
                        "Transfer {} cancelled after {} committed rows",
                        spec.label(),
                        result.transferred_records
                    );
                    return Ok(self.fail(result, started, TransferError::Cancelled));
                }
            }

            let batch = match cursor.fetch(spec.batch_size).await {
                Ok(batch) => batch,
                Err(e) => return Ok(self.fail(result, started, TransferError::source_query(e))),
            };
            if batch.is_empty() {
                break;
            }

            let fetched = batch.len();
            let mut outgoing = Vec::with_capacity(fetched);
            for row in batch {
                match compiled.transform_row(row) {
                    Ok(row) => outgoing.push(row),
                    Err(e) => return Ok(self.fail(result, started, e)),
                }
            }

            let written = match self.dest.write_batch(&insert_sql, &outgoing).await {
                Ok(written) => written,
                Err(e) => {
                    let err = TransferError::destination_write(spec.dest_table.as_str(), e);
                    return Ok(self.fail(result, started, err));
                }
            };

            result.transferred_records += written as i64;
            result.batches_committed += 1;
            debug!(
                "Committed batch {} ({} rows, {}/{})",
                result.batches_committed, written, result.transferred_records, result.total_records
            );
            if let Some(progress) = &self.progress {
                progress(result.transferred_records, result.total_records);
            }
        }

        // transferred may differ from the pre-pass count under concurrent
        // source writes; that drift is reported, not corrected.
        let result = result.finish(started);
        info!(
            "Transfer {} complete: {} rows in {} batches, {:.1}s ({} rows/sec)",
            result.label(),
            result.transferred_records,
            result.batches_committed,
            result.duration_seconds,
            result.rows_per_second()
        );
        Ok(result)
    }

    /// Run several transfers in order, stopping after the first failure.
    /// Results for the completed (and the failed) transfers are returned.
    pub async fn run_all(&self, specs: &[MappingSpec]) -> Result<Vec<TransferResult>> {
        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            let result = self.run(spec).await?;
            let failed = !result.succeeded;
            results.push(result);
            if failed {
                warn!(
                    "Transfer {} failed; skipping the remaining {} transfer(s)",
                    spec.label(),
                    specs.len() - results.len()
                );
                break;
            }
        }
        Ok(results)
    }

    /// Finalize a failed result. The in-flight batch, if any, was rolled
    /// back by the destination port; committed batches are untouched.
    fn fail(&self, result: TransferResult, started: Instant, err: TransferError) -> TransferResult {
        error!("{}", err.format_detailed());
        result.finish_failed(started, &err)
    }
}
