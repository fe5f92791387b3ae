//! Run orchestration: load, filter, aggregate, write, commit
//!
//! A run moves `Idle -> Loaded -> Filtered -> Aggregated -> Written ->
//! Committed`, or stops at `NoOp` when no record is newer than the stored
//! cutoff. Any error moves the run to `Failed` with the checkpoint untouched
//! since the last commit. The checkpoint is written exactly once, after the output file is
//! in place, while holding the store lock. A failure after `Written` leaves
//! an output file behind that the checkpoint does not account for; callers
//! must treat it as orphaned.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};

use crate::aggregate::{AggregateRow, aggregate};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::Result;
use crate::filter::{filter_new, max_receipt_time};
use crate::ingest::{InputRecord, Table, load_records, read_table};
use crate::template::{OutputRow, output_rows, write_template};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Loaded,
    Filtered,
    Aggregated,
    Written,
    Committed,
    NoOp,
    Failed,
}

/// Record counts observed during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub loaded: usize,
    pub new_records: usize,
    pub invalid_quantity: usize,
    pub invalid_time: usize,
}

impl RunSummary {
    fn observe(records: &[InputRecord], new_records: usize) -> Self {
        Self {
            loaded: records.len(),
            new_records,
            invalid_quantity: records.iter().filter(|r| !r.quantity.is_valid()).count(),
            invalid_time: records.iter().filter(|r| !r.receipt_time.is_valid()).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Output written and checkpoint advanced
    Committed {
        output: PathBuf,
        rows: usize,
        first_folio: u64,
        next_folio: u64,
        cutoff: Option<NaiveDateTime>,
    },
    /// Nothing newer than the stored cutoff; checkpoint untouched
    NoOp { cutoff: Option<NaiveDateTime> },
    /// Dry run: rows that would be written, nothing persisted
    Preview { rows: Vec<OutputRow> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub summary: RunSummary,
}

/// Composes the loader, filter, aggregator, template writer and checkpoint
pub struct Processor<'a> {
    store: &'a dyn CheckpointStore,
    template: PathBuf,
    output_base: PathBuf,
}

impl<'a> Processor<'a> {
    pub fn new(
        store: &'a dyn CheckpointStore,
        template: impl Into<PathBuf>,
        output_base: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            template: template.into(),
            output_base: output_base.into(),
        }
    }

    /// Process the export at `input`
    pub fn process_file(&self, input: &Path, sheet: Option<&str>, dry_run: bool) -> Result<RunReport> {
        log::info!("Processing {}", input.display());
        let table = read_table(input, sheet)?;
        self.process_table(&table, dry_run)
    }

    /// Process an already-read export table
    pub fn process_table(&self, table: &Table, dry_run: bool) -> Result<RunReport> {
        self.run(table, dry_run).1
    }

    /// Run to completion, returning the final state alongside the result
    fn run(&self, table: &Table, dry_run: bool) -> (RunState, Result<RunReport>) {
        let mut state = RunState::Idle;
        let result = self.execute(table, dry_run, &mut state);
        if let Err(e) = &result {
            log::error!("Run failed in state {:?}: {}", state, e);
            advance(&mut state, RunState::Failed);
        }
        (state, result)
    }

    fn execute(&self, table: &Table, dry_run: bool, state: &mut RunState) -> Result<RunReport> {
        let _lock = self.store.lock()?;
        let checkpoint = self.store.read()?;
        let records = load_records(table)?;
        advance(state, RunState::Loaded);

        let candidate_cutoff = max_receipt_time(&records);
        let new_records = filter_new(&records, checkpoint.last_cutoff);
        let summary = RunSummary::observe(&records, new_records.len());
        advance(state, RunState::Filtered);
        log::info!(
            "{} of {} records are newer than cutoff {:?}",
            summary.new_records,
            summary.loaded,
            checkpoint.last_cutoff
        );

        if new_records.is_empty() {
            advance(state, RunState::NoOp);
            return Ok(RunReport {
                outcome: RunOutcome::NoOp {
                    cutoff: checkpoint.last_cutoff,
                },
                summary,
            });
        }

        let rows = aggregate(&new_records);
        advance(state, RunState::Aggregated);

        if dry_run {
            return Ok(RunReport {
                outcome: RunOutcome::Preview {
                    rows: output_rows(&rows, checkpoint.next_folio),
                },
                summary,
            });
        }

        let reference = reference_date(&rows, candidate_cutoff);
        let output = write_template(
            &self.template,
            &rows,
            checkpoint.next_folio,
            &self.output_base,
            reference,
        )?;
        advance(state, RunState::Written);

        let committed = Checkpoint {
            // Option ordering keeps the cutoff monotonic when no time parsed
            last_cutoff: candidate_cutoff.max(checkpoint.last_cutoff),
            next_folio: checkpoint.next_folio + rows.len() as u64,
        };
        if let Err(e) = self.store.write(&committed) {
            log::error!(
                "Checkpoint commit failed; {} is orphaned and will be regenerated on retry",
                output.display()
            );
            return Err(e);
        }
        advance(state, RunState::Committed);

        Ok(RunReport {
            outcome: RunOutcome::Committed {
                output,
                rows: rows.len(),
                first_folio: checkpoint.next_folio,
                next_folio: committed.next_folio,
                cutoff: committed.last_cutoff,
            },
            summary,
        })
    }
}

fn advance(state: &mut RunState, next: RunState) {
    log::debug!("Run state {:?} -> {:?}", state, next);
    *state = next;
}

/// Date embedded in the output file name
fn reference_date(rows: &[AggregateRow], candidate_cutoff: Option<NaiveDateTime>) -> NaiveDate {
    rows.iter()
        .filter_map(|r| r.earliest_receipt_time)
        .max()
        .or(candidate_cutoff)
        .map(|t| t.date())
        .unwrap_or_else(|| chrono::Local::now().date_naive())
}
