//! `process` command handler

use anyhow::{Context, Result};
use colored::*;

use crate::checkpoint::{DATE_FORMAT, JsonCheckpointStore, TIME_FORMAT};
use crate::cli::ProcessArgs;
use crate::run::{Processor, RunOutcome, RunReport, RunSummary};
use crate::settings::Settings;
use crate::template::OutputRow;

pub fn handle_process_command(args: ProcessArgs, settings: &Settings) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let store = JsonCheckpointStore::new(&settings.checkpoint_path);
    let processor = Processor::new(&store, &settings.template_path, &settings.output_base);

    let report = processor
        .process_file(&args.input, settings.sheet.as_deref(), args.dry_run)
        .with_context(|| format!("Failed to process {}", args.input.display()))?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    match &report.outcome {
        RunOutcome::Committed {
            output,
            rows,
            first_folio,
            next_folio,
            cutoff,
        } => {
            println!("{}", "Processing complete".green().bold());
            println!("  Output:     {}", output.display().to_string().cyan());
            println!(
                "  Rows:       {} (folios {}-{})",
                rows,
                first_folio,
                next_folio.saturating_sub(1)
            );
            println!("  Next folio: {}", next_folio);
            println!("  Cutoff:     {}", format_cutoff(*cutoff));
        }
        RunOutcome::NoOp { cutoff } => {
            println!("{}", "No new records to process.".yellow());
            println!("  Cutoff:     {}", format_cutoff(*cutoff));
        }
        RunOutcome::Preview { rows } => {
            println!("{}", "Dry run, nothing written".yellow().bold());
            print_preview(rows);
        }
    }
    print_summary(&report.summary);
}

fn print_preview(rows: &[OutputRow]) {
    println!(
        "  {:>4}  {:>8}  {:<10}  {:<16}  {:<12}  {:>12}",
        "#".dimmed(),
        "FOLIO".dimmed(),
        "FECHA".dimmed(),
        "PRODUCTO".dimmed(),
        "OT".dimmed(),
        "CANTIDAD".dimmed()
    );
    for row in rows {
        let date = row
            .receipt_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        println!(
            "  {:>4}  {:>8}  {:<10}  {:<16}  {:<12}  {:>12}",
            row.sequence_index + 1,
            row.folio,
            date,
            row.product,
            row.work_order,
            row.quantity
        );
    }
}

fn print_summary(summary: &RunSummary) {
    let line = format!(
        "  Records:    {} loaded, {} new, {} invalid quantity, {} invalid time",
        summary.loaded, summary.new_records, summary.invalid_quantity, summary.invalid_time
    );
    if summary.invalid_quantity > 0 || summary.invalid_time > 0 {
        println!("{}", line.yellow());
    } else {
        println!("{}", line.dimmed());
    }
}

fn format_cutoff(cutoff: Option<chrono::NaiveDateTime>) -> String {
    match cutoff {
        Some(c) => format!("{} {}", c.format(DATE_FORMAT), c.format(TIME_FORMAT)),
        None => "(none)".to_string(),
    }
}
