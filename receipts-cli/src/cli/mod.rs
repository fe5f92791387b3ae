//! Command-line surface

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "receipts-cli", version, about = "Aggregate warehouse receipt exports into ERP load templates")]
pub struct Cli {
    /// Settings file (defaults to <config dir>/receipts-cli/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Checkpoint JSON file
    #[arg(long, global = true)]
    pub checkpoint: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process a receipt export and write the ERP load file
    Process(ProcessArgs),
    /// Inspect or edit the persisted checkpoint
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Receipt export (.xlsx, .xls, .ods or .csv)
    pub input: PathBuf,

    /// ERP template to fill
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Output name prefix; `_DD_MM.xlsx` is appended
    #[arg(long)]
    pub output_base: Option<PathBuf>,

    /// Worksheet to read from the input
    #[arg(long)]
    pub sheet: Option<String>,

    /// Show the rows that would be written without writing or committing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the current checkpoint
    Show {
        /// Print the raw JSON record
        #[arg(long)]
        json: bool,
    },
    /// Update the checkpoint; omitted values are kept
    Set {
        /// Next folio to assign
        #[arg(long)]
        folio: Option<u64>,

        /// Cutoff date, DD/MM/YYYY
        #[arg(long)]
        date: Option<String>,

        /// Cutoff time, HH:MM:SS
        #[arg(long)]
        time: Option<String>,

        /// Forget the cutoff so the next run processes every record
        #[arg(long, conflicts_with_all = ["date", "time"])]
        clear_cutoff: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_process() {
        let cli = Cli::try_parse_from([
            "receipts-cli",
            "process",
            "HistorialCaja.xlsx",
            "--dry-run",
            "--checkpoint",
            "state.json",
        ])
        .unwrap();
        assert_eq!(cli.checkpoint, Some(PathBuf::from("state.json")));
        match cli.command {
            Commands::Process(args) => {
                assert_eq!(args.input, PathBuf::from("HistorialCaja.xlsx"));
                assert!(args.dry_run);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_clear_cutoff_conflicts_with_date() {
        let result = Cli::try_parse_from([
            "receipts-cli",
            "config",
            "set",
            "--clear-cutoff",
            "--date",
            "01/01/2024",
        ]);
        assert!(result.is_err());
    }
}
