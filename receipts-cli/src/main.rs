mod aggregate;
mod checkpoint;
mod cli;
mod error;
mod filter;
mod ingest;
mod run;
mod settings;
mod template;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use settings::{Settings, SettingsOverrides};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "receipts_cli=debug" } else { "receipts_cli=info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut overrides = SettingsOverrides {
        checkpoint_path: cli.checkpoint.clone(),
        ..Default::default()
    };
    if let Commands::Process(args) = &cli.command {
        overrides.template_path = args.template.clone();
        overrides.output_base = args.output_base.clone();
        overrides.sheet = args.sheet.clone();
    }
    let settings = Settings::load(cli.config.as_deref(), &overrides)?;

    match cli.command {
        Commands::Process(args) => cli::commands::handle_process_command(args, &settings),
        Commands::Config(command) => cli::commands::handle_config_command(command, &settings),
    }
}
