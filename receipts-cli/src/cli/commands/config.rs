//! `config` command handler

use anyhow::{Context, Result};
use colored::*;

use crate::checkpoint::{CheckpointUpdate, JsonCheckpointStore, get_config, set_config};
use crate::cli::ConfigCommands;
use crate::settings::Settings;

pub fn handle_config_command(command: ConfigCommands, settings: &Settings) -> Result<()> {
    let store = JsonCheckpointStore::new(&settings.checkpoint_path);

    match command {
        ConfigCommands::Show { json } => {
            let record = get_config(&store).context("Failed to read checkpoint")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("Checkpoint: {}", store.path().display().to_string().cyan());
                println!("  ultimo_folio:    {}", record.ultimo_folio.to_string().bold());
                let registro = if record.ultimo_registro.is_empty() {
                    "(none)".dimmed().to_string()
                } else {
                    record.ultimo_registro.bold().to_string()
                };
                println!("  ultimo_registro: {}", registro);
                println!("  ultima_hora:     {}", record.ultima_hora.bold());
            }
        }
        ConfigCommands::Set {
            folio,
            date,
            time,
            clear_cutoff,
        } => {
            if folio.is_none() && date.is_none() && time.is_none() && !clear_cutoff {
                anyhow::bail!("Nothing to update: pass --folio, --date, --time or --clear-cutoff");
            }

            let update = CheckpointUpdate {
                folio,
                date,
                time,
                clear_cutoff,
            };
            let updated = set_config(&store, &update).context("Failed to update checkpoint")?;
            let record = updated.to_record();

            println!("{}", "Checkpoint updated".green().bold());
            println!("  ultimo_folio:    {}", record.ultimo_folio);
            println!("  ultimo_registro: {}", record.ultimo_registro);
            println!("  ultima_hora:     {}", record.ultima_hora);
        }
    }

    Ok(())
}
