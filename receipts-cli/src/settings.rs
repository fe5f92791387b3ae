//! File locations for a run, resolved from defaults, TOML, environment and flags

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const ENV_CHECKPOINT: &str = "RECEIPTS_CHECKPOINT";
pub const ENV_TEMPLATE: &str = "RECEIPTS_TEMPLATE";
pub const ENV_OUTPUT_BASE: &str = "RECEIPTS_OUTPUT_BASE";
pub const ENV_SHEET: &str = "RECEIPTS_SHEET";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// JSON checkpoint file
    pub checkpoint_path: PathBuf,
    /// ERP load template
    pub template_path: PathBuf,
    /// Output name prefix; `_<DD>_<MM>.xlsx` is appended
    pub output_base: PathBuf,
    /// Input worksheet; first sheet when unset
    pub sheet: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            checkpoint_path: PathBuf::from("config.json"),
            template_path: PathBuf::from("./Plantilla/Plantilla_ERP.xlsx"),
            output_base: PathBuf::from("./Plantilla/CARGA_PT"),
            sheet: None,
        }
    }
}

/// On-disk shape of `config.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    checkpoint_path: Option<PathBuf>,
    template_path: Option<PathBuf>,
    output_base: Option<PathBuf>,
    sheet: Option<String>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub checkpoint_path: Option<PathBuf>,
    pub template_path: Option<PathBuf>,
    pub output_base: Option<PathBuf>,
    pub sheet: Option<String>,
}

impl Settings {
    /// `<config dir>/receipts-cli/config.toml`
    pub fn default_config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("receipts-cli").join("config.toml"))
    }

    /// Resolve settings; an explicit `config_file` must exist
    pub fn load(config_file: Option<&Path>, overrides: &SettingsOverrides) -> Result<Self> {
        let mut settings = Settings::default();

        match config_file {
            Some(path) => settings.apply_file(path)?,
            None => {
                if let Some(path) = Self::default_config_file().filter(|p| p.exists()) {
                    settings.apply_file(&path)?;
                }
            }
        }

        settings.apply_env(|key| std::env::var(key).ok());
        settings.apply_overrides(overrides);

        log::debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let file = parse_settings(&raw)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        log::debug!("Applying settings from {}", path.display());
        if let Some(p) = file.checkpoint_path {
            self.checkpoint_path = p;
        }
        if let Some(p) = file.template_path {
            self.template_path = p;
        }
        if let Some(p) = file.output_base {
            self.output_base = p;
        }
        if file.sheet.is_some() {
            self.sheet = file.sheet;
        }
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup(ENV_CHECKPOINT) {
            self.checkpoint_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_TEMPLATE) {
            self.template_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_OUTPUT_BASE) {
            self.output_base = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_SHEET) {
            self.sheet = Some(v);
        }
    }

    fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(p) = &overrides.checkpoint_path {
            self.checkpoint_path = p.clone();
        }
        if let Some(p) = &overrides.template_path {
            self.template_path = p.clone();
        }
        if let Some(p) = &overrides.output_base {
            self.output_base = p.clone();
        }
        if overrides.sheet.is_some() {
            self.sheet = overrides.sheet.clone();
        }
    }
}

fn parse_settings(raw: &str) -> Result<SettingsFile> {
    Ok(toml::from_str(raw)?)
}
