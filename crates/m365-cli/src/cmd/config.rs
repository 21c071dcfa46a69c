use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use m365_core::config::{Settings, DEFAULT_CONFIG_FILE};
use m365_core::io;
use std::path::{Path, PathBuf};

const REDACTED: &str = "********";

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write a default settings file (never overwrites an existing one)
    Init,

    /// Validate the effective settings (file plus environment)
    Check,

    /// Print the effective settings with secrets redacted
    Show,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(
    path: Option<&Path>,
    settings: &Settings,
    subcmd: ConfigSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Init => init(path),
        ConfigSubcommand::Check => check(settings, json),
        ConfigSubcommand::Show => show(settings, json),
    }
}

fn init(path: Option<&Path>) -> anyhow::Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let yaml = Settings::default().to_yaml()?;
    let written = io::write_if_missing(&path, yaml.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    if written {
        println!("  created: {}", path.display());
    } else {
        println!("  exists:  {}", path.display());
    }
    Ok(())
}

fn check(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let outcome = settings.validate();

    if json {
        print_json(&serde_json::json!({
            "valid": outcome.is_ok(),
            "error": outcome.as_ref().err().map(|e| e.to_string()),
        }))?;
    } else if let Err(e) = &outcome {
        println!("[error] {e}");
    } else {
        println!("Configuration is valid.");
    }

    if outcome.is_err() {
        anyhow::bail!("configuration check failed");
    }
    Ok(())
}

fn show(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let redacted = redact(settings);
    if json {
        print_json(&redacted)?;
    } else {
        print!("{}", redacted.to_yaml()?);
    }
    Ok(())
}

fn redact(settings: &Settings) -> Settings {
    let hide = |v: &Option<String>| v.as_ref().map(|_| REDACTED.to_string());
    Settings {
        azure_client_secret: hide(&settings.azure_client_secret),
        azure_certificate_password: hide(&settings.azure_certificate_password),
        graph_access_token: hide(&settings.graph_access_token),
        ..settings.clone()
    }
}
