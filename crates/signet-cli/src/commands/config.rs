//! `signet config` -- show or validate configuration.

use std::path::Path;

use clap::{Args, Subcommand};

use signet_core::config::load_config;
use signet_evidence::EvidenceCatalog;

use crate::ExitCode;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective (merged) configuration.
    Show,
    /// Check that the configuration and the catalog it names load cleanly.
    Validate,
}

pub fn execute(args: &ConfigArgs, explicit: Option<&Path>, json: bool) -> ExitCode {
    let config = match load_config(Some(Path::new(".")), explicit) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("signet: error: {err}");
            return ExitCode::ConfigError;
        }
    };

    match &args.command {
        ConfigCommand::Show => {
            if json {
                match serde_json::to_string_pretty(&config) {
                    Ok(text) => println!("{text}"),
                    Err(e) => {
                        eprintln!("signet: error: {e}");
                        return ExitCode::EngineError;
                    }
                }
            } else {
                println!("data dir:      {}", config.storage.data_dir);
                println!("database:      {}", config.database_path().display());
                println!("evidence root: {}", config.evidence_root().display());
                println!("catalog:       {}", config.catalog_path().display());
            }
            ExitCode::Ok
        }
        ConfigCommand::Validate => match EvidenceCatalog::load(&config.catalog_path()) {
            Ok(_) => {
                println!("configuration ok");
                ExitCode::Ok
            }
            Err(err) => {
                eprintln!("signet: error: {err}");
                ExitCode::ConfigError
            }
        },
    }
}
