use std::path::PathBuf;

use clap::{Parser, Subcommand};

use signet_cli::{commands, CliContext, ExitCode};
use signet_core::config::load_config;
use signet_engine::ComplianceEngine;

/// Signet -- offline compliance-documentation manager.
#[derive(Parser)]
#[command(name = "signet", about = "Signet -- offline compliance-documentation manager")]
#[command(version)]
struct Cli {
    /// Enable TRACE-level logging.
    #[arg(long, global = true)]
    verbose: bool,

    /// Only log errors.
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit results (and logs) as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Explicit config file (overrides `.signet.yaml` discovery).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the data directory from the config.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage control documents and their approval signatures.
    Document(commands::document::DocumentArgs),
    /// Manage operational evidence forms.
    Form(commands::form::FormArgs),
    /// View and complete a control's evidence checklist.
    Checklist(commands::checklist::ChecklistArgs),
    /// Show which evidence modality applies to a control.
    Resolve(commands::resolve::ResolveArgs),
    /// Inspect and verify the activity trail.
    Activity(commands::activity::ActivityArgs),
    /// Show or validate Signet configuration.
    Config(commands::config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if let Err(err) = signet_core::init_tracing(cli.verbose, cli.quiet, cli.json) {
        eprintln!("signet: error: {err}");
        return signet_cli::terminate(ExitCode::EngineError);
    }

    // `config` commands operate on configuration alone and must work even
    // when the store or catalog cannot be opened yet.
    if let Commands::Config(args) = &cli.command {
        let code = commands::config::execute(args, cli.config.as_deref(), cli.json);
        return signet_cli::terminate(code);
    }

    let mut config = match load_config(Some(std::path::Path::new(".")), cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("signet: error: {err}");
            return signet_cli::terminate(ExitCode::ConfigError);
        }
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.display().to_string();
    }

    let engine = match ComplianceEngine::open(&config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("signet: error: {err}");
            return signet_cli::terminate(signet_cli::classify(&err));
        }
    };
    let mut ctx = CliContext {
        engine,
        json: cli.json,
    };

    let code = match cli.command {
        Commands::Document(args) => commands::document::execute(&args, &mut ctx),
        Commands::Form(args) => commands::form::execute(&args, &mut ctx),
        Commands::Checklist(args) => commands::checklist::execute(&args, &mut ctx),
        Commands::Resolve(args) => commands::resolve::execute(&args, &ctx),
        Commands::Activity(args) => commands::activity::execute(&args, &ctx),
        Commands::Config(_) => unreachable!("handled above"),
    };
    signet_cli::terminate(code)
}
