//! CraftBot - CLI entry point
//!
//! `craftbot run` starts the bot, `craftbot check` diagnoses a configuration
//! and `craftbot config` manages the configuration file.

use clap::{Parser, Subcommand};
use craftbot::check;
use craftbot::config::schema::LogLevel;
use craftbot::config::{default, xdg, ConfigLoader};
use craftbot::daemon::{run_daemon, RunOptions};
use craftbot::generator::{resolve_api_key, GeminiGenerator};
use craftbot::logging;
use std::path::PathBuf;
use std::process::ExitCode;

/// Chat assistant for Minecraft servers
#[derive(Parser)]
#[command(name = "craftbot")]
#[command(version, about = "Chat assistant for Minecraft servers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the craftbot CLI
#[derive(Subcommand)]
enum Commands {
    /// Watch server logs and answer prompts
    Run {
        /// Configuration file (default: XDG config path)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run as a background daemon (detached from terminal)
        #[arg(long)]
        daemonize: bool,
    },

    /// Check the configuration for common mistakes
    Check {
        /// Configuration file (default: XDG config path)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also send one test prompt to the text generator
        #[arg(long)]
        ping: bool,
    },

    /// Manage configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Actions for the `config` subcommand.
#[derive(Subcommand)]
enum ConfigAction {
    /// Create default configuration file
    Init {
        /// Overwrite existing configuration (creates backup)
        #[arg(long)]
        force: bool,
    },
    /// Show configuration file path
    Path,
    /// Validate configuration file
    Validate {
        /// Configuration file (default: XDG config path)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // Parse CLI arguments BEFORE any fork/runtime operations
    // This ensures errors are shown to the user in the terminal
    let cli = Cli::parse();

    // A missing .env is fine; the key may come from the environment.
    let _ = dotenv::dotenv();

    match cli.command {
        Commands::Run { config, daemonize } => {
            let options = RunOptions {
                config_path: config,
                daemonize,
            };
            if let Err(e) = run_daemon(options) {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        Commands::Check { config, ping } => {
            return run_check_command(config, ping);
        }
        Commands::Config { action } => {
            let result = match action {
                ConfigAction::Init { force } => default::create_default_config(force).map(|path| {
                    println!("Created configuration at {}", path.display());
                }),
                ConfigAction::Path => {
                    println!("{}", xdg::config_path().display());
                    Ok(())
                }
                ConfigAction::Validate { config } => ConfigLoader::load(config.as_deref())
                    .and_then(|config| {
                        config.validate()?;
                        Ok(config)
                    })
                    .map(|config| {
                        println!(
                            "Configuration is valid ({} server(s))",
                            config.servers.len()
                        );
                    }),
            };
            if let Err(e) = result {
                eprintln!("Config error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

/// Prints a diagnostics report. Exits with failure if any check failed.
fn run_check_command(config_path: Option<PathBuf>, ping: bool) -> ExitCode {
    logging::init(LogLevel::Warn);

    let config = match ConfigLoader::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut report = check::check_config(&config);
    if ping {
        report.push(ping_section(&config));
    }

    print!("{report}");
    if report.passed() {
        println!("All checks passed.");
        ExitCode::SUCCESS
    } else {
        println!("Some checks failed; fix them before running `craftbot run`.");
        ExitCode::FAILURE
    }
}

fn ping_section(config: &craftbot::Config) -> check::Section {
    if resolve_api_key(&config.gemini.api_key_env).is_err() {
        return check::ping_skipped("skipped, API key not configured");
    }
    let timeout = match config.gemini.timeout() {
        Ok(timeout) => timeout,
        Err(e) => return check::ping_skipped(&format!("skipped, {e}")),
    };
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => return check::ping_skipped(&format!("skipped, no tokio runtime: {e}")),
    };
    runtime.block_on(async {
        match GeminiGenerator::from_config(&config.gemini, timeout) {
            Ok(generator) => check::ping(&generator).await,
            Err(e) => check::ping_skipped(&format!("skipped, {e}")),
        }
    })
}
