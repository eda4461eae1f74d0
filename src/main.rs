//! Command line driver for the textswap substitution engine.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use textswap::config::parse_duration;
use textswap::{
    Config, HookState, HotkeyManager, Replacement, SubstitutionEngine, SubstitutionRequest,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tsw",
    version,
    about = "Erase typed trigger text and inject replacement content into the active application"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "textswap.json")]
    config: String,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Perform one substitution after a countdown
    Once {
        #[command(flatten)]
        replacement: ReplacementArgs,

        /// Delay before synthesizing, giving time to focus the target window
        #[arg(long, default_value = "3s")]
        countdown: String,
    },
    /// Fire the substitution on a global hotkey until interrupted
    Hotkey {
        #[command(flatten)]
        replacement: ReplacementArgs,
    },
    /// Write a default configuration file and exit
    InitConfig,
}

#[derive(Args)]
struct ReplacementArgs {
    /// Number of already-typed characters to erase first
    #[arg(short, long, default_value_t = 0)]
    erase: i32,

    /// Replacement text (plain, or HTML markup with --html)
    #[arg(short, long)]
    text: String,

    /// Treat the replacement as HTML markup
    #[arg(long)]
    html: bool,

    /// Caret position in the replacement, in printable characters from its
    /// start
    #[arg(long)]
    cursor: Option<usize>,
}

impl ReplacementArgs {
    fn request(&self) -> SubstitutionRequest {
        let replacement = if self.html {
            Replacement::html(self.text.clone())
        } else {
            Replacement::plain(self.text.clone())
        };
        SubstitutionRequest {
            chars_to_erase: self.erase,
            replacement,
            cursor_offset: self.cursor,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_tracing(cli.verbose || config.verbose);

    match &cli.command {
        Command::Once {
            replacement,
            countdown,
        } => run_once(&config, &replacement.request(), countdown).await,
        Command::Hotkey { replacement } => run_hotkey(&config, &replacement.request()).await,
        Command::InitConfig => init_config(&cli.config),
    }
}

fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Ok(Config::from_file(path)?)
    } else {
        Ok(Config::default())
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "textswap=debug,tsw=debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_once(config: &Config, request: &SubstitutionRequest, countdown: &str) -> Result<()> {
    let countdown = parse_duration(countdown)?;
    if !countdown.is_zero() {
        println!(
            "⏳ Focus the target window, substituting in {:?}...",
            countdown
        );
        tokio::time::sleep(countdown).await;
    }

    let mut engine = SubstitutionEngine::with_system_ports(config, HookState::new());
    engine
        .perform_substitution(request)
        .context("substitution failed")?;
    println!("{}", "Substitution complete.".green());

    // keep the process alive until the deferred clipboard restore has fired
    tokio::time::sleep(config.clipboard_restore_delay + Duration::from_millis(200)).await;
    Ok(())
}

async fn run_hotkey(config: &Config, request: &SubstitutionRequest) -> Result<()> {
    let mut manager = HotkeyManager::new()?;
    manager.register_trigger(&config.trigger_hotkey)?;
    let mut presses = manager.press_receiver();
    Arc::new(manager).start_listener();

    let mut engine = SubstitutionEngine::with_system_ports(config, HookState::new());
    println!(
        "🔥 Press {} to substitute (Ctrl+C to quit)",
        config.trigger_hotkey.cyan()
    );

    loop {
        tokio::select! {
            changed = presses.changed() => {
                if changed.is_err() {
                    break;
                }
                match engine.perform_substitution(request) {
                    Ok(()) => println!("{}", "Substitution complete.".green()),
                    Err(err) => eprintln!("{} {err}", "substitution failed:".red()),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n{}", "Stopping.".yellow());
                break;
            }
        }
    }
    Ok(())
}

fn init_config(path: &str) -> Result<()> {
    if Path::new(path).exists() {
        bail!("config file '{}' already exists", path);
    }
    Config::default().save_to_file(path)?;
    println!("✅ Default config written to {path}");
    Ok(())
}
