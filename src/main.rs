//! sndpad - Terminal soundboard with bounded concurrent playback channels.
//!
//! Single keys trigger short audio clips, each played by an external decoder
//! process (`aplay` for WAV, `mpg123` for MP3). Up to a configured number of
//! clips play at once; every active clip owns one display row showing a live
//! progress bar, and the space bar or quit key tears all of them down.
//!
//! The key-to-clip mapping and the playback limits live in a TOML config
//! file (typically ~/.config/sndpad/config.toml); `sndpad init` writes a
//! starter config and running `sndpad` with no subcommand enters the board.

use clap::{CommandFactory, Parser, Subcommand, builder::PossibleValuesParser};
use clap_complete::{Generator, Shell, generate};
use sndpad::cli;
use std::error::Error;
use std::io;

#[derive(Parser)]
#[command(name = "sndpad")]
#[command(about = "Terminal soundboard with bounded concurrent playback channels")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration
    Init,
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Start the interactive soundboard (the default)
    Play,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// View current configuration
    View,
    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_parser = PossibleValuesParser::new([
            "max_channels",
            "poll_interval_ms",
            "progress_width",
            "fallback_duration_secs",
        ]))]
        key: String,
        /// Configuration value
        value: String,
    },
    /// Edit configuration file in your editor
    Edit,
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut io::stdout(),
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init) => {
            cli::init::handle_init()?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::View => {
                cli::config::handle_config_view()?;
            }
            ConfigAction::Set { key, value } => {
                cli::config::handle_config_set(&key, &value)?;
            }
            ConfigAction::Edit => {
                cli::config::handle_config_edit()?;
            }
        },
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            print_completions(shell, &mut cmd);
        }
        Some(Commands::Play) | None => {
            cli::play::handle_play()?;
        }
    }

    Ok(())
}
