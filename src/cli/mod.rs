//! CLI module for Tolk.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Tolk - Accessible Livestream Companion
///
/// A terminal companion that overlays spoken AI commentary on YouTube videos
/// and livestreams. The name "Tolk" comes from the Norwegian word for
/// "interpreter."
#[derive(Parser, Debug)]
#[command(name = "tolk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch a video with live AI commentary (interactive session)
    Watch {
        /// YouTube URL or video ID to load at startup
        url: Option<String>,
    },

    /// Ask a one-shot question about a video
    Ask {
        /// The question to ask
        question: String,

        /// YouTube video ID to ask about
        #[arg(short = 'i', long)]
        video: Option<String>,

        /// Playback position in seconds for the transcript window
        #[arg(short, long, default_value = "0")]
        time: f64,
    },

    /// Start the companion server (REST + WebSocket)
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
