//! CLI argument definitions using Clap

use std::str::FromStr;

use clap::{Parser, Subcommand};

/// Recordify - voice memo recorder
#[derive(Parser, Debug)]
#[command(name = "recordify")]
#[command(version)]
#[command(about = "Record voice memos with pause/resume and save them locally or to an endpoint")]
#[command(long_about = None)]
pub struct Cli {
    /// Upload recordings to this URL instead of storing them locally
    #[arg(short = 'e', long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Directory for locally stored recordings
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Bearer token sent with uploads
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Show desktop notifications
    #[arg(short = 'n', long)]
    pub notify: bool,

    /// Config subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "endpoint",
    "token",
    "output_dir",
    "notify",
    "audio.sample_rate",
    "audio.channels",
    "audio.timeslice_ms",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

/// A line typed into an interactive session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Pause,
    Resume,
    Stop,
    Save,
    Status,
    Help,
    Quit,
}

impl SessionCommand {
    /// One line per command for the help listing
    pub const HELP: &'static [(&'static str, &'static str)] = &[
        ("start, r", "start a new recording (discards an unsaved one)"),
        ("pause, p", "pause the recording"),
        ("resume, c", "resume a paused recording"),
        ("stop, s", "stop and finalize the recording"),
        ("save, w", "save the finished recording"),
        ("status", "show the current state"),
        ("help, ?", "show this help"),
        ("quit, q", "release the microphone and exit"),
    ];
}

impl FromStr for SessionCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" | "r" => Ok(Self::Start),
            "pause" | "p" => Ok(Self::Pause),
            "resume" | "c" => Ok(Self::Resume),
            "stop" | "s" => Ok(Self::Stop),
            "save" | "w" => Ok(Self::Save),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(format!("Unknown command '{}'. Type 'help' for a list.", other)),
        }
    }
}
