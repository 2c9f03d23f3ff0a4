// CLI definitions using clap

use clap::{Parser, Subcommand};
use mascon_translator::auxiliary::AuxFunction;
use mascon_translator::combo::Position;
use mascon_translator::config::TimingField;
use mascon_translator::output::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mascon-translator")]
#[command(author, version, about = "Mascon lever to keyboard/mouse input translator")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate lever input until Ctrl-C (default)
    Run {
        /// Profile to use (default: the one set with `profile use`)
        #[arg(short, long)]
        profile: Option<String>,

        /// Joystick device node, e.g. /dev/input/event5
        #[arg(short, long)]
        device: Option<PathBuf>,

        /// Override the profile's output mode (arrow-keys, mouse-scroll, lever-keys)
        #[arg(short, long)]
        mode: Option<OutputMode>,
    },

    /// List connected joysticks
    #[command(visible_aliases = ["list", "ls"])]
    Devices,

    /// Record the buttons for each lever position
    LearnLever {
        #[arg(short, long)]
        profile: Option<String>,

        #[arg(short, long)]
        device: Option<PathBuf>,
    },

    /// Bind an auxiliary function to the next button pressed
    LearnAux {
        /// big-horn, small-horn, credit, test-menu or debug-mission
        function: AuxFunction,

        #[arg(short, long)]
        profile: Option<String>,

        #[arg(short, long)]
        device: Option<PathBuf>,
    },

    /// Unbind all auxiliary functions
    ClearAux {
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Set the lever-keys mode key for one position (0 or none unbinds)
    SetKey {
        /// Position name (B9..B1, N, P1..P5) or index 0-14
        position: Position,

        /// Key name, e.g. A, 1, SPACE, F5
        key: String,

        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Change one timing value in milliseconds
    SetTiming {
        /// debounce, step-delay, scroll-delay, key-hold or poll-interval
        timing: TimingField,

        ms: u64,

        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Change the saved output mode (arrow-keys, mouse-scroll, lever-keys)
    SetMode {
        mode: OutputMode,

        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Manage profiles
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Show application settings
    Settings,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List profiles
    List,
    /// Print a profile as TOML
    Show { name: Option<String> },
    /// Duplicate a profile
    Copy { name: String },
    /// Rename a profile
    Rename { from: String, to: String },
    /// Delete a profile
    Delete { name: String },
    /// Restore a profile to the built-in defaults
    Reset { name: String },
    /// Make a profile the default for `run`
    Use { name: String },
}
