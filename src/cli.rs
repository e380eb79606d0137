// Command-line interface definitions for murmur
//
// Kept separate from main.rs so the argument types can be unit tested
// through the library.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "murmur")]
#[command(author, version, about = "Looping ambient-noise mixer with presets and global hotkeys")]
#[command(long_about = "
Murmur mixes looping ambient sounds (rain, cafe chatter, fans...) into presets
and lets you switch between them with global hotkeys.

SETUP:
  1. Put some sound files (ogg, wav, flac, mp3) in ~/.local/share/murmur/sounds
  2. Add them to a preset: murmur sound add rain.ogg
  3. Unmute: murmur sound mute rain.ogg off && murmur preset mute off
  4. Run: murmur (to start the daemon)

USAGE:
  Up/Down switch to the next/previous preset, Left toggles mute.
  Rebind with: murmur hotkey capture next
  Edits made with the CLI are picked up by a running daemon.
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the data directory (presets, sounds and settings files)
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon,

    /// Show daemon state, the current preset and hotkeys
    Status,

    /// Show current configuration
    Config,

    /// Manage presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Manage the sounds of a preset
    Sound {
        #[command(subcommand)]
        action: SoundAction,

        /// Preset to edit (default: the current preset)
        #[arg(short, long, global = true, value_name = "NAME")]
        preset: Option<String>,
    },

    /// Manage preset groups
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Show or change hotkeys
    Hotkey {
        #[command(subcommand)]
        action: HotkeyCommand,
    },
}

/// On/off switch for mute commands
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Toggle {
    On,
    Off,
    Toggle,
}

impl Toggle {
    /// Resolve against the current value
    pub fn apply(self, current: bool) -> bool {
        match self {
            Toggle::On => true,
            Toggle::Off => false,
            Toggle::Toggle => !current,
        }
    }
}

#[derive(Subcommand)]
pub enum PresetAction {
    /// List presets in order (* marks the current one)
    List,

    /// Make a preset current
    Select { name: String },

    /// Switch to the next preset
    Next,

    /// Switch to the previous preset
    Previous,

    /// Create a preset
    Add {
        name: String,

        /// Insert after this preset (default: at the end)
        #[arg(long, value_name = "NAME")]
        after: Option<String>,
    },

    /// Delete a preset and its file
    Remove { name: String },

    /// Rename a preset
    Rename { old: String, new: String },

    /// Move a preset in the order
    Move {
        name: String,

        /// Place after this preset (default: first)
        #[arg(long, value_name = "NAME")]
        after: Option<String>,
    },

    /// Set a preset's master volume (0-100)
    Volume {
        volume: u8,

        /// Preset to change (default: current)
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },

    /// Mute or unmute a preset
    Mute {
        #[arg(value_enum, default_value = "toggle")]
        state: Toggle,

        /// Preset to change (default: current)
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SoundAction {
    /// List the preset's sounds with their volumes
    List,

    /// Add sound files (relative paths are also looked up in the sounds folder)
    Add {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Remove a sound
    Remove { sound: String },

    /// Set a sound's volume (0-100)
    Volume { sound: String, volume: u8 },

    /// Mute or unmute a sound
    Mute {
        sound: String,

        #[arg(value_enum, default_value = "toggle")]
        state: Toggle,
    },
}

#[derive(Subcommand)]
pub enum GroupAction {
    /// List groups and their members
    List,

    /// Create a group from existing presets
    Create {
        name: String,
        presets: Vec<String>,
    },

    /// Delete a group (its presets are kept)
    Remove { name: String },

    /// Only cycle through this group's presets
    Select { name: String },

    /// Cycle through all presets again
    Clear,

    /// Rename a group
    Rename { old: String, new: String },

    /// Move a group in the order
    Move {
        name: String,

        /// Place after this group (default: first)
        #[arg(long, value_name = "NAME")]
        after: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum HotkeyCommand {
    /// Show the current bindings
    Show,

    /// Bind an action to a key combination (e.g. "LeftCtrl+M")
    Set { action: String, combo: String },

    /// Press the new combination for an action (Escape cancels)
    Capture { action: String },
}
