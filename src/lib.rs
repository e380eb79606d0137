//! Murmur: looping ambient-noise mixer with presets and global hotkeys
//!
//! This library provides the core functionality for:
//! - Storing presets, sounds, groups and hotkeys as JSON files
//! - Mirroring the current preset onto looping rodio voices
//! - Detecting global hotkeys via rdev and matching them against bindings
//! - Running a daemon that reacts to hotkeys and to edits made on disk
//!
//! # Architecture
//!
//! ```text
//!   murmur preset/sound/group/hotkey ...
//!                  │ edits
//!                  ▼
//!          ┌──────────────────┐   notify    ┌──────────────────────────┐
//!          │   JSON settings  │ ──────────▶ │          Daemon          │
//!          │ (data directory) │             │    tokio::select! loop   │
//!          └──────────────────┘             └──────────────────────────┘
//!                                              ▲            │
//!                              key events      │            │ current preset
//!                                              │            ▼
//!                                      ┌──────────────┐ ┌──────────────┐
//!                                      │    Hotkey    │ │    Player    │
//!                                      │ rdev+matcher │ │   (rodio)    │
//!                                      └──────────────┘ └──────────────┘
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod hotkey;
pub mod library;
pub mod settings;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{MurmurError, Result};
pub use library::PresetLibrary;
