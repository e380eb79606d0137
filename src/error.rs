//! Error types for murmur
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the murmur application
#[derive(Error, Debug)]
pub enum MurmurError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reading or writing the JSON settings files
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from preset, sound and group bookkeeping
#[derive(Error, Debug)]
pub enum PresetError {
    #[error("Preset '{0}' does not exist. List presets with: murmur preset list")]
    NotFound(String),

    #[error("Preset '{0}' already exists")]
    AlreadyExists(String),

    #[error("A preset file already exists at {0}")]
    FileExists(PathBuf),

    #[error("Invalid preset name '{0}': names must be non-empty and cannot contain path separators")]
    InvalidName(String),

    #[error("Cannot remove '{0}': it is the only preset")]
    LastPreset(String),

    #[error("Sound '{0}' does not exist in this preset")]
    SoundNotFound(String),

    #[error("Sound '{0}' is already part of this preset")]
    SoundExists(String),

    #[error("Sound file not found: {0}")]
    SoundFileMissing(PathBuf),

    #[error("Volume {0} is out of range (0-100)")]
    InvalidVolume(u8),

    #[error("Group '{0}' does not exist")]
    GroupNotFound(String),

    #[error("Group '{0}' already exists")]
    GroupExists(String),

    #[error("No presets to cycle through in the current selection")]
    NothingToCycle,

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Errors related to hotkey parsing, binding and capture
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Unknown key name: '{0}'. Examples: Up, F9, LeftCtrl, A, Escape")]
    UnknownKey(String),

    #[error("A hotkey cannot be empty")]
    EmptyCombo,

    #[error("'{0}' has more than one character key; use modifiers plus a single key")]
    MultipleKeys(String),

    #[error("{combo} is already bound to '{action}'")]
    Conflict { combo: String, action: String },

    #[error("Unknown hotkey action '{0}'. Use: next, previous, mute")]
    UnknownAction(String),

    #[error("Global key capture failed: {0}")]
    Listen(String),

    #[error("No key combination was pressed within {0} seconds")]
    CaptureTimeout(u64),

    #[error("Hotkey capture was cancelled")]
    CaptureCancelled,
}

/// Errors related to audio output and sound decoding
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio output unavailable: {0}")]
    Output(String),

    #[error("Cannot open sound {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("Cannot decode sound {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Audio sink error: {0}")]
    Sink(String),

    #[error("Too many sounds: the mixer is limited to {0} voices")]
    TooManySounds(usize),
}

/// Result type alias using MurmurError
pub type Result<T> = std::result::Result<T, MurmurError>;

impl From<rodio::StreamError> for AudioError {
    fn from(e: rodio::StreamError) -> Self {
        AudioError::Output(e.to_string())
    }
}

impl From<rodio::PlayError> for AudioError {
    fn from(e: rodio::PlayError) -> Self {
        AudioError::Sink(e.to_string())
    }
}
