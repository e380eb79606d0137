//! Configuration loading and types for murmur
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/murmur/config.toml)
//! 3. Environment variables (MURMUR_*)
//! 4. CLI arguments (highest priority)
//!
//! The config only says *where* things live and how the daemon behaves.
//! Presets, sounds and hotkeys are user data and are kept as JSON files
//! inside the data directory (see [`crate::settings`]).

use crate::error::MurmurError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Murmur Configuration
#
# Location: ~/.config/murmur/config.toml
# All settings can be overridden via CLI flags

[library]
# Directory holding presets_settings.json, hotkey_settings.json,
# the presets/ folder and the sounds/ folder.
# Defaults to the platform data directory (~/.local/share/murmur on Linux).
# data_dir = "/home/me/ambient"

# Override individual folders (relative paths are resolved against data_dir)
# presets_dir = "presets"
# sounds_dir = "sounds"

[audio]
# Play sounds at all (false is handy for editing presets over SSH)
enabled = true

# Maximum number of sounds mixed at once
max_sounds = 64

[hotkeys]
# Listen for global hotkeys while the daemon runs
enabled = true

# Seconds `murmur hotkey capture` waits for a key combination
capture_timeout_secs = 30
"#;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub hotkeys: HotkeyConfig,
}

/// Where presets, sounds and settings files are stored
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Root data directory (None = platform default)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Preset files folder, relative to data_dir unless absolute
    #[serde(default)]
    pub presets_dir: Option<PathBuf>,

    /// Default folder for sound files, relative to data_dir unless absolute
    #[serde(default)]
    pub sounds_dir: Option<PathBuf>,
}

/// Mixer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    /// Play sounds at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of simultaneously loaded sounds
    #[serde(default = "default_max_sounds")]
    pub max_sounds: usize,
}

/// Global hotkey configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HotkeyConfig {
    /// Enable built-in hotkey detection (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How long `murmur hotkey capture` waits for a combination
    #[serde(default = "default_capture_timeout")]
    pub capture_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_sounds() -> usize {
    64
}

fn default_capture_timeout() -> u64 {
    30
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_sounds: default_max_sounds(),
        }
    }
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capture_timeout_secs: default_capture_timeout(),
        }
    }
}

/// Resolved on-disk locations of the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPaths {
    pub data_dir: PathBuf,
    pub presets_dir: PathBuf,
    pub sounds_dir: PathBuf,
    pub library_file: PathBuf,
    pub hotkeys_file: PathBuf,
}

impl LibraryPaths {
    /// Lay out the standard file names under a data directory
    pub fn under(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            presets_dir: data_dir.join("presets"),
            sounds_dir: data_dir.join("sounds"),
            library_file: data_dir.join("presets_settings.json"),
            hotkeys_file: data_dir.join("hotkey_settings.json"),
            data_dir,
        }
    }

    /// Create the data, presets and sounds directories
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [&self.data_dir, &self.presets_dir, &self.sounds_dir] {
            std::fs::create_dir_all(dir)?;
            tracing::debug!("Ensured directory exists: {:?}", dir);
        }
        Ok(())
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "murmur")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Platform default data directory
    pub fn default_data_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "murmur")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the runtime directory for ephemeral files (lock file)
    pub fn runtime_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "murmur")
            .and_then(|dirs| dirs.runtime_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| std::env::temp_dir().join("murmur"))
    }

    /// Path of the daemon's single-instance lock
    pub fn lock_path() -> PathBuf {
        Self::runtime_dir().join("murmur.lock")
    }

    /// Marker that tells a running daemon a hotkey capture is in progress
    pub fn capture_marker_path() -> PathBuf {
        Self::runtime_dir().join("murmur.capture")
    }

    /// Resolve every library location from the layered config
    pub fn library_paths(&self) -> LibraryPaths {
        let data_dir = self
            .library
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir);

        let mut paths = LibraryPaths::under(&data_dir);
        if let Some(ref dir) = self.library.presets_dir {
            paths.presets_dir = data_dir.join(dir);
        }
        if let Some(ref dir) = self.library.sounds_dir {
            paths.sounds_dir = data_dir.join(dir);
        }
        paths
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, MurmurError> {
    let mut config = Config::default();

    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| MurmurError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| MurmurError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    Ok(config)
}

/// Apply MURMUR_* environment overrides through a lookup function
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(dir) = lookup("MURMUR_DATA_DIR") {
        config.library.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(dir) = lookup("MURMUR_PRESETS_DIR") {
        config.library.presets_dir = Some(PathBuf::from(dir));
    }
    if let Some(dir) = lookup("MURMUR_SOUNDS_DIR") {
        config.library.sounds_dir = Some(PathBuf::from(dir));
    }
}

/// Write the commented default config if no config file exists yet
pub fn write_default_config(path: &Path) -> Result<bool, MurmurError> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| MurmurError::Config(format!("Failed to create config dir: {}", e)))?;
    }
    std::fs::write(path, DEFAULT_CONFIG)
        .map_err(|e| MurmurError::Config(format!("Failed to write config: {}", e)))?;
    Ok(true)
}
