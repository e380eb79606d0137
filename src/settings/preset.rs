//! Preset data: a master volume/mute plus a set of looping sounds

use crate::error::PresetError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Volume given to presets and sounds that have not been adjusted yet
pub const DEFAULT_VOLUME: u8 = 50;

/// Highest accepted volume (percent)
pub const MAX_VOLUME: u8 = 100;

/// One sound layer inside a preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundSettings {
    pub path: PathBuf,
    pub volume: u8,
    pub mute: bool,
}

/// Contents of a preset file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub volume: u8,
    pub mute: bool,
    #[serde(default)]
    pub sounds: BTreeMap<String, SoundSettings>,
}

/// Reject volumes above [`MAX_VOLUME`]
pub fn check_volume(volume: u8) -> Result<u8, PresetError> {
    if volume > MAX_VOLUME {
        Err(PresetError::InvalidVolume(volume))
    } else {
        Ok(volume)
    }
}

/// Name a sound is stored under: the file name of its path
pub fn sound_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

impl Preset {
    /// A fresh, muted, empty preset
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume: DEFAULT_VOLUME,
            mute: true,
            sounds: BTreeMap::new(),
        }
    }

    pub fn add_sound(
        &mut self,
        path: impl Into<PathBuf>,
        volume: u8,
        mute: bool,
    ) -> Result<String, PresetError> {
        let path = path.into();
        let volume = check_volume(volume)?;
        let name = sound_name(&path);
        if self.sounds.contains_key(&name) {
            return Err(PresetError::SoundExists(name));
        }
        self.sounds
            .insert(name.clone(), SoundSettings { path, volume, mute });
        Ok(name)
    }

    pub fn remove_sound(&mut self, name: &str) -> Result<SoundSettings, PresetError> {
        self.sounds
            .remove(name)
            .ok_or_else(|| PresetError::SoundNotFound(name.to_string()))
    }

    pub fn set_volume(&mut self, volume: u8) -> Result<u8, PresetError> {
        self.volume = check_volume(volume)?;
        Ok(self.volume)
    }

    pub fn set_mute(&mut self, mute: bool) -> bool {
        self.mute = mute;
        mute
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_sound_volume(&mut self, name: &str, volume: u8) -> Result<u8, PresetError> {
        let volume = check_volume(volume)?;
        let sound = self.sound_mut(name)?;
        sound.volume = volume;
        Ok(volume)
    }

    pub fn set_sound_mute(&mut self, name: &str, mute: bool) -> Result<bool, PresetError> {
        self.sound_mut(name)?.mute = mute;
        Ok(mute)
    }

    /// Volume a sound is actually heard at, in 0.0..=1.0
    pub fn effective_volume(&self, name: &str) -> Option<f32> {
        let sound = self.sounds.get(name)?;
        if self.mute || sound.mute {
            return Some(0.0);
        }
        Some(f32::from(sound.volume) / 100.0 * f32::from(self.volume) / 100.0)
    }

    fn sound_mut(&mut self, name: &str) -> Result<&mut SoundSettings, PresetError> {
        self.sounds
            .get_mut(name)
            .ok_or_else(|| PresetError::SoundNotFound(name.to_string()))
    }
}
