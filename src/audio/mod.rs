//! Sound playback module
//!
//! The [`Player`] keeps one looping voice per sound of the current preset.
//! It never decides what should play; it only reconciles the voices it owns
//! with a [`Preset`] handed to [`Player::sync`].
//!
//! Decoding and mixing sit behind the [`SoundBackend`] and [`Voice`] traits
//! so the reconciliation can be tested without an audio device.

pub mod rodio_backend;

use crate::config::AudioConfig;
use crate::error::AudioError;
use crate::settings::preset::Preset;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A single looping sound
pub trait Voice {
    /// Set the output gain (0.0..=1.0)
    fn set_volume(&mut self, volume: f32);

    /// Start or resume playback
    fn play(&mut self);

    /// Stop playback for good
    fn stop(&mut self);

    /// Whether the voice is still producing sound
    fn is_playing(&self) -> bool;
}

/// Something that can turn a sound file into a [`Voice`]
pub trait SoundBackend {
    type Voice: Voice;

    /// Open `path` as a looping voice. The voice starts paused.
    fn open(&mut self, path: &Path) -> Result<Self::Voice, AudioError>;
}

struct Loaded<V> {
    path: PathBuf,
    voice: V,
}

/// Mirrors the current preset onto a set of backend voices
pub struct Player<B: SoundBackend> {
    backend: B,
    voices: BTreeMap<String, Loaded<B::Voice>>,
    max_sounds: usize,
}

impl<B: SoundBackend> Player<B> {
    pub fn new(backend: B, max_sounds: usize) -> Self {
        Self {
            backend,
            voices: BTreeMap::new(),
            max_sounds,
        }
    }

    /// Names of the sounds that currently have a voice
    pub fn loaded(&self) -> impl Iterator<Item = &str> {
        self.voices.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Bring the voices in line with `preset`.
    ///
    /// Sounds that fail to open are skipped and returned with their error so
    /// the rest of the preset still plays.
    pub fn sync(&mut self, preset: &Preset) -> Vec<(String, AudioError)> {
        let mut failures = Vec::new();

        // Drop voices whose sound is gone or whose file changed
        let stale: Vec<String> = self
            .voices
            .iter()
            .filter(|(name, loaded)| {
                preset
                    .sounds
                    .get(name.as_str())
                    .map_or(true, |sound| sound.path != loaded.path)
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in stale {
            if let Some(mut loaded) = self.voices.remove(&name) {
                tracing::debug!("Stopping {}", name);
                loaded.voice.stop();
            }
        }

        for (name, sound) in &preset.sounds {
            let volume = preset.effective_volume(name).unwrap_or(0.0);

            if let Some(loaded) = self.voices.get_mut(name) {
                loaded.voice.set_volume(volume);
                if !loaded.voice.is_playing() {
                    loaded.voice.play();
                }
                continue;
            }

            if self.voices.len() >= self.max_sounds {
                failures.push((name.clone(), AudioError::TooManySounds(self.max_sounds)));
                continue;
            }

            match self.backend.open(&sound.path) {
                Ok(mut voice) => {
                    voice.set_volume(volume);
                    voice.play();
                    tracing::debug!("Playing {} at {:.2}", name, volume);
                    self.voices.insert(
                        name.clone(),
                        Loaded {
                            path: sound.path.clone(),
                            voice,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", name, e);
                    failures.push((name.clone(), e));
                }
            }
        }

        failures
    }

    /// Stop and release every voice
    pub fn stop_all(&mut self) {
        for (name, mut loaded) in std::mem::take(&mut self.voices) {
            tracing::trace!("Stopping {}", name);
            loaded.voice.stop();
        }
    }
}

impl<B: SoundBackend> Drop for Player<B> {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Factory function to create the rodio-backed player
pub fn create_player(
    config: &AudioConfig,
) -> Result<Player<rodio_backend::RodioBackend>, AudioError> {
    let backend = rodio_backend::RodioBackend::new()?;
    Ok(Player::new(backend, config.max_sounds))
}
