//! rodio playback backend
//!
//! Each voice is its own [`Sink`] fed by a looping decoder, so volume and
//! pause state are per sound while rodio does the mixing.

use super::{SoundBackend, Voice};
use crate::error::AudioError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Default output device plus the handle sinks attach to
pub struct RodioBackend {
    // Dropping the stream closes the device
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
}

impl RodioBackend {
    pub fn new() -> Result<Self, AudioError> {
        let (stream, stream_handle) = OutputStream::try_default()?;
        tracing::debug!("Opened default audio output");
        Ok(Self {
            _stream: stream,
            stream_handle,
        })
    }
}

impl SoundBackend for RodioBackend {
    type Voice = RodioVoice;

    fn open(&mut self, path: &Path) -> Result<RodioVoice, AudioError> {
        let file = File::open(path).map_err(|e| AudioError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let source =
            Decoder::new_looped(BufReader::new(file)).map_err(|e| AudioError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let sink = Sink::try_new(&self.stream_handle)?;
        sink.pause();
        sink.append(source);

        Ok(RodioVoice { sink })
    }
}

pub struct RodioVoice {
    sink: Sink,
}

impl Voice for RodioVoice {
    fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume.clamp(0.0, 1.0));
    }

    fn play(&mut self) {
        self.sink.play();
    }

    fn stop(&mut self) {
        self.sink.stop();
    }

    fn is_playing(&self) -> bool {
        !self.sink.empty() && !self.sink.is_paused()
    }
}
