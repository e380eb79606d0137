//! Hotkey detection module
//!
//! Global key events are captured with rdev (X11 on Linux, a CGEvent tap
//! on macOS, a low-level hook on Windows) and forwarded as [`KeyEvent`]s.
//! Deciding what a sequence of events means is the job of the
//! [`matcher::HotkeyMatcher`], which runs on the daemon's event loop.
//!
//! macOS: requires Accessibility permission for the terminal or app.

pub mod combo;
pub mod keys;
pub mod matcher;
pub mod rdev_listener;

use crate::error::HotkeyError;
use crate::settings::hotkeys::HotkeyBindings;
use combo::KeyCombo;
use keys::KeyName;
use matcher::{HotkeyMatcher, MatchOutcome};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;

/// Things a hotkey can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    /// Switch to the next preset
    Next,
    /// Switch to the previous preset
    Previous,
    /// Toggle the current preset's mute
    Mute,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 3] = [Self::Next, Self::Previous, Self::Mute];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Mute => "mute",
        }
    }
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HotkeyAction {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "next" => Ok(Self::Next),
            "previous" | "prev" => Ok(Self::Previous),
            "mute" => Ok(Self::Mute),
            _ => Err(HotkeyError::UnknownAction(s.to_string())),
        }
    }
}

/// Raw key events emitted by a listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Pressed(KeyName),
    Released(KeyName),
}

/// Trait for global key capture implementations
#[async_trait::async_trait]
pub trait HotkeyListener: Send {
    /// Start listening for key events
    /// Returns a channel receiver for events
    async fn start(&mut self) -> Result<mpsc::Receiver<KeyEvent>, HotkeyError>;

    /// Stop forwarding events
    async fn stop(&mut self) -> Result<(), HotkeyError>;
}

/// Factory function to create the platform listener
pub fn create_listener() -> Box<dyn HotkeyListener> {
    Box::new(rdev_listener::RdevListener::new())
}

/// Wait for the user to press and release a new combination for `action`.
///
/// Escape cancels. Gives up after `timeout`.
pub async fn capture_combo(
    events: &mut mpsc::Receiver<KeyEvent>,
    bindings: HotkeyBindings,
    action: HotkeyAction,
    timeout: Duration,
) -> Result<KeyCombo, HotkeyError> {
    let mut matcher = HotkeyMatcher::new(bindings);
    matcher.capture(action);

    let capture = async {
        while let Some(event) = events.recv().await {
            match matcher.handle(&event) {
                Some(MatchOutcome::Captured(_, combo)) => return Ok(combo),
                Some(MatchOutcome::CaptureCancelled(_)) => {
                    return Err(HotkeyError::CaptureCancelled)
                }
                _ => {}
            }
        }
        Err(HotkeyError::Listen("key listener stopped".to_string()))
    };

    tokio::time::timeout(timeout, capture)
        .await
        .map_err(|_| HotkeyError::CaptureTimeout(timeout.as_secs()))?
}
