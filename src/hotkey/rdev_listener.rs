//! rdev-based global key listener
//!
//! `rdev::listen` blocks its thread forever and offers no way to be
//! cancelled, so it runs on a dedicated OS thread and a shared flag decides
//! whether events are still forwarded.

use super::keys::KeyName;
use super::{HotkeyListener, KeyEvent};
use crate::error::HotkeyError;
use rdev::{listen, Event, EventType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct RdevListener {
    running: Arc<AtomicBool>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl RdevListener {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }
}

impl Default for RdevListener {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate an rdev event into a key event, ignoring mouse input
fn translate(event: &Event) -> Option<KeyEvent> {
    match event.event_type {
        EventType::KeyPress(key) => Some(KeyEvent::Pressed(KeyName::from_rdev(key))),
        EventType::KeyRelease(key) => Some(KeyEvent::Released(KeyName::from_rdev(key))),
        _ => None,
    }
}

#[async_trait::async_trait]
impl HotkeyListener for RdevListener {
    async fn start(&mut self) -> Result<mpsc::Receiver<KeyEvent>, HotkeyError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::Listen("listener already started".to_string()));
        }

        let (tx, rx) = mpsc::channel(64);
        let running = self.running.clone();

        let handle = std::thread::Builder::new()
            .name("murmur-keys".to_string())
            .spawn(move || {
                let callback = move |event: Event| {
                    if !running.load(Ordering::SeqCst) {
                        return;
                    }
                    if let Some(key_event) = translate(&event) {
                        tracing::trace!("Key event: {:?}", key_event);
                        // Queue full or receiver gone: drop the event rather
                        // than stall the OS hook
                        let _ = tx.try_send(key_event);
                    }
                };

                // This blocks until an error occurs or the process exits
                if let Err(e) = listen(callback) {
                    tracing::error!("rdev listen error: {:?}", e);
                    tracing::warn!(
                        "Global hotkeys are unavailable. On macOS grant Accessibility \
                         permission; on Linux an X11 session is required."
                    );
                }
            })
            .map_err(|e| HotkeyError::Listen(e.to_string()))?;

        self.thread_handle = Some(handle);
        tracing::debug!("Global key listener started");
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), HotkeyError> {
        self.running.store(false, Ordering::SeqCst);
        // The listener thread cannot be joined; it ends with the process
        self.thread_handle.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdev::{Button, Key};
    use std::time::SystemTime;

    fn event(event_type: EventType) -> Event {
        Event {
            time: SystemTime::now(),
            name: None,
            event_type,
        }
    }

    #[test]
    fn test_translate_key_events() {
        assert_eq!(
            translate(&event(EventType::KeyPress(Key::UpArrow))),
            Some(KeyEvent::Pressed(KeyName::parse("Up").unwrap()))
        );
        assert_eq!(
            translate(&event(EventType::KeyRelease(Key::KeyM))),
            Some(KeyEvent::Released(KeyName::parse("M").unwrap()))
        );
    }

    #[test]
    fn test_translate_ignores_mouse() {
        assert_eq!(translate(&event(EventType::ButtonPress(Button::Left))), None);
        assert_eq!(
            translate(&event(EventType::MouseMove { x: 1.0, y: 2.0 })),
            None
        );
    }
}
