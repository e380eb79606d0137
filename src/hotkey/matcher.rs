//! Hotkey state machine
//!
//! Turns the raw stream of key presses and releases into actions.
//!
//! ```text
//!   Listening ──capture(action)──▶ Capturing(action)
//!       ▲                               │
//!       └──── key released / Escape ────┘
//! ```
//!
//! In `Listening`, every press that makes the held keys equal to a binding
//! triggers that binding's action. In `Capturing`, the first release of a
//! key that was pressed during the capture yields the combination that was
//! held just before it.

use super::combo::KeyCombo;
use super::keys::KeyName;
use super::{HotkeyAction, KeyEvent};
use crate::settings::hotkeys::HotkeyBindings;

/// Current mode of the matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherMode {
    /// Watching for bound combinations
    Listening,
    /// Recording a new combination for an action
    Capturing(HotkeyAction),
}

/// What a key event resulted in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A bound combination was pressed
    Triggered(HotkeyAction),
    /// A new combination was recorded for the action
    Captured(HotkeyAction, KeyCombo),
    /// Escape was pressed while capturing
    CaptureCancelled(HotkeyAction),
}

#[derive(Debug, Clone)]
pub struct HotkeyMatcher {
    bindings: HotkeyBindings,
    held: KeyCombo,
    mode: MatcherMode,
}

impl HotkeyMatcher {
    pub fn new(bindings: HotkeyBindings) -> Self {
        Self {
            bindings,
            held: KeyCombo::new(),
            mode: MatcherMode::Listening,
        }
    }

    pub fn mode(&self) -> MatcherMode {
        self.mode
    }

    pub fn bindings(&self) -> &HotkeyBindings {
        &self.bindings
    }

    pub fn set_bindings(&mut self, bindings: HotkeyBindings) {
        self.bindings = bindings;
    }

    /// Start recording a combination for `action`.
    ///
    /// Keys already held are forgotten so their releases cannot end the
    /// capture.
    pub fn capture(&mut self, action: HotkeyAction) {
        self.held.clear();
        self.mode = MatcherMode::Capturing(action);
    }

    /// Feed one listener event
    pub fn handle(&mut self, event: &KeyEvent) -> Option<MatchOutcome> {
        match event {
            KeyEvent::Pressed(key) => self.on_press(key.clone()),
            KeyEvent::Released(key) => self.on_release(key),
        }
    }

    pub fn on_press(&mut self, key: KeyName) -> Option<MatchOutcome> {
        if let MatcherMode::Capturing(action) = self.mode {
            if key == KeyName::escape() {
                self.mode = MatcherMode::Listening;
                self.held.clear();
                return Some(MatchOutcome::CaptureCancelled(action));
            }
            self.held.press(key);
            return None;
        }

        // Auto-repeat of a held key
        if !self.held.press(key) {
            return None;
        }

        self.bindings
            .find(&self.held)
            .map(MatchOutcome::Triggered)
    }

    pub fn on_release(&mut self, key: &KeyName) -> Option<MatchOutcome> {
        let snapshot = self.held.clone();
        if !self.held.release(key) {
            return None;
        }

        match self.mode {
            MatcherMode::Capturing(action) => {
                self.mode = MatcherMode::Listening;
                Some(MatchOutcome::Captured(action, snapshot))
            }
            MatcherMode::Listening => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> KeyName {
        KeyName::parse(name).unwrap()
    }

    fn press(m: &mut HotkeyMatcher, name: &str) -> Option<MatchOutcome> {
        m.handle(&KeyEvent::Pressed(key(name)))
    }

    fn release(m: &mut HotkeyMatcher, name: &str) -> Option<MatchOutcome> {
        m.handle(&KeyEvent::Released(key(name)))
    }

    fn matcher() -> HotkeyMatcher {
        HotkeyMatcher::new(HotkeyBindings::default())
    }

    #[test]
    fn test_default_bindings_trigger() {
        let mut m = matcher();
        assert_eq!(
            press(&mut m, "Up"),
            Some(MatchOutcome::Triggered(HotkeyAction::Next))
        );
        release(&mut m, "Up");
        assert_eq!(
            press(&mut m, "Down"),
            Some(MatchOutcome::Triggered(HotkeyAction::Previous))
        );
        release(&mut m, "Down");
        assert_eq!(
            press(&mut m, "Left"),
            Some(MatchOutcome::Triggered(HotkeyAction::Mute))
        );
    }

    #[test]
    fn test_auto_repeat_triggers_once() {
        let mut m = matcher();
        assert!(press(&mut m, "Up").is_some());
        assert!(press(&mut m, "Up").is_none());
        assert!(press(&mut m, "Up").is_none());
        release(&mut m, "Up");
        assert!(press(&mut m, "Up").is_some());
    }

    #[test]
    fn test_extra_held_key_prevents_match() {
        let mut m = matcher();
        assert!(press(&mut m, "LeftShift").is_none());
        assert!(press(&mut m, "Up").is_none());
        release(&mut m, "LeftShift");
        // Up is still held but no new press happened
        assert_eq!(m.mode(), MatcherMode::Listening);
    }

    #[test]
    fn test_combo_binding_needs_all_keys() {
        let mut bindings = HotkeyBindings::default();
        bindings.next = "ctrl+alt+n".parse().unwrap();
        let mut m = HotkeyMatcher::new(bindings);

        assert!(press(&mut m, "Ctrl").is_none());
        assert!(press(&mut m, "N").is_none());
        release(&mut m, "N");
        assert_eq!(
            press(&mut m, "Alt"),
            None,
            "character key is no longer held"
        );
        assert_eq!(
            press(&mut m, "N"),
            Some(MatchOutcome::Triggered(HotkeyAction::Next))
        );
    }

    #[test]
    fn test_capture_records_combo_on_first_release() {
        let mut m = matcher();
        m.capture(HotkeyAction::Mute);

        assert!(press(&mut m, "LeftCtrl").is_none());
        assert!(press(&mut m, "M").is_none());
        let outcome = release(&mut m, "M");
        assert_eq!(
            outcome,
            Some(MatchOutcome::Captured(
                HotkeyAction::Mute,
                "LeftCtrl+M".parse().unwrap()
            ))
        );
        assert_eq!(m.mode(), MatcherMode::Listening);
    }

    #[test]
    fn test_capture_modifier_only() {
        let mut m = matcher();
        m.capture(HotkeyAction::Next);
        press(&mut m, "F9");
        assert_eq!(
            release(&mut m, "F9"),
            Some(MatchOutcome::Captured(
                HotkeyAction::Next,
                KeyCombo::single(key("F9"))
            ))
        );
    }

    #[test]
    fn test_capture_ignores_keys_held_before_start() {
        let mut m = matcher();
        press(&mut m, "Enter");
        m.capture(HotkeyAction::Previous);

        // Releasing the key that started the capture does nothing
        assert!(release(&mut m, "Enter").is_none());
        assert!(matches!(m.mode(), MatcherMode::Capturing(_)));

        press(&mut m, "P");
        assert!(matches!(
            release(&mut m, "P"),
            Some(MatchOutcome::Captured(HotkeyAction::Previous, _))
        ));
    }

    #[test]
    fn test_capture_does_not_trigger_bindings() {
        let mut m = matcher();
        m.capture(HotkeyAction::Mute);
        assert!(press(&mut m, "Up").is_none());
    }

    #[test]
    fn test_escape_cancels_capture() {
        let mut m = matcher();
        m.capture(HotkeyAction::Next);
        press(&mut m, "LeftShift");
        assert_eq!(
            press(&mut m, "Escape"),
            Some(MatchOutcome::CaptureCancelled(HotkeyAction::Next))
        );
        assert_eq!(m.mode(), MatcherMode::Listening);
        assert!(release(&mut m, "LeftShift").is_none());
    }

    #[test]
    fn test_set_bindings_takes_effect() {
        let mut m = matcher();
        let mut bindings = HotkeyBindings::default();
        bindings.next = "F8".parse().unwrap();
        m.set_bindings(bindings);

        assert!(press(&mut m, "Up").is_none());
        release(&mut m, "Up");
        assert_eq!(
            press(&mut m, "F8"),
            Some(MatchOutcome::Triggered(HotkeyAction::Next))
        );
    }
}
