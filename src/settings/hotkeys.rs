//! Hotkey bindings (`hotkey_settings.json`)

use crate::error::HotkeyError;
use crate::hotkey::combo::KeyCombo;
use crate::hotkey::keys::KeyName;
use crate::hotkey::HotkeyAction;
use serde::{Deserialize, Serialize};

/// One combination per action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyBindings {
    pub next: KeyCombo,
    pub previous: KeyCombo,
    pub mute: KeyCombo,
}

fn arrow(name: &str) -> KeyCombo {
    KeyName::parse(name)
        .map(KeyCombo::single)
        .unwrap_or_default()
}

impl Default for HotkeyBindings {
    /// Arrow keys: up/down cycle presets, left toggles mute
    fn default() -> Self {
        Self {
            next: arrow("Up"),
            previous: arrow("Down"),
            mute: arrow("Left"),
        }
    }
}

impl HotkeyBindings {
    pub fn get(&self, action: HotkeyAction) -> &KeyCombo {
        match action {
            HotkeyAction::Next => &self.next,
            HotkeyAction::Previous => &self.previous,
            HotkeyAction::Mute => &self.mute,
        }
    }

    fn get_mut(&mut self, action: HotkeyAction) -> &mut KeyCombo {
        match action {
            HotkeyAction::Next => &mut self.next,
            HotkeyAction::Previous => &mut self.previous,
            HotkeyAction::Mute => &mut self.mute,
        }
    }

    /// Action bound to exactly this combination. Empty bindings never match.
    pub fn find(&self, combo: &KeyCombo) -> Option<HotkeyAction> {
        if combo.is_empty() {
            return None;
        }
        HotkeyAction::ALL
            .into_iter()
            .find(|action| self.get(*action) == combo)
    }

    /// Bind `combo` to `action`, refusing empty combos and combos that
    /// already belong to another action
    pub fn set_hotkey(&mut self, action: HotkeyAction, combo: KeyCombo) -> Result<(), HotkeyError> {
        if combo.is_empty() {
            return Err(HotkeyError::EmptyCombo);
        }
        if let Some(other) = self.find(&combo).filter(|other| *other != action) {
            return Err(HotkeyError::Conflict {
                combo: combo.to_string(),
                action: other.to_string(),
            });
        }
        *self.get_mut(action) = combo;
        Ok(())
    }
}
