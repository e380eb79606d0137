//! Key combinations
//!
//! A [`KeyCombo`] is a set of held modifier keys plus at most one character
//! key. It doubles as the live "what is held right now" tracker in the
//! matcher and as the stored form of a binding.
//!
//! The canonical text form lists modifiers in sorted order followed by the
//! character key, joined with `+` (`LeftCtrl+LeftShift+N`, `Up`). That
//! string is what ends up in `hotkey_settings.json`.

use super::keys::KeyName;
use crate::error::HotkeyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyCombo {
    modifiers: BTreeSet<KeyName>,
    key: Option<KeyName>,
}

impl KeyCombo {
    pub fn new() -> Self {
        Self::default()
    }

    /// A combo made of a single key of either kind
    pub fn single(key: KeyName) -> Self {
        let mut combo = Self::new();
        combo.press(key);
        combo
    }

    pub fn modifiers(&self) -> impl Iterator<Item = &KeyName> {
        self.modifiers.iter()
    }

    pub fn key(&self) -> Option<&KeyName> {
        self.key.as_ref()
    }

    pub fn add_modifier(&mut self, key: KeyName) -> bool {
        self.modifiers.insert(key)
    }

    pub fn remove_modifier(&mut self, key: &KeyName) -> bool {
        self.modifiers.remove(key)
    }

    pub fn set_key(&mut self, key: KeyName) {
        self.key = Some(key);
    }

    pub fn remove_key(&mut self) -> Option<KeyName> {
        self.key.take()
    }

    pub fn clear(&mut self) {
        self.modifiers.clear();
        self.key = None;
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty() && self.key.is_none()
    }

    pub fn contains(&self, key: &KeyName) -> bool {
        self.key.as_ref() == Some(key) || self.modifiers.contains(key)
    }

    /// Record a key going down. Returns false when it was already held.
    pub fn press(&mut self, key: KeyName) -> bool {
        if self.contains(&key) {
            return false;
        }
        if key.is_character() {
            self.set_key(key);
        } else {
            self.add_modifier(key);
        }
        true
    }

    /// Record a key going up. Returns false when it was not held.
    pub fn release(&mut self, key: &KeyName) -> bool {
        if self.key.as_ref() == Some(key) {
            self.key = None;
            true
        } else {
            self.remove_modifier(key)
        }
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Empty");
        }
        let names: Vec<&str> = self
            .modifiers
            .iter()
            .chain(self.key.iter())
            .map(KeyName::as_str)
            .collect();
        f.write_str(&names.join("+"))
    }
}

impl FromStr for KeyCombo {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("empty") {
            return Ok(Self::new());
        }

        let mut combo = Self::new();
        for part in s.split('+') {
            let key = KeyName::parse(part)?;
            if key.is_character() && combo.key.is_some() {
                return Err(HotkeyError::MultipleKeys(s.to_string()));
            }
            combo.press(key);
        }
        Ok(combo)
    }
}

impl TryFrom<String> for KeyCombo {
    type Error = HotkeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<KeyCombo> for String {
    fn from(combo: KeyCombo) -> Self {
        combo.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> KeyName {
        KeyName::parse(name).unwrap()
    }

    #[test]
    fn test_empty_combo() {
        let combo = KeyCombo::new();
        assert!(combo.is_empty());
        assert_eq!(combo.to_string(), "Empty");
        assert_eq!("Empty".parse::<KeyCombo>().unwrap(), combo);
    }

    #[test]
    fn test_canonical_string_sorts_modifiers() {
        let mut combo = KeyCombo::new();
        combo.press(key("N"));
        combo.press(key("LeftShift"));
        combo.press(key("LeftCtrl"));
        assert_eq!(combo.to_string(), "LeftCtrl+LeftShift+N");
    }

    #[test]
    fn test_parse_is_order_insensitive() {
        let a: KeyCombo = "n+shift+ctrl".parse().unwrap();
        let b: KeyCombo = "LeftCtrl+LeftShift+N".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.key(), Some(&key("N")));
        assert_eq!(a.modifiers().count(), 2);
    }

    #[test]
    fn test_modifier_only_combo() {
        let combo: KeyCombo = "Up".parse().unwrap();
        assert_eq!(combo.key(), None);
        assert_eq!(combo, KeyCombo::single(key("Up")));
        assert_eq!(combo.to_string(), "Up");
    }

    #[test]
    fn test_two_character_keys_rejected() {
        assert!(matches!(
            "A+B".parse::<KeyCombo>(),
            Err(HotkeyError::MultipleKeys(_))
        ));
        assert!(matches!(
            "Ctrl+Hyper".parse::<KeyCombo>(),
            Err(HotkeyError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_press_and_release_tracking() {
        let mut combo = KeyCombo::new();
        assert!(combo.press(key("Alt")));
        assert!(!combo.press(key("Alt")));
        assert!(combo.press(key("K")));
        assert!(!combo.press(key("K")));
        assert!(combo.contains(&key("K")));

        assert!(combo.release(&key("K")));
        assert!(!combo.release(&key("K")));
        assert!(combo.release(&key("Alt")));
        assert!(combo.is_empty());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let combo: KeyCombo = "ctrl+f9".parse().unwrap();
        let json = serde_json::to_string(&combo).unwrap();
        assert_eq!(json, "\"F9+LeftCtrl\"");

        let back: KeyCombo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, combo);

        assert!(serde_json::from_str::<KeyCombo>("\"Ctrl+Nope\"").is_err());
    }
}
