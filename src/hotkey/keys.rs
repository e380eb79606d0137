//! Key names
//!
//! Captured keys arrive as `rdev::Key` values. They are turned into
//! canonical names so they can be stored in JSON, compared and ordered.
//! Character keys (letters, digits, punctuation) name the main key of a
//! combination; every other key acts as a modifier.

use crate::error::HotkeyError;
use rdev::Key;
use std::fmt;

/// Canonical name <-> rdev key
const KEY_TABLE: &[(&str, Key)] = &[
    // Modifiers
    ("LeftCtrl", Key::ControlLeft),
    ("RightCtrl", Key::ControlRight),
    ("LeftShift", Key::ShiftLeft),
    ("RightShift", Key::ShiftRight),
    ("Alt", Key::Alt),
    ("AltGr", Key::AltGr),
    ("LeftMeta", Key::MetaLeft),
    ("RightMeta", Key::MetaRight),
    ("Fn", Key::Function),
    // Navigation
    ("Up", Key::UpArrow),
    ("Down", Key::DownArrow),
    ("Left", Key::LeftArrow),
    ("Right", Key::RightArrow),
    ("Home", Key::Home),
    ("End", Key::End),
    ("PageUp", Key::PageUp),
    ("PageDown", Key::PageDown),
    ("Insert", Key::Insert),
    ("Delete", Key::Delete),
    // Editing and locks
    ("Escape", Key::Escape),
    ("Space", Key::Space),
    ("Tab", Key::Tab),
    ("Enter", Key::Return),
    ("Backspace", Key::Backspace),
    ("CapsLock", Key::CapsLock),
    ("NumLock", Key::NumLock),
    ("ScrollLock", Key::ScrollLock),
    ("Pause", Key::Pause),
    ("PrintScreen", Key::PrintScreen),
    // Function keys
    ("F1", Key::F1),
    ("F2", Key::F2),
    ("F3", Key::F3),
    ("F4", Key::F4),
    ("F5", Key::F5),
    ("F6", Key::F6),
    ("F7", Key::F7),
    ("F8", Key::F8),
    ("F9", Key::F9),
    ("F10", Key::F10),
    ("F11", Key::F11),
    ("F12", Key::F12),
    // Keypad
    ("Kp0", Key::Kp0),
    ("Kp1", Key::Kp1),
    ("Kp2", Key::Kp2),
    ("Kp3", Key::Kp3),
    ("Kp4", Key::Kp4),
    ("Kp5", Key::Kp5),
    ("Kp6", Key::Kp6),
    ("Kp7", Key::Kp7),
    ("Kp8", Key::Kp8),
    ("Kp9", Key::Kp9),
    ("KpEnter", Key::KpReturn),
    ("KpMinus", Key::KpMinus),
    ("KpPlus", Key::KpPlus),
    ("KpMultiply", Key::KpMultiply),
    ("KpDivide", Key::KpDivide),
    ("KpDelete", Key::KpDelete),
    // Letters
    ("A", Key::KeyA),
    ("B", Key::KeyB),
    ("C", Key::KeyC),
    ("D", Key::KeyD),
    ("E", Key::KeyE),
    ("F", Key::KeyF),
    ("G", Key::KeyG),
    ("H", Key::KeyH),
    ("I", Key::KeyI),
    ("J", Key::KeyJ),
    ("K", Key::KeyK),
    ("L", Key::KeyL),
    ("M", Key::KeyM),
    ("N", Key::KeyN),
    ("O", Key::KeyO),
    ("P", Key::KeyP),
    ("Q", Key::KeyQ),
    ("R", Key::KeyR),
    ("S", Key::KeyS),
    ("T", Key::KeyT),
    ("U", Key::KeyU),
    ("V", Key::KeyV),
    ("W", Key::KeyW),
    ("X", Key::KeyX),
    ("Y", Key::KeyY),
    ("Z", Key::KeyZ),
    // Digits
    ("0", Key::Num0),
    ("1", Key::Num1),
    ("2", Key::Num2),
    ("3", Key::Num3),
    ("4", Key::Num4),
    ("5", Key::Num5),
    ("6", Key::Num6),
    ("7", Key::Num7),
    ("8", Key::Num8),
    ("9", Key::Num9),
    // Punctuation
    ("`", Key::BackQuote),
    ("-", Key::Minus),
    ("=", Key::Equal),
    ("[", Key::LeftBracket),
    ("]", Key::RightBracket),
    (";", Key::SemiColon),
    ("'", Key::Quote),
    ("\\", Key::BackSlash),
    ("<", Key::IntlBackslash),
    (",", Key::Comma),
    (".", Key::Dot),
    ("/", Key::Slash),
];

/// Extra spellings accepted when parsing
const ALIASES: &[(&str, &str)] = &[
    ("CTRL", "LeftCtrl"),
    ("CONTROL", "LeftCtrl"),
    ("LCTRL", "LeftCtrl"),
    ("LEFTCONTROL", "LeftCtrl"),
    ("RCTRL", "RightCtrl"),
    ("RIGHTCONTROL", "RightCtrl"),
    ("SHIFT", "LeftShift"),
    ("LSHIFT", "LeftShift"),
    ("RSHIFT", "RightShift"),
    ("OPTION", "Alt"),
    ("LEFTALT", "Alt"),
    ("RIGHTALT", "AltGr"),
    ("META", "LeftMeta"),
    ("SUPER", "LeftMeta"),
    ("WIN", "LeftMeta"),
    ("CMD", "LeftMeta"),
    ("COMMAND", "LeftMeta"),
    ("UPARROW", "Up"),
    ("DOWNARROW", "Down"),
    ("LEFTARROW", "Left"),
    ("RIGHTARROW", "Right"),
    ("ESC", "Escape"),
    ("RETURN", "Enter"),
    ("DEL", "Delete"),
    ("INS", "Insert"),
    ("PGUP", "PageUp"),
    ("PGDN", "PageDown"),
    ("FUNCTION", "Fn"),
];

/// Prefix used for keys rdev reports only by scan code
const UNKNOWN_PREFIX: &str = "Key#";

/// A canonical key name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyName(String);

impl KeyName {
    /// The escape key, which cancels hotkey capture
    pub fn escape() -> Self {
        Self("Escape".to_string())
    }

    /// Name a key reported by the listener
    pub fn from_rdev(key: Key) -> Self {
        if let Key::Unknown(code) = key {
            return Self(format!("{}{}", UNKNOWN_PREFIX, code));
        }
        KEY_TABLE
            .iter()
            .find(|(_, k)| *k == key)
            .map(|(name, _)| Self((*name).to_string()))
            .unwrap_or_else(|| Self(format!("{:?}", key)))
    }

    /// Parse a user-supplied key name (case-insensitive, aliases allowed)
    pub fn parse(name: &str) -> Result<Self, HotkeyError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(HotkeyError::UnknownKey(name.to_string()));
        }

        if let Some(code) = trimmed.strip_prefix(UNKNOWN_PREFIX) {
            return code
                .parse::<u32>()
                .map(|code| Self(format!("{}{}", UNKNOWN_PREFIX, code)))
                .map_err(|_| HotkeyError::UnknownKey(name.to_string()));
        }

        if let Some((canonical, _)) = KEY_TABLE
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(trimmed))
        {
            return Ok(Self((*canonical).to_string()));
        }

        let upper = trimmed.to_ascii_uppercase();
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == upper)
            .map(|(_, canonical)| Self((*canonical).to_string()))
            .ok_or_else(|| HotkeyError::UnknownKey(name.to_string()))
    }

    /// Letters, digits and punctuation form the main key of a combo
    pub fn is_character(&self) -> bool {
        self.0.chars().count() == 1
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
