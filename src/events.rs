//! Typed input events delivered to the monitor by the host runtime
//!
//! The browser original reacted to raw DOM events; here the host translates
//! whatever event source it has into this enum, which keeps the policy logic
//! testable outside a browser. Key chords serialize through a compact string
//! form (`"ctrl+shift+i"`, `"f12"`) so recorded traces stay hand-editable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    F12,
    PrintScreen,
}

/// A key press together with its modifier state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyChord {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyChord {
    pub fn key(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            meta: false,
        }
    }

    pub fn char(c: char) -> Self {
        Self::key(Key::Char(c))
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Ctrl on most platforms, Cmd on macOS. The detection rules treat them
    /// interchangeably.
    pub fn primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized key chord: {0:?}")]
pub struct ChordParseError(String);

impl FromStr for KeyChord {
    type Err = ChordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        let mut parts = lowered.split('+').collect::<Vec<_>>();
        let key_part = parts.pop().filter(|p| !p.is_empty());
        let key_part = key_part.ok_or_else(|| ChordParseError(s.to_string()))?;

        let key = match key_part {
            "f12" => Key::F12,
            "printscreen" | "prtsc" => Key::PrintScreen,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return Err(ChordParseError(s.to_string())),
                }
            }
        };

        let mut chord = KeyChord::key(key);
        for part in parts {
            match part {
                "ctrl" | "control" => chord.ctrl = true,
                "shift" => chord.shift = true,
                "meta" | "cmd" | "super" => chord.meta = true,
                _ => return Err(ChordParseError(s.to_string())),
            }
        }
        Ok(chord)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "ctrl+")?;
        }
        if self.meta {
            write!(f, "meta+")?;
        }
        if self.shift {
            write!(f, "shift+")?;
        }
        match &self.key {
            Key::Char(c) => write!(f, "{}", c.to_ascii_lowercase()),
            Key::F12 => write!(f, "f12"),
            Key::PrintScreen => write!(f, "printscreen"),
        }
    }
}

impl TryFrom<String> for KeyChord {
    type Error = ChordParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyChord> for String {
    fn from(chord: KeyChord) -> Self {
        chord.to_string()
    }
}

/// Events the host feeds into the monitor, in delivery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// Page visibility transition. Only `hidden: true` can count as a tab
    /// switch; a bare window blur never does.
    VisibilityChanged { hidden: bool },
    WindowBlur,
    KeyDown { chord: KeyChord },
    KeyUp { chord: KeyChord },
    ContextMenu,
    /// A screen/display capture acquisition request, routed through the
    /// session's guarded capture provider.
    CaptureRequested,
}
