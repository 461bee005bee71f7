// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key vocabulary for auto-responses and their PTY byte encodings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named key an auto-response rule may send to the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Enter,
    Tab,
    Esc,
    Up,
    Down,
    Left,
    Right,
    Space,
    #[serde(rename = "ctrl+c")]
    CtrlC,
}

impl Key {
    /// The byte sequence this key produces on a terminal input stream.
    pub fn encode(&self) -> &'static [u8] {
        match self {
            Self::Enter => b"\r",
            Self::Tab => b"\t",
            Self::Esc => b"\x1b",
            Self::Up => b"\x1b[A",
            Self::Down => b"\x1b[B",
            Self::Right => b"\x1b[C",
            Self::Left => b"\x1b[D",
            Self::Space => b" ",
            Self::CtrlC => b"\x03",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Tab => "tab",
            Self::Esc => "esc",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Space => "space",
            Self::CtrlC => "ctrl+c",
        }
    }

    /// Parse a key name as it appears in rule catalogs.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "enter" => Some(Self::Enter),
            "tab" => Some(Self::Tab),
            "esc" => Some(Self::Esc),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "space" => Some(Self::Space),
            "ctrl+c" => Some(Self::CtrlC),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode a key sequence into the bytes written to the child.
pub fn encode_sequence(keys: &[Key]) -> Vec<u8> {
    let mut out = Vec::with_capacity(keys.len() * 3);
    for key in keys {
        out.extend_from_slice(key.encode());
    }
    out
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
