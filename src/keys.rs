//! Canonical keystroke representation and config key-string parsing.
//!
//! The event tap delivers already-translated keystrokes. A keystroke is either
//! a printable character (case preserved; modes lowercase when they want to)
//! or a canonical control byte: `0x1B` escape, `0x09` tab, `0x04` Ctrl-D,
//! `0x15` Ctrl-U, `0x7F` backspace, and the other Ctrl-letter bytes.
//!
//! Config strings canonicalize against both byte and named forms, so
//! `"escape"` matches a raw `0x1B` and `"Ctrl+C"` matches the produced `0x03`.

use crate::error::{Error, Result};

pub const ESCAPE: u8 = 0x1B;
pub const TAB: u8 = 0x09;
pub const ENTER: u8 = 0x0D;
pub const BACKSPACE: u8 = 0x7F;
pub const CTRL_D: u8 = 0x04;
pub const CTRL_U: u8 = 0x15;

/// A single captured keystroke after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable character with case preserved.
    Char(char),
    /// Canonical control byte.
    Control(u8),
}

impl Key {
    /// Normalize a raw byte from the tap: printable ASCII passes through as a
    /// character, everything else is kept as a control byte.
    pub fn from_byte(byte: u8) -> Key {
        match byte {
            0x20..=0x7E => Key::Char(byte as char),
            other => Key::Control(other),
        }
    }

    pub fn is_escape(&self) -> bool {
        matches!(self, Key::Control(ESCAPE))
    }

    pub fn is_tab(&self) -> bool {
        matches!(self, Key::Control(TAB))
    }

    pub fn is_backspace(&self) -> bool {
        matches!(self, Key::Control(BACKSPACE))
    }

    /// The lowercase character for printable keys, `None` for control bytes.
    pub fn char_lowercase(&self) -> Option<char> {
        match self {
            Key::Char(c) => Some(c.to_ascii_lowercase()),
            Key::Control(_) => None,
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Char(' ') => write!(f, "space"),
            Key::Char(c) => write!(f, "{c}"),
            Key::Control(ESCAPE) => write!(f, "escape"),
            Key::Control(TAB) => write!(f, "tab"),
            Key::Control(ENTER) => write!(f, "return"),
            Key::Control(BACKSPACE) => write!(f, "backspace"),
            Key::Control(b) if *b < 0x20 => write!(f, "ctrl+{}", (b | 0x60) as char),
            Key::Control(b) => write!(f, "0x{b:02x}"),
        }
    }
}

/// Parse a configured key string into its canonical [`Key`].
///
/// Accepted forms: named keys (`escape`, `tab`, `return`, `backspace`,
/// `space`), a single printable character (`g`, `,`), or a `Ctrl+X` modifier
/// form which canonicalizes to the control byte the tap would produce.
pub fn parse_key(spec: &str) -> Result<Key> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(Error::ConfigValidation("empty key string".into()));
    }

    if let Some((modifiers, last)) = split_modifier_form(trimmed) {
        for modifier in &modifiers {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => {}
                other => {
                    return Err(Error::ConfigValidation(format!(
                        "unsupported modifier '{other}' in key '{trimmed}' \
                         (only Ctrl produces a distinct key code)"
                    )));
                }
            }
        }
        let base = parse_bare_key(last)?;
        return match base {
            // Ctrl+letter (and Ctrl+[ etc.) produce the ASCII control byte.
            Key::Char(c) if c.is_ascii() => {
                Ok(Key::Control((c.to_ascii_uppercase() as u8) & 0x1F))
            }
            _ => Err(Error::ConfigValidation(format!(
                "cannot combine Ctrl with '{last}' in key '{trimmed}'"
            ))),
        };
    }

    parse_bare_key(trimmed)
}

/// Parse a list of configured key strings, preserving order.
pub fn parse_key_list(specs: &[String]) -> Result<Vec<Key>> {
    specs.iter().map(|s| parse_key(s)).collect()
}

/// True when `key` matches `configured`. Printable characters match
/// case-insensitively; control bytes match exactly.
pub fn key_matches(key: Key, configured: Key) -> bool {
    match (key, configured) {
        (Key::Char(a), Key::Char(b)) => a.eq_ignore_ascii_case(&b),
        (Key::Control(a), Key::Control(b)) => a == b,
        _ => false,
    }
}

/// True when `key` matches any entry of the configured set.
pub fn key_matches_any(key: Key, configured: &[Key]) -> bool {
    configured.iter().any(|&c| key_matches(key, c))
}

fn split_modifier_form(spec: &str) -> Option<(Vec<&str>, &str)> {
    if !spec.contains('+') || spec.len() == 1 {
        return None;
    }
    let mut parts: Vec<&str> = spec.split('+').map(str::trim).collect();
    // "shift++" style strings produce empty segments; treat the trailing '+'
    // itself as the key ("ctrl++" means Ctrl and the plus character).
    let last = parts.pop()?;
    let last = if last.is_empty() { "+" } else { last };
    if parts.is_empty() {
        return None;
    }
    Some((parts, last))
}

fn parse_bare_key(name: &str) -> Result<Key> {
    let lowered = name.to_ascii_lowercase();
    match lowered.as_str() {
        "escape" | "esc" => Ok(Key::Control(ESCAPE)),
        "tab" => Ok(Key::Control(TAB)),
        "return" | "enter" => Ok(Key::Control(ENTER)),
        "backspace" | "delete" => Ok(Key::Control(BACKSPACE)),
        "space" => Ok(Key::Char(' ')),
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_graphic() => Ok(Key::Char(c)),
                _ => Err(Error::ConfigValidation(format!("unrecognized key '{name}'"))),
            }
        }
    }
}
