//! Customizable keybindings for the overlay.
//!
//! Tool hotkeys and the cancel key. Keys are stored as strings ("V",
//! "Escape") so the bindings can live in the config file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::AnnotationTool;

/// A key as reported by the host, independent of any windowing toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyCode {
    /// Letter or digit, normalised to uppercase.
    Char(char),
    Escape,
    Enter,
    Space,
    Tab,
    Backspace,
    Delete,
}

impl KeyCode {
    /// A character key. Letters are normalised to uppercase so `v` and `V`
    /// are the same binding.
    pub fn char(c: char) -> Self {
        KeyCode::Char(c.to_ascii_uppercase())
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCode::Char(c) => write!(f, "{}", c),
            KeyCode::Escape => f.write_str("Escape"),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Space => f.write_str("Space"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::Backspace => f.write_str("Backspace"),
            KeyCode::Delete => f.write_str("Delete"),
        }
    }
}

impl FromStr for KeyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphanumeric() {
                return Ok(KeyCode::char(c));
            }
        }

        match s.to_ascii_lowercase().as_str() {
            "escape" | "esc" => Ok(KeyCode::Escape),
            "enter" | "return" => Ok(KeyCode::Enter),
            "space" => Ok(KeyCode::Space),
            "tab" => Ok(KeyCode::Tab),
            "backspace" => Ok(KeyCode::Backspace),
            "delete" | "del" => Ok(KeyCode::Delete),
            _ => Err(format!("Unknown key: {}", s)),
        }
    }
}

impl TryFrom<String> for KeyCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyCode> for String {
    fn from(key: KeyCode) -> Self {
        key.to_string()
    }
}

/// What a key press does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Switch to a tool
    SelectTool(AnnotationTool),
    /// Abort the open draft
    Cancel,
}

/// Keybinding configuration for the overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    /// Hotkey for Select tool
    pub tool_select: KeyCode,
    /// Hotkey for Point tool
    pub tool_point: KeyCode,
    /// Hotkey for Polygon tool
    pub tool_polygon: KeyCode,
    /// Hotkey for Measurement tool
    pub tool_measurement: KeyCode,
    /// Hotkey for Eraser tool
    pub tool_eraser: KeyCode,
    /// Aborts the open draft
    pub cancel: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            tool_select: KeyCode::Char('V'),
            tool_point: KeyCode::Char('P'),
            tool_polygon: KeyCode::Char('G'),
            tool_measurement: KeyCode::Char('M'),
            tool_eraser: KeyCode::Char('E'),
            cancel: KeyCode::Escape,
        }
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the tool that corresponds to a key press, if any.
    pub fn tool_for_key(&self, key: KeyCode) -> Option<AnnotationTool> {
        AnnotationTool::all()
            .iter()
            .copied()
            .find(|&tool| self.key_for_tool(tool) == key)
    }

    /// Resolve a key press. Cancel wins if it shares a key with a tool.
    pub fn action_for_key(&self, key: KeyCode) -> Option<KeyAction> {
        if key == self.cancel {
            return Some(KeyAction::Cancel);
        }
        self.tool_for_key(key).map(KeyAction::SelectTool)
    }

    /// Get the hotkey for a specific tool.
    pub fn key_for_tool(&self, tool: AnnotationTool) -> KeyCode {
        match tool {
            AnnotationTool::Select => self.tool_select,
            AnnotationTool::Point => self.tool_point,
            AnnotationTool::Polygon => self.tool_polygon,
            AnnotationTool::Measurement => self.tool_measurement,
            AnnotationTool::Eraser => self.tool_eraser,
        }
    }

    /// Set the hotkey for a tool.
    pub fn set_tool_key(&mut self, tool: AnnotationTool, key: KeyCode) {
        match tool {
            AnnotationTool::Select => self.tool_select = key,
            AnnotationTool::Point => self.tool_point = key,
            AnnotationTool::Polygon => self.tool_polygon = key,
            AnnotationTool::Measurement => self.tool_measurement = key,
            AnnotationTool::Eraser => self.tool_eraser = key,
        }
    }

    /// Check if a key is already used by any binding.
    /// Returns a description of what it's used for, if anything.
    pub fn key_conflict(&self, key: KeyCode, exclude_tool: Option<AnnotationTool>) -> Option<String> {
        if key == self.cancel {
            return Some("Cancel".to_string());
        }
        AnnotationTool::all()
            .iter()
            .filter(|&&tool| Some(tool) != exclude_tool)
            .find(|&&tool| self.key_for_tool(tool) == key)
            .map(|tool| format!("{} tool", tool.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tool_keys() {
        let bindings = KeyBindings::new();
        assert_eq!(bindings.tool_for_key(KeyCode::char('v')), Some(AnnotationTool::Select));
        assert_eq!(bindings.tool_for_key(KeyCode::char('g')), Some(AnnotationTool::Polygon));
        assert_eq!(bindings.tool_for_key(KeyCode::char('m')), Some(AnnotationTool::Measurement));
        assert_eq!(bindings.tool_for_key(KeyCode::char('x')), None);
    }

    #[test]
    fn test_escape_cancels() {
        let bindings = KeyBindings::new();
        assert_eq!(bindings.action_for_key(KeyCode::Escape), Some(KeyAction::Cancel));
        assert_eq!(
            bindings.action_for_key(KeyCode::char('e')),
            Some(KeyAction::SelectTool(AnnotationTool::Eraser))
        );
    }

    #[test]
    fn test_key_conflict() {
        let mut bindings = KeyBindings::new();
        assert_eq!(bindings.key_conflict(KeyCode::char('p'), None), Some("Point tool".to_string()));
        assert_eq!(bindings.key_conflict(KeyCode::char('p'), Some(AnnotationTool::Point)), None);
        assert_eq!(bindings.key_conflict(KeyCode::Escape, None), Some("Cancel".to_string()));

        bindings.set_tool_key(AnnotationTool::Point, KeyCode::char('o'));
        assert_eq!(bindings.key_conflict(KeyCode::char('p'), None), None);
    }

    #[test]
    fn test_key_strings() {
        assert_eq!("esc".parse::<KeyCode>(), Ok(KeyCode::Escape));
        assert_eq!("q".parse::<KeyCode>(), Ok(KeyCode::Char('Q')));
        assert_eq!(KeyCode::Char('7').to_string(), "7");
        assert!("F13".parse::<KeyCode>().is_err());
    }

    #[test]
    fn test_bindings_json() {
        let json = serde_json::to_string(&KeyBindings::new()).expect("serializes");
        assert!(json.contains(r#""cancel":"Escape""#));

        // Missing fields fall back to defaults
        let parsed: KeyBindings = serde_json::from_str(r#"{"tool_point": "k"}"#).expect("parses");
        assert_eq!(parsed.tool_point, KeyCode::Char('K'));
        assert_eq!(parsed.tool_select, KeyCode::Char('V'));
    }
}
