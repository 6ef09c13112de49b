//! Keybindings parsed from the `[keybindings]` config section.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::infra::config::Keybindings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeyBinding {
    /// Parse specs such as `k`, `ctrl+b`, `alt+enter`.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim().to_ascii_lowercase();
        let mut parts: Vec<&str> = spec.split('+').collect();
        let key = parts.pop()?;

        let mut modifiers = KeyModifiers::NONE;
        for part in parts {
            modifiers |= match part {
                "ctrl" | "control" => KeyModifiers::CONTROL,
                "alt" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                _ => return None,
            };
        }

        let code = match key {
            "enter" => KeyCode::Enter,
            "esc" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "space" => KeyCode::Char(' '),
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "backspace" => KeyCode::Backspace,
            single => {
                let mut chars = single.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => KeyCode::Char(ch),
                    _ => return None,
                }
            }
        };
        Some(Self { code, modifiers })
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        let code_matches = match (self.code, key.code) {
            (KeyCode::Char(expected), KeyCode::Char(actual)) => {
                expected.eq_ignore_ascii_case(&actual)
            }
            (expected, actual) => expected == actual,
        };
        let relevant = key.modifiers & (KeyModifiers::CONTROL | KeyModifiers::ALT);
        code_matches && relevant == self.modifiers.difference(KeyModifiers::SHIFT)
    }

    /// Bindings without ctrl/alt would swallow typed text in the source editor.
    pub fn is_chord(&self) -> bool {
        self.modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    }
}

/// Resolved bindings for the actions that are configurable.
#[derive(Debug, Clone, Copy)]
pub struct Keymap {
    pub up: KeyBinding,
    pub down: KeyBinding,
    pub check: KeyBinding,
    pub save: KeyBinding,
}

impl Keymap {
    /// Resolve the configured bindings, falling back to the defaults for unparsable entries.
    pub fn from_config(bindings: &Keybindings) -> Self {
        let defaults = Keybindings::default();
        let resolve = |configured: &str, fallback: &str| {
            KeyBinding::parse(configured).unwrap_or_else(|| {
                tracing::warn!(binding = configured, "ignoring unparsable keybinding");
                KeyBinding::parse(fallback).unwrap_or(KeyBinding {
                    code: KeyCode::Null,
                    modifiers: KeyModifiers::NONE,
                })
            })
        };
        Self {
            up: resolve(&bindings.up, &defaults.up),
            down: resolve(&bindings.down, &defaults.down),
            check: resolve(&bindings.check, &defaults.check),
            save: resolve(&bindings.save, &defaults.save),
        }
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::from_config(&Keybindings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn parses_modifier_combinations() {
        let binding = KeyBinding::parse("Ctrl+B").unwrap();
        assert!(binding.matches(&key(KeyCode::Char('b'), KeyModifiers::CONTROL)));
        assert!(!binding.matches(&key(KeyCode::Char('b'), KeyModifiers::NONE)));
        assert!(KeyBinding::parse("hyper+b").is_none());
        assert!(KeyBinding::parse("ctrl+bb").is_none());
    }

    #[test]
    fn plain_keys_ignore_shift_but_not_control() {
        let binding = KeyBinding::parse("k").unwrap();
        assert!(binding.matches(&key(KeyCode::Char('k'), KeyModifiers::NONE)));
        assert!(binding.matches(&key(KeyCode::Char('K'), KeyModifiers::SHIFT)));
        assert!(!binding.matches(&key(KeyCode::Char('k'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn invalid_config_entries_fall_back_to_defaults() {
        let bindings = Keybindings {
            check: "nonsense+".into(),
            ..Keybindings::default()
        };
        let keymap = Keymap::from_config(&bindings);
        assert!(
            keymap
                .check
                .matches(&key(KeyCode::Char('b'), KeyModifiers::CONTROL))
        );
    }
}
