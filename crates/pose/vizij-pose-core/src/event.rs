//! Input events fed to modal sessions, and the session status they report.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    LeftMouse,
    RightMouse,
    Enter,
    Space,
    Escape,
    Tab,
    Backspace,
    Minus,
    Period,
    Digit(u8),
    /// Letter keys. Sessions compare them upper case.
    Letter(char),
}

impl Key {
    pub fn letter(c: char) -> Key {
        Key::Letter(c.to_ascii_uppercase())
    }

    /// Upper-cases letter keys, which may arrive lower case from serde.
    pub fn normalized(self) -> Key {
        match self {
            Key::Letter(c) => Key::letter(c),
            other => other,
        }
    }

    #[inline]
    pub fn is_confirm(self) -> bool {
        matches!(self, Key::LeftMouse | Key::Enter | Key::Space)
    }

    #[inline]
    pub fn is_cancel(self) -> bool {
        matches!(self, Key::Escape | Key::RightMouse)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
    };
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    PointerMove { x: f32, modifiers: Modifiers },
    KeyPress { key: Key, modifiers: Modifiers },
    KeyRelease { key: Key, modifiers: Modifiers },
}

impl InputEvent {
    pub fn pointer(x: f32) -> Self {
        InputEvent::PointerMove {
            x,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn press(key: Key) -> Self {
        InputEvent::KeyPress {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn release(key: Key) -> Self {
        InputEvent::KeyRelease {
            key,
            modifiers: Modifiers::NONE,
        }
    }
}

/// Region and pointer state at the moment a gesture starts.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GestureContext {
    pub region_xmin: f32,
    pub region_width: f32,
    pub cursor_x: f32,
    /// Key that started the gesture (release-confirm watches for its release).
    pub initiating_key: Option<Key>,
}

impl Default for GestureContext {
    fn default() -> Self {
        Self {
            region_xmin: 0.0,
            region_width: 1000.0,
            cursor_x: 0.0,
            initiating_key: None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOutcome {
    Confirmed,
    Cancelled,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Running,
    Finished(SessionOutcome),
}

impl SessionStatus {
    pub fn is_running(self) -> bool {
        matches!(self, SessionStatus::Running)
    }
}

/// Typed numeric entry. While active it overrides pointer-driven values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NumericInput {
    buffer: String,
    negative: bool,
}

impl NumericInput {
    /// Feed a key. Returns true when the key belongs to numeric entry.
    pub fn handle(&mut self, key: Key) -> bool {
        match key {
            Key::Digit(d) if d <= 9 => {
                self.buffer.push(char::from(b'0' + d));
                true
            }
            Key::Period => {
                if !self.buffer.contains('.') {
                    self.buffer.push('.');
                }
                true
            }
            Key::Minus => {
                self.negative = !self.negative;
                true
            }
            Key::Backspace => {
                if self.buffer.pop().is_none() {
                    self.negative = false;
                }
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.buffer.is_empty() || self.negative
    }

    /// Typed value, `None` until at least one digit parses.
    pub fn value(&self) -> Option<f32> {
        let v: f32 = self.buffer.parse().ok()?;
        Some(if self.negative { -v } else { v })
    }

    pub fn text(&self) -> String {
        format!("{}{}", if self.negative { "-" } else { "" }, self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_input_builds_value() {
        let mut num = NumericInput::default();
        assert!(!num.is_active());
        for key in [Key::Digit(2), Key::Digit(5), Key::Period, Key::Digit(5)] {
            assert!(num.handle(key));
        }
        assert_eq!(num.value(), Some(25.5));
        assert!(num.handle(Key::Minus));
        assert_eq!(num.value(), Some(-25.5));
        assert!(!num.handle(Key::letter('g')));
        for _ in 0..4 {
            num.handle(Key::Backspace);
        }
        assert_eq!(num.value(), None);
        num.handle(Key::Backspace);
        assert!(!num.is_active());
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let ev: InputEvent =
            serde_json::from_str(r#"{"type":"key_press","key":"Tab","modifiers":{}}"#).unwrap();
        assert_eq!(ev, InputEvent::press(Key::Tab));
    }

    #[test]
    fn letters_normalize_to_upper_case() {
        assert_eq!(Key::Letter('x').normalized(), Key::Letter('X'));
        assert_eq!(Key::Letter('X').normalized(), Key::Letter('X'));
        assert_eq!(Key::Tab.normalized(), Key::Tab);
    }
}
