//! Keyboard synthesis and pointer tracking.
//!
//! Backed by rdev when the `input-hooks` feature is enabled. Without it,
//! keystrokes fail with a platform error and the pointer position is unknown,
//! which leaves the failsafe inert.

#[cfg(feature = "input-hooks")]
mod hooks {
    use once_cell::sync::OnceCell;
    use rdev::{EventType, Key as RdevKey};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::thread;
    use tracing::{debug, error};

    use crate::errors::ScriptError;
    use crate::keyboard::{Key, Keystroke};

    type SharedPosition = Arc<Mutex<Option<(f64, f64)>>>;

    static POINTER: OnceCell<SharedPosition> = OnceCell::new();

    /// Start the global listener once and keep the latest pointer position.
    fn pointer_tracker() -> &'static SharedPosition {
        POINTER.get_or_init(|| {
            let position: SharedPosition = Arc::new(Mutex::new(None));
            let writer = Arc::clone(&position);

            thread::spawn(move || {
                debug!("Starting pointer listener");
                if let Err(error) = rdev::listen(move |event: rdev::Event| {
                    if let EventType::MouseMove { x, y } = event.event_type {
                        *writer.lock().unwrap_or_else(PoisonError::into_inner) = Some((x, y));
                    }
                }) {
                    error!("Pointer listener stopped: {:?}", error);
                }
            });

            position
        })
    }

    pub fn pointer_position() -> Option<(f64, f64)> {
        *pointer_tracker()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn screen_size() -> Option<(f64, f64)> {
        rdev::display_size()
            .ok()
            .map(|(width, height)| (width as f64, height as f64))
    }

    fn simulate(event: &EventType) -> Result<(), ScriptError> {
        rdev::simulate(event)
            .map_err(|e| ScriptError::Platform(format!("Failed to send {event:?}: {e:?}")))
    }

    pub fn send_keystroke(keystroke: &Keystroke) -> Result<(), ScriptError> {
        let key = to_rdev_key(keystroke.key).ok_or_else(|| {
            ScriptError::Platform(format!("No key code for {:?}", keystroke.ch))
        })?;

        if keystroke.shift {
            simulate(&EventType::KeyPress(RdevKey::ShiftLeft))?;
        }
        let result = simulate(&EventType::KeyPress(key))
            .and_then(|_| simulate(&EventType::KeyRelease(key)));
        if keystroke.shift {
            // Release shift even if the key itself failed.
            simulate(&EventType::KeyRelease(RdevKey::ShiftLeft))?;
        }
        result
    }

    fn to_rdev_key(key: Key) -> Option<RdevKey> {
        let mapped = match key {
            Key::Letter(letter) => match letter {
                'a' => RdevKey::KeyA,
                'b' => RdevKey::KeyB,
                'c' => RdevKey::KeyC,
                'd' => RdevKey::KeyD,
                'e' => RdevKey::KeyE,
                'f' => RdevKey::KeyF,
                'g' => RdevKey::KeyG,
                'h' => RdevKey::KeyH,
                'i' => RdevKey::KeyI,
                'j' => RdevKey::KeyJ,
                'k' => RdevKey::KeyK,
                'l' => RdevKey::KeyL,
                'm' => RdevKey::KeyM,
                'n' => RdevKey::KeyN,
                'o' => RdevKey::KeyO,
                'p' => RdevKey::KeyP,
                'q' => RdevKey::KeyQ,
                'r' => RdevKey::KeyR,
                's' => RdevKey::KeyS,
                't' => RdevKey::KeyT,
                'u' => RdevKey::KeyU,
                'v' => RdevKey::KeyV,
                'w' => RdevKey::KeyW,
                'x' => RdevKey::KeyX,
                'y' => RdevKey::KeyY,
                'z' => RdevKey::KeyZ,
                _ => return None,
            },
            Key::Digit(digit) => match digit {
                0 => RdevKey::Num0,
                1 => RdevKey::Num1,
                2 => RdevKey::Num2,
                3 => RdevKey::Num3,
                4 => RdevKey::Num4,
                5 => RdevKey::Num5,
                6 => RdevKey::Num6,
                7 => RdevKey::Num7,
                8 => RdevKey::Num8,
                9 => RdevKey::Num9,
                _ => return None,
            },
            Key::Return => RdevKey::Return,
            Key::Tab => RdevKey::Tab,
            Key::Space => RdevKey::Space,
            Key::Backspace => RdevKey::Backspace,
            Key::Minus => RdevKey::Minus,
            Key::Equal => RdevKey::Equal,
            Key::LeftBracket => RdevKey::LeftBracket,
            Key::RightBracket => RdevKey::RightBracket,
            Key::BackSlash => RdevKey::BackSlash,
            Key::SemiColon => RdevKey::SemiColon,
            Key::Quote => RdevKey::Quote,
            Key::BackQuote => RdevKey::BackQuote,
            Key::Comma => RdevKey::Comma,
            Key::Dot => RdevKey::Dot,
            Key::Slash => RdevKey::Slash,
        };
        Some(mapped)
    }
}

#[cfg(not(feature = "input-hooks"))]
mod hooks {
    use crate::errors::ScriptError;
    use crate::keyboard::Keystroke;

    pub fn pointer_position() -> Option<(f64, f64)> {
        None
    }

    pub fn screen_size() -> Option<(f64, f64)> {
        None
    }

    pub fn send_keystroke(_keystroke: &Keystroke) -> Result<(), ScriptError> {
        Err(ScriptError::Platform(
            "keyboard synthesis is not available in this build (enable the `input-hooks` feature)"
                .to_string(),
        ))
    }
}

pub(crate) use hooks::{pointer_position, screen_size, send_keystroke};
