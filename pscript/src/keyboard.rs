//! Text to keystroke translation for the `type` command.

use serde::Serialize;

/// Physical key on a US layout keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Key {
    /// `a` to `z`.
    Letter(char),
    /// `0` to `9`.
    Digit(u8),
    Return,
    Tab,
    Space,
    Backspace,
    Minus,
    Equal,
    LeftBracket,
    RightBracket,
    BackSlash,
    SemiColon,
    Quote,
    BackQuote,
    Comma,
    Dot,
    Slash,
}

/// One character to synthesize, with the key that produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Keystroke {
    pub ch: char,
    pub key: Key,
    pub shift: bool,
}

/// Expand the `/e /t /s /b` literals. Any other `/x` pair is left untouched.
pub fn substitute_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '/' {
            let replacement = match chars.peek() {
                Some('e') => Some('\n'),
                Some('t') => Some('\t'),
                Some('s') => Some(' '),
                Some('b') => Some('\u{8}'),
                _ => None,
            };
            if let Some(replacement) = replacement {
                chars.next();
                out.push(replacement);
                continue;
            }
        }
        out.push(ch);
    }
    out
}

pub fn keystroke_for(ch: char) -> Option<Keystroke> {
    let (key, shift) = match ch {
        'a'..='z' => (Key::Letter(ch), false),
        'A'..='Z' => (Key::Letter(ch.to_ascii_lowercase()), true),
        '0'..='9' => (Key::Digit(ch as u8 - b'0'), false),
        '\n' | '\r' => (Key::Return, false),
        '\t' => (Key::Tab, false),
        ' ' => (Key::Space, false),
        '\u{8}' => (Key::Backspace, false),
        '-' => (Key::Minus, false),
        '_' => (Key::Minus, true),
        '=' => (Key::Equal, false),
        '+' => (Key::Equal, true),
        '[' => (Key::LeftBracket, false),
        '{' => (Key::LeftBracket, true),
        ']' => (Key::RightBracket, false),
        '}' => (Key::RightBracket, true),
        '\\' => (Key::BackSlash, false),
        '|' => (Key::BackSlash, true),
        ';' => (Key::SemiColon, false),
        ':' => (Key::SemiColon, true),
        '\'' => (Key::Quote, false),
        '"' => (Key::Quote, true),
        '`' => (Key::BackQuote, false),
        '~' => (Key::BackQuote, true),
        ',' => (Key::Comma, false),
        '<' => (Key::Comma, true),
        '.' => (Key::Dot, false),
        '>' => (Key::Dot, true),
        '/' => (Key::Slash, false),
        '?' => (Key::Slash, true),
        '!' => (Key::Digit(1), true),
        '@' => (Key::Digit(2), true),
        '#' => (Key::Digit(3), true),
        '$' => (Key::Digit(4), true),
        '%' => (Key::Digit(5), true),
        '^' => (Key::Digit(6), true),
        '&' => (Key::Digit(7), true),
        '*' => (Key::Digit(8), true),
        '(' => (Key::Digit(9), true),
        ')' => (Key::Digit(0), true),
        _ => return None,
    };
    Some(Keystroke { ch, key, shift })
}

/// Map every character of `text`, or return the first one with no key.
pub fn keystrokes(text: &str) -> Result<Vec<Keystroke>, char> {
    text.chars()
        .map(|ch| keystroke_for(ch).ok_or(ch))
        .collect()
}
