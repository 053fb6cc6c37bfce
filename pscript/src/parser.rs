//! Script text to command stream.
//!
//! One command per physical line: `<command-name> [argument-text]`. Lines whose
//! first non-blank character is `#` are comments. Parsing never fails; a line
//! that carries no command is simply skipped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::errors::ScriptError;

/// Conventional extension for persisted scripts.
pub const SCRIPT_EXTENSION: &str = "psc";

/// One parsed line of a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Lowercased command name.
    pub name: String,
    /// Raw remainder of the line after the first run of whitespace.
    pub argument: String,
    /// 1-based physical line number in the source text.
    pub line_number: usize,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.argument.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {}", self.name, self.argument)
        }
    }
}

/// Parse a single line. Returns `None` for blank and comment lines.
pub fn parse_line(line: &str, line_number: usize) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (name, argument) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim_start()),
        None => (line, ""),
    };

    Some(Command {
        name: name.to_lowercase(),
        argument: argument.to_string(),
        line_number,
    })
}

/// Parse a whole script, keeping the original line numbers.
pub fn parse_script(text: &str) -> Vec<Command> {
    let commands: Vec<Command> = text
        .lines()
        .enumerate()
        .filter_map(|(index, line)| parse_line(line, index + 1))
        .collect();
    debug!(count = commands.len(), "Parsed script");
    commands
}

/// Read a persisted script file as UTF-8 text.
pub fn read_script(path: impl AsRef<Path>) -> Result<String, ScriptError> {
    let path = path.as_ref();
    if path.extension().and_then(|ext| ext.to_str()) != Some(SCRIPT_EXTENSION) {
        warn!(
            "Script {} does not use the .{} extension",
            path.display(),
            SCRIPT_EXTENSION
        );
    }
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_splits_name_and_argument() {
        let command = parse_line("  TYPE   hello   world ", 4).unwrap();
        assert_eq!(command.name, "type");
        assert_eq!(command.argument, "hello   world");
        assert_eq!(command.line_number, 4);
    }

    #[test]
    fn test_parse_line_without_argument() {
        let command = parse_line("exit", 1).unwrap();
        assert_eq!(command.name, "exit");
        assert_eq!(command.argument, "");
    }

    #[test]
    fn test_parse_line_skips_blank_and_comments() {
        assert!(parse_line("", 1).is_none());
        assert!(parse_line("   \t ", 1).is_none());
        assert!(parse_line("# a comment", 1).is_none());
        assert!(parse_line("   #indented comment", 1).is_none());
    }

    #[test]
    fn test_parse_line_keeps_hash_inside_argument() {
        let command = parse_line("type issue #42", 1).unwrap();
        assert_eq!(command.argument, "issue #42");
    }

    #[test]
    fn test_parse_script_preserves_line_numbers() {
        let script = "# header\n\nopen notepad\n   \nwait 1.5\n# note\ntype hi/e\r\nexit\n";
        let commands = parse_script(script);
        let summary: Vec<(&str, &str, usize)> = commands
            .iter()
            .map(|c| (c.name.as_str(), c.argument.as_str(), c.line_number))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("open", "notepad", 3),
                ("wait", "1.5", 5),
                ("type", "hi/e", 7),
                ("exit", "", 8),
            ]
        );
    }

    #[test]
    fn test_argument_is_byte_identical_to_rest_of_line() {
        for rest in ["a/tb/sc/d", "Hello, World!", "x  y\tz", "ünïcödé ✓", "#not-a-comment"] {
            let line = format!("type {rest}");
            let command = parse_line(&line, 1).unwrap();
            assert_eq!(command.argument.as_bytes(), rest.as_bytes());
        }
    }

    #[test]
    fn test_parse_script_never_fails_on_garbage() {
        let commands = parse_script("@@@\n\u{0}\n!!! ???");
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[2].name, "!!!");
        assert_eq!(commands[2].argument, "???");
    }

    #[test]
    fn test_read_script_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.psc");
        std::fs::write(&path, "wait 0\n").unwrap();
        assert_eq!(read_script(&path).unwrap(), "wait 0\n");
        assert!(matches!(
            read_script(dir.path().join("missing.psc")),
            Err(ScriptError::Io(_))
        ));
    }
}
