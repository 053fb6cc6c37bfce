//! Static table of applications that `open` knows how to launch.
//!
//! Adding an application means adding a row here; the table is not runtime
//! configurable.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LaunchTarget {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

const fn target(program: &'static str) -> LaunchTarget {
    LaunchTarget { program, args: &[] }
}

#[cfg(target_os = "windows")]
const APPLICATIONS: &[(&str, LaunchTarget)] = &[
    ("notepad", target("notepad.exe")),
    ("calculator", target("calc.exe")),
    ("paint", target("mspaint.exe")),
    ("explorer", target("explorer.exe")),
    ("cmd", target("cmd.exe")),
];

#[cfg(target_os = "macos")]
const APPLICATIONS: &[(&str, LaunchTarget)] = &[
    (
        "notepad",
        target("/System/Applications/TextEdit.app/Contents/MacOS/TextEdit"),
    ),
    (
        "calculator",
        target("/System/Applications/Calculator.app/Contents/MacOS/Calculator"),
    ),
    (
        "terminal",
        target("/System/Applications/Utilities/Terminal.app/Contents/MacOS/Terminal"),
    ),
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const APPLICATIONS: &[(&str, LaunchTarget)] = &[
    ("notepad", target("gedit")),
    ("calculator", target("gnome-calculator")),
    ("terminal", target("x-terminal-emulator")),
];

/// Look up a launch target by lowercase logical name.
pub fn lookup(name: &str) -> Option<&'static LaunchTarget> {
    APPLICATIONS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, target)| target)
}

pub fn names() -> Vec<&'static str> {
    APPLICATIONS.iter().map(|(name, _)| *name).collect()
}

/// Window title guess for an application: its logical name, capitalized.
pub fn window_title_hint(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_applications_are_configured() {
        assert!(lookup("notepad").is_some());
        assert!(lookup("calculator").is_some());
        assert!(lookup("minesweeper").is_none());
        assert!(names().contains(&"notepad"));
    }

    #[test]
    fn test_lookup_expects_lowercase_names() {
        assert!(lookup("Notepad").is_none());
    }

    #[test]
    fn test_window_title_hint() {
        assert_eq!(window_title_hint("notepad"), "Notepad");
        assert_eq!(window_title_hint(""), "");
    }
}
