//! Terminal output primitives
//!
//! Plain-text presentation for the launcher: status lines, reminders,
//! warnings. Warnings and errors go to stderr, everything else to stdout.

use std::io::{self, BufRead, Write};

/// ANSI color codes - pastel palette
pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const GREEN: &'static str = "\x1b[38;5;120m"; // Pastel green
    pub const YELLOW: &'static str = "\x1b[38;5;228m"; // Pastel yellow
    pub const RED: &'static str = "\x1b[38;5;210m"; // Pastel red
    pub const CYAN: &'static str = "\x1b[38;5;159m"; // Pastel cyan
    pub const BOLD: &'static str = "\x1b[1m";
}

/// Status level for messages
#[derive(Debug, Clone, Copy)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn symbol(&self) -> &'static str {
        match self {
            Level::Info => "ℹ",
            Level::Success => "✓",
            Level::Warning => "⚠",
            Level::Error => "✗",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Level::Info => Colors::CYAN,
            Level::Success => Colors::GREEN,
            Level::Warning => Colors::YELLOW,
            Level::Error => Colors::RED,
        }
    }
}

/// Format a status message
pub fn status(level: Level, message: &str) -> String {
    format!(
        "{}{} {}{}",
        level.color(),
        level.symbol(),
        message,
        Colors::RESET
    )
}

/// Print a highlighted reminder, typically right before reading a reply.
pub fn reminder(message: &str) {
    println!("{}{}{}{}", Colors::BOLD, Colors::YELLOW, message, Colors::RESET);
    let _ = io::stdout().flush();
}

pub fn info(message: &str) {
    println!("{}", status(Level::Info, message));
}

pub fn warn(message: &str) {
    eprintln!("{}", status(Level::Warning, message));
}

pub fn error(message: &str) {
    eprintln!("{}", status(Level::Error, message));
}

/// Source of interactive replies. The consent gate is a deliberate
/// synchronous boundary: a human is on the other end.
pub trait Prompter: Send + Sync {
    /// Read one line of input, without the trailing newline.
    fn read_reply(&self) -> io::Result<String>;
}

/// Reads replies from standard input.
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn read_reply(&self) -> io::Result<String> {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_symbols() {
        let msg = status(Level::Success, "done");
        assert!(msg.contains("✓"));
        assert!(msg.contains("done"));

        let msg = status(Level::Error, "failed");
        assert!(msg.contains("✗"));
    }

    #[test]
    fn test_status_resets_color() {
        assert!(status(Level::Warning, "careful").ends_with(Colors::RESET));
    }
}
