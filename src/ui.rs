//! Output sinks for user facing messages.
//!
//! The engine and every highway body talk to the user through a [`Ui`]
//! reference instead of printing directly, which keeps runs testable with a
//! [`Recorder`].

use std::cell::RefCell;

use console::style;

pub trait Ui {
    /// Regular progress message.
    fn message(&self, text: &str);
    /// A highway or the whole run finished successfully.
    fn success(&self, text: &str);
    /// Something went wrong.
    fn error(&self, text: &str);
    /// Diagnostic output, only shown in verbose mode.
    fn verbose(&self, text: &str);
    /// Machine readable output, written as is.
    fn output(&self, text: &str);
}

/// Writes styled messages to stderr and raw output to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminal {
    pub verbose: bool,
}

impl Terminal {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn print(&self, line: String) {
        // Keep progress bars from being torn by our output.
        tracing_indicatif::suspend_tracing_indicatif(|| eprintln!("{line}"));
    }
}

impl Ui for Terminal {
    fn message(&self, text: &str) {
        self.print(format!("{} {}", style("::").blue().bold(), text));
    }

    fn success(&self, text: &str) {
        self.print(format!("{} {}", style("✓").green().bold(), style(text).green()));
    }

    fn error(&self, text: &str) {
        self.print(format!("{} {}", style("✗").red().bold(), style(text).red()));
    }

    fn verbose(&self, text: &str) {
        if self.verbose {
            self.print(format!("{}", style(text).dim()));
        }
    }

    fn output(&self, text: &str) {
        tracing_indicatif::suspend_tracing_indicatif(|| println!("{text}"));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Message,
    Success,
    Error,
    Verbose,
    Output,
}

/// Keeps every message in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct Recorder {
    lines: RefCell<Vec<(Level, String)>>,
}

impl Recorder {
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.borrow().clone()
    }

    pub fn texts(&self, level: Level) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn push(&self, level: Level, text: &str) {
        self.lines.borrow_mut().push((level, text.to_string()));
    }
}

impl Ui for Recorder {
    fn message(&self, text: &str) {
        self.push(Level::Message, text);
    }

    fn success(&self, text: &str) {
        self.push(Level::Success, text);
    }

    fn error(&self, text: &str) {
        self.push(Level::Error, text);
    }

    fn verbose(&self, text: &str) {
        self.push(Level::Verbose, text);
    }

    fn output(&self, text: &str) {
        self.push(Level::Output, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_keeps_order() {
        let ui = Recorder::default();
        ui.message("one");
        ui.error("two");
        ui.message("three");

        assert_eq!(ui.lines().len(), 3);
        assert_eq!(ui.texts(Level::Message), ["one", "three"]);
        assert_eq!(ui.texts(Level::Error), ["two"]);
    }
}
