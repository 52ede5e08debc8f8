//! Colored terminal output utilities.

use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    dim: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            dim: Style::new().dim(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Overwrite the current line with a progress counter.
    ///
    /// Does nothing when stderr is not a terminal.
    pub(crate) fn progress(&self, done: usize, total: usize) {
        if !self.term.is_term() {
            return;
        }
        let _ = self.term.clear_line();
        let _ = self
            .term
            .write_str(&self.dim.apply_to(progress_line(done, total)).to_string());
        if done == total {
            let _ = self.term.clear_line();
        }
    }
}

fn progress_line(done: usize, total: usize) -> String {
    format!("Building [{done}/{total}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line() {
        assert_eq!(progress_line(3, 10), "Building [3/10]");
    }
}
