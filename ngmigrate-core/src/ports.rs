//! Port traits abstracting process execution and progress output away from
//! the repair loop.

use camino::Utf8Path;
use thiserror::Error;

/// Captured output of a command that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A command that could not be started or exited non-zero.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("command `{command}` failed ({})", describe_exit(.exit_code))]
pub struct CommandFailure {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process never ran or was killed by a signal.
    pub exit_code: Option<i32>,
}

impl CommandFailure {
    /// The text failure classification looks at: stderr, or stdout when
    /// the tool wrote nothing to stderr.
    pub fn diagnostic_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "did not run to completion".to_string(),
    }
}

/// Runs a whitespace-separated command line in a working directory.
pub trait CommandRunner {
    fn run(&self, command: &str, cwd: &Utf8Path) -> Result<CommandOutput, CommandFailure>;
}

/// Tone of a free-form progress message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Failure,
}

/// Receives step transitions and messages; purely presentational.
pub trait ProgressReporter {
    fn on_step_start(&mut self, label: &str);
    fn on_step_end(&mut self, label: &str);

    fn message(&mut self, _tone: Tone, _text: &str) {}
}
