//! Default process and console port implementations.

use crate::ports::{CommandFailure, CommandOutput, CommandRunner, ProgressReporter, Tone};
use camino::Utf8Path;
use colored::Colorize;
use tracing::debug;

/// Runs command lines through the platform shell (`sh -c`, or `cmd /C` on
/// Windows) via `duct`, capturing both streams. The shell resolves the
/// `npm.cmd`/`npx.cmd` shims and honours quoted arguments.
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner;

impl ShellCommandRunner {
    fn expression(command: &str) -> duct::Expression {
        if cfg!(windows) {
            duct::cmd("cmd", ["/C", command])
        } else {
            duct::cmd("sh", ["-c", command])
        }
    }
}

impl CommandRunner for ShellCommandRunner {
    fn run(&self, command: &str, cwd: &Utf8Path) -> Result<CommandOutput, CommandFailure> {
        if command.trim().is_empty() {
            return Err(CommandFailure {
                command: command.to_string(),
                stdout: String::new(),
                stderr: "empty command line".to_string(),
                exit_code: None,
            });
        }
        debug!(command, cwd = %cwd, "running");

        let output = Self::expression(command)
            .dir(cwd.as_std_path())
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|err| CommandFailure {
                command: command.to_string(),
                stdout: String::new(),
                stderr: format!("failed to start shell for `{command}`: {err}"),
                exit_code: None,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            debug!(command, code = ?output.status.code(), "command failed");
            Err(CommandFailure {
                command: command.to_string(),
                stdout,
                stderr,
                exit_code: output.status.code(),
            })
        }
    }
}

/// Prints `[ ] step` when a step starts and `[✔] step` when it ends.
#[derive(Debug, Clone, Default)]
pub struct ConsoleProgress;

impl ConsoleProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for ConsoleProgress {
    fn on_step_start(&mut self, label: &str) {
        println!("[ ] {label}");
    }

    fn on_step_end(&mut self, label: &str) {
        println!("[{}] {label}", "✔".green());
    }

    fn message(&mut self, tone: Tone, text: &str) {
        match tone {
            Tone::Success => println!("{}", text.green()),
            Tone::Warning => println!("{}", text.yellow()),
            Tone::Failure => eprintln!("{}", text.red()),
        }
    }
}
