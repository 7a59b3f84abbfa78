//! Command execution shared by every tool wrapper.
//!
//! All external programs (`bazel`, `xcodebuild`, `xcrun simctl`, `plutil`,
//! `open`, `killall`) are reached through the [`ToolRunner`] trait so the
//! orchestration logic can be driven by a scripted runner in tests.
//!
//! ## Error Messages
//!
//! [`run_command`] formats failures the same way everywhere:
//! - What was run (description and command line)
//! - The exit status
//! - Captured stdout/stderr, when output was captured

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    stdin: Option<Vec<u8>>,
    capture: bool,
}

impl ToolCommand {
    /// Creates a command whose output is captured.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            current_dir: None,
            stdin: None,
            capture: true,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Feeds `input` to the child's stdin.
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Lets the child write straight to the terminal instead of capturing.
    pub fn inherit_output(mut self) -> Self {
        self.capture = false;
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn get_stdin(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }

    pub fn captures_output(&self) -> bool {
        self.capture
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of running a [`ToolCommand`].
///
/// `stdout`/`stderr` are empty when output was inherited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// A successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs external commands.
///
/// `Err` means the program could not be started at all; a program that ran and
/// exited non-zero is reported through [`ToolOutput::success`].
pub trait ToolRunner {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
        tracing::debug!("Running: {}", command);

        let mut cmd = Command::new(command.program());
        cmd.args(command.get_args());
        if let Some(dir) = command.get_current_dir() {
            cmd.current_dir(dir);
        }

        if !command.captures_output() {
            let status = cmd.status()?;
            tracing::debug!("{} exited with {}", command.program().to_string_lossy(), status);
            return Ok(ToolOutput {
                success: status.success(),
                code: status.code(),
                stdout: String::new(),
                stderr: String::new(),
            });
        }

        let output = match command.get_stdin() {
            Some(input) => {
                let mut child = cmd
                    .stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .spawn()?;
                let stdin = child.stdin.take();
                // Feed stdin while output is drained so neither pipe can fill up
                // and stall the other side.
                thread::scope(|scope| {
                    let writer = scope.spawn(move || match stdin {
                        Some(mut stdin) => stdin.write_all(input),
                        None => Ok(()),
                    });
                    let output = child.wait_with_output();
                    let written = writer
                        .join()
                        .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
                    match written {
                        // The child may exit without reading everything.
                        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
                        _ => output,
                    }
                })?
            }
            None => cmd.output()?,
        };

        tracing::debug!(
            "{} exited with {}",
            command.program().to_string_lossy(),
            output.status
        );
        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs an external command with consistent error handling.
///
/// # Arguments
/// * `runner` - The runner that executes the command
/// * `command` - The command to execute
/// * `description` - Human-readable description of what the command does
///
/// # Returns
/// The output if the command succeeded, or a formatted message naming the
/// command, its exit status and its captured output. Callers wrap the message
/// in the [`PlaygroundError`](crate::PlaygroundError) variant of their stage.
pub fn run_command(
    runner: &dyn ToolRunner,
    command: &ToolCommand,
    description: &str,
) -> Result<ToolOutput, String> {
    let output = runner.run(command).map_err(|e| {
        format!(
            "Failed to start {}.\n\n\
             Command: {}\n\
             Error: {}\n\n\
             Ensure the tool is installed and available on PATH.",
            description, command, e
        )
    })?;

    if !output.success {
        let mut message = format!(
            "{} failed.\n\n\
             Command: {}\n\
             Exit status: {}",
            description,
            command,
            output.status_text()
        );
        if !output.stdout.trim().is_empty() {
            message.push_str(&format!("\n\nStdout:\n{}", output.stdout.trim_end()));
        }
        if !output.stderr.trim().is_empty() {
            message.push_str(&format!("\n\nStderr:\n{}", output.stderr.trim_end()));
        }
        return Err(message);
    }
    Ok(output)
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted runner for tests.

    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned outputs keyed by command-line prefix and records every
    /// command it was asked to run.
    #[derive(Default)]
    pub(crate) struct ScriptedRunner {
        responses: RefCell<Vec<(String, VecDeque<io::Result<ToolOutput>>)>>,
        pub(crate) calls: RefCell<Vec<ToolCommand>>,
    }

    impl ScriptedRunner {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Queues `output` for the next command whose rendered command line
        /// starts with `prefix`. The last queued output for a prefix repeats.
        pub(crate) fn respond(self, prefix: &str, output: ToolOutput) -> Self {
            self.push(prefix, Ok(output));
            self
        }

        /// Drops anything queued for `prefix` and answers with `output` from now on.
        pub(crate) fn replace(self, prefix: &str, output: ToolOutput) -> Self {
            self.responses.borrow_mut().retain(|(p, _)| p != prefix);
            self.push(prefix, Ok(output));
            self
        }

        /// Makes the next matching command fail to start.
        pub(crate) fn fail_to_start(self, prefix: &str) -> Self {
            self.push(
                prefix,
                Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory")),
            );
            self
        }

        fn push(&self, prefix: &str, output: io::Result<ToolOutput>) {
            let mut responses = self.responses.borrow_mut();
            match responses.iter_mut().find(|(p, _)| p == prefix) {
                Some((_, queue)) => queue.push_back(output),
                None => responses.push((prefix.to_string(), VecDeque::from([output]))),
            }
        }

        pub(crate) fn command_lines(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|c| c.to_string()).collect()
        }

        pub(crate) fn count_prefix(&self, prefix: &str) -> usize {
            self.command_lines()
                .iter()
                .filter(|line| line.starts_with(prefix))
                .count()
        }
    }

    fn clone_result(result: &io::Result<ToolOutput>) -> io::Result<ToolOutput> {
        match result {
            Ok(output) => Ok(output.clone()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        }
    }

    impl ToolRunner for ScriptedRunner {
        fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
            self.calls.borrow_mut().push(command.clone());
            let line = command.to_string();
            let mut responses = self.responses.borrow_mut();
            // Longest matching prefix wins.
            let entry = responses
                .iter_mut()
                .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len());
            match entry {
                Some((_, queue)) if queue.len() > 1 => {
                    queue.pop_front().unwrap_or_else(|| Ok(ToolOutput::ok("")))
                }
                Some((_, queue)) => queue
                    .front()
                    .map(clone_result)
                    .unwrap_or_else(|| Ok(ToolOutput::ok(""))),
                None => Ok(ToolOutput::ok("")),
            }
        }
    }
}
