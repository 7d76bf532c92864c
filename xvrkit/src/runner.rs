//! Running the external tool to completion while relaying its output.

use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, error, info};

use crate::command::{display_command, prepare, XvrCommand};
use crate::error::{RunError, RunResult};
use crate::notify::Notifier;
use crate::settings::Settings;

/// How a finished run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Everything the tool wrote to stderr.
    pub stderr: String,
}

/// Launches `xvr` subcommands according to [`Settings`].
pub struct XvrRunner<'a> {
    settings: &'a Settings,
    notifier: &'a dyn Notifier,
}

impl<'a> XvrRunner<'a> {
    pub fn new(settings: &'a Settings, notifier: &'a dyn Notifier) -> Self {
        XvrRunner { settings, notifier }
    }

    /// Program and full argument vector for `command`, including the optional
    /// `script -q /dev/null` wrapper.
    pub fn command_line(&self, command: &dyn XvrCommand) -> (OsString, Vec<OsString>) {
        let mut args = command.args();
        if self.settings.pty_wrapper {
            let mut wrapped: Vec<OsString> = vec!["-q".into(), "/dev/null".into()];
            wrapped.push(self.settings.program.clone().into());
            wrapped.append(&mut args);
            ("script".into(), wrapped)
        } else {
            (self.settings.program.clone().into(), args)
        }
    }

    /// The command line as it would be typed in a shell.
    pub fn describe(&self, command: &dyn XvrCommand) -> String {
        let (program, args) = self.command_line(command);
        display_command(&program, &args)
    }

    /// Validates, prepares and runs `command`, relaying stdout to `console` line by
    /// line as it arrives.
    ///
    /// Validation problems and a missing executable are errors; a non-zero exit is
    /// a normal [`RunOutcome`] with `success == false`.
    pub fn run(&self, command: &dyn XvrCommand, console: &mut dyn Write) -> RunResult<RunOutcome> {
        let label = command.label();
        if let Err(e) = prepare(command) {
            self.notifier.show_info(&format!("Error: {}", e));
            return Err(e);
        }

        self.notifier.show_info(&format!(
            "Starting {} (see console for live output)...",
            label
        ));
        info!("--- {} Log ---", label);
        let outcome = self.spawn_and_relay(command, console);
        info!("--- End {} Log ---", label);

        match outcome {
            Ok(outcome) => {
                self.report(label, &outcome, console)?;
                Ok(outcome)
            }
            Err(e) => {
                self.notifier.show_info(&format!("Error: {}", e));
                Err(e)
            }
        }
    }

    fn spawn_and_relay(
        &self,
        command: &dyn XvrCommand,
        console: &mut dyn Write,
    ) -> RunResult<RunOutcome> {
        let (program, args) = self.command_line(command);
        info!("Executing command: {}", display_command(&program, &args));

        let mut child = Command::new(&program)
            .args(&args)
            .envs(&self.settings.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => RunError::NotInstalled {
                    program: program.to_string_lossy().into_owned(),
                },
                _ => RunError::Io(e),
            })?;

        // Drained on its own thread so a chatty stderr cannot stall stdout.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                stderr
                    .read_to_end(&mut buf)
                    .map(|_| String::from_utf8_lossy(&buf).into_owned())
            })
        });

        let relayed = match child.stdout.take() {
            Some(stdout) => relay_lines(stdout, console),
            None => Ok(()),
        };
        if relayed.is_err() {
            // Nothing reads its stdout any more.
            let _ = child.kill();
        }

        let stderr = match stderr_reader {
            Some(handle) => handle.join().unwrap_or_else(|_| Ok(String::new())),
            None => Ok(String::new()),
        };
        let status = child.wait()?;
        relayed?;
        let stderr = stderr?;
        debug!("{} exited with {}", program.to_string_lossy(), status);

        Ok(RunOutcome {
            success: status.success(),
            code: status.code(),
            stderr,
        })
    }

    fn report(&self, label: &str, outcome: &RunOutcome, console: &mut dyn Write) -> io::Result<()> {
        let has_stderr = !outcome.stderr.trim().is_empty();
        if outcome.success {
            self.notifier
                .show_info(&format!("{} completed successfully!", label));
            if has_stderr {
                self.notifier.show_info(&format!(
                    "{} finished with warnings (check console).",
                    label
                ));
                writeln!(console, "--- STDERR Output (Warnings/Errors) ---")?;
                writeln!(console, "{}", outcome.stderr.trim_end())?;
            }
        } else {
            let message = match outcome.code {
                Some(code) => format!("{} failed with exit code {}.", label, code),
                None => format!("{} was terminated by a signal.", label),
            };
            error!("{}", message);
            self.notifier.show_info(&message);
            if has_stderr {
                writeln!(console, "--- STDERR Output (Failure) ---")?;
                writeln!(console, "{}", outcome.stderr.trim_end())?;
            }
        }
        Ok(())
    }
}

/// Copies `stdout` to `console` line by line. Bytes that are not UTF-8 (progress
/// bars, terminal control codes) are replaced rather than treated as errors.
fn relay_lines(stdout: impl Read, console: &mut dyn Write) -> io::Result<()> {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        writeln!(console, "{}", line.trim_end())?;
        console.flush()?;
    }
}
