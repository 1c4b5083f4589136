use std::fs::File;
use std::io::Write;
use std::process::{Command, Output, Stdio};

use crate::error::{HostError, HostResult};

/// Captured result of a command that is allowed to fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Probe {
    pub success: bool,
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Run a command and capture its output. Fails if the command
/// returns a non-zero exit code.
pub fn run(program: &str, args: &[&str]) -> HostResult<String> {
    run_raw(program, args).map(|out| out.trim().to_string())
}

/// Like [`run`], but stdout is returned exactly as written, with
/// leading and trailing whitespace intact.
pub fn run_raw(program: &str, args: &[&str]) -> HostResult<String> {
    let output = spawn(program, args)?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let command = format_command(program, args);
        tracing::error!(%command, %stderr, "command failed");
        Err(HostError::CommandFailed {
            command,
            code: output.status.code(),
        })
    }
}

/// Run a command and capture its output without treating a
/// non-zero exit as an error. Only a missing program or a spawn
/// failure is reported as `Err`.
pub fn probe(program: &str, args: &[&str]) -> HostResult<Probe> {
    let output = spawn(program, args)?;

    Ok(Probe {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Run a command with stdin/stdout/stderr inherited (interactive).
pub fn run_interactive(program: &str, args: &[&str]) -> HostResult<()> {
    tracing::debug!(command = %format_command(program, args), "running");

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| spawn_error(program, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(HostError::CommandFailed {
            command: format_command(program, args),
            code: status.code(),
        })
    }
}

/// Run a command that pipes its stdin from a byte slice.
pub fn run_with_stdin(program: &str, args: &[&str], stdin_data: &[u8]) -> HostResult<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    if let Some(stdin) = &mut child.stdin {
        stdin.write_all(stdin_data)?;
    }
    drop(child.stdin.take());

    let output = child.wait_with_output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let command = format_command(program, args);
        tracing::error!(%command, %stderr, "command failed");
        Err(HostError::CommandFailed {
            command,
            code: output.status.code(),
        })
    }
}

/// Run a command with its stdout streamed into `path`. The file is
/// created or truncated before the command starts and removed again
/// if the command cannot be spawned or exits non-zero.
pub fn run_to_file(program: &str, args: &[&str], path: &str) -> HostResult<()> {
    let file = File::create(path)?;

    let result = Command::new(program)
        .args(args)
        .stdout(Stdio::from(file))
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| spawn_error(program, e))
        .and_then(|output| {
            if output.status.success() {
                return Ok(());
            }
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let command = format_command(program, args);
            tracing::error!(%command, %stderr, "command failed");
            Err(HostError::CommandFailed {
                command,
                code: output.status.code(),
            })
        });

    if result.is_err() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path, error = %e, "could not remove partial output");
        }
    }
    result
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

/// Join a program and its arguments for display.
#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}

/// Quote a single word for a POSIX shell.
#[must_use]
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

/// Build a shell command line with every word quoted.
#[must_use]
pub fn shell_line(program: &str, args: &[&str]) -> String {
    let mut parts = vec![shell_quote(program)];
    parts.extend(args.iter().map(|a| shell_quote(a)));
    parts.join(" ")
}

fn spawn(program: &str, args: &[&str]) -> HostResult<Output> {
    tracing::debug!(command = %format_command(program, args), "running");

    Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| spawn_error(program, e))
}

fn spawn_error(program: &str, e: std::io::Error) -> HostError {
    if e.kind() == std::io::ErrorKind::NotFound {
        HostError::CommandNotFound(program.to_string())
    } else {
        HostError::Io(e)
    }
}
