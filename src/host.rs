use std::path::Path;

use crate::cmd::{self, Probe};
use crate::error::{HostError, HostResult};

/// The machine being operated on.
///
/// Every command, file read, and file write goes through this
/// trait, so the same workflows run against the local machine
/// ([`LocalHost`]) or a remote one over SSH
/// ([`SshSession`](crate::ssh::SshSession)).
pub trait Host {
    /// Human-readable name of the target, used in log lines.
    fn describe(&self) -> String;

    /// Run a command and capture its output. Fails on a non-zero
    /// exit code.
    fn exec(&self, program: &str, args: &[&str]) -> HostResult<String>;

    /// Run a command attached to the terminal.
    fn exec_interactive(&self, program: &str, args: &[&str]) -> HostResult<()>;

    /// Run a command whose failure is an expected outcome.
    fn probe(&self, program: &str, args: &[&str]) -> HostResult<Probe>;

    /// Run a command and write its stdout to `path` on the host.
    /// No partial file is left behind when the command fails.
    fn exec_to_file(&self, program: &str, args: &[&str], path: &str) -> HostResult<()>;

    /// Read a file byte for byte, returning `None` when it does not
    /// exist.
    fn read_file(&self, path: &str) -> HostResult<Option<String>>;

    /// Create or replace a file.
    fn write_file(&self, path: &str, content: &str) -> HostResult<()>;

    fn exists(&self, path: &str) -> HostResult<bool>;

    fn file_size(&self, path: &str) -> HostResult<u64>;

    /// Read an environment variable as seen on the host.
    fn env_var(&self, name: &str) -> Option<String>;

    fn command_exists(&self, program: &str) -> bool {
        self.probe("sh", &["-c", &format!("command -v {}", cmd::shell_quote(program))])
            .is_ok_and(|p| p.success)
    }

    fn create_dir_all(&self, path: &str) -> HostResult<()> {
        self.exec("mkdir", &["-p", path]).map(|_| ())
    }

    fn symlink(&self, target: &str, link: &str) -> HostResult<()> {
        self.exec("ln", &["-sfn", target, link]).map(|_| ())
    }

    fn remove_file(&self, path: &str) -> HostResult<()> {
        self.exec("rm", &["-f", path]).map(|_| ())
    }

    fn chmod(&self, mode: &str, path: &str) -> HostResult<()> {
        self.exec("chmod", &[mode, path]).map(|_| ())
    }
}

/// Operates on the machine running `supahost`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHost;

impl LocalHost {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Host for LocalHost {
    fn describe(&self) -> String {
        "localhost".to_string()
    }

    fn exec(&self, program: &str, args: &[&str]) -> HostResult<String> {
        cmd::run(program, args)
    }

    fn exec_interactive(&self, program: &str, args: &[&str]) -> HostResult<()> {
        cmd::run_interactive(program, args)
    }

    fn probe(&self, program: &str, args: &[&str]) -> HostResult<Probe> {
        cmd::probe(program, args)
    }

    fn exec_to_file(&self, program: &str, args: &[&str], path: &str) -> HostResult<()> {
        cmd::run_to_file(program, args, path)
    }

    fn read_file(&self, path: &str) -> HostResult<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HostError::Io(e)),
        }
    }

    fn write_file(&self, path: &str, content: &str) -> HostResult<()> {
        std::fs::write(path, content)?;
        Ok(())
    }

    fn exists(&self, path: &str) -> HostResult<bool> {
        Ok(Path::new(path).exists())
    }

    fn file_size(&self, path: &str) -> HostResult<u64> {
        Ok(std::fs::metadata(path)?.len())
    }

    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn command_exists(&self, program: &str) -> bool {
        cmd::command_exists(program)
    }

    fn create_dir_all(&self, path: &str) -> HostResult<()> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }
}
