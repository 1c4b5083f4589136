use crate::cmd::{self, Probe};
use crate::error::{HostError, HostResult};
use crate::host::Host;

/// SSH session wrapper that runs every host operation on a
/// remote machine through the `ssh` client.
#[derive(Debug, Clone)]
pub struct SshSession {
    host: String,
    user: String,
    key: Option<String>,
    program: String,
}

/// Exit status the `ssh` client uses for its own failures
/// (connection refused, authentication, host key).
const SSH_ERROR_STATUS: i32 = 255;

impl SshSession {
    #[must_use]
    pub fn new(host: &str, user: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            key: None,
            program: "ssh".to_string(),
        }
    }

    /// Parse `user@host` or a bare `host` (user defaults to
    /// `root`).
    #[must_use]
    pub fn from_target(target: &str) -> Self {
        match target.split_once('@') {
            Some((user, host)) if !user.is_empty() => Self::new(host, user),
            Some((_, host)) => Self::new(host, "root"),
            None => Self::new(target, "root"),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key_path: &str) -> Self {
        self.key = Some(key_path.to_string());
        self
    }

    /// Use another `ssh`-compatible client binary.
    #[must_use]
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Verify the remote host accepts a non-interactive login.
    pub fn check_connection(&self) -> HostResult<()> {
        let args = self.build_ssh_args("true");
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run(&self.program, &refs)
            .map(|_| ())
            .map_err(|e| HostError::SshFailed(format!("{}: {e}", self.destination())))
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Build the full `ssh` argument vector for a remote command
    /// line.
    #[must_use]
    pub fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.ssh_base_args();
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    fn ssh_base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
        ];
        if let Some(key) = &self.key {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        args
    }

    fn remote(&self, line: &str) -> HostResult<String> {
        self.remote_raw(line).map(|out| out.trim().to_string())
    }

    fn remote_raw(&self, line: &str) -> HostResult<String> {
        let args = self.build_ssh_args(line);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_raw(&self.program, &refs)
    }
}

impl Host for SshSession {
    fn describe(&self) -> String {
        self.destination()
    }

    fn exec(&self, program: &str, args: &[&str]) -> HostResult<String> {
        self.remote(&cmd::shell_line(program, args))
    }

    fn exec_interactive(&self, program: &str, args: &[&str]) -> HostResult<()> {
        let mut ssh_args = vec!["-t".to_string()];
        ssh_args.extend(self.build_ssh_args(&cmd::shell_line(program, args)));
        let refs: Vec<&str> = ssh_args.iter().map(String::as_str).collect();
        cmd::run_interactive(&self.program, &refs)
    }

    fn probe(&self, program: &str, args: &[&str]) -> HostResult<Probe> {
        let ssh_args = self.build_ssh_args(&cmd::shell_line(program, args));
        let refs: Vec<&str> = ssh_args.iter().map(String::as_str).collect();
        let probe = cmd::probe(&self.program, &refs)?;
        if probe.code == Some(SSH_ERROR_STATUS) {
            return Err(HostError::SshFailed(format!(
                "{}: {}",
                self.destination(),
                probe.stderr
            )));
        }
        Ok(probe)
    }

    fn exec_to_file(&self, program: &str, args: &[&str], path: &str) -> HostResult<()> {
        let path = cmd::shell_quote(path);
        let line = format!(
            "{} > {path} || {{ status=$?; rm -f {path}; exit $status; }}",
            cmd::shell_line(program, args),
        );
        self.remote(&line).map(|_| ())
    }

    fn read_file(&self, path: &str) -> HostResult<Option<String>> {
        if !self.exists(path)? {
            return Ok(None);
        }
        self.remote_raw(&cmd::shell_line("cat", &[path])).map(Some)
    }

    /// Write content to a remote file via stdin pipe.
    fn write_file(&self, path: &str, content: &str) -> HostResult<()> {
        let command = format!("cat > {}", cmd::shell_quote(path));
        let args = self.build_ssh_args(&command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_with_stdin(&self.program, &refs, content.as_bytes())?;
        Ok(())
    }

    fn exists(&self, path: &str) -> HostResult<bool> {
        Ok(self.probe("test", &["-e", path])?.success)
    }

    fn file_size(&self, path: &str) -> HostResult<u64> {
        let out = self.exec("stat", &["-c", "%s", path])?;
        out.trim()
            .parse()
            .map_err(|_| HostError::Other(format!("unexpected stat output for {path}: {out}")))
    }

    fn env_var(&self, name: &str) -> Option<String> {
        self.probe("printenv", &[name])
            .ok()
            .filter(|p| p.success)
            .map(|p| p.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_with_user() {
        let ssh = SshSession::from_target("ubuntu@10.0.0.5");
        assert_eq!(ssh.user(), "ubuntu");
        assert_eq!(ssh.host(), "10.0.0.5");
    }

    #[test]
    fn target_without_user_defaults_to_root() {
        let ssh = SshSession::from_target("db.example.com");
        assert_eq!(ssh.user(), "root");
        assert_eq!(ssh.host(), "db.example.com");

        let ssh = SshSession::from_target("@db.example.com");
        assert_eq!(ssh.user(), "root");
    }

    #[test]
    fn ssh_args_include_key_and_destination() {
        let ssh = SshSession::new("1.2.3.4", "root").with_key("/home/me/.ssh/id_ed25519");
        let args = ssh.build_ssh_args("docker ps");

        assert!(args.contains(&"-i".to_string()));
        assert!(args.contains(&"/home/me/.ssh/id_ed25519".to_string()));
        assert_eq!(args[args.len() - 2], "root@1.2.3.4");
        assert_eq!(args[args.len() - 1], "docker ps");
    }

    #[test]
    fn describe_is_destination() {
        let ssh = SshSession::new("vps", "admin");
        assert_eq!(ssh.describe(), "admin@vps");
    }
}
