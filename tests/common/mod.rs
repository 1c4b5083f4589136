//! In-memory [`Host`] used by the integration tests.
//!
//! Commands are matched against scripted replies; anything not
//! scripted succeeds with empty output. `docker compose up/down/ps`
//! and the database health probe are simulated so lifecycle flows
//! can be asserted end to end.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use supahost::cmd::Probe;
use supahost::error::{HostError, HostResult};
use supahost::host::Host;

pub const ENV_EXAMPLE: &str = "\
# Secrets
POSTGRES_PASSWORD=your-super-secret-and-long-postgres-password
JWT_SECRET=your-super-secret-jwt-token-with-at-least-32-characters-long

############
# Studio
############
DASHBOARD_USERNAME=supabase
DASHBOARD_PASSWORD=this_password_is_insecure_and_should_be_updated
STUDIO_PORT=3000
";

const RUNNING_PS: &str = concat!(
    r#"{"Name":"supabase-db","Service":"db","State":"running","Status":"Up 1 minute (healthy)","Health":"healthy"}"#,
    "\n",
    r#"{"Name":"supabase-kong","Service":"kong","State":"running","Status":"Up 1 minute","Health":""}"#,
    "\n",
    r#"{"Name":"supabase-studio","Service":"studio","State":"running","Status":"Up 1 minute","Health":""}"#,
);

#[derive(Debug, Clone)]
pub enum Reply {
    Ok(String),
    Fail(String),
    Missing,
}

pub struct FakeHost {
    commands: RefCell<Vec<String>>,
    rules: RefCell<Vec<(String, Reply)>>,
    files: RefCell<BTreeMap<String, String>>,
    dirs: RefCell<BTreeSet<String>>,
    env: RefCell<BTreeMap<String, String>>,
    compose_up: Cell<bool>,
    uid: RefCell<String>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            commands: RefCell::new(Vec::new()),
            rules: RefCell::new(Vec::new()),
            files: RefCell::new(BTreeMap::new()),
            dirs: RefCell::new(BTreeSet::new()),
            env: RefCell::new(BTreeMap::new()),
            compose_up: Cell::new(false),
            uid: RefCell::new("0".into()),
        }
    }

    pub fn non_root() -> Self {
        let host = Self::new();
        *host.uid.borrow_mut() = "1000".into();
        host
    }

    /// Script the reply for any command line containing `pattern`.
    /// Later rules win.
    pub fn on(&self, pattern: &str, reply: Reply) -> &Self {
        self.rules.borrow_mut().push((pattern.to_string(), reply));
        self
    }

    pub fn with_file(&self, path: &str, content: &str) -> &Self {
        self.files
            .borrow_mut()
            .insert(path.to_string(), content.to_string());
        self
    }

    pub fn with_env(&self, name: &str, value: &str) -> &Self {
        self.env
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }

    pub fn files_under(&self, dir: &str) -> Vec<String> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.files
            .borrow()
            .keys()
            .filter(|p| p.starts_with(&prefix))
            .cloned()
            .collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.commands.borrow().iter().any(|c| c.contains(pattern))
    }

    /// Index of the first command containing `pattern`.
    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.commands.borrow().iter().position(|c| c.contains(pattern))
    }

    pub fn compose_running(&self) -> bool {
        self.compose_up.get()
    }

    fn reply(&self, program: &str, args: &[&str]) -> Reply {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.commands.borrow_mut().push(line.clone());

        if let Some((_, reply)) = self
            .rules
            .borrow()
            .iter()
            .rev()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
        {
            return reply.clone();
        }

        if line == "id -u" {
            return Reply::Ok(self.uid.borrow().clone());
        }
        if program == "docker" && args.first() == Some(&"compose") {
            if args.contains(&"up") {
                self.compose_up.set(true);
            } else if args.contains(&"down") {
                self.compose_up.set(false);
            } else if args.contains(&"ps") && args.contains(&"json") {
                let out = if self.compose_up.get() { RUNNING_PS } else { "" };
                return Reply::Ok(out.to_string());
            }
        }
        if line.starts_with("docker inspect") {
            return if self.compose_up.get() {
                Reply::Ok("healthy".into())
            } else {
                Reply::Fail("Error: No such object".into())
            };
        }
        Reply::Ok(String::new())
    }

    fn failed(program: &str, args: &[&str]) -> HostError {
        HostError::CommandFailed {
            command: format!("{program} {}", args.join(" ")),
            code: Some(1),
        }
    }
}

impl Host for FakeHost {
    fn describe(&self) -> String {
        "fake".into()
    }

    fn exec(&self, program: &str, args: &[&str]) -> HostResult<String> {
        match self.reply(program, args) {
            Reply::Ok(out) => Ok(out),
            Reply::Fail(_) => Err(Self::failed(program, args)),
            Reply::Missing => Err(HostError::CommandNotFound(program.into())),
        }
    }

    fn exec_interactive(&self, program: &str, args: &[&str]) -> HostResult<()> {
        self.exec(program, args).map(|_| ())
    }

    fn probe(&self, program: &str, args: &[&str]) -> HostResult<Probe> {
        match self.reply(program, args) {
            Reply::Ok(stdout) => Ok(Probe {
                success: true,
                code: Some(0),
                stdout,
                stderr: String::new(),
            }),
            Reply::Fail(stderr) => Ok(Probe {
                success: false,
                code: Some(1),
                stdout: String::new(),
                stderr,
            }),
            Reply::Missing => Err(HostError::CommandNotFound(program.into())),
        }
    }

    /// Like the real hosts, the file exists before the command runs.
    fn exec_to_file(&self, program: &str, args: &[&str], path: &str) -> HostResult<()> {
        self.files.borrow_mut().insert(path.to_string(), String::new());
        let out = self.exec(program, args)?;
        self.files.borrow_mut().insert(path.to_string(), out);
        Ok(())
    }

    fn read_file(&self, path: &str) -> HostResult<Option<String>> {
        Ok(self.files.borrow().get(path).cloned())
    }

    fn write_file(&self, path: &str, content: &str) -> HostResult<()> {
        self.commands.borrow_mut().push(format!("write {path}"));
        self.files
            .borrow_mut()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &str) -> HostResult<bool> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        Ok(self.dirs.borrow().contains(path)
            || self
                .files
                .borrow()
                .keys()
                .any(|p| p == path || p.starts_with(&prefix)))
    }

    fn file_size(&self, path: &str) -> HostResult<u64> {
        self.files
            .borrow()
            .get(path)
            .map(|c| c.len() as u64)
            .ok_or_else(|| HostError::FileNotFound(path.into()))
    }

    fn env_var(&self, name: &str) -> Option<String> {
        self.env.borrow().get(name).cloned()
    }

    fn create_dir_all(&self, path: &str) -> HostResult<()> {
        self.commands.borrow_mut().push(format!("mkdir -p {path}"));
        self.dirs.borrow_mut().insert(path.to_string());
        Ok(())
    }

    fn remove_file(&self, path: &str) -> HostResult<()> {
        self.commands.borrow_mut().push(format!("rm -f {path}"));
        self.files.borrow_mut().remove(path);
        Ok(())
    }
}
