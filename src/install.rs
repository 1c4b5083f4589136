use std::cell::RefCell;

use crate::error::HostResult;
use crate::host::Host;
use crate::nginx::{self, NginxSite};
use crate::pipeline::{Pipeline, PipelineReport, Progress, StepOutcome};
use crate::preflight::{self, OsRelease};
use crate::settings::Settings;
use crate::stack;

pub const BASE_PACKAGES: &[&str] = &[
    "ca-certificates",
    "curl",
    "git",
    "gnupg",
    "lsb-release",
    "nginx",
    "openssl",
    "snapd",
    "ufw",
];

pub const DOCKER_PACKAGES: &[&str] = &[
    "docker-ce",
    "docker-ce-cli",
    "containerd.io",
    "docker-buildx-plugin",
    "docker-compose-plugin",
];

pub const DOCKER_KEYRING: &str = "/etc/apt/keyrings/docker.asc";
pub const DOCKER_SOURCES: &str = "/etc/apt/sources.list.d/docker.list";

/// Installs system dependencies and prepares the stack.
pub struct Installer<'a> {
    host: &'a dyn Host,
    settings: &'a Settings,
    resume: bool,
    skip_firewall: bool,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub const fn new(host: &'a dyn Host, settings: &'a Settings) -> Self {
        Self {
            host,
            settings,
            resume: false,
            skip_firewall: false,
        }
    }

    /// Skip steps recorded as completed by an earlier run.
    #[must_use]
    pub const fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    #[must_use]
    pub const fn skip_firewall(mut self, skip: bool) -> Self {
        self.skip_firewall = skip;
        self
    }

    /// Run every install step in order, stopping at the first
    /// failure.
    pub fn run(&self) -> PipelineReport {
        let host = self.host;
        let settings = self.settings;
        let os = RefCell::new(OsRelease::default());

        let progress = if self.resume {
            self.load_progress()
        } else {
            Progress::default()
        };

        let skip_firewall = self.skip_firewall;

        Pipeline::new("install")
            .gate("preflight", || {
                let report = preflight::run(host, settings)?;
                *os.borrow_mut() = report.os;
                Ok(StepOutcome::Done)
            })
            .step("apt-update", || apt_update(host))
            .step("base-packages", || apt_install(host, BASE_PACKAGES))
            .step("docker-repo", || docker_repo(host, &os.borrow()))
            .step("docker-engine", || docker_engine(host))
            .step("certbot", || certbot(host))
            .step("firewall", || {
                if skip_firewall {
                    Ok(StepOutcome::Skipped("--skip-firewall".into()))
                } else {
                    firewall(host)
                }
            })
            .step("fetch-stack", || stack::fetch(host, settings))
            .step("nginx-http", || nginx_http(host, settings))
            .resume(progress)
            .checkpoint(|progress| self.save_progress(progress))
            .run()
    }

    fn load_progress(&self) -> Progress {
        let path = self.settings.state_file();
        match self.host.read_file(&path) {
            Ok(Some(content)) => Progress::from_json(&content).unwrap_or_else(|err| {
                tracing::warn!(%path, "ignoring unreadable install progress: {err}");
                Progress::default()
            }),
            Ok(None) => Progress::default(),
            Err(err) => {
                tracing::warn!(%path, "could not read install progress: {err}");
                Progress::default()
            }
        }
    }

    fn save_progress(&self, progress: &Progress) -> HostResult<()> {
        self.host.create_dir_all(&self.settings.state_dir)?;
        self.host
            .write_file(&self.settings.state_file(), &progress.to_json()?)
    }
}

fn apt_get(host: &dyn Host, args: &[&str]) -> HostResult<()> {
    let mut full = vec!["DEBIAN_FRONTEND=noninteractive", "apt-get"];
    full.extend_from_slice(args);
    host.exec_interactive("env", &full)
}

fn apt_update(host: &dyn Host) -> HostResult<StepOutcome> {
    apt_get(host, &["update"])?;
    Ok(StepOutcome::Done)
}

fn apt_install(host: &dyn Host, packages: &[&str]) -> HostResult<StepOutcome> {
    let mut args = vec!["install", "-y"];
    args.extend_from_slice(packages);
    apt_get(host, &args)?;
    Ok(StepOutcome::Done)
}

/// Render the apt source line for Docker's repository.
#[must_use]
pub fn docker_source_line(arch: &str, os: &OsRelease) -> String {
    format!(
        "deb [arch={arch} signed-by={DOCKER_KEYRING}] \
         https://download.docker.com/linux/{} {} stable\n",
        os.docker_distro(),
        os.codename
    )
}

fn docker_repo(host: &dyn Host, os: &OsRelease) -> HostResult<StepOutcome> {
    let key_url = format!("https://download.docker.com/linux/{}/gpg", os.docker_distro());

    host.exec("install", &["-m", "0755", "-d", "/etc/apt/keyrings"])?;
    host.exec("curl", &["-fsSL", &key_url, "-o", DOCKER_KEYRING])?;
    host.chmod("a+r", DOCKER_KEYRING)?;

    let arch = host.exec("dpkg", &["--print-architecture"])?;
    host.write_file(DOCKER_SOURCES, &docker_source_line(arch.trim(), os))?;

    apt_get(host, &["update"])?;
    Ok(StepOutcome::Done)
}

fn docker_engine(host: &dyn Host) -> HostResult<StepOutcome> {
    apt_install(host, DOCKER_PACKAGES)?;
    host.exec("systemctl", &["enable", "--now", "docker"])?;
    Ok(StepOutcome::Done)
}

fn certbot(host: &dyn Host) -> HostResult<StepOutcome> {
    host.exec_interactive("snap", &["install", "core"])?;
    host.exec_interactive("snap", &["install", "--classic", "certbot"])?;
    host.symlink("/snap/bin/certbot", "/usr/bin/certbot")?;
    Ok(StepOutcome::Done)
}

fn firewall(host: &dyn Host) -> HostResult<StepOutcome> {
    host.exec("ufw", &["allow", "80/tcp"])?;
    host.exec("ufw", &["allow", "443/tcp"])?;
    host.exec("ufw", &["limit", "ssh"])?;
    host.exec("ufw", &["--force", "enable"])?;
    Ok(StepOutcome::Done)
}

fn nginx_http(host: &dyn Host, settings: &Settings) -> HostResult<StepOutcome> {
    let site = NginxSite::http(settings, None);
    nginx::install_site(host, settings, &site)?;
    nginx::enable_site(host, settings)?;
    nginx::test_config(host)?;
    nginx::service(host, "restart")?;
    Ok(StepOutcome::Done)
}
