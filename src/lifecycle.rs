use std::thread;

use chrono::Local;

use crate::compose::{ComposeProject, ServiceState};
use crate::credentials::{self, DashboardCredentials};
use crate::envfile::EnvFile;
use crate::error::{HostError, HostResult};
use crate::host::Host;
use crate::nginx::{self, Domain, NginxSite};
use crate::pipeline::{Pipeline, StepOutcome, StepRecord};
use crate::preflight;
use crate::settings::Settings;
use crate::stack;

/// Renewal hook installed as a daily cron script.
pub const RENEW_SCRIPT: &str = "#!/bin/sh\n\
# Renew Let's Encrypt certificates for the Supabase reverse proxy.\n\
certbot renew --quiet --pre-hook \"systemctl stop nginx\" --post-hook \"systemctl start nginx\"\n";

/// Certificate request for the `ssl` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SslRequest {
    pub domain: Domain,
    pub email: String,
}

/// Operates a fetched Supabase stack: compose lifecycle, proxy,
/// certificates, and backups.
pub struct Manager<'a> {
    host: &'a dyn Host,
    settings: &'a Settings,
    compose: ComposeProject,
}

impl<'a> Manager<'a> {
    #[must_use]
    pub fn new(host: &'a dyn Host, settings: &'a Settings) -> Self {
        Self {
            host,
            settings,
            compose: ComposeProject::new(settings),
        }
    }

    pub fn require_root(&self) -> HostResult<()> {
        preflight::require_root(self.host)
    }

    /// Bring the stack up and put the proxy in front of it.
    pub fn start(&self, rotate_credentials: bool) -> HostResult<DashboardCredentials> {
        let creds = self.ensure_credentials(rotate_credentials)?;

        tracing::info!(host = %self.host.describe(), "starting Supabase services");
        self.compose.up(self.host)?;
        self.wait_ready()?;

        nginx::enable_site(self.host, self.settings)?;
        nginx::test_config(self.host)?;
        nginx::service(self.host, "restart")?;

        tracing::info!("Supabase started");
        Ok(creds)
    }

    pub fn stop(&self) -> HostResult<()> {
        tracing::info!(host = %self.host.describe(), "stopping Supabase services");
        self.compose.down(self.host)
    }

    pub fn restart(&self, rotate_credentials: bool) -> HostResult<DashboardCredentials> {
        self.stop()?;
        self.start(rotate_credentials)
    }

    /// Show `docker compose ps` and return the parsed states.
    pub fn status(&self) -> HostResult<Vec<ServiceState>> {
        self.host
            .exec_interactive("docker", &self.compose.args(&["ps"]))?;
        self.services()
    }

    pub fn services(&self) -> HostResult<Vec<ServiceState>> {
        self.compose.ps(self.host)
    }

    /// Services whose container is currently running.
    pub fn running_services(&self) -> HostResult<Vec<ServiceState>> {
        Ok(self
            .services()?
            .into_iter()
            .filter(ServiceState::is_running)
            .collect())
    }

    /// Follow aggregated logs until interrupted.
    pub fn logs(&self, service: Option<&str>, tail: Option<u32>) -> HostResult<()> {
        let tail = tail.map(|n| n.to_string());
        let mut sub = vec!["logs", "-f"];
        if let Some(tail) = &tail {
            sub.push("--tail");
            sub.push(tail.as_str());
        }
        if let Some(service) = service {
            sub.push(service);
        }
        self.host.exec_interactive("docker", &self.compose.args(&sub))
    }

    /// Obtain a certificate and switch the proxy to HTTPS.
    ///
    /// Steps run in order; completed steps are not rolled back when
    /// a later one fails.
    pub fn ssl(&self, request: &SslRequest) -> HostResult<Vec<StepRecord>> {
        let host = self.host;
        let settings = self.settings;

        let report = Pipeline::new("ssl")
            .step("stop-nginx", || {
                nginx::service(host, "stop")?;
                Ok(StepOutcome::Done)
            })
            .step("certificate", || {
                request_certificate(host, request)?;
                Ok(StepOutcome::Done)
            })
            .step("dhparam", || dhparam(host, settings))
            .step("renewal-cron", || {
                host.write_file(&settings.renew_cron_path, RENEW_SCRIPT)?;
                host.chmod("755", &settings.renew_cron_path)?;
                Ok(StepOutcome::Done)
            })
            .step("nginx-https", || {
                let site = NginxSite::https(settings, request.domain.clone());
                nginx::install_site(host, settings, &site)?;
                nginx::enable_site(host, settings)?;
                nginx::test_config(host)?;
                Ok(StepOutcome::Done)
            })
            .step("start-nginx", || {
                nginx::service(host, "start")?;
                Ok(StepOutcome::Done)
            })
            .run();

        println!("{}", report.summary());
        let records = report.into_result()?;
        tracing::info!(domain = %request.domain, "HTTPS enabled");
        Ok(records)
    }

    /// Pull source and images, then restart.
    pub fn update(&self) -> HostResult<DashboardCredentials> {
        stack::pull_latest(self.host, self.settings)?;
        tracing::info!("pulling updated images");
        self.compose.pull(self.host)?;
        self.restart(false)
    }

    /// Dump every database to a timestamped SQL file and return its
    /// path.
    pub fn backup(&self) -> HostResult<String> {
        self.host.create_dir_all(&self.settings.backup_dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = format!(
            "{}/{}_backup_{stamp}.sql",
            self.settings.backup_dir, self.settings.backup_prefix
        );

        tracing::info!(%path, "dumping database");
        let dumped = self.host.exec_to_file(
            "docker",
            &[
                "exec",
                &self.settings.db_container,
                "pg_dumpall",
                "-U",
                &self.settings.db_user,
            ],
            &path,
        );
        if let Err(err) = dumped {
            if let Err(e) = self.host.remove_file(&path) {
                tracing::warn!(%path, error = %e, "could not remove partial dump");
            }
            return Err(err);
        }

        if self.host.file_size(&path)? == 0 {
            self.host.remove_file(&path)?;
            return Err(HostError::Other(format!(
                "database dump from {} was empty",
                self.settings.db_container
            )));
        }

        tracing::info!(%path, "backup written");
        Ok(path)
    }

    pub fn restore(&self) -> HostResult<()> {
        Err(HostError::Unimplemented("restore".into()))
    }

    fn ensure_credentials(&self, rotate: bool) -> HostResult<DashboardCredentials> {
        let env_path = self.settings.env_path();
        let content = self.host.read_file(&env_path)?.ok_or_else(|| {
            HostError::FileNotFound(format!("{env_path} (run `supahost install` first)"))
        })?;

        let mut env = EnvFile::parse(&content);
        let creds = credentials::ensure_dashboard_credentials(
            &mut env,
            &self.settings.dashboard_username,
            rotate,
        );

        let rendered = env.render();
        if rendered != content {
            self.host.write_file(&env_path, &rendered)?;
        }
        Ok(creds)
    }

    /// Poll the database container's health instead of sleeping a
    /// fixed duration.
    fn wait_ready(&self) -> HostResult<()> {
        let attempts = self.settings.readiness_attempts;
        let container = &self.settings.db_container;

        for attempt in 1..=attempts {
            let probe = self.host.probe(
                "docker",
                &["inspect", "--format", "{{.State.Health.Status}}", container],
            );

            match probe {
                Ok(p) if p.success && p.stdout.trim() == "healthy" => {
                    tracing::info!(%container, "healthy");
                    return Ok(());
                }
                Ok(p) if p.success => {
                    tracing::info!(%container, "health check ({attempt}/{attempts}): {}", p.stdout.trim());
                }
                _ => {
                    tracing::info!(%container, "health check ({attempt}/{attempts}): waiting for container");
                }
            }

            if attempt < attempts {
                thread::sleep(self.settings.readiness_interval());
            }
        }

        Err(HostError::HealthcheckTimeout(container.clone(), attempts))
    }
}

fn request_certificate(host: &dyn Host, request: &SslRequest) -> HostResult<()> {
    host.exec_interactive(
        "certbot",
        &[
            "certonly",
            "--standalone",
            "--non-interactive",
            "--agree-tos",
            "--email",
            &request.email,
            "-d",
            request.domain.as_str(),
        ],
    )
}

fn dhparam(host: &dyn Host, settings: &Settings) -> HostResult<StepOutcome> {
    if host.exists(&settings.dhparam_path)? {
        return Ok(StepOutcome::Skipped(format!("{} exists", settings.dhparam_path)));
    }
    let bits = settings.dhparam_bits.to_string();
    host.exec_interactive("openssl", &["dhparam", "-out", &settings.dhparam_path, &bits])?;
    Ok(StepOutcome::Done)
}
