use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HostError, HostResult};

const GIB: u64 = 1024 * 1024 * 1024;

/// Paths, names, and thresholds for a self-hosted Supabase
/// instance.
///
/// Every field has a default, so a TOML file only needs the keys
/// it changes.
///
/// # Example
///
/// ```
/// use supahost::Settings;
///
/// let settings = Settings::new()
///     .install_dir("/srv/supabase")
///     .backup_dir("/mnt/backups/supabase");
///
/// assert_eq!(settings.docker_dir(), "/srv/supabase/docker");
/// assert_eq!(settings.env_path(), "/srv/supabase/docker/.env");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub install_dir: String,
    pub repo_url: String,
    pub nginx_dir: String,
    pub site_name: String,
    pub upstream: String,
    pub client_max_body_size: String,
    pub letsencrypt_live: String,
    pub dhparam_path: String,
    pub dhparam_bits: u32,
    pub renew_cron_path: String,
    pub backup_dir: String,
    pub backup_prefix: String,
    pub report_dir: String,
    pub report_prefix: String,
    pub state_dir: String,
    pub dashboard_username: String,
    pub db_container: String,
    pub db_user: String,
    pub readiness_attempts: u32,
    pub readiness_interval_secs: u64,
    pub min_memory_bytes: u64,
    pub min_disk_bytes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_dir: "/opt/supabase".to_string(),
            repo_url: "https://github.com/supabase/supabase".to_string(),
            nginx_dir: "/etc/nginx".to_string(),
            site_name: "supabase".to_string(),
            upstream: "127.0.0.1:8000".to_string(),
            client_max_body_size: "100M".to_string(),
            letsencrypt_live: "/etc/letsencrypt/live".to_string(),
            dhparam_path: "/etc/nginx/dhparam.pem".to_string(),
            dhparam_bits: 2048,
            renew_cron_path: "/etc/cron.daily/supabase-certbot".to_string(),
            backup_dir: "/var/backups/supabase".to_string(),
            backup_prefix: "supabase".to_string(),
            report_dir: "/tmp".to_string(),
            report_prefix: "supabase-debug".to_string(),
            state_dir: "/var/lib/supahost".to_string(),
            dashboard_username: "supabase".to_string(),
            db_container: "supabase-db".to_string(),
            db_user: "postgres".to_string(),
            readiness_attempts: 30,
            readiness_interval_secs: 5,
            min_memory_bytes: 2 * GIB,
            min_disk_bytes: 10 * GIB,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file. Missing keys keep their
    /// defaults; unknown keys are rejected.
    pub fn load(path: &Path) -> HostResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HostError::FileNotFound(path.display().to_string())
            } else {
                HostError::Io(e)
            }
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> HostResult<Self> {
        Ok(toml::from_str(content)?)
    }

    #[must_use]
    pub fn install_dir(mut self, dir: &str) -> Self {
        self.install_dir = dir.to_string();
        self
    }

    #[must_use]
    pub fn repo_url(mut self, url: &str) -> Self {
        self.repo_url = url.to_string();
        self
    }

    #[must_use]
    pub fn nginx_dir(mut self, dir: &str) -> Self {
        self.nginx_dir = dir.to_string();
        self
    }

    #[must_use]
    pub fn backup_dir(mut self, dir: &str) -> Self {
        self.backup_dir = dir.to_string();
        self
    }

    #[must_use]
    pub fn report_dir(mut self, dir: &str) -> Self {
        self.report_dir = dir.to_string();
        self
    }

    #[must_use]
    pub fn state_dir(mut self, dir: &str) -> Self {
        self.state_dir = dir.to_string();
        self
    }

    #[must_use]
    pub fn dashboard_username(mut self, user: &str) -> Self {
        self.dashboard_username = user.to_string();
        self
    }

    #[must_use]
    pub const fn readiness(mut self, attempts: u32, interval_secs: u64) -> Self {
        self.readiness_attempts = attempts;
        self.readiness_interval_secs = interval_secs;
        self
    }

    #[must_use]
    pub fn docker_dir(&self) -> String {
        format!("{}/docker", self.install_dir)
    }

    #[must_use]
    pub fn compose_file(&self) -> String {
        format!("{}/docker-compose.yml", self.docker_dir())
    }

    #[must_use]
    pub fn env_path(&self) -> String {
        format!("{}/.env", self.docker_dir())
    }

    #[must_use]
    pub fn env_example_path(&self) -> String {
        format!("{}/.env.example", self.docker_dir())
    }

    #[must_use]
    pub fn site_available(&self) -> String {
        format!("{}/sites-available/{}", self.nginx_dir, self.site_name)
    }

    #[must_use]
    pub fn site_enabled(&self) -> String {
        format!("{}/sites-enabled/{}", self.nginx_dir, self.site_name)
    }

    #[must_use]
    pub fn default_site_enabled(&self) -> String {
        format!("{}/sites-enabled/default", self.nginx_dir)
    }

    #[must_use]
    pub fn state_file(&self) -> String {
        format!("{}/install-state.json", self.state_dir)
    }

    #[must_use]
    pub const fn readiness_interval(&self) -> Duration {
        Duration::from_secs(self.readiness_interval_secs)
    }
}
