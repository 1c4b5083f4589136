//! Read-only health report for a Supabase host.
//!
//! [`run`] executes a fixed battery of probes, prints each result,
//! appends it to a timestamped report file, derives
//! recommendations from what it saw, and never fails: a probe that
//! cannot run is itself a finding.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::compose;
use crate::host::Host;
use crate::preflight::{self, format_gib};
use crate::settings::Settings;

/// Ports the stack and proxy need, with what normally binds them.
pub const CHECKED_PORTS: &[(u16, &str)] = &[
    (80, "HTTP"),
    (443, "HTTPS"),
    (3000, "Studio"),
    (5432, "PostgreSQL"),
    (8000, "API gateway"),
];

const HTTPS_TARGETS: &[&str] = &[
    "https://github.com",
    "https://download.docker.com",
    "https://registry-1.docker.io/v2/",
];

struct CloudEndpoint {
    provider: &'static str,
    url: &'static str,
    header: Option<&'static str>,
}

const CLOUD_ENDPOINTS: &[CloudEndpoint] = &[
    CloudEndpoint {
        provider: "AWS",
        url: "http://169.254.169.254/latest/meta-data/",
        header: None,
    },
    CloudEndpoint {
        provider: "Google Cloud",
        url: "http://metadata.google.internal/computeMetadata/v1/",
        header: Some("Metadata-Flavor: Google"),
    },
    CloudEndpoint {
        provider: "Azure",
        url: "http://169.254.169.254/metadata/instance?api-version=2021-02-01",
        header: Some("Metadata: true"),
    },
    CloudEndpoint {
        provider: "DigitalOcean",
        url: "http://169.254.169.254/metadata/v1/",
        header: None,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub section: &'static str,
    pub check: String,
    pub outcome: Outcome,
    pub detail: String,
}

/// A listening TCP port and the process holding it, when `ss`
/// could tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundPort {
    pub port: u16,
    pub process: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirewallStatus {
    pub active: bool,
    pub allows_http: bool,
    pub allows_https: bool,
}

/// Conditions gathered by the probes that recommendations are
/// derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facts {
    pub memory_bytes: Option<u64>,
    pub disk_free_bytes: Option<u64>,
    pub docker_installed: bool,
    pub port_conflicts: Vec<BoundPort>,
    pub firewall: Option<FirewallStatus>,
    pub cloud_providers: Vec<String>,
}

/// Result of a diagnostics run.
#[derive(Debug, Clone)]
pub struct Summary {
    pub report_path: Option<PathBuf>,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,
}

impl Summary {
    #[must_use]
    pub fn count(&self, outcome: Outcome) -> usize {
        self.findings.iter().filter(|f| f.outcome == outcome).count()
    }
}

/// Run every probe against `host` and write the report under
/// `settings.report_dir`.
pub fn run(host: &dyn Host, settings: &Settings) -> Summary {
    Diagnostics::new(host, settings).run()
}

struct Diagnostics<'a> {
    host: &'a dyn Host,
    settings: &'a Settings,
    report: ReportFile,
    section: &'static str,
    findings: Vec<Finding>,
    facts: Facts,
}

impl<'a> Diagnostics<'a> {
    fn new(host: &'a dyn Host, settings: &'a Settings) -> Self {
        Self {
            host,
            settings,
            report: ReportFile::create(Path::new(&settings.report_dir), &settings.report_prefix),
            section: "",
            findings: Vec::new(),
            facts: Facts::default(),
        }
    }

    fn run(mut self) -> Summary {
        self.emit(&format!(
            "Supabase host diagnostics for {} at {}",
            self.host.describe(),
            Local::now().format("%Y-%m-%d %H:%M:%S %Z")
        ));

        self.system();
        self.proxy_environment();
        self.connectivity();
        self.package_manager();
        self.docker();
        self.ports();
        self.firewall();
        self.cloud_metadata();
        self.nginx_ssl();

        let recommendations = recommendations(&self.facts, self.settings);
        self.begin("Recommendations");
        for (i, line) in recommendations.iter().enumerate() {
            self.emit(&format!("{}. {line}", i + 1));
        }

        let (pass, warn, fail) = (
            self.count(Outcome::Pass),
            self.count(Outcome::Warn),
            self.count(Outcome::Fail),
        );
        self.begin("Summary");
        self.emit(&format!("{pass} passed, {warn} warnings, {fail} failed"));

        if let Some(path) = &self.report.path {
            println!();
            println!("Report saved to {}", path.display());
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    println!("==================== FULL REPORT ====================");
                    print!("{content}");
                }
                Err(err) => tracing::warn!(path = %path.display(), "could not read report back: {err}"),
            }
        }

        Summary {
            report_path: self.report.path.clone(),
            findings: self.findings,
            recommendations,
        }
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.findings.iter().filter(|f| f.outcome == outcome).count()
    }

    fn emit(&mut self, line: &str) {
        println!("{line}");
        self.report.line(line);
    }

    fn begin(&mut self, section: &'static str) {
        self.section = section;
        self.emit("");
        self.emit(&format!("== {section} =="));
    }

    fn record(&mut self, check: &str, outcome: Outcome, detail: impl Into<String>) {
        let detail = detail.into();
        self.emit(&format!("[{outcome}] {check}: {detail}"));
        self.findings.push(Finding {
            section: self.section,
            check: check.to_string(),
            outcome,
            detail,
        });
    }

    fn system(&mut self) {
        self.begin("System");

        match preflight::read_os_release(self.host) {
            Ok(os) if os.is_ubuntu() => self.record("os", Outcome::Pass, os.pretty_name),
            Ok(os) if os.is_debian_family() => {
                self.record("os", Outcome::Warn, format!("{} (not Ubuntu)", os.pretty_name));
            }
            Ok(os) => self.record("os", Outcome::Fail, format!("{} (unsupported)", os.pretty_name)),
            Err(err) => self.record("os", Outcome::Fail, err.to_string()),
        }

        match self.host.probe("uname", &["-r"]) {
            Ok(p) if p.success => self.record("kernel", Outcome::Pass, p.stdout),
            Ok(p) => self.record("kernel", Outcome::Warn, p.stderr),
            Err(err) => self.record("kernel", Outcome::Warn, err.to_string()),
        }

        match preflight::read_memory(self.host) {
            Ok(bytes) => {
                self.facts.memory_bytes = Some(bytes);
                let outcome = if bytes < self.settings.min_memory_bytes {
                    Outcome::Warn
                } else {
                    Outcome::Pass
                };
                self.record("memory", outcome, format!("{} total", format_gib(bytes)));
            }
            Err(err) => self.record("memory", Outcome::Fail, err.to_string()),
        }

        match preflight::read_disk_free(self.host, "/") {
            Ok(bytes) => {
                self.facts.disk_free_bytes = Some(bytes);
                let outcome = if bytes < self.settings.min_disk_bytes {
                    Outcome::Warn
                } else {
                    Outcome::Pass
                };
                self.record("disk", outcome, format!("{} free on /", format_gib(bytes)));
            }
            Err(err) => self.record("disk", Outcome::Fail, err.to_string()),
        }

        match self.host.probe("uptime", &[]) {
            Ok(p) if p.success => self.record("uptime", Outcome::Pass, p.stdout),
            _ => self.record("uptime", Outcome::Warn, "unavailable"),
        }
    }

    fn proxy_environment(&mut self) {
        self.begin("Proxy environment");

        for var in ["http_proxy", "https_proxy"] {
            let value = self
                .host
                .env_var(var)
                .or_else(|| self.host.env_var(&var.to_ascii_uppercase()));
            match value {
                Some(v) if !v.is_empty() => self.record(
                    var,
                    Outcome::Warn,
                    format!("{v} (Docker needs the same proxy configured to pull images)"),
                ),
                _ => self.record(var, Outcome::Pass, "not set"),
            }
        }
    }

    fn connectivity(&mut self) {
        self.begin("Connectivity");

        match self.host.probe("ping", &["-c", "1", "-W", "3", "8.8.8.8"]) {
            Ok(p) if p.success => self.record("ping 8.8.8.8", Outcome::Pass, "reachable"),
            Ok(_) => self.record("ping 8.8.8.8", Outcome::Fail, "no reply (ICMP may be filtered)"),
            Err(err) => self.record("ping 8.8.8.8", Outcome::Fail, err.to_string()),
        }

        match self.host.probe("getent", &["hosts", "github.com"]) {
            Ok(p) if p.success && !p.stdout.is_empty() => {
                let ip = p.stdout.split_whitespace().next().unwrap_or_default().to_string();
                self.record("dns github.com", Outcome::Pass, ip);
            }
            Ok(_) => self.record("dns github.com", Outcome::Fail, "does not resolve"),
            Err(err) => self.record("dns github.com", Outcome::Fail, err.to_string()),
        }

        for url in HTTPS_TARGETS {
            match http_status(self.host, url, 10, &[]) {
                Some(code) => self.record(url, Outcome::Pass, format!("HTTP {code}")),
                None => self.record(url, Outcome::Fail, "unreachable"),
            }
        }
    }

    fn package_manager(&mut self) {
        self.begin("Package manager");

        match self.host.probe("apt-get", &["check"]) {
            Ok(p) if p.success => self.record("apt-get check", Outcome::Pass, "dependency tree consistent"),
            Ok(p) => self.record("apt-get check", Outcome::Fail, last_line(&p.stderr)),
            Err(err) => self.record("apt-get check", Outcome::Fail, err.to_string()),
        }

        match self.host.probe("dpkg", &["--audit"]) {
            Ok(p) if p.success && p.stdout.is_empty() => {
                self.record("dpkg --audit", Outcome::Pass, "no broken packages");
            }
            Ok(_) => self.record(
                "dpkg --audit",
                Outcome::Warn,
                "packages half-installed; run: dpkg --configure -a",
            ),
            Err(err) => self.record("dpkg --audit", Outcome::Warn, err.to_string()),
        }
    }

    fn docker(&mut self) {
        self.begin("Docker");

        if !self.host.command_exists("docker") {
            self.record("docker", Outcome::Fail, "not installed");
            return;
        }
        self.facts.docker_installed = true;

        match self.host.probe("systemctl", &["is-active", "docker"]) {
            Ok(p) if p.stdout == "active" => self.record("service", Outcome::Pass, "active"),
            Ok(p) => self.record("service", Outcome::Fail, p.stdout),
            Err(err) => self.record("service", Outcome::Fail, err.to_string()),
        }

        match self.host.probe("docker", &["info", "--format", "{{.ServerVersion}}"]) {
            Ok(p) if p.success => self.record("engine", Outcome::Pass, format!("version {}", p.stdout)),
            Ok(p) => self.record("engine", Outcome::Fail, last_line(&p.stderr)),
            Err(err) => self.record("engine", Outcome::Fail, err.to_string()),
        }

        match self.host.probe("docker", &["compose", "version", "--short"]) {
            Ok(p) if p.success => self.record("compose plugin", Outcome::Pass, p.stdout),
            _ => self.record("compose plugin", Outcome::Fail, "docker compose unavailable"),
        }

        match self.host.probe(
            "docker",
            &["ps", "-a", "--filter", "name=supabase", "--format", "{{.Names}}\t{{.Status}}"],
        ) {
            Ok(p) if p.success => {
                let rows: Vec<&str> = p.stdout.lines().filter(|l| !l.trim().is_empty()).collect();
                let up = rows
                    .iter()
                    .filter(|row| row.split('\t').nth(1).is_some_and(|s| s.starts_with("Up")))
                    .count();
                if rows.is_empty() {
                    self.record("containers", Outcome::Warn, "no Supabase containers");
                } else if up == rows.len() {
                    self.record("containers", Outcome::Pass, format!("{up} running"));
                } else {
                    self.record(
                        "containers",
                        Outcome::Warn,
                        format!("{up} of {} running", rows.len()),
                    );
                }
            }
            Ok(p) => self.record("containers", Outcome::Fail, last_line(&p.stderr)),
            Err(err) => self.record("containers", Outcome::Fail, err.to_string()),
        }

        self.images();
    }

    fn images(&mut self) {
        let compose_file = self.settings.compose_file();
        let yaml = match self.host.read_file(&compose_file) {
            Ok(Some(yaml)) => yaml,
            Ok(None) => {
                self.record("images", Outcome::Warn, format!("{compose_file} not found"));
                return;
            }
            Err(err) => {
                self.record("images", Outcome::Warn, err.to_string());
                return;
            }
        };

        let services = match compose::declared_services(&yaml) {
            Ok(services) => services,
            Err(err) => {
                self.record("images", Outcome::Warn, format!("cannot parse {compose_file}: {err}"));
                return;
            }
        };

        let images: Vec<String> = services.into_iter().filter_map(|s| s.image).collect();
        let missing: Vec<&String> = images
            .iter()
            .filter(|image| {
                !self
                    .host
                    .probe("docker", &["image", "inspect", "--format", "{{.Id}}", image.as_str()])
                    .is_ok_and(|p| p.success)
            })
            .collect();

        if missing.is_empty() {
            self.record("images", Outcome::Pass, format!("all {} present", images.len()));
        } else {
            let names: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
            self.record(
                "images",
                Outcome::Warn,
                format!(
                    "{} of {} not pulled yet: {}",
                    missing.len(),
                    images.len(),
                    names.join(", ")
                ),
            );
        }
    }

    fn ports(&mut self) {
        self.begin("Ports");

        let bound = match self.host.probe("ss", &["-H", "-ltnp"]) {
            Ok(p) if p.success => parse_listening(&p.stdout),
            Ok(p) => {
                self.record("ss", Outcome::Fail, last_line(&p.stderr));
                return;
            }
            Err(err) => {
                self.record("ss", Outcome::Fail, err.to_string());
                return;
            }
        };

        for (port, role) in CHECKED_PORTS {
            let check = format!("port {port} ({role})");
            match bound.iter().find(|b| b.port == *port) {
                None => self.record(&check, Outcome::Pass, "free"),
                Some(b) if is_expected_owner(*port, b.process.as_deref()) => {
                    let owner = b.process.clone().unwrap_or_default();
                    self.record(&check, Outcome::Pass, format!("in use by {owner} (expected)"));
                }
                Some(BoundPort { process: None, .. }) => self.record(
                    &check,
                    Outcome::Warn,
                    "in use (owner unknown; run as root to see it)",
                ),
                Some(b) => {
                    let owner = b.process.clone().unwrap_or_default();
                    self.record(&check, Outcome::Warn, format!("in use by {owner}"));
                    self.facts.port_conflicts.push(b.clone());
                }
            }
        }
    }

    fn firewall(&mut self) {
        self.begin("Firewall");

        match self.host.probe("ufw", &["status"]) {
            Ok(p) if p.success => {
                let status = parse_ufw_status(&p.stdout);
                self.facts.firewall = Some(status);
                if !status.active {
                    self.record("ufw", Outcome::Warn, "inactive");
                } else if status.allows_http && status.allows_https {
                    self.record("ufw", Outcome::Pass, "active, 80 and 443 allowed");
                } else {
                    self.record("ufw", Outcome::Warn, "active, but 80/443 are not both allowed");
                }
            }
            Ok(p) => self.record("ufw", Outcome::Warn, last_line(&p.stderr)),
            Err(err) => self.record("ufw", Outcome::Warn, err.to_string()),
        }
    }

    fn cloud_metadata(&mut self) {
        self.begin("Cloud provider");

        for endpoint in CLOUD_ENDPOINTS {
            // Link-local endpoints are never proxied, and any answer
            // counts: IMDSv2 replies 401 to a tokenless GET.
            let mut extra = vec!["--noproxy", "*"];
            if let Some(header) = endpoint.header {
                extra.extend(["-H", header]);
            }
            if let Some(code) = http_status(self.host, endpoint.url, 3, &extra) {
                tracing::debug!(provider = endpoint.provider, %code, "metadata service answered");
                self.facts.cloud_providers.push(endpoint.provider.to_string());
                self.record(
                    endpoint.provider,
                    Outcome::Warn,
                    "metadata service answered; make sure the provider firewall allows 80/443",
                );
            } else {
                self.record(endpoint.provider, Outcome::Pass, "not detected");
            }
        }
    }

    fn nginx_ssl(&mut self) {
        self.begin("Nginx and SSL");

        if self.host.command_exists("nginx") {
            match self.host.probe("nginx", &["-t"]) {
                Ok(p) if p.success => self.record("nginx -t", Outcome::Pass, "syntax ok"),
                Ok(p) => self.record("nginx -t", Outcome::Fail, last_line(&p.stderr)),
                Err(err) => self.record("nginx -t", Outcome::Fail, err.to_string()),
            }
        } else {
            self.record("nginx", Outcome::Fail, "not installed");
        }

        for (check, path) in [
            ("site config", self.settings.site_available()),
            ("site enabled", self.settings.site_enabled()),
        ] {
            match self.host.exists(&path) {
                Ok(true) => self.record(check, Outcome::Pass, path),
                Ok(false) => self.record(check, Outcome::Warn, format!("{path} missing")),
                Err(err) => self.record(check, Outcome::Warn, err.to_string()),
            }
        }

        match self.host.probe("certbot", &["certificates"]) {
            Ok(p) if p.success => {
                let count = count_certificates(&p.stdout);
                if count == 0 {
                    self.record("certificates", Outcome::Warn, "none issued (run: supahost ssl)");
                } else {
                    self.record("certificates", Outcome::Pass, format!("{count} issued"));
                }
            }
            Ok(p) => self.record("certificates", Outcome::Warn, last_line(&p.stderr)),
            Err(_) => self.record("certificates", Outcome::Warn, "certbot not installed"),
        }

        match self.host.exists(&self.settings.letsencrypt_live) {
            Ok(true) => self.record("letsencrypt", Outcome::Pass, self.settings.letsencrypt_live.clone()),
            _ => self.record(
                "letsencrypt",
                Outcome::Warn,
                format!("{} missing", self.settings.letsencrypt_live),
            ),
        }
    }
}

/// HTTP status code from `curl`, or `None` when nothing answered.
fn http_status(host: &dyn Host, url: &str, timeout_secs: u32, extra: &[&str]) -> Option<String> {
    let timeout = timeout_secs.to_string();
    let mut args = vec!["-s", "-o", "/dev/null", "-w", "%{http_code}", "--max-time", timeout.as_str()];
    args.extend_from_slice(extra);
    args.push(url);

    host.probe("curl", &args)
        .ok()
        .filter(|p| p.success)
        .map(|p| p.stdout)
        .filter(|code| !code.is_empty() && code != "000")
}

fn last_line(text: &str) -> String {
    text.lines().last().unwrap_or("no output").to_string()
}

fn is_expected_owner(port: u16, process: Option<&str>) -> bool {
    match (port, process) {
        (80 | 443, Some("nginx")) => true,
        (3000 | 5432 | 8000, Some("docker-proxy")) => true,
        _ => false,
    }
}

/// Listening TCP ports from `ss -H -ltnp`.
#[must_use]
pub fn parse_listening(output: &str) -> Vec<BoundPort> {
    let mut ports: Vec<BoundPort> = Vec::new();
    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(local) = fields.get(3) else {
            continue;
        };
        let Some(port) = local.rsplit(':').next().and_then(|p| p.parse().ok()) else {
            continue;
        };
        let process = line.split_once("((\"").and_then(|(_, rest)| {
            rest.split_once('"').map(|(name, _)| name.to_string())
        });
        if !ports.iter().any(|b| b.port == port) {
            ports.push(BoundPort { port, process });
        }
    }
    ports
}

/// Parse `ufw status` output.
#[must_use]
pub fn parse_ufw_status(output: &str) -> FirewallStatus {
    let mut status = FirewallStatus::default();
    for line in output.lines() {
        let line = line.trim();
        if line == "Status: active" {
            status.active = true;
            continue;
        }
        let Some((rule, _)) = line.split_once("ALLOW") else {
            continue;
        };
        let rule = rule.trim();
        let port = rule.split_whitespace().next().unwrap_or_default();
        let matches_port = |p: &str| port == p || port.starts_with(&format!("{p}/"));

        if matches_port("80") || rule.starts_with("Nginx Full") || rule.starts_with("Nginx HTTP ") || rule == "Nginx HTTP" {
            status.allows_http = true;
        }
        if matches_port("443") || rule.starts_with("Nginx Full") || rule.starts_with("Nginx HTTPS") {
            status.allows_https = true;
        }
    }
    status
}

/// Number of certificates listed by `certbot certificates`.
#[must_use]
pub fn count_certificates(output: &str) -> usize {
    output
        .lines()
        .filter(|l| l.trim_start().starts_with("Certificate Name:"))
        .count()
}

/// Advice derived from recorded facts.
#[must_use]
pub fn recommendations(facts: &Facts, settings: &Settings) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(mem) = facts.memory_bytes.filter(|m| *m < settings.min_memory_bytes) {
        out.push(format!(
            "Add memory or swap: Supabase needs at least {} (found {}).",
            format_gib(settings.min_memory_bytes),
            format_gib(mem)
        ));
    }
    if let Some(disk) = facts.disk_free_bytes.filter(|d| *d < settings.min_disk_bytes) {
        out.push(format!(
            "Free disk space: at least {} is recommended (found {}).",
            format_gib(settings.min_disk_bytes),
            format_gib(disk)
        ));
    }
    if !facts.docker_installed {
        out.push("Install Docker and the Compose plugin: run `supahost install`.".to_string());
    }
    for conflict in &facts.port_conflicts {
        out.push(format!(
            "Port {} is held by {}; stop it or change the Supabase port mapping.",
            conflict.port,
            conflict.process.as_deref().unwrap_or("another process")
        ));
    }
    match facts.firewall {
        Some(fw) if !fw.active => out.push(
            "Enable the firewall: ufw allow 80/tcp && ufw allow 443/tcp && ufw limit ssh && ufw --force enable"
                .to_string(),
        ),
        Some(fw) if !(fw.allows_http && fw.allows_https) => {
            out.push("Allow web traffic: ufw allow 80/tcp && ufw allow 443/tcp".to_string());
        }
        _ => {}
    }
    for provider in &facts.cloud_providers {
        out.push(format!(
            "Running on {provider}: open ports 80 and 443 in its firewall or security group."
        ));
    }

    if out.is_empty() {
        out.push("No issues found.".to_string());
    }
    out
}

/// Append-only report file with a unique timestamped name.
struct ReportFile {
    path: Option<PathBuf>,
    file: Option<File>,
}

impl ReportFile {
    fn create(dir: &Path, prefix: &str) -> Self {
        let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();

        for attempt in 0..100 {
            let path = report_path(dir, prefix, &stamp, attempt);
            match OpenOptions::new().append(true).create_new(true).open(&path) {
                Ok(file) => {
                    return Self {
                        path: Some(path),
                        file: Some(file),
                    };
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), "cannot create report file: {e}");
                    break;
                }
            }
        }

        Self {
            path: None,
            file: None,
        }
    }

    fn line(&mut self, text: &str) {
        if let Some(file) = &mut self.file {
            if let Err(e) = writeln!(file, "{text}") {
                tracing::warn!("report write failed, continuing without file: {e}");
                self.file = None;
            }
        }
    }
}

/// `<dir>/<prefix>-<stamp>.txt`, with `-<n>` appended for retries.
#[must_use]
pub fn report_path(dir: &Path, prefix: &str, stamp: &str, attempt: u32) -> PathBuf {
    if attempt == 0 {
        dir.join(format!("{prefix}-{stamp}.txt"))
    } else {
        dir.join(format!("{prefix}-{stamp}-{attempt}.txt"))
    }
}
