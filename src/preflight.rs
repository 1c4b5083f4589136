use crate::error::{HostError, HostResult};
use crate::host::Host;
use crate::settings::Settings;

pub const OS_RELEASE: &str = "/etc/os-release";
pub const MEMINFO: &str = "/proc/meminfo";

/// Fields of `/etc/os-release` that matter for installation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub id_like: Vec<String>,
    pub version_id: String,
    pub codename: String,
    pub pretty_name: String,
}

impl OsRelease {
    #[must_use]
    pub fn is_ubuntu(&self) -> bool {
        self.id == "ubuntu"
    }

    #[must_use]
    pub fn is_debian_family(&self) -> bool {
        self.id == "debian"
            || self.is_ubuntu()
            || self.id_like.iter().any(|l| l == "debian" || l == "ubuntu")
    }

    /// Distribution path used by Docker's apt repository.
    #[must_use]
    pub fn docker_distro(&self) -> &str {
        if self.id == "debian" { "debian" } else { "ubuntu" }
    }
}

/// Outcome of the preflight checks. Warnings never block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
    pub os: OsRelease,
    pub memory_bytes: u64,
    pub disk_free_bytes: u64,
    pub warnings: Vec<String>,
}

/// Parse `/etc/os-release` content.
#[must_use]
pub fn parse_os_release(content: &str) -> OsRelease {
    let mut os = OsRelease::default();
    let mut ubuntu_codename = String::new();

    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim() {
            "ID" => os.id = value.to_ascii_lowercase(),
            "ID_LIKE" => {
                os.id_like = value.split_whitespace().map(str::to_ascii_lowercase).collect();
            }
            "VERSION_ID" => os.version_id = value,
            "VERSION_CODENAME" => os.codename = value,
            "UBUNTU_CODENAME" => ubuntu_codename = value,
            "PRETTY_NAME" => os.pretty_name = value,
            _ => {}
        }
    }

    if os.codename.is_empty() {
        os.codename = ubuntu_codename;
    }
    os
}

/// Total memory in bytes from `/proc/meminfo`.
#[must_use]
pub fn parse_meminfo_total(content: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let rest = line.strip_prefix("MemTotal:")?;
        let kib: u64 = rest.split_whitespace().next()?.parse().ok()?;
        Some(kib * 1024)
    })
}

/// Available bytes from `df -P -B1 <path>` output.
#[must_use]
pub fn parse_df_available(output: &str) -> Option<u64> {
    output
        .lines()
        .skip(1)
        .find_map(|line| line.split_whitespace().nth(3)?.parse().ok())
}

/// Format a byte count as GiB with one decimal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_gib(bytes: u64) -> String {
    format!("{:.1} GiB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}

/// Fail with [`HostError::NotRoot`] unless the effective user on
/// the host is root.
pub fn require_root(host: &dyn Host) -> HostResult<()> {
    let uid = host.exec("id", &["-u"])?;
    if uid.trim() == "0" {
        Ok(())
    } else {
        Err(HostError::NotRoot)
    }
}

pub fn read_os_release(host: &dyn Host) -> HostResult<OsRelease> {
    let content = host
        .read_file(OS_RELEASE)?
        .ok_or_else(|| HostError::UnsupportedOs(format!("{OS_RELEASE} not found")))?;
    Ok(parse_os_release(&content))
}

pub fn read_memory(host: &dyn Host) -> HostResult<u64> {
    let content = host
        .read_file(MEMINFO)?
        .ok_or_else(|| HostError::FileNotFound(MEMINFO.into()))?;
    parse_meminfo_total(&content)
        .ok_or_else(|| HostError::Other(format!("no MemTotal line in {MEMINFO}")))
}

pub fn read_disk_free(host: &dyn Host, path: &str) -> HostResult<u64> {
    let output = host.exec("df", &["-P", "-B1", path])?;
    parse_df_available(&output)
        .ok_or_else(|| HostError::Other(format!("unexpected df output for {path}")))
}

/// Run the one-shot preflight gate: root, OS family, memory, disk.
pub fn run(host: &dyn Host, settings: &Settings) -> HostResult<PreflightReport> {
    require_root(host)?;

    let os = read_os_release(host)?;
    if !os.is_debian_family() {
        return Err(HostError::UnsupportedOs(format!(
            "{} (apt-based Ubuntu or Debian required)",
            if os.pretty_name.is_empty() { &os.id } else { &os.pretty_name }
        )));
    }

    let mut warnings = Vec::new();
    if !os.is_ubuntu() {
        warnings.push(format!(
            "{} is not Ubuntu; installation is untested there",
            os.pretty_name
        ));
    }

    let memory_bytes = read_memory(host)?;
    if memory_bytes < settings.min_memory_bytes {
        warnings.push(format!(
            "only {} of memory; at least {} is recommended",
            format_gib(memory_bytes),
            format_gib(settings.min_memory_bytes)
        ));
    }

    let disk_free_bytes = read_disk_free(host, "/")?;
    if disk_free_bytes < settings.min_disk_bytes {
        warnings.push(format!(
            "only {} of free disk; at least {} is recommended",
            format_gib(disk_free_bytes),
            format_gib(settings.min_disk_bytes)
        ));
    }

    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    tracing::info!(
        os = %os.pretty_name,
        memory = %format_gib(memory_bytes),
        disk_free = %format_gib(disk_free_bytes),
        "preflight passed"
    );

    Ok(PreflightReport {
        os,
        memory_bytes,
        disk_free_bytes,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const UBUNTU_2204: &str = r#"PRETTY_NAME="Ubuntu 22.04.4 LTS"
NAME="Ubuntu"
VERSION_ID="22.04"
VERSION="22.04.4 LTS (Jammy Jellyfish)"
VERSION_CODENAME=jammy
ID=ubuntu
ID_LIKE=debian
UBUNTU_CODENAME=jammy
"#;

    #[test]
    fn parses_ubuntu_release() {
        let os = parse_os_release(UBUNTU_2204);

        assert_eq!(os.id, "ubuntu");
        assert_eq!(os.id_like, vec!["debian"]);
        assert_eq!(os.version_id, "22.04");
        assert_eq!(os.codename, "jammy");
        assert_eq!(os.pretty_name, "Ubuntu 22.04.4 LTS");
        assert!(os.is_ubuntu());
        assert_eq!(os.docker_distro(), "ubuntu");
    }

    #[test]
    fn derivative_falls_back_to_ubuntu_codename() {
        let os = parse_os_release("ID=linuxmint\nID_LIKE=\"ubuntu debian\"\nUBUNTU_CODENAME=noble\n");

        assert!(os.is_debian_family());
        assert!(!os.is_ubuntu());
        assert_eq!(os.codename, "noble");
    }

    #[test]
    fn rhel_is_not_debian_family() {
        let os = parse_os_release("ID=\"rocky\"\nID_LIKE=\"rhel centos fedora\"\n");
        assert!(!os.is_debian_family());
    }

    #[test]
    fn meminfo_total_in_bytes() {
        let content = "MemTotal:        2014256 kB\nMemFree:          123456 kB\n";
        assert_eq!(parse_meminfo_total(content), Some(2_014_256 * 1024));
        assert_eq!(parse_meminfo_total("MemFree: 1 kB\n"), None);
    }

    #[test]
    fn df_available_column() {
        let output = "Filesystem        1-blocks        Used   Available Capacity Mounted on\n\
                      /dev/sda1      51835101184 9876543210 41958557974      20% /\n";
        assert_eq!(parse_df_available(output), Some(41_958_557_974));
        assert_eq!(parse_df_available("header only\n"), None);
    }

    #[test]
    fn gib_formatting() {
        assert_eq!(format_gib(2 * 1024 * 1024 * 1024), "2.0 GiB");
        assert_eq!(format_gib(1536 * 1024 * 1024), "1.5 GiB");
    }
}
