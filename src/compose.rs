use docker_compose_types::Compose;
use serde::Deserialize;

use crate::error::{HostError, HostResult};
use crate::host::Host;
use crate::settings::Settings;

/// The upstream Supabase Compose project on the host.
///
/// Commands always pass `--project-directory` and `-f`, so they
/// work without changing the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeProject {
    pub dir: String,
    pub file: String,
}

impl ComposeProject {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            dir: settings.docker_dir(),
            file: settings.compose_file(),
        }
    }

    /// Arguments for `docker` running `compose <sub...>`.
    #[must_use]
    pub fn args<'a>(&'a self, sub: &[&'a str]) -> Vec<&'a str> {
        let mut args = vec![
            "compose",
            "--project-directory",
            self.dir.as_str(),
            "-f",
            self.file.as_str(),
        ];
        args.extend_from_slice(sub);
        args
    }

    pub fn up(&self, host: &dyn Host) -> HostResult<()> {
        host.exec_interactive("docker", &self.args(&["up", "-d"]))
    }

    pub fn down(&self, host: &dyn Host) -> HostResult<()> {
        host.exec_interactive("docker", &self.args(&["down"]))
    }

    pub fn pull(&self, host: &dyn Host) -> HostResult<()> {
        host.exec_interactive("docker", &self.args(&["pull"]))
    }

    /// Current state of every service container.
    pub fn ps(&self, host: &dyn Host) -> HostResult<Vec<ServiceState>> {
        let output = host.exec("docker", &self.args(&["ps", "--all", "--format", "json"]))?;
        parse_ps(&output)
    }
}

/// One row of `docker compose ps --format json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceState {
    pub name: String,
    pub service: String,
    pub state: String,
    pub status: String,
    pub health: String,
}

impl ServiceState {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

/// Parse `docker compose ps --format json`. Older Compose releases
/// print one JSON array, newer ones one object per line.
pub fn parse_ps(output: &str) -> HostResult<Vec<ServiceState>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(HostError::from))
        .collect()
}

/// A service declared in the upstream compose file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredService {
    pub name: String,
    pub image: Option<String>,
    pub container_name: Option<String>,
}

/// List the services of a compose file in declaration order.
pub fn declared_services(yaml: &str) -> HostResult<Vec<DeclaredService>> {
    let compose: Compose = serde_yaml::from_str(yaml)?;
    Ok(compose
        .services
        .0
        .iter()
        .map(|(name, service)| DeclaredService {
            name: name.clone(),
            image: service.as_ref().and_then(|s| s.image.clone()),
            container_name: service.as_ref().and_then(|s| s.container_name.clone()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_pin_project_directory() {
        let project = ComposeProject::new(&Settings::new());

        assert_eq!(
            project.args(&["up", "-d"]),
            vec![
                "compose",
                "--project-directory",
                "/opt/supabase/docker",
                "-f",
                "/opt/supabase/docker/docker-compose.yml",
                "up",
                "-d",
            ]
        );
    }

    #[test]
    fn parse_ps_ndjson() {
        let output = r#"{"Name":"supabase-db","Service":"db","State":"running","Status":"Up 2 minutes (healthy)","Health":"healthy"}
{"Name":"supabase-kong","Service":"kong","State":"exited","Status":"Exited (1) 5 seconds ago","Health":""}"#;

        let states = parse_ps(output).unwrap();

        assert_eq!(states.len(), 2);
        assert!(states[0].is_running());
        assert_eq!(states[0].health, "healthy");
        assert!(!states[1].is_running());
        assert_eq!(states[1].service, "kong");
    }

    #[test]
    fn parse_ps_array_with_extra_fields() {
        let output = r#"[{"ID":"abc","Name":"supabase-studio","Service":"studio","State":"running","Status":"Up","Publishers":[]}]"#;

        let states = parse_ps(output).unwrap();

        assert_eq!(states.len(), 1);
        assert_eq!(states[0].name, "supabase-studio");
        assert_eq!(states[0].health, "");
    }

    #[test]
    fn parse_ps_empty() {
        assert!(parse_ps("").unwrap().is_empty());
        assert!(parse_ps("[]").unwrap().is_empty());
    }
}
