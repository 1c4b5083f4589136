pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("command failed: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("SSH connection failed: {0}")]
    SshFailed(String),

    #[error("this command must be run as root (try: sudo supahost ...)")]
    NotRoot,

    #[error("unsupported operating system: {0}")]
    UnsupportedOs(String),

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("invalid domain name '{domain}': {reason}")]
    InvalidDomain {
        domain: String,
        reason: &'static str,
    },

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error(
        "container '{0}' did not become healthy after {1} attempts"
    )]
    HealthcheckTimeout(String, u32),

    #[error("step '{step}' failed")]
    StepFailed {
        step: String,
        source: Box<HostError>,
    },

    #[error("{0} is not implemented")]
    Unimplemented(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Template(#[from] minijinja::Error),
}
