use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::envfile::EnvFile;

pub const USERNAME_KEY: &str = "DASHBOARD_USERNAME";
pub const PASSWORD_KEY: &str = "DASHBOARD_PASSWORD";

/// Password shipped in the upstream `.env.example`.
pub const PLACEHOLDER_PASSWORD: &str = "this_password_is_insecure_and_should_be_updated";

pub const PASSWORD_LENGTH: usize = 24;

/// Username and password gating the Studio dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardCredentials {
    pub username: String,
    pub password: String,
    /// `true` when the password was created by this call.
    pub generated: bool,
}

/// Random alphanumeric password.
#[must_use]
pub fn generate_password(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Make sure `env` holds usable dashboard credentials and return
/// them.
///
/// A new password is generated when none is set, when the upstream
/// placeholder is still in place, or when `rotate` is requested.
/// Both keys are upserted, never appended.
pub fn ensure_dashboard_credentials(
    env: &mut EnvFile,
    username: &str,
    rotate: bool,
) -> DashboardCredentials {
    let current = env
        .get(PASSWORD_KEY)
        .filter(|p| !p.is_empty() && *p != PLACEHOLDER_PASSWORD)
        .map(ToString::to_string);

    let (password, generated) = match current {
        Some(password) if !rotate => (password, false),
        _ => (generate_password(PASSWORD_LENGTH), true),
    };

    env.set(USERNAME_KEY, username);
    env.set(PASSWORD_KEY, &password);

    DashboardCredentials {
        username: username.to_string(),
        password,
        generated,
    }
}
