use crate::error::{HostError, HostResult};
use crate::host::Host;
use crate::pipeline::StepOutcome;
use crate::settings::Settings;

/// Clone the upstream repository unless the install directory
/// already exists. Returns `true` when a clone happened.
pub fn clone_if_absent(host: &dyn Host, settings: &Settings) -> HostResult<bool> {
    if host.exists(&settings.install_dir)? {
        tracing::info!(dir = %settings.install_dir, "install directory exists, reusing it");
        return Ok(false);
    }

    tracing::info!(repo = %settings.repo_url, dir = %settings.install_dir, "cloning stack");
    host.exec_interactive(
        "git",
        &["clone", "--depth", "1", &settings.repo_url, &settings.install_dir],
    )?;
    Ok(true)
}

/// Copy `.env.example` to `.env` if no `.env` exists yet.
/// Returns `true` when the file was created.
pub fn seed_env_file(host: &dyn Host, settings: &Settings) -> HostResult<bool> {
    let env_path = settings.env_path();
    if host.exists(&env_path)? {
        return Ok(false);
    }

    let example = settings.env_example_path();
    let template = host
        .read_file(&example)?
        .ok_or_else(|| HostError::FileNotFound(example.clone()))?;

    host.write_file(&env_path, &template)?;
    host.chmod("600", &env_path)?;
    tracing::info!(path = %env_path, "created environment file from template");
    Ok(true)
}

/// Fetch the stack: clone if needed, then seed the env file.
pub fn fetch(host: &dyn Host, settings: &Settings) -> HostResult<StepOutcome> {
    let cloned = clone_if_absent(host, settings)?;
    let seeded = seed_env_file(host, settings)?;

    if cloned || seeded {
        Ok(StepOutcome::Done)
    } else {
        Ok(StepOutcome::Skipped("stack and .env already present".into()))
    }
}

/// Fast-forward the checkout to the latest upstream commit.
pub fn pull_latest(host: &dyn Host, settings: &Settings) -> HostResult<()> {
    if !host.exists(&settings.install_dir)? {
        return Err(HostError::FileNotFound(format!(
            "{} (run `supahost install` first)",
            settings.install_dir
        )));
    }
    tracing::info!(dir = %settings.install_dir, "pulling latest source");
    host.exec_interactive("git", &["-C", &settings.install_dir, "pull", "--ff-only"])
}
