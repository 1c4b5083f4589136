use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};

use crate::compose::ServiceState;
use crate::credentials::DashboardCredentials;
use crate::diagnose;
use crate::host::{Host, LocalHost};
use crate::install::Installer;
use crate::lifecycle::{Manager, SslRequest};
use crate::nginx::{Domain, NginxSite};
use crate::preflight;
use crate::settings::Settings;
use crate::ssh::SshSession;

#[derive(Debug, Parser)]
#[command(name = "supahost", version)]
#[command(about = "Install and operate a self-hosted Supabase instance")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Operate on a remote host over SSH
    #[arg(long, global = true, value_name = "USER@ADDR")]
    pub host: Option<String>,

    /// SSH private key for --host
    #[arg(long, global = true, value_name = "FILE")]
    pub ssh_key: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Install Docker, Nginx, Certbot and fetch the Supabase stack
    Install {
        /// Skip steps completed by an earlier run
        #[arg(long)]
        resume: bool,
        /// Leave the firewall untouched
        #[arg(long)]
        skip_firewall: bool,
    },
    /// Start all services and the reverse proxy
    Start {
        /// Generate a new dashboard password
        #[arg(long)]
        rotate_credentials: bool,
    },
    /// Stop all services
    Stop,
    /// Stop, then start all services
    Restart {
        /// Generate a new dashboard password
        #[arg(long)]
        rotate_credentials: bool,
    },
    /// Show service status
    Status,
    /// Follow service logs
    Logs {
        /// Only this service
        service: Option<String>,
        /// Lines of history to show before following
        #[arg(long)]
        tail: Option<u32>,
    },
    /// Obtain a Let's Encrypt certificate and enable HTTPS
    Ssl {
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Pull the latest source and images, then restart
    Update,
    /// Dump all databases to a timestamped SQL file
    Backup,
    /// Restore a database dump (not implemented)
    Restore,
    /// Write a diagnostics report for this host
    Diagnose,
    /// Print the Nginx site configuration without writing it
    RenderNginx {
        #[arg(long)]
        domain: Option<String>,
        /// Render the HTTPS variant (requires --domain)
        #[arg(long, requires = "domain")]
        https: bool,
    },
}

impl Command {
    /// Whether the command changes the host and so needs root.
    #[must_use]
    pub const fn requires_root(&self) -> bool {
        !matches!(self, Self::Diagnose | Self::Restore | Self::RenderNginx { .. })
    }
}

/// Early exit from argument parsing: text for stdout and the exit
/// code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliExit {
    pub code: u8,
    pub output: String,
}

/// Parse arguments. Help and version exit 0; any other parse
/// error prints usage and exits 1.
pub fn parse<I, T>(args: I) -> Result<Cli, CliExit>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|err| match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => CliExit {
            code: 0,
            output: err.to_string(),
        },
        _ => CliExit {
            code: 1,
            output: format!("{err}\n{}", Cli::command().render_help()),
        },
    })
}

/// Resolve settings and the target host, then run the command.
pub fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::new(),
    };

    match &cli.host {
        Some(target) => {
            let mut session = SshSession::from_target(target);
            if let Some(key) = &cli.ssh_key {
                session = session.with_key(key);
            }
            session.check_connection()?;
            run_command(&session, &settings, cli.command)
        }
        None => run_command(&LocalHost::new(), &settings, cli.command),
    }
}

/// Run one command against `host`.
pub fn run_command(host: &dyn Host, settings: &Settings, command: Command) -> anyhow::Result<()> {
    if command.requires_root() {
        preflight::require_root(host)?;
    }

    let manager = Manager::new(host, settings);

    match command {
        Command::Install {
            resume,
            skip_firewall,
        } => {
            let report = Installer::new(host, settings)
                .resume(resume)
                .skip_firewall(skip_firewall)
                .run();
            println!("{}", report.summary());
            report.into_result()?;
            println!();
            println!("Supabase is installed in {}.", settings.install_dir);
            println!("Next: supahost start, then supahost ssl");
        }
        Command::Start { rotate_credentials } => {
            print_credentials(&manager.start(rotate_credentials)?);
        }
        Command::Stop => manager.stop()?,
        Command::Restart { rotate_credentials } => {
            print_credentials(&manager.restart(rotate_credentials)?);
        }
        Command::Status => {
            let states = manager.status()?;
            let running = states.iter().filter(|s| ServiceState::is_running(s)).count();
            println!("{running} of {} services running", states.len());
        }
        Command::Logs { service, tail } => manager.logs(service.as_deref(), tail)?,
        Command::Ssl { domain, email } => {
            let domain = match domain {
                Some(d) => d,
                None => prompt("Domain name")?,
            };
            let domain = Domain::parse(&domain)?;
            let email = match email {
                Some(e) => e,
                None => prompt("Email for Let's Encrypt")?,
            };
            if !email.contains('@') {
                bail!("invalid email address '{email}'");
            }

            manager.ssl(&SslRequest {
                domain: domain.clone(),
                email,
            })?;
            println!("HTTPS is enabled: https://{domain}");
        }
        Command::Update => print_credentials(&manager.update()?),
        Command::Backup => {
            let path = manager.backup()?;
            println!("Backup written to {path}");
        }
        Command::Restore => manager.restore()?,
        Command::Diagnose => {
            diagnose::run(host, settings);
        }
        Command::RenderNginx { domain, https } => {
            let domain = domain.as_deref().map(Domain::parse).transpose()?;
            let site = match (https, domain) {
                (true, Some(domain)) => NginxSite::https(settings, domain),
                (true, None) => bail!("--https requires --domain"),
                (false, domain) => NginxSite::http(settings, domain),
            };
            print!("{}", site.render()?);
        }
    }

    Ok(())
}

fn print_credentials(creds: &DashboardCredentials) {
    if creds.generated {
        println!("Dashboard credentials (shown once, store them now):");
        println!("  username: {}", creds.username);
        println!("  password: {}", creds.password);
    } else {
        println!(
            "Dashboard user '{}' unchanged (use --rotate-credentials for a new password)",
            creds.username
        );
    }
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("{label} is required");
    }
    Ok(value)
}
