//! Install and operate a self-hosted Supabase instance.
//!
//! `supahost` takes a fresh Ubuntu (or other Debian-family) server
//! to a running Supabase stack behind Nginx with Let's Encrypt TLS,
//! and then keeps operating it: start, stop, update, back up, and
//! diagnose. Every command runs against a [`Host`], either the
//! local machine ([`LocalHost`]) or a remote one over SSH
//! ([`SshSession`]).
//!
//! # Overview
//!
//! - [`Installer`] runs the install as an ordered [`Pipeline`] of
//!   named steps: preflight, packages, Docker, Certbot, firewall,
//!   stack checkout, and an HTTP-only proxy. Progress is recorded
//!   so `install --resume` continues after a failure.
//! - [`Manager`] drives the Compose project and the proxy:
//!   `start` ensures dashboard credentials in the stack's `.env`,
//!   brings services up, and waits for the database to report
//!   healthy before restarting Nginx.
//! - [`NginxSite`] renders the proxy configuration from a typed
//!   struct; a [`Domain`] is validated before anything is written.
//! - [`diagnose::run`] writes a timestamped report covering the OS,
//!   network, Docker, ports, firewall, cloud provider, and TLS.
//!
//! # Example
//!
//! ```rust,no_run
//! use supahost::{LocalHost, Manager, Settings};
//!
//! fn main() -> anyhow::Result<()> {
//!     let host = LocalHost::new();
//!     let settings = Settings::new().install_dir("/srv/supabase");
//!
//!     let manager = Manager::new(&host, &settings);
//!     manager.require_root()?;
//!
//!     let creds = manager.start(false)?;
//!     if creds.generated {
//!         println!("dashboard password: {}", creds.password);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The same operations are available from the `supahost` binary:
//!
//! ```sh
//! sudo supahost install
//! sudo supahost start
//! sudo supahost ssl --domain db.example.com --email ops@example.com
//! supahost diagnose --host root@203.0.113.7
//! ```
//!
//! [`Pipeline`]: pipeline::Pipeline

// Allow noisy pedantic lints that don't add value for an
// operations tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod cmd;
pub mod compose;
pub mod credentials;
pub mod diagnose;
pub mod envfile;
pub mod error;
pub mod host;
pub mod install;
pub mod lifecycle;
pub mod logging;
pub mod nginx;
pub mod pipeline;
pub mod preflight;
pub mod settings;
pub mod ssh;
pub mod stack;

pub use credentials::DashboardCredentials;
pub use envfile::EnvFile;
pub use error::{HostError, HostResult};
pub use host::{Host, LocalHost};
pub use install::Installer;
pub use lifecycle::{Manager, SslRequest};
pub use nginx::{Domain, NginxSite};
pub use settings::Settings;
pub use ssh::SshSession;
