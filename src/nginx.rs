use std::fmt;

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::error::{HostError, HostResult};
use crate::host::Host;
use crate::settings::Settings;

pub const HTTP_TEMPLATE: &str = include_str!("../templates/nginx-http.conf.j2");
pub const HTTPS_TEMPLATE: &str = include_str!("../templates/nginx-https.conf.j2");

const HTTP_NAME: &str = "nginx-http.conf";
const HTTPS_NAME: &str = "nginx-https.conf";

/// A validated, lowercase DNS name.
///
/// # Example
///
/// ```
/// use supahost::nginx::Domain;
///
/// let domain = Domain::parse("API.Example.com").unwrap();
/// assert_eq!(domain.as_str(), "api.example.com");
///
/// assert!(Domain::parse("localhost").is_err());
/// assert!(Domain::parse("-bad.example.com").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    pub fn parse(input: &str) -> HostResult<Self> {
        let domain = input.trim().trim_end_matches('.').to_ascii_lowercase();
        let invalid = |reason| HostError::InvalidDomain {
            domain: input.to_string(),
            reason,
        };

        if domain.is_empty() {
            return Err(invalid("empty"));
        }
        if domain.len() > 253 {
            return Err(invalid("longer than 253 characters"));
        }

        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 {
            return Err(invalid("needs at least two labels"));
        }
        for label in &labels {
            if label.is_empty() {
                return Err(invalid("empty label"));
            }
            if label.len() > 63 {
                return Err(invalid("label longer than 63 characters"));
            }
            if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(invalid("labels may only contain letters, digits and '-'"));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(invalid("labels may not start or end with '-'"));
            }
        }
        if labels
            .last()
            .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(invalid("top-level label is numeric"));
        }

        Ok(Self(domain))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which server blocks the site carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listener {
    /// Plain HTTP on port 80.
    Http,
    /// HTTP redirect plus TLS on port 443 with Let's Encrypt
    /// certificates.
    Https {
        letsencrypt_live: String,
        dhparam: String,
    },
}

/// Typed Nginx site for the Supabase API gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NginxSite {
    pub domain: Option<Domain>,
    pub upstream: String,
    pub client_max_body_size: String,
    pub listener: Listener,
}

#[derive(Serialize)]
struct TemplateVars<'a> {
    server_name: &'a str,
    domain: Option<&'a str>,
    upstream: &'a str,
    client_max_body_size: &'a str,
    letsencrypt_live: Option<&'a str>,
    dhparam: Option<&'a str>,
}

impl NginxSite {
    /// HTTP-only site. Without a domain it answers any host name.
    #[must_use]
    pub fn http(settings: &Settings, domain: Option<Domain>) -> Self {
        Self {
            domain,
            upstream: settings.upstream.clone(),
            client_max_body_size: settings.client_max_body_size.clone(),
            listener: Listener::Http,
        }
    }

    #[must_use]
    pub fn https(settings: &Settings, domain: Domain) -> Self {
        Self {
            domain: Some(domain),
            upstream: settings.upstream.clone(),
            client_max_body_size: settings.client_max_body_size.clone(),
            listener: Listener::Https {
                letsencrypt_live: settings.letsencrypt_live.clone(),
                dhparam: settings.dhparam_path.clone(),
            },
        }
    }

    pub fn render(&self) -> HostResult<String> {
        let env = environment()?;
        let domain = self.domain.as_ref().map(Domain::as_str);

        let (name, letsencrypt_live, dhparam) = match &self.listener {
            Listener::Http => (HTTP_NAME, None, None),
            Listener::Https {
                letsencrypt_live,
                dhparam,
            } => {
                if domain.is_none() {
                    return Err(HostError::Other(
                        "an HTTPS site needs a domain".into(),
                    ));
                }
                (HTTPS_NAME, Some(letsencrypt_live.as_str()), Some(dhparam.as_str()))
            }
        };

        let vars = TemplateVars {
            server_name: domain.unwrap_or("_"),
            domain,
            upstream: &self.upstream,
            client_max_body_size: &self.client_max_body_size,
            letsencrypt_live,
            dhparam,
        };

        Ok(env.get_template(name)?.render(vars)?)
    }
}

fn environment() -> HostResult<Environment<'static>> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env.add_template(HTTP_NAME, HTTP_TEMPLATE)?;
    env.add_template(HTTPS_NAME, HTTPS_TEMPLATE)?;
    Ok(env)
}

/// Result of writing a rendered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Write `content` to `path` unless the file already holds exactly
/// that content. The file is always replaced as a whole.
pub fn write_if_changed(host: &dyn Host, path: &str, content: &str) -> HostResult<WriteOutcome> {
    if host.read_file(path)?.as_deref() == Some(content) {
        tracing::info!(path, "configuration unchanged");
        return Ok(WriteOutcome::Unchanged);
    }
    host.write_file(path, content)?;
    tracing::info!(path, "configuration written");
    Ok(WriteOutcome::Written)
}

/// Render `site` and install it as the Supabase site.
pub fn install_site(host: &dyn Host, settings: &Settings, site: &NginxSite) -> HostResult<WriteOutcome> {
    let content = site.render()?;
    host.create_dir_all(&format!("{}/sites-available", settings.nginx_dir))?;
    write_if_changed(host, &settings.site_available(), &content)
}

/// Link the Supabase site into `sites-enabled` and drop the stock
/// default site, which would otherwise claim port 80.
pub fn enable_site(host: &dyn Host, settings: &Settings) -> HostResult<()> {
    host.create_dir_all(&format!("{}/sites-enabled", settings.nginx_dir))?;
    host.symlink(&settings.site_available(), &settings.site_enabled())?;
    host.remove_file(&settings.default_site_enabled())
}

/// Validate the configuration with `nginx -t`.
pub fn test_config(host: &dyn Host) -> HostResult<()> {
    host.exec("nginx", &["-t"]).map(|_| ())
}

/// Run `systemctl <action> nginx`.
pub fn service(host: &dyn Host, action: &str) -> HostResult<()> {
    tracing::info!(action, "nginx service");
    host.exec("systemctl", &[action, "nginx"]).map(|_| ())
}
