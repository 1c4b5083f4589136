mod common;

use common::FakeHost;
use supahost::nginx::{self, WriteOutcome};
use supahost::{Domain, NginxSite, Settings};

#[test]
fn https_site_substitutes_every_placeholder() {
    let domain = Domain::parse("db.example.com").unwrap();
    let site = NginxSite::https(&Settings::new(), domain);

    let rendered = site.render().unwrap();

    assert_eq!(rendered.matches("db.example.com").count(), 5);
    assert!(!rendered.contains("{{"));
    assert!(!rendered.contains("{%"));
    assert!(rendered.contains("ssl_dhparam /etc/nginx/dhparam.pem;"));
    assert!(rendered.contains("return 301 https://$host$request_uri;"));
    assert!(rendered.ends_with("}\n"));
}

#[test]
fn http_site_without_domain_answers_any_host() {
    let rendered = NginxSite::http(&Settings::new(), None).render().unwrap();

    assert!(rendered.contains("server_name _;"));
    assert_eq!(rendered.matches("server 127.0.0.1:8000;").count(), 1);
    assert!(rendered.contains("client_max_body_size 100M;"));
    assert!(!rendered.contains("443"));
}

#[test]
fn http_site_with_domain() {
    let domain = Domain::parse("Studio.Example.org.").unwrap();
    let rendered = NginxSite::http(&Settings::new(), Some(domain)).render().unwrap();

    assert!(rendered.contains("server_name studio.example.org;"));
}

#[test]
fn https_without_domain_is_refused() {
    let mut site = NginxSite::https(&Settings::new(), Domain::parse("a.example.com").unwrap());
    site.domain = None;

    assert!(site.render().is_err());
}

#[test]
fn rendering_twice_writes_once() {
    let host = FakeHost::new();
    let settings = Settings::new();
    let site = NginxSite::http(&settings, None);

    let first = nginx::install_site(&host, &settings, &site).unwrap();
    let second = nginx::install_site(&host, &settings, &site).unwrap();

    assert_eq!(first, WriteOutcome::Written);
    assert_eq!(second, WriteOutcome::Unchanged);
    let writes = host
        .commands()
        .iter()
        .filter(|c| c.as_str() == "write /etc/nginx/sites-available/supabase")
        .count();
    assert_eq!(writes, 1);
}

#[test]
fn changed_site_replaces_the_whole_file() {
    let host = FakeHost::new();
    let settings = Settings::new();
    host.with_file(&settings.site_available(), "# hand edited\n");

    let outcome = nginx::install_site(&host, &settings, &NginxSite::http(&settings, None)).unwrap();

    assert_eq!(outcome, WriteOutcome::Written);
    let content = host.file(&settings.site_available()).unwrap();
    assert!(!content.contains("hand edited"));
}

#[test]
fn enable_site_links_and_drops_default() {
    let host = FakeHost::new();
    let settings = Settings::new();

    nginx::enable_site(&host, &settings).unwrap();

    assert!(host.ran(
        "ln -sfn /etc/nginx/sites-available/supabase /etc/nginx/sites-enabled/supabase"
    ));
    assert!(host.ran("rm -f /etc/nginx/sites-enabled/default"));
}
