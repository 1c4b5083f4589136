use std::io::Write;

use supahost::Settings;
use supahost::error::HostError;

#[test]
fn partial_file_keeps_defaults() {
    let settings = Settings::from_toml(
        r#"
install_dir = "/srv/supabase"
readiness_attempts = 60
"#,
    )
    .unwrap();

    assert_eq!(settings.install_dir, "/srv/supabase");
    assert_eq!(settings.readiness_attempts, 60);
    assert_eq!(settings.readiness_interval_secs, 5);
    assert_eq!(settings.nginx_dir, "/etc/nginx");
}

#[test]
fn unknown_keys_are_rejected() {
    let err = Settings::from_toml("instal_dir = \"/srv\"\n").unwrap_err();

    assert!(matches!(err, HostError::Toml(_)));
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "backup_dir = \"/mnt/backups\"").unwrap();
    writeln!(file, "dashboard_username = \"ops\"").unwrap();

    let settings = Settings::load(file.path()).unwrap();

    assert_eq!(settings.backup_dir, "/mnt/backups");
    assert_eq!(settings.dashboard_username, "ops");
}

#[test]
fn missing_file_is_reported_by_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("supahost.toml");

    let err = Settings::load(&path).unwrap_err();

    assert!(matches!(err, HostError::FileNotFound(ref p) if p.ends_with("supahost.toml")));
}

#[test]
fn serialized_defaults_load_back() {
    let text = toml::to_string(&Settings::new()).unwrap();

    assert_eq!(Settings::from_toml(&text).unwrap(), Settings::new());
}
