mod common;

use common::{ENV_EXAMPLE, FakeHost, Reply};
use supahost::error::HostError;
use supahost::pipeline::StepStatus;
use supahost::{Installer, Settings};

const UBUNTU: &str = "PRETTY_NAME=\"Ubuntu 24.04.1 LTS\"\n\
ID=ubuntu\n\
ID_LIKE=debian\n\
VERSION_ID=\"24.04\"\n\
VERSION_CODENAME=noble\n";

const MEMINFO: &str = "MemTotal:        8148412 kB\nMemFree:         6123456 kB\n";

const DF: &str = "Filesystem     1B-blocks        Used   Available Capacity Mounted on\n\
/dev/vda1   84145856512 4012345344 80133511168       5% /\n";

const STEPS: &[&str] = &[
    "preflight",
    "apt-update",
    "base-packages",
    "docker-repo",
    "docker-engine",
    "certbot",
    "firewall",
    "fetch-stack",
    "nginx-http",
];

fn fresh_server() -> FakeHost {
    let host = FakeHost::new();
    host.with_file("/etc/os-release", UBUNTU)
        .with_file("/proc/meminfo", MEMINFO)
        .with_file("/opt/supabase/docker/.env.example", ENV_EXAMPLE)
        .on("df -P -B1", Reply::Ok(DF.into()))
        .on("dpkg --print-architecture", Reply::Ok("amd64\n".into()));
    host
}

fn count(host: &FakeHost, pattern: &str) -> usize {
    host.commands().iter().filter(|c| c.contains(pattern)).count()
}

#[test]
fn runs_steps_in_order() {
    let host = fresh_server();
    let settings = Settings::new();

    let report = Installer::new(&host, &settings).run();

    assert!(report.succeeded(), "{}", report.summary());
    let names: Vec<&str> = report.records().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, STEPS);

    let order = [
        "apt-get update",
        "apt-get install -y ca-certificates",
        "write /etc/apt/sources.list.d/docker.list",
        "apt-get install -y docker-ce",
        "snap install core",
        "ufw allow 80/tcp",
        "write /opt/supabase/docker/.env",
        "write /etc/nginx/sites-available/supabase",
        "nginx -t",
        "systemctl restart nginx",
    ];
    let positions: Vec<usize> = order.iter().map(|p| host.position(p).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
}

#[test]
fn writes_docker_source_and_seeds_env() {
    let host = fresh_server();
    let settings = Settings::new();

    Installer::new(&host, &settings).run().into_result().unwrap();

    let source = host.file("/etc/apt/sources.list.d/docker.list").unwrap();
    assert!(source.contains("arch=amd64"));
    assert!(source.contains("linux/ubuntu noble stable"));
    assert_eq!(host.file("/opt/supabase/docker/.env").unwrap(), ENV_EXAMPLE);
    assert!(host.ran("chmod 600 /opt/supabase/docker/.env"));

    let site = host.file("/etc/nginx/sites-available/supabase").unwrap();
    assert!(site.contains("server_name _;"));
    assert!(host.ran("rm -f /etc/nginx/sites-enabled/default"));
}

#[test]
fn existing_checkout_is_not_cloned_again() {
    let host = fresh_server();
    let settings = Settings::new();

    Installer::new(&host, &settings).run().into_result().unwrap();

    assert!(!host.ran("git clone"));
}

#[test]
fn non_root_stops_before_any_change() {
    let host = FakeHost::non_root();
    let settings = Settings::new();

    let report = Installer::new(&host, &settings).run();

    assert_eq!(report.failed_step(), Some("preflight"));
    assert_eq!(host.commands(), vec!["id -u"]);
    for step in &STEPS[1..] {
        assert_eq!(report.status_of(step), Some(&StepStatus::NotRun));
    }
}

#[test]
fn unsupported_os_is_fatal() {
    let host = fresh_server();
    host.with_file(
        "/etc/os-release",
        "NAME=\"Fedora Linux\"\nID=fedora\nPRETTY_NAME=\"Fedora Linux 40\"\n",
    );
    let settings = Settings::new();

    let err = Installer::new(&host, &settings)
        .run()
        .into_result()
        .unwrap_err();

    match err {
        HostError::StepFailed { step, source } => {
            assert_eq!(step, "preflight");
            assert!(matches!(*source, HostError::UnsupportedOs(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!host.ran("apt-get"));
}

#[test]
fn failure_reports_remaining_steps_as_not_run() {
    let host = fresh_server();
    host.on("snap install core", Reply::Fail("error: cannot communicate with server".into()));
    let settings = Settings::new();

    let report = Installer::new(&host, &settings).run();

    assert_eq!(report.failed_step(), Some("certbot"));
    assert_eq!(report.status_of("docker-engine"), Some(&StepStatus::Succeeded));
    assert!(matches!(report.status_of("certbot"), Some(StepStatus::Failed(_))));
    assert_eq!(report.status_of("firewall"), Some(&StepStatus::NotRun));
    assert_eq!(report.status_of("nginx-http"), Some(&StepStatus::NotRun));
    assert!(!host.ran("ufw"));
    assert!(report.summary().contains("not run"));
}

#[test]
fn resume_skips_completed_steps() {
    let host = fresh_server();
    host.on("snap install core", Reply::Fail("snapd not ready".into()));
    let settings = Settings::new();

    let first = Installer::new(&host, &settings).run();
    assert_eq!(first.failed_step(), Some("certbot"));
    let progress = host.file("/var/lib/supahost/install-state.json").unwrap();
    assert!(progress.contains("docker-engine"));
    assert!(!progress.contains("certbot"));

    host.on("snap install core", Reply::Ok(String::new()));
    let second = Installer::new(&host, &settings).resume(true).run();

    assert!(second.succeeded(), "{}", second.summary());
    assert_eq!(
        second.status_of("docker-engine"),
        Some(&StepStatus::Skipped("completed earlier".into()))
    );
    assert_eq!(second.status_of("certbot"), Some(&StepStatus::Succeeded));
    // apt-update and docker-repo each ran once, in the first attempt
    assert_eq!(count(&host, "apt-get update"), 2);
    // preflight is re-checked on every run
    assert_eq!(count(&host, "id -u"), 2);
}

#[test]
fn without_resume_every_step_runs_again() {
    let host = fresh_server();
    let settings = Settings::new();

    Installer::new(&host, &settings).run().into_result().unwrap();
    Installer::new(&host, &settings).run().into_result().unwrap();

    assert_eq!(count(&host, "apt-get update"), 4);
}

#[test]
fn skip_firewall_leaves_ufw_alone() {
    let host = fresh_server();
    let settings = Settings::new();

    let report = Installer::new(&host, &settings).skip_firewall(true).run();

    assert!(report.succeeded());
    assert_eq!(
        report.status_of("firewall"),
        Some(&StepStatus::Skipped("--skip-firewall".into()))
    );
    assert!(!host.ran("ufw"));
}
