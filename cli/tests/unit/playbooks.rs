//! Playbook phases end to end: runbook, real templates, scripted ssh.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use hostkit_cli::application::services::playbooks::certificates::RESTORE_SCRIPT;
use hostkit_cli::application::services::playbooks::run_playbook;
use hostkit_cli::application::services::playbooks::tools::BASHRC_MARKER;
use hostkit_cli::application::services::runbook::Runbook;
use hostkit_cli::domain::config::DeployConfig;
use hostkit_cli::domain::error::StepError;
use hostkit_cli::domain::playbook::PlaybookKind;
use hostkit_cli::domain::summary::StepRecord;
use hostkit_cli::domain::step::StepOutcome;
use hostkit_cli::infra::assets::EmbeddedAssets;

use crate::mocks::{MemoryFs, MockRunner, NullReporter, session};

const MATTERMOST_CONFIG: &str = r#"
remote = "198.51.100.4"
user = "deploy"

[mattermost]
letsencrypt_email = "ops@example.org"
psql_user = "mmuser"
psql_password = "s3cret"
site_url = "https://chat.example.org"
"#;

const NEXTCLOUD_CONFIG: &str = r#"
remote = "198.51.100.4"
user = "deploy"
server_name = "cloud.example.org"
memcached_memory = "512"
sql_user = "nc"
sql_password = "pw"
nc_release_file_url = "https://download.nextcloud.com/server/releases/latest.tar.bz2"
nc_admin_user = "admin"
nc_admin_pw = "adminpw"
"#;

const BACKUP_DIR: &str = "/srv/backup/letsencrypt";

const CERTIFICATE_READY: &str = "jsonpath='{.status.conditions";

// Excerpts of the files Ubuntu 24.04 ships.
const STOCK_MEMCACHED_CONF: &str = "\
# Start with a cap of 64 megs of memory. It's reasonable, and the daemon default
# Note that the daemon will grow to this size, but does not start out holding this much
# memory
-m 64

# Default connection port is 11211
-p 11211
";

const STOCK_POOL_CONF: &str = "\
pm = dynamic
pm.max_children = 5
pm.start_servers = 2
pm.min_spare_servers = 1
pm.max_spare_servers = 3
;pm.max_spawn_rate = 32

; Pass environment variables like LD_LIBRARY_PATH. All $VARIABLEs are taken from
; the current environment.
; Default Value: clean env
;env[HOSTNAME] = $HOSTNAME
;env[PATH] = /usr/local/bin:/usr/bin:/bin
;env[TMP] = /tmp
;env[TMPDIR] = /tmp
;env[TEMP] = /tmp
";

const STOCK_PHP_INI: &str = "\
memory_limit = 128M
post_max_size = 8M
upload_max_filesize = 2M

[opcache]
; Determines if Zend OPCache is enabled
;opcache.enable=1

; Determines if Zend OPCache is enabled for the CLI version of PHP
;opcache.enable_cli=0

; The OPcache shared memory storage size.
;opcache.memory_consumption=128

; The amount of memory for interned strings in Mbytes.
;opcache.interned_strings_buffer=8

; The maximum number of keys (scripts) in the OPcache hash table.
;opcache.max_accelerated_files=10000

; The maximum percentage of \"wasted\" memory until a restart is scheduled.
;opcache.max_wasted_percentage=5

; How often (in seconds) to check file timestamps for changes to the shared
; memory storage allocation. (\"1\" means validate once per second, but only
; once per request. \"0\" means always validate)
;opcache.revalidate_freq=2

; If disabled, all PHPDoc comments are dropped from the code to reduce the
; size of the optimized code.
;opcache.save_comments=1

; Absolute path used to store shared lockfiles (for *nix only).
;opcache.lockfile_path=/tmp

[curl]
; A default value for the CURLOPT_CAINFO option. This is required to be an
; absolute path.
;curl.cainfo =
";

const MEMCACHED_CONF: &str = "/etc/memcached.conf";
const POOL_CONF: &str = "/etc/php/8.3/fpm/pool.d/www.conf";
const PHP_INI: &str = "/etc/php/8.3/fpm/php.ini";

fn mattermost_config_with_backup_dir() -> DeployConfig {
    DeployConfig::parse(&format!("{MATTERMOST_CONFIG}backup_dir = \"{BACKUP_DIR}\"\n")).unwrap()
}

/// Files copied down by rsync whose destination ends in `file`.
fn downloads_of(runner: &MockRunner, file: &str) -> usize {
    runner
        .calls()
        .iter()
        .filter(|c| c.program == "rsync" && c.args.last().is_some_and(|a| a.ends_with(file)))
        .count()
}

/// Content written to `remote_path` through `cat >`, if any.
fn uploaded(runner: &MockRunner, remote_path: &str) -> Option<String> {
    let command = format!("cat > {remote_path}");
    runner
        .calls()
        .into_iter()
        .find(|c| c.remote_command().ends_with(&command))
        .and_then(|c| c.stdin)
        .map(|bytes| String::from_utf8(bytes).unwrap())
}

fn stock_webserver_host() -> MockRunner {
    MockRunner::new()
        .on(&format!("cat {MEMCACHED_CONF}"), 0, STOCK_MEMCACHED_CONF, "")
        .on(&format!("cat {POOL_CONF}"), 0, STOCK_POOL_CONF, "")
        .on(&format!("cat {PHP_INI}"), 0, STOCK_PHP_INI, "")
}

fn step_outcomes(records: &[StepRecord]) -> Vec<(String, StepOutcome)> {
    records
        .iter()
        .filter_map(|r| match r {
            StepRecord::Step { name, outcome } => Some((name.clone(), outcome.clone())),
            StepRecord::Wait { .. } => None,
        })
        .collect()
}

#[tokio::test]
async fn tools_shell_on_provisioned_host_changes_nothing() {
    let config = DeployConfig::parse("remote = \"vm\"\nuser = \"root\"\n").unwrap();
    let runner = MockRunner::new();
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "tools");

    run_playbook(&mut rb, PlaybookKind::Tools, &["shell"]).await.unwrap();
    let summary = rb.into_summary();

    assert_eq!(runner.count("curl"), 0);
    assert_eq!(runner.count("install_starship.sh --bin-dir"), 0);
    assert!(runner.calls().iter().all(|c| c.stdin.is_none()), "nothing uploaded");
    assert!(
        step_outcomes(&summary.records)
            .iter()
            .all(|(_, o)| *o == StepOutcome::AlreadySatisfied)
    );
}

#[tokio::test]
async fn tools_shell_on_fresh_host_installs_and_appends_marker() {
    let config = DeployConfig::parse("remote = \"vm\"\nuser = \"root\"\n").unwrap();
    let runner = MockRunner::new()
        .on("test -f install_starship.sh", 1, "", "")
        .on("test -x ~/bin/starship", 1, "", "")
        .on("grep -qF", 1, "", "");
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "tools");

    run_playbook(&mut rb, PlaybookKind::Tools, &["shell"]).await.unwrap();

    assert_eq!(runner.count("curl -fsSL https://starship.rs/install.sh"), 1);
    let appended = runner
        .calls()
        .into_iter()
        .find(|c| c.remote_command().contains("cat >> \"$HOME\"/.bashrc"))
        .expect("bashrc append");
    let snippet = String::from_utf8(appended.stdin.unwrap()).unwrap();
    assert!(snippet.contains(BASHRC_MARKER));
}

#[tokio::test]
async fn installed_helm_release_is_not_reinstalled() {
    let config = DeployConfig::parse(MATTERMOST_CONFIG).unwrap();
    let runner = MockRunner::new().on(
        "helm list -n ingress-nginx",
        0,
        "NAME           NAMESPACE      STATUS\ningress-nginx  ingress-nginx  deployed\n",
        "",
    );
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "mattermost");

    run_playbook(&mut rb, PlaybookKind::Mattermost, &["ingress"]).await.unwrap();

    assert_eq!(runner.count("helm install"), 0);
    assert!(
        runner
            .remote_commands()
            .iter()
            .filter(|c| c.contains("helm list"))
            .all(|c| c.starts_with("export KUBECONFIG=\"$HOME\"/.kube/config && "))
    );
}

#[tokio::test]
async fn missing_helm_release_is_installed_once() {
    let config = DeployConfig::parse(MATTERMOST_CONFIG).unwrap();
    let runner = MockRunner::new();
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "mattermost");

    run_playbook(&mut rb, PlaybookKind::Mattermost, &["ingress"]).await.unwrap();
    let summary = rb.into_summary();

    assert_eq!(runner.count("helm install ingress-nginx"), 1);
    assert_eq!(summary.tally().applied, 1);
}

#[tokio::test]
async fn failed_install_aborts_with_step_error() {
    let config = DeployConfig::parse(MATTERMOST_CONFIG).unwrap();
    let runner = MockRunner::new().on(
        "helm install",
        1,
        "",
        "Error: INSTALLATION FAILED: cannot re-use a name",
    );
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "mattermost");

    let err = run_playbook(&mut rb, PlaybookKind::Mattermost, &["ingress"])
        .await
        .unwrap_err();
    assert!(err.downcast_ref::<StepError>().is_some(), "got: {err:#}");
    assert!(format!("{err:#}").contains("cannot re-use a name"));
    assert_eq!(runner.count("kubectl get svc -n ingress-nginx"), 0);
}

#[tokio::test]
async fn existing_database_user_is_not_recreated() {
    let config = DeployConfig::parse(NEXTCLOUD_CONFIG).unwrap();
    let runner = MockRunner::new().on("SELECT CONCAT", 0, "user:nc\n", "");
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "nextcloud");

    run_playbook(&mut rb, PlaybookKind::Nextcloud, &["database"]).await.unwrap();

    assert_eq!(runner.count("CREATE USER"), 0);
    assert_eq!(runner.count("CREATE DATABASE IF NOT EXISTS nextcloud"), 1);
}

#[tokio::test]
async fn configure_skips_install_when_occ_reports_installed() {
    let config = DeployConfig::parse(NEXTCLOUD_CONFIG).unwrap();
    let runner = MockRunner::new().on("occ status", 0, "  - installed: true\n", "");
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "nextcloud");

    run_playbook(&mut rb, PlaybookKind::Nextcloud, &["configure"]).await.unwrap();

    assert_eq!(runner.count("maintenance:install"), 0);
    assert_eq!(
        runner.count("config:system:set trusted_domains 1 --value=cloud.example.org"),
        1
    );
}

// --- mattermost: tls and certificates ---

#[tokio::test]
async fn ingress_is_not_reapplied_while_certificate_exists() {
    let config = DeployConfig::parse(MATTERMOST_CONFIG).unwrap();
    let runner =
        MockRunner::new().on("kubectl get certificate mattermost-tls -n mattermost", 0, "", "");
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "mattermost");

    run_playbook(&mut rb, PlaybookKind::Mattermost, &["tls"]).await.unwrap();

    assert_eq!(runner.count("kubectl apply -f ~/mattermost-ingress.yaml"), 0);
    let ingress =
        uploaded(&runner, "\"$HOME\"/mattermost-ingress.yaml").expect("ingress uploaded");
    assert!(ingress.contains("chat.example.org"));
}

#[tokio::test]
async fn ingress_is_applied_when_certificate_is_absent() {
    let config = DeployConfig::parse(MATTERMOST_CONFIG).unwrap();
    let runner = MockRunner::new().on(
        "kubectl get certificate mattermost-tls -n mattermost",
        1,
        "",
        "Error from server (NotFound): certificates.cert-manager.io \"mattermost-tls\" not found",
    );
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "mattermost");

    run_playbook(&mut rb, PlaybookKind::Mattermost, &["tls"]).await.unwrap();
    let summary = rb.into_summary();

    assert_eq!(runner.count("kubectl apply -f ~/mattermost-ingress.yaml"), 1);
    assert!(
        step_outcomes(&summary.records)
            .contains(&("mattermost ingress".to_string(), StepOutcome::Applied))
    );
}

#[tokio::test(start_paused = true)]
async fn certificate_timeout_warns_and_backs_up_without_tls_secret() {
    let config = mattermost_config_with_backup_dir();
    let runner = MockRunner::new()
        .on(CERTIFICATE_READY, 0, "False\n", "")
        .on(
            "kubectl get secret mattermost-tls",
            1,
            "",
            "Error from server (NotFound): secrets \"mattermost-tls\" not found",
        );
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "mattermost");

    run_playbook(&mut rb, PlaybookKind::Mattermost, &["certificates"]).await.unwrap();
    let summary = rb.into_summary();

    assert_eq!(runner.count(CERTIFICATE_READY), 60);
    assert_eq!(summary.tally().waits_timed_out, 1);
    assert!(
        summary.warnings.iter().any(|w| w.contains("certificate mattermost-tls not ready")),
        "warnings: {:?}",
        summary.warnings
    );
    assert_eq!(downloads_of(&runner, "mattermost-tls-secret.yaml"), 0);
    assert_eq!(downloads_of(&runner, "letsencrypt-prod-secret.yaml"), 1);
    assert_eq!(downloads_of(&runner, "letsencrypt-prod-clusterissuer.yaml"), 1);

    let written = fs.written.borrow();
    let (path, script, executable) = written.first().expect("restore script written");
    assert_eq!(path, &Path::new(BACKUP_DIR).join(RESTORE_SCRIPT));
    assert!(*executable);
    let script = String::from_utf8(script.clone()).unwrap();
    assert!(script.contains("if [ -f mattermost-tls-secret.yaml ]"));
}

#[tokio::test(start_paused = true)]
async fn ready_certificate_backs_up_tls_secret() {
    let config = mattermost_config_with_backup_dir();
    let runner = MockRunner::new().on(CERTIFICATE_READY, 0, "True\n", "");
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "mattermost");

    run_playbook(&mut rb, PlaybookKind::Mattermost, &["certificates"]).await.unwrap();
    let summary = rb.into_summary();

    assert_eq!(runner.count(CERTIFICATE_READY), 1);
    assert!(summary.warnings.is_empty(), "warnings: {:?}", summary.warnings);
    assert_eq!(downloads_of(&runner, "mattermost-tls-secret.yaml"), 1);
    assert_eq!(fs.written.borrow().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn ready_certificate_requires_tls_secret_export() {
    let config = mattermost_config_with_backup_dir();
    let runner = MockRunner::new()
        .on(CERTIFICATE_READY, 0, "True\n", "")
        .on("kubectl get secret mattermost-tls", 1, "", "forbidden");
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "mattermost");

    let err = run_playbook(&mut rb, PlaybookKind::Mattermost, &["certificates"])
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("forbidden"), "got: {err:#}");
    assert!(fs.written.borrow().is_empty(), "no restore script without the secret");
}

// --- nextcloud: webserver ---

#[tokio::test]
async fn webserver_edits_stock_configuration_files() {
    let config = DeployConfig::parse(NEXTCLOUD_CONFIG).unwrap();
    let runner = stock_webserver_host();
    let mut s = session(&runner);
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "nextcloud");

    run_playbook(&mut rb, PlaybookKind::Nextcloud, &["webserver"]).await.unwrap();

    let memcached = uploaded(&runner, MEMCACHED_CONF).expect("memcached.conf rewritten");
    assert!(memcached.contains("\n-m 512\n"));
    assert!(!memcached.contains("\n-m 64\n"));

    let pool = uploaded(&runner, POOL_CONF).expect("www.conf rewritten");
    assert!(pool.contains("pm.max_children = 80\npm.start_servers = 20\n"));
    assert!(pool.contains("\nenv[TMP] = /tmp\nenv[TMPDIR] = /tmp\n"));

    let ini = uploaded(&runner, PHP_INI).expect("php.ini rewritten");
    assert!(ini.contains("memory_limit = 1024M"));
    assert!(ini.contains("\nopcache.enable=1\n"));
    assert!(ini.contains(";opcache.enable_cli=0"));
    assert!(ini.contains(
        ";opcache.lockfile_path=/tmp\n\nopcache.jit=1255\nopcache.jit_buffer_size=256M\n\n[curl]\n"
    ));
}

#[tokio::test]
async fn webserver_rerun_leaves_edited_files_alone() {
    let config = DeployConfig::parse(NEXTCLOUD_CONFIG).unwrap();
    let (reporter, fs) = (NullReporter::default(), MemoryFs::default());
    let first = stock_webserver_host();
    {
        let mut s = session(&first);
        let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "nextcloud");
        run_playbook(&mut rb, PlaybookKind::Nextcloud, &["webserver"]).await.unwrap();
    }

    let mut edited = MockRunner::new();
    for path in [MEMCACHED_CONF, POOL_CONF, PHP_INI] {
        let content = uploaded(&first, path).unwrap();
        edited = edited.on(&format!("cat {path}"), 0, &content, "");
    }
    let mut s = session(&edited);
    let mut rb = Runbook::new(&mut s, &config, &EmbeddedAssets, &fs, &reporter, "nextcloud");
    run_playbook(&mut rb, PlaybookKind::Nextcloud, &["webserver"]).await.unwrap();
    let summary = rb.into_summary();

    for path in [MEMCACHED_CONF, POOL_CONF, PHP_INI] {
        assert!(uploaded(&edited, path).is_none(), "{path} rewritten again");
    }
    let edits: Vec<_> = step_outcomes(&summary.records)
        .into_iter()
        .filter(|(name, _)| name.starts_with("edit "))
        .collect();
    assert_eq!(edits.len(), 3);
    assert!(edits.iter().all(|(_, o)| *o == StepOutcome::AlreadySatisfied));
}
