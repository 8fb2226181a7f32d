//! `nextcloud`: Apache with PHP-FPM, MariaDB and memcached, then a
//! Nextcloud release installed through `occ`.

use anyhow::Result;

use crate::application::ports::{ConfigSupplier, RemoteSession};
use crate::application::services::runbook::Runbook;
use crate::domain::config::{DeployConfig, Overlay};
use crate::domain::edit::Replacement;
use crate::domain::playbook::PlaybookKind;
use crate::domain::shell::quote;
use crate::domain::step::{Action, Probe, Step};

pub const DEFAULT_PHP_VERSION: &str = "8.3";
pub const INSTALL_DIR: &str = "/var/www/nextcloud";
const OCC: &str = "sudo -u www-data php /var/www/nextcloud/occ";

const PHP_MODULES: &[&str] = &[
    "cli", "common", "curl", "gd", "mbstring", "xml", "zip", "intl", "gmp", "bcmath", "mysql",
    "imagick", "memcached", "apcu",
];

/// Run one phase of the nextcloud playbook.
///
/// # Errors
///
/// Returns the first failing command or step.
pub async fn run_phase<S: RemoteSession>(rb: &mut Runbook<'_, S>, phase: &str) -> Result<()> {
    let php = php_version(rb.config())?;
    match phase {
        "packages" => packages(rb, &php).await,
        "webserver" => webserver(rb, &php).await,
        "database" => database(rb).await,
        "download" => download(rb, &php).await,
        "configure" => configure(rb).await,
        other => Err(super::unknown_phase(PlaybookKind::Nextcloud, other)),
    }
}

fn php_version(config: &DeployConfig) -> Result<String> {
    config.get_or("php_version", DEFAULT_PHP_VERSION)
}

/// `apt install` line for PHP-FPM and the modules Nextcloud needs.
#[must_use]
pub fn php_packages(php: &str) -> String {
    let mut line = format!("apt install --assume-yes php{php}-fpm");
    for module in PHP_MODULES {
        line.push_str(&format!(" php{php}-{module}"));
    }
    line
}

async fn packages<S: RemoteSession>(rb: &mut Runbook<'_, S>, php: &str) -> Result<()> {
    rb.run_all(&[
        "apt install --assume-yes curl wget gnupg2 lsb-release ca-certificates",
        "apt install --assume-yes apache2",
        "apt install --assume-yes imagemagick memcached libmemcached-tools mariadb-server unzip smbclient",
    ])
    .await?;
    rb.run(&php_packages(php)).await?;
    Ok(())
}

/// PHP-FPM pool sizing and environment for Nextcloud.
#[must_use]
pub fn pool_replacements() -> Vec<Replacement> {
    [
        ("max_children = 5", "max_children = 80"),
        ("start_servers = 2", "start_servers = 20"),
        ("min_spare_servers = 1", "min_spare_servers = 20"),
        ("max_spare_servers = 3", "max_spare_servers = 60"),
        (";env[HOSTNAME] = $HOSTNAME", "env[HOSTNAME] = $HOSTNAME"),
        (
            ";env[PATH] = /usr/local/bin:/usr/bin:/bin",
            "env[PATH] = /usr/local/bin:/usr/bin:/bin",
        ),
        (";env[TMP] = /tmp", "env[TMP] = /tmp"),
        (";env[TMPDIR] = /tmp", "env[TMPDIR] = /tmp"),
        (";env[TEMP] = /tmp", "env[TEMP] = /tmp"),
    ]
    .into_iter()
    .map(|(old, new)| Replacement::new(old, new))
    .collect()
}

/// `php.ini` limits and opcache tuning. The JIT lines have no commented
/// template, so they are inserted before the `[curl]` section header.
#[must_use]
pub fn php_ini_replacements() -> Vec<Replacement> {
    let mut replacements: Vec<Replacement> = [
        ("memory_limit = 128M", "memory_limit = 1024M"),
        ("post_max_size = 8M", "post_max_size = 512M"),
        ("upload_max_filesize = 2M", "upload_max_filesize = 1024M"),
        (";opcache.enable=1", "opcache.enable=1"),
        (";opcache.memory_consumption=128", "opcache.memory_consumption=1024"),
        (
            ";opcache.interned_strings_buffer=8",
            "opcache.interned_strings_buffer=64",
        ),
        (
            ";opcache.max_accelerated_files=10000",
            "opcache.max_accelerated_files=150000",
        ),
        (
            ";opcache.max_wasted_percentage=5",
            "opcache.max_wasted_percentage=15",
        ),
        (";opcache.revalidate_freq=2", "opcache.revalidate_freq=60"),
        (";opcache.save_comments=1", "opcache.save_comments=1"),
    ]
    .into_iter()
    .map(|(old, new)| Replacement::new(old, new))
    .collect();
    replacements.push(Replacement::new(
        ";opcache.lockfile_path=/tmp\n\n[curl]\n",
        ";opcache.lockfile_path=/tmp\n\nopcache.jit=1255\nopcache.jit_buffer_size=256M\n\n[curl]\n",
    ));
    replacements
}

async fn webserver<S: RemoteSession>(rb: &mut Runbook<'_, S>, php: &str) -> Result<()> {
    rb.run(&format!("a2enconf php{php}-fpm")).await?;
    let vars = Overlay::new(rb.config()).with("php_version", php);
    rb.push_template(
        "nextcloud/vhost.conf",
        "/etc/apache2/sites-available/nextcloud.conf",
        &vars,
    )
    .await?;
    rb.run_all(&[
        "sudo a2enmod headers rewrite mpm_event http2 mime proxy proxy_fcgi setenvif alias dir env ssl proxy_http proxy_wstunnel",
        "sudo a2dismod mpm_prefork",
        "sudo a2ensite nextcloud.conf",
    ])
    .await?;

    let memory = rb.config().get("memcached_memory")?;
    rb.edit_file(
        "/etc/memcached.conf",
        &[Replacement::new("-m 64", format!("-m {memory}"))],
    )
    .await?;
    rb.edit_file(
        &format!("/etc/php/{php}/fpm/pool.d/www.conf"),
        &pool_replacements(),
    )
    .await?;
    rb.edit_file(
        &format!("/etc/php/{php}/fpm/php.ini"),
        &php_ini_replacements(),
    )
    .await?;
    Ok(())
}

fn mysql(statement: &str) -> String {
    format!("mysql --execute {}", quote(statement))
}

async fn database<S: RemoteSession>(rb: &mut Runbook<'_, S>) -> Result<()> {
    let user = rb.config().get("sql_user")?;
    let password = rb.config().get("sql_password")?;
    rb.require(&Step::new(
        format!("database user {user}"),
        Probe::stdout_contains(
            mysql(&format!(
                "SELECT CONCAT('user:', User) FROM mysql.user WHERE User = '{user}' AND Host = 'localhost';"
            )),
            format!("user:{user}"),
        ),
        Action::command(mysql(&format!(
            "CREATE USER '{user}'@'localhost' IDENTIFIED BY '{password}';"
        ))),
    ))
    .await?;
    rb.run(&mysql(
        "CREATE DATABASE IF NOT EXISTS nextcloud CHARACTER SET utf8mb4 COLLATE utf8mb4_general_ci;",
    ))
    .await?;
    rb.run(&mysql(&format!(
        "GRANT ALL PRIVILEGES ON nextcloud.* TO '{user}'@'localhost';"
    )))
    .await?;
    rb.run(&mysql("FLUSH PRIVILEGES;")).await?;
    Ok(())
}

async fn download<S: RemoteSession>(rb: &mut Runbook<'_, S>, php: &str) -> Result<()> {
    let url = rb.config().get("nc_release_file_url")?;
    rb.chdir(Some("/var/www"));
    let fetched = rb
        .require(&Step::new(
            "nextcloud release",
            Probe::exit_code(format!("test -d {INSTALL_DIR}")),
            Action::Commands(vec![
                format!("wget -q -O nextcloud.tar.bz2 {}", quote(&url)),
                "tar xjf nextcloud.tar.bz2".to_string(),
            ]),
        ))
        .await;
    rb.chdir(None);
    fetched?;

    rb.run_all(&[
        "chown -R www-data:www-data /var/www/nextcloud",
        // a2dissite exits 0 when the site is already disabled
        "a2dissite 000-default.conf",
        "a2ensite nextcloud.conf",
        "systemctl restart apache2",
        "systemctl restart memcached",
    ])
    .await?;
    rb.run(&format!("systemctl restart php{php}-fpm")).await?;
    Ok(())
}

/// `occ maintenance:install` with every argument shell-quoted.
///
/// # Errors
///
/// Returns [`crate::domain::ConfigError::MissingKey`] for absent keys.
pub fn install_command(config: &impl ConfigSupplier) -> Result<String> {
    Ok(format!(
        "{OCC} maintenance:install --database mysql --database-name nextcloud \
         --database-user {} --database-pass {} --admin-user {} --admin-pass {} \
         --data-dir {INSTALL_DIR}/data",
        quote(&config.get("sql_user")?),
        quote(&config.get("sql_password")?),
        quote(&config.get("nc_admin_user")?),
        quote(&config.get("nc_admin_pw")?),
    ))
}

async fn configure<S: RemoteSession>(rb: &mut Runbook<'_, S>) -> Result<()> {
    let install = install_command(rb.config())?;
    rb.require(&Step::new(
        "nextcloud installation",
        Probe::stdout_contains(format!("{OCC} status"), "installed: true"),
        Action::command(install),
    ))
    .await?;

    let server_name = rb.config().get("server_name")?;
    let settings = [
        ("trusted_domains 1", server_name.clone()),
        // used in generated links, e.g. in notification emails
        ("overwrite.cli.url", format!("https://{server_name}")),
        ("memcache.local", r"\OC\Memcache\APCu".to_string()),
        ("memcache.distributed", r"\OC\Memcache\Memcached".to_string()),
        ("memcache.locking", r"\OC\Memcache\Memcached".to_string()),
    ];
    for (name, value) in settings {
        rb.run(&format!(
            "{OCC} config:system:set {name} --value={}",
            quote(&value)
        ))
        .await?;
    }
    Ok(())
}
