//! Local backup of the Let's Encrypt state of a Mattermost install.
//!
//! Keeping the ACME account key and the issued certificate lets a rebuilt
//! host serve HTTPS without a new issuance.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::application::ports::{ConfigSupplier, RemoteSession};
use crate::application::services::runbook::Runbook;

pub const DEFAULT_BACKUP_DIR: &str = "./lets_encrypt_backup";
pub const RESTORE_SCRIPT: &str = "restore_certificates.sh";

/// One exported Kubernetes object.
struct Export {
    command: &'static str,
    file: &'static str,
}

const TLS_SECRET: Export = Export {
    command: "kubectl get secret mattermost-tls -n mattermost -o yaml",
    file: "mattermost-tls-secret.yaml",
};

const ACCOUNT_SECRET: Export = Export {
    command: "kubectl get secret letsencrypt-prod -n cert-manager -o yaml",
    file: "letsencrypt-prod-secret.yaml",
};

const CLUSTER_ISSUER: Export = Export {
    command: "kubectl get clusterissuer letsencrypt-prod -o yaml",
    file: "letsencrypt-prod-clusterissuer.yaml",
};

/// Export the TLS secret, ACME account secret and ClusterIssuer, copy them
/// into the local backup directory and write a restore script next to them.
///
/// The account secret is optional. The TLS secret is optional only when
/// the certificate never became ready.
///
/// # Errors
///
/// Returns an error if a required export or download fails, or the local
/// directory cannot be written.
pub async fn backup<S: RemoteSession>(
    rb: &mut Runbook<'_, S>,
    certificate_ready: bool,
) -> Result<PathBuf> {
    let dir = PathBuf::from(rb.config().get_or("mattermost::backup_dir", DEFAULT_BACKUP_DIR)?);
    rb.create_local_dir(&dir)?;
    rb.note("backing up Let's Encrypt certificates");

    for (export, required) in [
        (&TLS_SECRET, certificate_ready),
        (&ACCOUNT_SECRET, false),
        (&CLUSTER_ISSUER, true),
    ] {
        save(rb, export, &dir, required).await?;
    }

    let script = rb.render(&format!("mattermost/{RESTORE_SCRIPT}"), rb.config())?;
    let script_path = dir.join(RESTORE_SCRIPT);
    rb.write_local(&script_path, script.as_bytes(), true)?;

    rb.success(&format!(
        "Let's Encrypt certificates backed up to {}",
        dir.display()
    ));
    rb.note(&format!(
        "to restore on a fresh installation run: bash {}",
        script_path.display()
    ));
    Ok(dir)
}

async fn save<S: RemoteSession>(
    rb: &mut Runbook<'_, S>,
    export: &Export,
    dir: &Path,
    required: bool,
) -> Result<()> {
    let remote = format!("~/{}", export.file);
    let command = format!("{} > {remote}", export.command);
    if required {
        rb.run(&command).await?;
    } else if !rb.run_tolerant(&command).await?.succeeded() {
        return Ok(());
    }
    rb.download(&remote, &dir.join(export.file), required).await?;
    Ok(())
}
