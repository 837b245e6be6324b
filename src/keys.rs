//! Locates organization admin key material in a crypto-config tree.

use futures::future::try_join_all;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::config::OrgSpec;
use crate::error::{BootstrapError, Result};
use crate::identity::AdminCredentials;

/// Suffix of private key files written by the crypto material generator.
pub const PRIVATE_KEY_SUFFIX: &str = "_sk";

/// `<root>/peerOrganizations/<org>.<domain>/users/Admin@<org>.<domain>/msp`
pub fn admin_msp_dir(crypto_root: &Path, org: &OrgSpec) -> PathBuf {
    crypto_root
        .join("peerOrganizations")
        .join(org.org_domain())
        .join("users")
        .join(org.admin_username())
        .join("msp")
}

pub fn signed_cert_path(msp_dir: &Path, username: &str) -> PathBuf {
    msp_dir.join("signcerts").join(format!("{}-cert.pem", username))
}

/// Files in `dir` matching `*_sk`, sorted. A missing directory yields no matches.
pub async fn find_private_keys(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut keys = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with('.') || !name.ends_with(PRIVATE_KEY_SUFFIX) {
            continue;
        }
        // follows symlinks
        match tokio::fs::metadata(entry.path()).await {
            Ok(meta) if meta.is_file() => keys.push(entry.path()),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    keys.sort();
    Ok(keys)
}

/// Build the admin credential descriptor for one organization.
pub async fn discover(crypto_root: &Path, org: &OrgSpec) -> Result<AdminCredentials> {
    let msp_dir = admin_msp_dir(crypto_root, org);
    let keystore = msp_dir.join("keystore");

    let keys = match find_private_keys(&keystore).await {
        Ok(keys) => keys,
        Err(source) => {
            error!("Unable to find private key for {}: {}", org.id, source);
            return Err(BootstrapError::Keystore { dir: keystore, source });
        }
    };

    let Some(private_key) = keys.first().cloned() else {
        error!("Unable to find private key for {}: no *{} file in {:?}", org.id, PRIVATE_KEY_SUFFIX, keystore);
        return Err(BootstrapError::KeyNotFound {
            org: org.id.clone(),
            dir: keystore,
        });
    };
    if keys.len() > 1 {
        warn!(
            "{} private keys in {:?}, using {:?}; ignored: {:?}",
            keys.len(),
            keystore,
            private_key,
            &keys[1..]
        );
    }

    let username = org.admin_username();
    let signed_cert = signed_cert_path(&msp_dir, &username);
    debug!("Admin key for {}: {:?}", org.id, private_key);

    Ok(AdminCredentials::new(org, signed_cert, private_key))
}

/// Discover every organization concurrently; the first failure fails the batch.
pub async fn discover_all(crypto_root: &Path, orgs: &[OrgSpec]) -> Result<Vec<AdminCredentials>> {
    try_join_all(orgs.iter().map(|org| discover(crypto_root, org))).await
}
