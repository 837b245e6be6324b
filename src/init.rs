//! Prepopulates per-organization key/value stores with the admin identity
//! of every organization in a connection profile.

use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::client::{ClientContext, Network, ProfileNetwork};
use crate::config::{store_dir, ConnectionProfile, OrgNaming, OrgSpec};
use crate::crypto::{CryptoKeyStore, CryptoSuite};
use crate::error::{BootstrapError, Result, RunStatus};
use crate::identity::AdminCredentials;
use crate::keys::{discover, discover_all};
use crate::storage::{FileKeyValueStore, KeyValueStore};

pub struct BootstrapOptions {
    pub connection_profile: PathBuf,
    pub crypto_root: PathBuf,
    pub store_root: PathBuf,
    pub naming: OrgNaming,
    pub domain: String,
    /// Report per-organization failures instead of aborting the batch.
    pub keep_going: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultRecord {
    pub username: String,
    /// JSON array of peers
    pub peers: String,
    /// JSON array of channels
    pub channels: String,
    /// Identity was created by this run rather than found in the store
    pub registered: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrgOutcome {
    Populated(ResultRecord),
    Failed { org: String, reason: String },
}

#[derive(Debug, Default)]
pub struct Report {
    pub outcomes: Vec<OrgOutcome>,
}

impl Report {
    pub fn records(&self) -> Vec<&ResultRecord> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                OrgOutcome::Populated(record) => Some(record),
                OrgOutcome::Failed { .. } => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                OrgOutcome::Failed { org, reason } => Some((org.as_str(), reason.as_str())),
                OrgOutcome::Populated(_) => None,
            })
            .collect()
    }

    pub fn status(&self) -> RunStatus {
        let failed = self.failures().len();
        if failed == 0 {
            RunStatus::Success
        } else if failed == self.outcomes.len() {
            RunStatus::Failure
        } else {
            RunStatus::PartialFailure
        }
    }

    pub fn print(&self) {
        match serde_json::to_string_pretty(&self.records()) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Unable to render result records: {}", e),
        }
        let failures = self.failures();
        if failures.is_empty() {
            println!("All set. Key value store populated.");
            return;
        }
        for (org, reason) in failures {
            eprintln!("{}: {}", org, reason);
        }
        eprintln!("Something went wrong.");
    }
}

/// Load the profile and populate every organization's store.
pub async fn bootstrap(options: &BootstrapOptions) -> Result<Report> {
    let profile = Arc::new(ConnectionProfile::load(&options.connection_profile)?);
    let orgs = profile.org_specs(options.naming, &options.domain)?;
    let network: Arc<dyn Network> = Arc::new(ProfileNetwork::new(
        profile.clone(),
        Some(options.connection_profile.clone()),
    ));
    info!("Populating {} organization(s) under {:?}", orgs.len(), options.store_root);
    run(network, &orgs, options).await
}

pub async fn run(
    network: Arc<dyn Network>,
    orgs: &[OrgSpec],
    options: &BootstrapOptions,
) -> Result<Report> {
    if options.keep_going {
        Ok(run_keep_going(network, orgs, options).await)
    } else {
        run_fail_fast(network, orgs, options).await
    }
}

async fn run_fail_fast(
    network: Arc<dyn Network>,
    orgs: &[OrgSpec],
    options: &BootstrapOptions,
) -> Result<Report> {
    let credentials = discover_all(&options.crypto_root, orgs).await?;

    let records = try_join_all(orgs.iter().zip(&credentials).map(|(org, creds)| {
        populate_org(
            network.clone(),
            creds,
            store_dir(&options.store_root, org),
        )
    }))
    .await?;

    Ok(Report {
        outcomes: records.into_iter().map(OrgOutcome::Populated).collect(),
    })
}

async fn run_keep_going(
    network: Arc<dyn Network>,
    orgs: &[OrgSpec],
    options: &BootstrapOptions,
) -> Report {
    let discovered = join_all(orgs.iter().map(|org| discover(&options.crypto_root, org))).await;

    let outcomes = join_all(orgs.iter().zip(discovered).map(|(org, found)| {
        let network = network.clone();
        let dir = store_dir(&options.store_root, org);
        async move {
            let populated = match found {
                Ok(creds) => populate_org(network, &creds, dir).await,
                Err(e) => Err(e),
            };
            match populated {
                Ok(record) => OrgOutcome::Populated(record),
                Err(e) => {
                    error!("Organization {} failed: {}", org.id, e);
                    OrgOutcome::Failed {
                        org: org.id.clone(),
                        reason: e.to_string(),
                    }
                }
            }
        }
    }))
    .await;

    Report { outcomes }
}

/// Register (or find) one organization's admin in its store and record the
/// organization's peers and the channels its first peer has joined.
pub async fn populate_org(
    network: Arc<dyn Network>,
    credentials: &AdminCredentials,
    dir: PathBuf,
) -> Result<ResultRecord> {
    let mut client = ClientContext::new(network);
    client.set_crypto_suite(CryptoSuite::new());

    let store = FileKeyValueStore::open(&dir).await?;
    println!(
        "Prepopulating key/value store for {} located at '{}'.",
        credentials.username,
        store.location().display()
    );
    client.set_state_store(Arc::new(store));

    let key_store = CryptoKeyStore::open(&dir).await?;
    client
        .crypto_suite_mut()
        .ok_or_else(|| BootstrapError::MissingComponent("crypto suite".to_string()))?
        .set_key_store(key_store);

    let (user, registered) = match client.get_user_context(&credentials.username, true).await? {
        Some(user) => {
            info!("User {} already present in {:?}", user.name, dir);
            (user, false)
        }
        None => (client.create_user(credentials).await?, true),
    };

    let peers = client.peers_for_org(&credentials.mspid).await?;
    let first = peers
        .first()
        .ok_or_else(|| BootstrapError::NoPeers(credentials.mspid.clone()))?;
    let channels = client.query_channels(first, true).await?;

    Ok(ResultRecord {
        username: user.name,
        peers: serde_json::to_string(&peers)?,
        channels: serde_json::to_string(&channels)?,
        registered,
    })
}
