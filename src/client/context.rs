use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::network::{ChannelInfo, Network, Peer};
use crate::crypto::CryptoSuite;
use crate::error::{BootstrapError, Result};
use crate::identity::{AdminCredentials, UserContext};
use crate::storage::{get_json, put_json, KeyValueStore};

/// A client bound to one network view, with its own state store,
/// crypto suite and current user.
pub struct ClientContext {
    network: Arc<dyn Network>,
    state_store: Option<Arc<dyn KeyValueStore>>,
    crypto_suite: Option<CryptoSuite>,
    user_context: Option<UserContext>,
}

impl ClientContext {
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self {
            network,
            state_store: None,
            crypto_suite: None,
            user_context: None,
        }
    }

    pub fn set_state_store(&mut self, store: Arc<dyn KeyValueStore>) {
        self.state_store = Some(store);
    }

    pub fn set_crypto_suite(&mut self, suite: CryptoSuite) {
        self.crypto_suite = Some(suite);
    }

    pub fn crypto_suite_mut(&mut self) -> Option<&mut CryptoSuite> {
        self.crypto_suite.as_mut()
    }

    /// Current user if it matches `name`, else (when `check_persistence`) the
    /// user persisted in the state store. A persisted user whose signing key
    /// is missing from the key store is treated as absent.
    pub async fn get_user_context(&mut self, name: &str, check_persistence: bool) -> Result<Option<UserContext>> {
        if let Some(user) = &self.user_context {
            if user.name == name {
                return Ok(Some(user.clone()));
            }
        }
        if !check_persistence {
            return Ok(None);
        }
        let Some(store) = self.state_store.clone() else {
            debug!("No state store attached, cannot load {}", name);
            return Ok(None);
        };

        let Some(user) = get_json::<UserContext>(store.as_ref(), name).await? else {
            return Ok(None);
        };
        if let Some(suite) = &self.crypto_suite {
            if suite.key_store().is_some() && !suite.has_key(user.signing_identity()).await? {
                warn!(
                    "User {} found in {:?} but its signing key {} is missing",
                    name,
                    store.location(),
                    user.signing_identity()
                );
                return Ok(None);
            }
        }

        debug!("Loaded user context {} from {:?}", name, store.location());
        self.user_context = Some(user.clone());
        Ok(Some(user))
    }

    /// Register a user from on-disk certificate and key, persisting it unless
    /// the credentials ask to skip persistence.
    pub async fn create_user(&mut self, credentials: &AdminCredentials) -> Result<UserContext> {
        let content = &credentials.crypto_content;
        let certificate = read_crypto_content(&content.signed_cert).await?;
        if !certificate.contains("-----BEGIN CERTIFICATE-----") {
            return Err(BootstrapError::KeyMaterial(format!(
                "{:?} is not a PEM certificate",
                content.signed_cert
            )));
        }
        let key_pem = read_crypto_content(&content.private_key).await?;

        let suite = self
            .crypto_suite
            .as_ref()
            .ok_or_else(|| BootstrapError::MissingComponent("crypto suite".to_string()))?;
        let ski = suite.import_key(&key_pem).await?;
        let user = UserContext::from_enrollment(credentials, ski, certificate);

        if !credentials.skip_persistence {
            let store = self
                .state_store
                .as_ref()
                .ok_or_else(|| BootstrapError::MissingComponent("state store".to_string()))?;
            put_json(store.as_ref(), &user.name, &user).await?;
        }

        info!("Created user context {} for {}", user.name, user.mspid);
        self.user_context = Some(user.clone());
        Ok(user)
    }

    pub async fn peers_for_org(&self, mspid: &str) -> Result<Vec<Peer>> {
        self.network.peers_for_org(mspid).await
    }

    pub async fn query_channels(&self, peer: &Peer, fresh: bool) -> Result<Vec<ChannelInfo>> {
        self.network.query_channels(peer, fresh).await
    }
}

async fn read_crypto_content(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BootstrapError::CryptoContent {
            path: path.to_path_buf(),
            source,
        })
}
