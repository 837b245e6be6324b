// Peer and channel lookups for a client context
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::config::ConnectionProfile;
use crate::error::{BootstrapError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Peer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub mspid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelInfo {
    pub channel_id: String,
}

#[async_trait]
pub trait Network: Send + Sync {
    /// Peers belonging to the organization with the given MSP id.
    async fn peers_for_org(&self, mspid: &str) -> Result<Vec<Peer>>;

    /// Channels the peer has joined. `fresh` bypasses any cached view.
    async fn query_channels(&self, peer: &Peer, fresh: bool) -> Result<Vec<ChannelInfo>>;
}

/// Answers peer and channel queries from a connection profile.
pub struct ProfileNetwork {
    profile: Arc<ConnectionProfile>,
    source: Option<PathBuf>,
}

impl ProfileNetwork {
    pub fn new(profile: Arc<ConnectionProfile>, source: Option<PathBuf>) -> Self {
        Self { profile, source }
    }

    async fn current_profile(&self, fresh: bool) -> Result<Arc<ConnectionProfile>> {
        let path = match (&self.source, fresh) {
            (Some(path), true) => path,
            _ => return Ok(self.profile.clone()),
        };
        debug!("Re-reading connection profile {:?}", path);
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BootstrapError::Network(format!("unable to re-read {:?}: {}", path, e)))?;
        // a profile that breaks mid-run is a lookup failure, not a startup config error
        let profile = ConnectionProfile::parse(path, &contents)
            .map_err(|e| BootstrapError::Network(format!("unable to re-read {:?}: {}", path, e)))?;
        Ok(Arc::new(profile))
    }
}

fn knows_peer(profile: &ConnectionProfile, name: &str) -> bool {
    profile.peers.contains_key(name)
        || profile
            .organizations
            .values()
            .any(|org| org.peers.iter().any(|p| p == name))
}

#[async_trait]
impl Network for ProfileNetwork {
    async fn peers_for_org(&self, mspid: &str) -> Result<Vec<Peer>> {
        let peers = self
            .profile
            .organizations
            .iter()
            .filter(|(id, org)| org.resolved_mspid(id) == mspid)
            .flat_map(|(_, org)| org.peers.iter())
            .map(|name| Peer {
                name: name.clone(),
                url: self.profile.peers.get(name).and_then(|p| p.url.clone()),
                mspid: mspid.to_string(),
            })
            .collect();
        Ok(peers)
    }

    async fn query_channels(&self, peer: &Peer, fresh: bool) -> Result<Vec<ChannelInfo>> {
        let profile = self.current_profile(fresh).await?;
        if !knows_peer(&profile, &peer.name) {
            return Err(BootstrapError::Network(format!("unknown peer '{}'", peer.name)));
        }
        Ok(profile
            .channels
            .iter()
            .filter(|(_, channel)| channel.peers.contains_key(&peer.name))
            .map(|(name, _)| ChannelInfo {
                channel_id: name.clone(),
            })
            .collect())
    }
}
