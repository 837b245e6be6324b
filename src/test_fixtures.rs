//! Throwaway crypto-config trees and connection profiles for tests.

use p256::pkcs8::{EncodePrivateKey, LineEnding};
use p256::SecretKey;
use rand::rngs::OsRng;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::OrgSpec;
use crate::crypto::subject_key_identifier;
use crate::keys::{admin_msp_dir, signed_cert_path};

pub const TEST_CERT: &str = "-----BEGIN CERTIFICATE-----\n\
MIICGjCCAcCgAwIBAgIRAPlxmhfDOdF3tE4OUHzI3LAwCgYIKoZIzj0EAwIwczEL\n\
-----END CERTIFICATE-----\n";

pub fn org_spec(id: &str, name: &str) -> OrgSpec {
    OrgSpec {
        id: id.to_string(),
        name: name.to_string(),
        mspid: id.to_string(),
        domain: "example.com".to_string(),
    }
}

pub fn generate_key_pem() -> String {
    let key = SecretKey::random(&mut OsRng);
    key.to_pkcs8_pem(LineEnding::LF).unwrap().as_str().to_owned()
}

pub struct CryptoFixture {
    dir: TempDir,
}

impl CryptoFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Lay out admin key and certificate for `org`; returns the key path.
    pub fn add_admin(&self, org: &OrgSpec) -> PathBuf {
        let msp = admin_msp_dir(self.root(), org);
        let keystore = msp.join("keystore");
        std::fs::create_dir_all(&keystore).unwrap();
        std::fs::create_dir_all(msp.join("signcerts")).unwrap();

        let pem = generate_key_pem();
        let ski = subject_key_identifier(&crate::crypto::parse_private_key(&pem).unwrap().public_key());
        let key_path = keystore.join(format!("{}_sk", ski));
        std::fs::write(&key_path, pem).unwrap();
        std::fs::write(signed_cert_path(&msp, &org.admin_username()), TEST_CERT).unwrap();
        key_path
    }

    /// Profile declaring one peer per org, all joined to `mychannel`.
    pub fn write_profile(&self, orgs: &[&OrgSpec]) -> PathBuf {
        let mut organizations = serde_json::Map::new();
        let mut peers = serde_json::Map::new();
        let mut channel_peers = serde_json::Map::new();
        for org in orgs {
            let peer = format!("peer0.{}", org.org_domain());
            organizations.insert(
                org.id.clone(),
                serde_json::json!({ "mspid": org.mspid, "peers": [peer] }),
            );
            peers.insert(
                peer.clone(),
                serde_json::json!({ "url": format!("grpcs://{}:7051", peer) }),
            );
            channel_peers.insert(peer, serde_json::json!({}));
        }
        let profile = serde_json::json!({
            "name": "test-network",
            "organizations": organizations,
            "peers": peers,
            "channels": { "mychannel": { "peers": channel_peers } },
        });

        let path = self.root().join("connection-profile.json");
        std::fs::write(&path, serde_json::to_string_pretty(&profile).unwrap()).unwrap();
        path
    }
}
