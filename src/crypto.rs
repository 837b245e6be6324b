use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use p256::{PublicKey, SecretKey};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BootstrapError, Result};

/// Parse a PEM private key (PKCS#8, or SEC1 `EC PRIVATE KEY`).
pub fn parse_private_key(pem: &str) -> Result<SecretKey> {
    if let Ok(key) = SecretKey::from_pkcs8_pem(pem) {
        return Ok(key);
    }
    SecretKey::from_sec1_pem(pem)
        .map_err(|e| BootstrapError::KeyMaterial(format!("unsupported private key: {}", e)))
}

/// Hex SHA-256 of the uncompressed public point.
pub fn subject_key_identifier(public: &PublicKey) -> String {
    let point = public.to_encoded_point(false);
    hex::encode(Sha256::digest(point.as_bytes()))
}

/// File-backed key store: `<ski>-priv` and `<ski>-pub` PEM files.
#[derive(Debug, Clone)]
pub struct CryptoKeyStore {
    dir: PathBuf,
}

impl CryptoKeyStore {
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| BootstrapError::Store {
                path: dir.to_path_buf(),
                source,
            })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn location(&self) -> &Path {
        &self.dir
    }

    fn private_path(&self, ski: &str) -> PathBuf {
        self.dir.join(format!("{}-priv", ski))
    }

    fn public_path(&self, ski: &str) -> PathBuf {
        self.dir.join(format!("{}-pub", ski))
    }

    pub async fn put_key(&self, ski: &str, key: &SecretKey) -> Result<()> {
        let private_pem = key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| BootstrapError::KeyMaterial(e.to_string()))?;
        let public_pem = key
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| BootstrapError::KeyMaterial(e.to_string()))?;

        write_file(&self.private_path(ski), private_pem.as_bytes()).await?;
        write_file(&self.public_path(ski), public_pem.as_bytes()).await
    }

    pub async fn get_key(&self, ski: &str) -> Result<Option<SecretKey>> {
        let path = self.private_path(ski);
        match tokio::fs::read_to_string(&path).await {
            Ok(pem) => parse_private_key(&pem).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BootstrapError::Store { path, source }),
        }
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| BootstrapError::Store {
            path: path.to_path_buf(),
            source,
        })
}

/// Key handling for a client context. Keys are only persisted once a key
/// store is attached.
#[derive(Debug, Default)]
pub struct CryptoSuite {
    key_store: Option<CryptoKeyStore>,
}

impl CryptoSuite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_store(&mut self, key_store: CryptoKeyStore) {
        self.key_store = Some(key_store);
    }

    pub fn key_store(&self) -> Option<&CryptoKeyStore> {
        self.key_store.as_ref()
    }

    /// Import a PEM private key, returning its subject key identifier.
    pub async fn import_key(&self, pem: &str) -> Result<String> {
        let key_store = self
            .key_store
            .as_ref()
            .ok_or_else(|| BootstrapError::MissingComponent("crypto key store".to_string()))?;
        let key = parse_private_key(pem)?;
        let ski = subject_key_identifier(&key.public_key());
        key_store.put_key(&ski, &key).await?;
        debug!("Imported key {} into {:?}", ski, key_store.location());
        Ok(ski)
    }

    pub async fn has_key(&self, ski: &str) -> Result<bool> {
        match &self.key_store {
            Some(store) => Ok(store.get_key(ski).await?.is_some()),
            None => Ok(false),
        }
    }
}
