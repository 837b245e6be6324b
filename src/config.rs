use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{BootstrapError, Result};

/// Store directory created under the home directory when no path is given.
pub const DEFAULT_STORE_DIR: &str = ".hfc-key-store";
/// Relative store directory used when no home directory can be resolved.
pub const FALLBACK_STORE_DIR: &str = "dappinstances";

/// How an organization identifier from the profile becomes the short name
/// used in crypto-config paths and store directories.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OrgNaming {
    /// `Org1MSP` -> `org1`
    #[default]
    StripMsp,
    /// `org1` -> `org1`
    AsIs,
}

impl OrgNaming {
    pub fn short_name(self, org_id: &str) -> String {
        match self {
            OrgNaming::StripMsp => org_id
                .strip_suffix("MSP")
                .unwrap_or(org_id)
                .to_lowercase(),
            OrgNaming::AsIs => org_id.to_string(),
        }
    }
}

/// Tool settings, read from an optional TOML file.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub naming: OrgNaming,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default)]
    pub default_store_root: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_domain() -> String {
    "example.com".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            naming: OrgNaming::default(),
            domain: default_domain(),
            default_store_root: None,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Without a path the defaults apply; an explicit path must exist and parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path).map_err(|e| BootstrapError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&contents).map_err(|e| BootstrapError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectionProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub organizations: BTreeMap<String, OrganizationConfig>,
    #[serde(default)]
    pub peers: BTreeMap<String, PeerConfig>,
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct OrganizationConfig {
    #[serde(default, alias = "mspId", skip_serializing_if = "Option::is_none")]
    pub mspid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub peers: Vec<String>,
}

impl OrganizationConfig {
    /// The configured `mspid`, or one derived from the organization identifier.
    pub fn resolved_mspid(&self, org_id: &str) -> String {
        self.mspid.clone().unwrap_or_else(|| default_mspid(org_id))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PeerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ChannelConfig {
    #[serde(default)]
    pub peers: BTreeMap<String, serde_json::Value>,
}

impl ConnectionProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| BootstrapError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let profile = Self::parse(path, &contents)?;
        info!(
            "Loaded connection profile {:?} with {} organization(s)",
            path,
            profile.organizations.len()
        );
        Ok(profile)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        serde_json::from_str(contents).map_err(|source| BootstrapError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Derive the per-organization options, validating them against the profile.
    pub fn org_specs(&self, naming: OrgNaming, default_domain: &str) -> Result<Vec<OrgSpec>> {
        let mut seen: BTreeMap<String, &String> = BTreeMap::new();
        let mut seen_mspids: BTreeMap<String, &String> = BTreeMap::new();
        let mut specs = Vec::with_capacity(self.organizations.len());

        for (id, org) in &self.organizations {
            let name = naming.short_name(id);
            if name.is_empty() || name == "." || name == ".." || name.contains(|c: char| c == '/' || c == '\\') {
                return Err(BootstrapError::ConfigInvalid(format!(
                    "organization '{}' has no usable short name (got '{}')",
                    id, name
                )));
            }
            if let Some(other) = seen.insert(name.clone(), id) {
                return Err(BootstrapError::ConfigInvalid(format!(
                    "organizations '{}' and '{}' both map to '{}'",
                    other, id, name
                )));
            }
            if !self.peers.is_empty() {
                if let Some(unknown) = org.peers.iter().find(|p| !self.peers.contains_key(*p)) {
                    return Err(BootstrapError::ConfigInvalid(format!(
                        "organization '{}' references undeclared peer '{}'",
                        id, unknown
                    )));
                }
            }

            let mspid = org.resolved_mspid(id);
            if mspid.is_empty() {
                return Err(BootstrapError::ConfigInvalid(format!(
                    "organization '{}' has an empty mspid",
                    id
                )));
            }
            if let Some(other) = seen_mspids.insert(mspid.clone(), id) {
                return Err(BootstrapError::ConfigInvalid(format!(
                    "organizations '{}' and '{}' share mspid '{}'",
                    other, id, mspid
                )));
            }
            let domain = org.domain.clone().unwrap_or_else(|| default_domain.to_string());

            debug!("Organization {} -> name={} mspid={} domain={}", id, name, mspid, domain);
            specs.push(OrgSpec {
                id: id.clone(),
                name,
                mspid,
                domain,
            });
        }

        Ok(specs)
    }
}

fn default_mspid(org_id: &str) -> String {
    if org_id.ends_with("MSP") {
        org_id.to_string()
    } else {
        format!("{}MSP", org_id)
    }
}

/// Per-organization options derived from the profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgSpec {
    pub id: String,
    pub name: String,
    pub mspid: String,
    pub domain: String,
}

impl OrgSpec {
    /// `org1.example.com`
    pub fn org_domain(&self) -> String {
        format!("{}.{}", self.name, self.domain)
    }

    pub fn admin_username(&self) -> String {
        format!("Admin@{}", self.org_domain())
    }
}

/// Root under which per-organization stores are created.
pub fn store_root(explicit: Option<&Path>, settings: &Settings) -> PathBuf {
    resolve_store_root(explicit, settings.default_store_root.as_deref(), dirs::home_dir())
}

fn resolve_store_root(explicit: Option<&Path>, configured: Option<&Path>, home: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit.or(configured) {
        return path.to_path_buf();
    }
    match home {
        Some(home) => home.join(DEFAULT_STORE_DIR),
        None => PathBuf::from(FALLBACK_STORE_DIR),
    }
}

pub fn store_dir(root: &Path, org: &OrgSpec) -> PathBuf {
    root.join(&org.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"{
        "name": "basic-network",
        "organizations": {
            "Org1MSP": { "mspid": "Org1MSP", "peers": ["peer0.org1.example.com"] },
            "Org2MSP": { "peers": ["peer0.org2.example.com"], "domain": "acme.org" }
        },
        "peers": {
            "peer0.org1.example.com": { "url": "grpcs://localhost:7051" },
            "peer0.org2.example.com": { "url": "grpcs://localhost:9051" }
        },
        "client": { "organization": "Org1MSP" }
    }"#;

    fn parse(json: &str) -> Result<ConnectionProfile> {
        ConnectionProfile::parse(Path::new("profile.json"), json)
    }

    #[test]
    fn test_naming_strategies() {
        assert_eq!(OrgNaming::StripMsp.short_name("Org1MSP"), "org1");
        assert_eq!(OrgNaming::StripMsp.short_name("org1"), "org1");
        assert_eq!(OrgNaming::AsIs.short_name("Org1MSP"), "Org1MSP");
        assert_eq!(OrgNaming::AsIs.short_name("org1"), "org1");
    }

    #[test]
    fn test_org_specs() {
        let profile = parse(PROFILE).unwrap();
        let specs = profile.org_specs(OrgNaming::StripMsp, "example.com").unwrap();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "org1");
        assert_eq!(specs[0].mspid, "Org1MSP");
        assert_eq!(specs[0].admin_username(), "Admin@org1.example.com");
        assert_eq!(specs[1].mspid, "Org2MSP");
        assert_eq!(specs[1].org_domain(), "org2.acme.org");
    }

    #[test]
    fn test_mspid_fallback_for_plain_ids() {
        let profile = parse(r#"{ "organizations": { "org1": {} } }"#).unwrap();
        let specs = profile.org_specs(OrgNaming::AsIs, "example.com").unwrap();
        assert_eq!(specs[0].mspid, "org1MSP");
    }

    #[test]
    fn test_malformed_profile() {
        let err = parse("{ not json").unwrap_err();
        assert!(matches!(err, BootstrapError::ConfigParse { .. }));
        assert!(err.is_config_error());

        let err = parse(r#"{ "peers": {} }"#).unwrap_err();
        assert!(matches!(err, BootstrapError::ConfigParse { .. }));
    }

    #[test]
    fn test_missing_profile_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConnectionProfile::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, BootstrapError::ConfigRead { .. }));
    }

    #[test]
    fn test_colliding_short_names() {
        let profile = parse(r#"{ "organizations": { "Org1MSP": {}, "org1": {} } }"#).unwrap();
        let err = profile.org_specs(OrgNaming::StripMsp, "example.com").unwrap_err();
        assert!(matches!(err, BootstrapError::ConfigInvalid(_)));
    }

    #[test]
    fn test_duplicate_mspid() {
        let profile = parse(
            r#"{
                "organizations": {
                    "Org1MSP": { "mspid": "X", "peers": ["p1"] },
                    "Org2MSP": { "mspid": "X", "peers": ["p2"] }
                },
                "peers": { "p1": {}, "p2": {} }
            }"#,
        )
        .unwrap();
        let err = profile.org_specs(OrgNaming::StripMsp, "example.com").unwrap_err();
        assert!(matches!(err, BootstrapError::ConfigInvalid(_)));
        assert!(err.to_string().contains("share mspid 'X'"));

        // derived and explicit ids collide too
        let profile = parse(r#"{ "organizations": { "Org1MSP": {}, "org1": { "mspid": "Org1MSP" } } }"#).unwrap();
        assert!(profile.org_specs(OrgNaming::AsIs, "example.com").is_err());
    }

    #[test]
    fn test_undeclared_peer() {
        let profile = parse(
            r#"{
                "organizations": { "Org1MSP": { "peers": ["peer9"] } },
                "peers": { "peer0": {} }
            }"#,
        )
        .unwrap();
        let err = profile.org_specs(OrgNaming::StripMsp, "example.com").unwrap_err();
        assert!(err.to_string().contains("peer9"));
    }

    #[test]
    fn test_unusable_short_name() {
        let profile = parse(r#"{ "organizations": { "MSP": {} } }"#).unwrap();
        assert!(profile.org_specs(OrgNaming::StripMsp, "example.com").is_err());
    }

    #[test]
    fn test_settings_defaults_and_toml() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.naming, OrgNaming::StripMsp);
        assert_eq!(settings.domain, "example.com");
        assert_eq!(settings.log_level, "info");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "naming = \"as-is\"\ndomain = \"acme.org\"\ndefault_store_root = \"/srv/kvs\"\n",
        )
        .unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.naming, OrgNaming::AsIs);
        assert_eq!(settings.domain, "acme.org");
        assert_eq!(settings.default_store_root, Some(PathBuf::from("/srv/kvs")));
        assert_eq!(settings.log_level, "info");

        std::fs::write(&path, "naming = \"sideways\"\n").unwrap();
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(BootstrapError::Settings { .. })
        ));
    }

    #[test]
    fn test_store_root_policy() {
        let home = Some(PathBuf::from("/home/alice"));
        assert_eq!(
            resolve_store_root(Some(Path::new("/tmp/kvs")), Some(Path::new("/srv")), home.clone()),
            PathBuf::from("/tmp/kvs")
        );
        assert_eq!(
            resolve_store_root(None, Some(Path::new("/srv")), home.clone()),
            PathBuf::from("/srv")
        );
        assert_eq!(
            resolve_store_root(None, None, home),
            PathBuf::from("/home/alice/.hfc-key-store")
        );
        assert_eq!(resolve_store_root(None, None, None), PathBuf::from("dappinstances"));
    }

    #[test]
    fn test_store_dir_per_org() {
        let profile = parse(PROFILE).unwrap();
        let specs = profile.org_specs(OrgNaming::StripMsp, "example.com").unwrap();
        assert_eq!(
            store_dir(Path::new("/tmp/kvs"), &specs[1]),
            PathBuf::from("/tmp/kvs/org2")
        );
    }
}
