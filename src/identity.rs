use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::OrgSpec;

/// On-disk crypto material backing an admin identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CryptoContent {
    pub signed_cert: PathBuf,
    pub private_key: PathBuf,
}

/// Everything needed to register an organization admin with a client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub mspid: String,
    pub org: String,
    pub crypto_content: CryptoContent,
    pub skip_persistence: bool,
}

impl AdminCredentials {
    pub fn new(org: &OrgSpec, signed_cert: PathBuf, private_key: PathBuf) -> Self {
        Self {
            username: org.admin_username(),
            mspid: org.mspid.clone(),
            org: org.name.clone(),
            crypto_content: CryptoContent {
                signed_cert,
                private_key,
            },
            skip_persistence: false,
        }
    }
}

/// A user context as persisted in the state store, keyed by user name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserContext {
    pub name: String,
    pub mspid: String,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub affiliation: String,
    #[serde(rename = "enrollmentSecret", default)]
    pub enrollment_secret: String,
    pub enrollment: Enrollment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Enrollment {
    /// Subject key identifier of the signing key in the crypto key store.
    #[serde(rename = "signingIdentity")]
    pub signing_identity: String,
    pub identity: EnrollmentCertificate,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EnrollmentCertificate {
    pub certificate: String,
}

impl UserContext {
    pub fn from_enrollment(credentials: &AdminCredentials, ski: String, certificate: String) -> Self {
        Self {
            name: credentials.username.clone(),
            mspid: credentials.mspid.clone(),
            roles: None,
            affiliation: String::new(),
            enrollment_secret: String::new(),
            enrollment: Enrollment {
                signing_identity: ski,
                identity: EnrollmentCertificate { certificate },
            },
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    pub fn signing_identity(&self) -> &str {
        &self.enrollment.signing_identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org1() -> OrgSpec {
        OrgSpec {
            id: "Org1MSP".to_string(),
            name: "org1".to_string(),
            mspid: "Org1MSP".to_string(),
            domain: "example.com".to_string(),
        }
    }

    #[test]
    fn test_admin_credentials() {
        let creds = AdminCredentials::new(&org1(), PathBuf::from("cert.pem"), PathBuf::from("abc_sk"));
        assert_eq!(creds.username, "Admin@org1.example.com");
        assert_eq!(creds.mspid, "Org1MSP");
        assert_eq!(creds.org, "org1");
        assert!(!creds.skip_persistence);
    }

    #[test]
    fn test_user_context_wire_names() {
        let creds = AdminCredentials::new(&org1(), PathBuf::from("cert.pem"), PathBuf::from("abc_sk"));
        let user = UserContext::from_enrollment(&creds, "ab12".to_string(), "CERT".to_string());

        let json: serde_json::Value = serde_json::to_value(&user).unwrap();
        assert_eq!(json["name"], "Admin@org1.example.com");
        assert_eq!(json["enrollment"]["signingIdentity"], "ab12");
        assert_eq!(json["enrollment"]["identity"]["certificate"], "CERT");
        assert_eq!(json["enrollmentSecret"], "");
        assert!(user.created_at.is_some());
    }

    #[test]
    fn test_user_context_without_timestamp() {
        let json = r#"{
            "name": "Admin@org1.example.com",
            "mspid": "Org1MSP",
            "roles": null,
            "affiliation": "",
            "enrollmentSecret": "",
            "enrollment": { "signingIdentity": "ff00", "identity": { "certificate": "PEM" } }
        }"#;
        let user: UserContext = serde_json::from_str(json).unwrap();
        assert_eq!(user.signing_identity(), "ff00");
        assert_eq!(user.created_at, None);
    }
}
