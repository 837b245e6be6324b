use clap::Parser;
use std::path::PathBuf;

use crate::config::OrgNaming;

#[derive(Parser, Debug)]
#[command(name = "kvs_populate")]
#[command(version, disable_version_flag = true)]
#[command(about = "Prepopulate a client key/value store with organization admin identities", long_about = None)]
pub struct Cli {
    /// Connection profile (JSON) listing the organizations
    pub connection_profile: PathBuf,

    /// Crypto-config root containing `peerOrganizations/`
    pub crypto_config: PathBuf,

    /// Base directory for the per-organization stores (default: ~/.hfc-key-store)
    pub key_value_store: Option<PathBuf>,

    /// How organization identifiers map to crypto-config names
    #[arg(long, value_enum)]
    pub naming: Option<OrgNaming>,

    /// Domain appended to organization names when the profile has none
    #[arg(long)]
    pub domain: Option<String>,

    /// TOML settings file
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Populate every organization that can be populated and report the rest
    #[arg(long, default_value_t = false)]
    pub keep_going: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    pub version: Option<bool>,
}
