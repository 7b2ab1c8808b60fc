//! Process-wide policy, the synthetic frontend, userlists and ACME state

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Listening addresses of the proxy
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalBind {
    #[serde(default)]
    pub http_bind: String,
    #[serde(default)]
    pub https_bind: String,
    /// Expect the PROXY protocol header on the public binds
    #[serde(default)]
    pub accept_proxy: bool,
    /// Bind of a proxy terminating TLS in front of this one, empty if none
    #[serde(default)]
    pub fronting_proxy_bind: String,
}

impl GlobalBind {
    pub fn has_fronting_proxy(&self) -> bool {
        !self.fronting_proxy_bind.is_empty()
    }
}

/// Global policy, read-only for the map compilers
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Global {
    #[serde(default)]
    pub bind: GlobalBind,
    /// Every host must have a root path, a fallback one is added if missing
    #[serde(default)]
    pub strict_host: bool,
}

/// The single synthetic frontend every HTTP host is served from
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontend {
    pub name: String,
    pub bind_name: String,
    pub bind_socket: String,
    pub accept_proxy: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub passwd: String,
    #[serde(default)]
    pub encrypted: bool,
}

/// Named set of users, users are kept sorted by name
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Userlist {
    pub name: String,
    pub users: Vec<User>,
}

/// ACME configuration that is part of the proxy configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Acme {
    pub enabled: bool,
    pub prefix: String,
    pub socket: String,
    pub shared: bool,
    /// Certificate storage name to the domains it should cover
    pub certs: BTreeMap<String, BTreeSet<String>>,
}

impl Acme {
    pub fn add_domains(&mut self, storage: &str, domains: impl IntoIterator<Item = String>) {
        self.certs.entry(storage.to_string()).or_default().extend(domains);
    }
}

/// Working state of the certificate issuance client
///
/// Owned by a collaborator outside the compilation cycle; it never takes part
/// in configuration equality.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AcmeData {
    pub emails: String,
    pub endpoint: String,
    /// Renew certificates expiring within this many days
    pub expiring_days: u32,
    pub terms_agreed: bool,
}
