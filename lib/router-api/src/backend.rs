//! Backend model: HTTP backends, their hostpaths and endpoints, and TCP backends

use crate::maps::HostsMap;
use serde::{Deserialize, Serialize};

/// Reserved ID of the designated default backend
pub const DEFAULT_BACKEND_ID: &str = "_default_backend";

/// Build the derived ID of a backend from its identity
pub fn build_id(namespace: &str, name: &str, port: &str) -> String {
    format!("{}_{}_{}", namespace, name, port)
}

/// Identity of a backend: (namespace, name, port)
///
/// Used as a stable handle into the registry, it survives re-sorting and
/// default backend (re)designation.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BackendKey {
    pub namespace: String,
    pub name: String,
    pub port: String,
}

impl BackendKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            port: port.into(),
        }
    }

    /// ID derived from the identity, ignoring any default designation
    pub fn derived_id(&self) -> String {
        build_id(&self.namespace, &self.name, &self.port)
    }
}

/// Server defaults applied to every endpoint of a backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub initial_weight: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { initial_weight: 1 }
    }
}

/// A single upstream server of a backend
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub ip: String,
    pub port: u16,
    #[serde(default = "default_weight")]
    pub weight: i32,
    /// Reference of the source object, e.g. `namespace/pod-name`
    #[serde(default)]
    pub target_ref: String,
}

fn default_weight() -> i32 {
    1
}

/// One hostpath served by a backend, together with its per-path config
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendPath {
    /// Identifier used as the value of the backend's idpath map
    pub id: String,
    /// Hostname followed by the path prefix, e.g. `domain.local/app`
    pub hostpath: String,
    #[serde(default)]
    pub ssl_redirect: bool,
    /// Request body limit in bytes, 0 means unlimited
    #[serde(default)]
    pub max_body_size: i64,
}

impl BackendPath {
    fn same_config(&self, other: &BackendPath) -> bool {
        self.ssl_redirect == other.ssl_redirect && self.max_body_size == other.max_body_size
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendTls {
    /// At least one host routing to this backend requires client certificates
    #[serde(default)]
    pub has_tls_auth: bool,
}

/// HTTP backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Backend {
    pub id: String,
    pub namespace: String,
    pub name: String,
    pub port: String,
    pub server: ServerConfig,
    pub endpoints: Vec<Endpoint>,
    /// Sorted by hostpath, descending, so longer prefixes come first
    pub paths: Vec<BackendPath>,
    pub tls: BackendTls,
    /// Compiled hostpath to path ID map, only for backends that need ACLs
    #[serde(skip)]
    pub paths_map: Option<HostsMap>,
}

impl Backend {
    pub fn new(namespace: &str, name: &str, port: &str) -> Self {
        Self {
            id: build_id(namespace, name, port),
            namespace: namespace.to_string(),
            name: name.to_string(),
            port: port.to_string(),
            server: ServerConfig::default(),
            endpoints: Vec::new(),
            paths: Vec::new(),
            tls: BackendTls::default(),
            paths_map: None,
        }
    }

    pub fn key(&self) -> BackendKey {
        BackendKey::new(&self.namespace, &self.name, &self.port)
    }

    pub fn matches(&self, namespace: &str, name: &str, port: &str) -> bool {
        self.namespace == namespace && self.name == name && self.port == port
    }

    /// Add a hostpath, or return the existing one
    pub fn add_hostpath(&mut self, hostpath: &str) -> &mut BackendPath {
        let pos = match self.paths.iter().position(|p| p.hostpath == hostpath) {
            Some(pos) => pos,
            None => {
                let path = BackendPath {
                    id: format!("path{:02}", self.paths.len() + 1),
                    hostpath: hostpath.to_string(),
                    ..Default::default()
                };
                self.paths.push(path);
                self.paths.sort_by(|a, b| b.hostpath.cmp(&a.hostpath));
                self.paths
                    .iter()
                    .position(|p| p.hostpath == hostpath)
                    .unwrap_or(self.paths.len() - 1)
            }
        };
        &mut self.paths[pos]
    }

    pub fn find_hostpath(&self, hostpath: &str) -> Option<&BackendPath> {
        self.paths.iter().find(|p| p.hostpath == hostpath)
    }

    pub fn has_ssl_redirect_hostpath(&self, hostpath: &str) -> bool {
        self.find_hostpath(hostpath)
            .map(|p| p.ssl_redirect)
            .unwrap_or(false)
    }

    pub fn max_body_size_hostpath(&self, hostpath: &str) -> i64 {
        self.find_hostpath(hostpath)
            .map(|p| p.max_body_size)
            .unwrap_or(0)
    }

    /// Whether the paths of this backend disagree on their configuration,
    /// in which case a hostpath ACL is needed to apply per-path config
    pub fn need_acl(&self) -> bool {
        match self.paths.split_first() {
            Some((first, rest)) => rest.iter().any(|p| !p.same_config(first)),
            None => false,
        }
    }

    pub fn add_endpoint(&mut self, ip: &str, port: u16, target_ref: &str) -> &mut Endpoint {
        self.endpoints.push(Endpoint {
            ip: ip.to_string(),
            port,
            weight: self.server.initial_weight,
            target_ref: target_ref.to_string(),
        });
        let last = self.endpoints.len() - 1;
        &mut self.endpoints[last]
    }
}

/// TCP backend, identified by (service name, port)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TcpBackend {
    pub name: String,
    pub port: i32,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub proxy_protocol: bool,
}
