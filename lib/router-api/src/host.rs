//! Virtual host model

use crate::backend::{Backend, BackendKey};
use serde::{Deserialize, Serialize};

/// Hostname of the catch-all host
pub const DEFAULT_HOST: &str = "*";

/// A path prefix of a host and the backend it routes to
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HostPath {
    pub path: String,
    /// None when the backend could not be resolved while the path was added
    pub backend: Option<BackendKey>,
}

/// Alternative names a host answers to
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostAlias {
    /// Alias hostname, may be a `*.domain` wildcard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_regex: Option<String>,
}

/// TLS settings of a host
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostTls {
    /// Certificate file, the default certificate is used when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_filename: Option<String>,
    /// CA bundle used to verify client certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crl_filename: Option<String>,
    #[serde(default)]
    pub ca_verify_optional: bool,
    /// Redirect target used when client certificate validation fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_error_page: Option<String>,
}

/// A virtual host
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub hostname: String,
    /// Sorted by path, descending, so longer prefixes come first
    #[serde(default)]
    pub paths: Vec<HostPath>,
    #[serde(default)]
    pub alias: HostAlias,
    #[serde(default)]
    pub tls: HostTls,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_redirect: Option<String>,
    #[serde(default)]
    pub ssl_passthrough: bool,
    /// Backend ID serving plain HTTP requests of an ssl-passthrough host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_passthrough_backend: Option<String>,
    /// Expose the backend namespace to the proxy as a request variable
    #[serde(default)]
    pub var_namespace: bool,
}

impl Host {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            ..Default::default()
        }
    }

    /// Add a path routing to `backend`, or re-point an existing one
    pub fn add_path(&mut self, backend: Option<&Backend>, path: &str) {
        self.add_path_key(backend.map(Backend::key), path);
    }

    /// Same as [`Host::add_path`], from a backend identity
    pub fn add_path_key(&mut self, backend: Option<BackendKey>, path: &str) {
        if let Some(existing) = self.paths.iter_mut().find(|p| p.path == path) {
            existing.backend = backend;
            return;
        }
        self.paths.push(HostPath {
            path: path.to_string(),
            backend,
        });
        self.paths.sort_by(|a, b| b.path.cmp(&a.path));
    }

    pub fn find_path(&self, path: &str) -> Option<&HostPath> {
        self.paths.iter().find(|p| p.path == path)
    }

    pub fn has_tls(&self) -> bool {
        non_empty(&self.tls.tls_filename).is_some()
    }

    pub fn has_tls_auth(&self) -> bool {
        non_empty(&self.tls.ca_filename).is_some()
    }
}

/// Value of an optional setting, treating an empty string as unset
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// All virtual hosts, sorted by hostname
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Hosts {
    pub items: Vec<Host>,
}

impl Hosts {
    /// Find or create a host
    pub fn acquire_host(&mut self, hostname: &str) -> &mut Host {
        let pos = match self.position(hostname) {
            Some(pos) => pos,
            None => {
                self.items.push(Host::new(hostname));
                self.items.sort_by(|a, b| a.hostname.cmp(&b.hostname));
                self.position(hostname).unwrap_or(self.items.len() - 1)
            }
        };
        &mut self.items[pos]
    }

    pub fn find_host(&self, hostname: &str) -> Option<&Host> {
        self.items.iter().find(|h| h.hostname == hostname)
    }

    /// The catch-all host, if declared
    pub fn default_host(&self) -> Option<&Host> {
        self.find_host(DEFAULT_HOST)
    }

    pub fn has_ssl_passthrough(&self) -> bool {
        self.items.iter().any(|h| h.ssl_passthrough)
    }

    fn position(&self, hostname: &str) -> Option<usize> {
        self.items.iter().position(|h| h.hostname == hostname)
    }
}
