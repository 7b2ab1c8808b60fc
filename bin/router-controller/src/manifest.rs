//! Model manifest: the hosts and backends a configuration is populated from

use anyhow::{Context, Result};
use router_api::{BackendKey, Global, HostAlias, HostTls, TcpBackend, Userlist};
use router_core::Config;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub default_x509_cert: String,
    #[serde(default)]
    pub default_backend: Option<BackendKey>,
    #[serde(default)]
    pub backends: Vec<BackendSpec>,
    #[serde(default)]
    pub tcp_backends: Vec<TcpBackend>,
    #[serde(default)]
    pub userlists: Vec<Userlist>,
    #[serde(default)]
    pub hosts: Vec<HostSpec>,
    #[serde(default)]
    pub acme: AcmeSpec,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AcmeSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub socket: String,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub certs: Vec<AcmeCertSpec>,
}

/// Domains a certificate storage should cover
#[derive(Clone, Debug, Deserialize)]
pub struct AcmeCertSpec {
    pub storage: String,
    pub domains: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BackendSpec {
    pub namespace: String,
    pub name: String,
    pub port: String,
    #[serde(default)]
    pub initial_weight: Option<i32>,
    #[serde(default)]
    pub paths: Vec<BackendPathSpec>,
    #[serde(default)]
    pub endpoints: Vec<EndpointSpec>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BackendPathSpec {
    pub hostpath: String,
    #[serde(default)]
    pub ssl_redirect: bool,
    #[serde(default)]
    pub max_body_size: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EndpointSpec {
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub weight: Option<i32>,
    #[serde(default)]
    pub target_ref: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HostSpec {
    pub hostname: String,
    #[serde(default)]
    pub paths: Vec<HostPathSpec>,
    #[serde(default)]
    pub alias: HostAlias,
    #[serde(default)]
    pub tls: HostTls,
    #[serde(default)]
    pub root_redirect: Option<String>,
    #[serde(default)]
    pub ssl_passthrough: bool,
    #[serde(default)]
    pub http_passthrough_backend: Option<String>,
    #[serde(default)]
    pub var_namespace: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HostPathSpec {
    pub path: String,
    pub backend: BackendKey,
}

impl Manifest {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse manifest")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::from_yaml(&yaml)
    }

    /// Fill an empty configuration: backends first, so hosts can resolve them
    pub fn populate(&self, config: &mut Config) {
        *config.global_mut() = self.global.clone();
        config.config_default_x509_cert(&self.default_x509_cert);

        for spec in &self.backends {
            let backend = config.acquire_backend(&spec.namespace, &spec.name, &spec.port);
            if let Some(weight) = spec.initial_weight {
                backend.server.initial_weight = weight;
            }
            for path_spec in &spec.paths {
                let path = backend.add_hostpath(&path_spec.hostpath);
                path.ssl_redirect = path_spec.ssl_redirect;
                path.max_body_size = path_spec.max_body_size;
            }
            for ep_spec in &spec.endpoints {
                let endpoint = backend.add_endpoint(&ep_spec.ip, ep_spec.port, &ep_spec.target_ref);
                if let Some(weight) = ep_spec.weight {
                    endpoint.weight = weight;
                }
            }
        }

        if let Some(key) = &self.default_backend {
            config.acquire_backend(&key.namespace, &key.name, &key.port);
            config.config_default_backend(Some(key));
        }

        for spec in &self.tcp_backends {
            let backend = config.acquire_tcp_backend(&spec.name, spec.port);
            backend.endpoints = spec.endpoints.clone();
            backend.proxy_protocol = spec.proxy_protocol;
        }

        for userlist in &self.userlists {
            config.add_userlist(&userlist.name, userlist.users.clone());
        }

        for spec in &self.hosts {
            let paths: Vec<(&str, Option<BackendKey>)> = spec
                .paths
                .iter()
                .map(|p| {
                    let key = &p.backend;
                    let found = config.find_backend(&key.namespace, &key.name, &key.port);
                    if found.is_none() {
                        warn!("Host {}{}: backend {} not found", spec.hostname, p.path, key.derived_id());
                    }
                    (p.path.as_str(), found.map(|b| b.key()))
                })
                .collect();
            let host = config.hosts_mut().acquire_host(&spec.hostname);
            for (path, backend) in paths {
                host.add_path_key(backend, path);
            }
            host.alias = spec.alias.clone();
            host.tls = spec.tls.clone();
            host.root_redirect = spec.root_redirect.clone();
            host.ssl_passthrough = spec.ssl_passthrough;
            host.http_passthrough_backend = spec.http_passthrough_backend.clone();
            host.var_namespace = spec.var_namespace;
        }

        let acme = config.acme_mut();
        acme.enabled = self.acme.enabled;
        acme.prefix = self.acme.prefix.clone();
        acme.socket = self.acme.socket.clone();
        acme.shared = self.acme.shared;
        for cert in &self.acme.certs {
            acme.add_domains(&cert.storage, cert.domains.iter().cloned());
        }

        debug!(
            "Populated {} backends, {} tcp backends, {} hosts",
            config.backends().len(),
            config.tcp_backends().len(),
            config.hosts().items.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use router_core::ConfigOptions;

    const MANIFEST: &str = r#"
global:
  bind:
    https_bind: ":443"
  strict_host: true
default_x509_cert: /ssl/default.pem
default_backend:
  namespace: system
  name: default
  port: "8080"
backends:
  - namespace: default
    name: app
    port: "8080"
    paths:
      - hostpath: d1.local/
        ssl_redirect: true
      - hostpath: d1.local/api
        max_body_size: 1024
    endpoints:
      - ip: 10.0.0.1
        port: 8080
tcp_backends:
  - name: postgres
    port: 5432
userlists:
  - name: admins
    users:
      - name: bob
        passwd: secret
      - name: alice
        passwd: secret
hosts:
  - hostname: d1.local
    tls:
      tls_filename: /ssl/d1.pem
    paths:
      - path: /
        backend: { namespace: default, name: app, port: "8080" }
      - path: /api
        backend: { namespace: default, name: app, port: "8080" }
  - hostname: d2.local
    paths:
      - path: /missing
        backend: { namespace: default, name: gone, port: "80" }
acme:
  enabled: true
  prefix: /.well-known/acme-challenge
  socket: /var/run/acme.sock
  certs:
    - storage: default/d1-tls
      domains: [d1.local]
    - storage: default/d1-tls
      domains: [www.d1.local, d1.local]
"#;

    fn populated() -> Config {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let mut config = Config::new(ConfigOptions::default());
        manifest.populate(&mut config);
        config
    }

    #[test]
    fn test_populate_backends() {
        let config = populated();
        let app = config.find_backend("default", "app", "8080").unwrap();
        assert_eq!(app.paths.len(), 2);
        assert!(app.has_ssl_redirect_hostpath("d1.local/"));
        assert_eq!(app.max_body_size_hostpath("d1.local/api"), 1024);
        assert_eq!(app.endpoints[0].weight, 1);
        assert_eq!(config.default_backend().map(|b| b.id.as_str()), Some("_default_backend"));
        assert_eq!(config.backends().last().map(|b| b.name.as_str()), Some("default"));
        assert_eq!(config.default_x509_cert(), "/ssl/default.pem");
    }

    #[test]
    fn test_populate_hosts() {
        let config = populated();
        let d1 = config.hosts().find_host("d1.local").unwrap();
        assert_eq!(d1.paths.len(), 2);
        assert!(d1.has_tls());
        let d2 = config.hosts().find_host("d2.local").unwrap();
        assert!(d2.find_path("/missing").is_some_and(|p| p.backend.is_none()));
    }

    #[test]
    fn test_populate_tcp_and_userlists() {
        let config = populated();
        assert_eq!(config.tcp_backends()[0].port, 5432);
        let users: Vec<&str> = config.find_userlist("admins").unwrap().users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(users, vec!["alice", "bob"]);
    }

    #[test]
    fn test_populate_acme() {
        let config = populated();
        let acme = config.acme();
        assert!(acme.enabled);
        assert_eq!(acme.socket, "/var/run/acme.sock");
        let domains: Vec<&str> = acme.certs["default/d1-tls"].iter().map(String::as_str).collect();
        assert_eq!(domains, vec!["d1.local", "www.d1.local"]);
    }

    #[test]
    fn test_invalid_manifest() {
        assert!(Manifest::from_yaml("hosts: [").is_err());
        assert!(Manifest::from_yaml("backends:\n  - name: app\n").is_err());
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::from_yaml("{}").unwrap();
        assert!(manifest.hosts.is_empty());
        assert!(manifest.default_backend.is_none());
    }
}
