//! Final synchronization of a populated configuration
//!
//! Some decisions need the whole model to be known: the frontend bind depends
//! on every host, strict host adds missing root paths, and TLS auth is pushed
//! from hosts down to backends. These run once, after population and before
//! the maps are built.

use crate::config::Config;
use crate::registry::BackendRegistry;
use router_api::{Backend, BackendKey, Frontend, Global, Hosts};
use tracing::{debug, warn};

impl Config {
    /// Resolve the policies that need the complete host and backend model
    ///
    /// Running it again with the same input changes nothing.
    pub fn sync_config(&mut self) {
        sync_frontend_bind(&mut self.frontend, &self.hosts, &self.global);
        // synthesized root paths take part in tls auth propagation
        if self.global.strict_host {
            add_strict_host_paths(&mut self.hosts, &self.backends);
        }
        propagate_tls_auth(&self.hosts, &mut self.backends);
    }
}

fn sync_frontend_bind(frontend: &mut Frontend, hosts: &Hosts, global: &Global) {
    if hosts.has_ssl_passthrough() {
        // a tcp frontend inspects the SNI and relays everything else here
        let bind_name = format!("{}_socket", frontend.name);
        frontend.bind_socket = format!("unix@/var/run/{}.sock", bind_name);
        frontend.bind_name = bind_name;
        frontend.accept_proxy = true;
    } else {
        frontend.bind_name = "_public".to_string();
        frontend.bind_socket = global.bind.https_bind.clone();
        frontend.accept_proxy = global.bind.accept_proxy;
    }
    debug!(
        "Frontend {} binds {} (accept-proxy: {})",
        frontend.name, frontend.bind_socket, frontend.accept_proxy
    );
}

fn propagate_tls_auth(hosts: &Hosts, backends: &mut BackendRegistry) {
    let hosts = hosts
        .items
        .iter()
        .filter(|h| !h.ssl_passthrough && h.has_tls_auth());
    for host in hosts {
        for key in host.paths.iter().filter_map(|p| p.backend.as_ref()) {
            if let Some(backend) = backends.get_mut(key) {
                backend.tls.has_tls_auth = true;
            }
        }
    }
}

/// Root path backend of the default host, or else the default backend
fn strict_host_backend(hosts: &Hosts, backends: &BackendRegistry) -> Option<BackendKey> {
    hosts
        .default_host()
        .and_then(|h| h.find_path("/"))
        .and_then(|p| p.backend.as_ref())
        .and_then(|key| backends.get(key))
        .or_else(|| backends.default_backend())
        .map(Backend::key)
}

fn add_strict_host_paths(hosts: &mut Hosts, backends: &BackendRegistry) {
    let fallback_key = strict_host_backend(hosts, backends);
    let fallback = fallback_key.as_ref().and_then(|key| backends.get(key));
    let hosts = hosts
        .items
        .iter_mut()
        .filter(|h| !h.ssl_passthrough && h.find_path("/").is_none());
    for host in hosts {
        match fallback {
            Some(backend) => debug!("Strict host: {}/ routes to {}", host.hostname, backend.id),
            None => warn!("Strict host: {}/ has no backend to route to", host.hostname),
        }
        host.add_path(fallback, "/");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOptions;
    use router_api::DEFAULT_HOST;

    fn new_config() -> Config {
        Config::new(ConfigOptions::default())
    }

    fn root_backend(config: &Config, hostname: &str) -> Option<BackendKey> {
        config
            .hosts()
            .find_host(hostname)
            .and_then(|h| h.find_path("/"))
            .and_then(|p| p.backend.clone())
    }

    #[test]
    fn test_frontend_bind_public() {
        let mut config = new_config();
        config.global_mut().bind.https_bind = ":443".to_string();
        config.global_mut().bind.accept_proxy = true;
        config.hosts_mut().acquire_host("d1.local");
        config.sync_config();
        let frontend = config.frontend();
        assert_eq!(frontend.bind_name, "_public");
        assert_eq!(frontend.bind_socket, ":443");
        assert!(frontend.accept_proxy);
    }

    #[test]
    fn test_frontend_bind_ssl_passthrough() {
        let mut config = new_config();
        config.global_mut().bind.https_bind = ":443".to_string();
        config.hosts_mut().acquire_host("d1.local").ssl_passthrough = true;
        config.sync_config();
        let frontend = config.frontend();
        assert_eq!(frontend.bind_name, "_front001_socket");
        assert_eq!(frontend.bind_socket, "unix@/var/run/_front001_socket.sock");
        assert!(frontend.accept_proxy);
    }

    #[test]
    fn test_tls_auth_propagates_to_backends() {
        let mut config = new_config();
        let b1 = config.acquire_backend("default", "app1", "8080").clone();
        let b2 = config.acquire_backend("default", "app2", "8080").clone();
        let b3 = config.acquire_backend("default", "app3", "8080").clone();
        {
            let host = config.hosts_mut().acquire_host("d1.local");
            host.tls.ca_filename = Some("/ssl/ca.pem".to_string());
            host.add_path(Some(&b1), "/");
            host.add_path(Some(&b2), "/app");
        }
        {
            let host = config.hosts_mut().acquire_host("d2.local");
            host.tls.ca_filename = Some("/ssl/ca.pem".to_string());
            host.ssl_passthrough = true;
            host.add_path(Some(&b3), "/");
        }
        config.sync_config();
        let tls_auth = |name: &str| {
            config
                .find_backend("default", name, "8080")
                .map(|b| b.tls.has_tls_auth)
        };
        assert_eq!(tls_auth("app1"), Some(true));
        assert_eq!(tls_auth("app2"), Some(true));
        assert_eq!(tls_auth("app3"), Some(false));
    }

    #[test]
    fn test_strict_host_uses_default_host_root() {
        let mut config = new_config();
        config.global_mut().strict_host = true;
        let root = config.acquire_backend("default", "root", "8080").clone();
        let app = config.acquire_backend("default", "app", "8080").clone();
        let default = config.acquire_backend("system", "default", "8080").key();
        config.config_default_backend(Some(&default));
        config.hosts_mut().acquire_host(DEFAULT_HOST).add_path(Some(&root), "/");
        config.hosts_mut().acquire_host("d1.local").add_path(Some(&app), "/app");
        config.sync_config();
        assert_eq!(root_backend(&config, "d1.local"), Some(root.key()));
        let paths = &config.hosts().find_host("d1.local").unwrap().paths;
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_strict_host_falls_back_to_default_backend() {
        let mut config = new_config();
        config.global_mut().strict_host = true;
        let app = config.acquire_backend("default", "app", "8080").clone();
        let default = config.acquire_backend("system", "default", "8080").key();
        config.config_default_backend(Some(&default));
        config.hosts_mut().acquire_host("d1.local").add_path(Some(&app), "/app");
        config.sync_config();
        assert_eq!(root_backend(&config, "d1.local"), Some(default));
    }

    #[test]
    fn test_strict_host_without_any_backend() {
        let mut config = new_config();
        config.global_mut().strict_host = true;
        let app = config.acquire_backend("default", "app", "8080").clone();
        config.hosts_mut().acquire_host("d1.local").add_path(Some(&app), "/app");
        config.sync_config();
        let host = config.hosts().find_host("d1.local").unwrap();
        assert!(host.find_path("/").is_some_and(|p| p.backend.is_none()));
    }

    #[test]
    fn test_strict_host_skips_passthrough_and_disabled() {
        let mut config = new_config();
        let app = config.acquire_backend("default", "app", "8080").clone();
        config.hosts_mut().acquire_host("d1.local").add_path(Some(&app), "/app");
        config.sync_config();
        assert!(config.hosts().find_host("d1.local").unwrap().find_path("/").is_none());

        config.global_mut().strict_host = true;
        {
            let host = config.hosts_mut().acquire_host("d2.local");
            host.ssl_passthrough = true;
            host.add_path(Some(&app), "/app");
        }
        config.sync_config();
        assert!(config.hosts().find_host("d2.local").unwrap().find_path("/").is_none());
        assert!(config.hosts().find_host("d1.local").unwrap().find_path("/").is_some());
    }

    #[test]
    fn test_sync_config_idempotent() {
        let mut config = new_config();
        config.global_mut().strict_host = true;
        let app = config.acquire_backend("default", "app", "8080").clone();
        {
            let host = config.hosts_mut().acquire_host("d1.local");
            host.tls.ca_filename = Some("/ssl/ca.pem".to_string());
            host.add_path(Some(&app), "/app");
        }
        config.sync_config();
        let first = config.clone();
        config.sync_config();
        assert!(config.equals(&first));
    }

    #[test]
    fn test_sync_config_idempotent_with_fallback_backend() {
        let mut config = new_config();
        config.global_mut().strict_host = true;
        let app = config.acquire_backend("default", "app", "8080").clone();
        let default = config.acquire_backend("system", "default", "8080").key();
        config.config_default_backend(Some(&default));
        {
            let host = config.hosts_mut().acquire_host("d1.local");
            host.tls.ca_filename = Some("/ssl/ca.pem".to_string());
            host.add_path(Some(&app), "/app");
        }
        config.sync_config();
        assert_eq!(
            config.default_backend().map(|b| b.tls.has_tls_auth),
            Some(true)
        );
        let first = config.clone();
        config.sync_config();
        assert!(config.equals(&first));
    }
}
