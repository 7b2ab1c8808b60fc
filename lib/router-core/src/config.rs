//! Router configuration: the model the population phase fills in, and the
//! compiled artifacts derived from it

use crate::registry::{compare_tcp_backends, BackendRegistry};
use router_api::{
    Acme, AcmeData, Backend, BackendKey, Frontend, FrontendGroup, Global, Hosts, TcpBackend,
    User, Userlist,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the single synthetic HTTP frontend
pub const FRONTEND_NAME: &str = "_front001";

/// Construction options of a [`Config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOptions {
    /// Directory prefix of every map file
    pub maps_dir: PathBuf,
}

/// One configuration instance, built once per reconciliation cycle
///
/// Population, finalization and compilation are single-threaded; callers
/// must serialize access to an instance.
#[derive(Clone, Debug)]
pub struct Config {
    // external state, not part of the proxy configuration
    pub(crate) acme_data: AcmeData,
    // proxy configuration
    pub(crate) acme: Acme,
    pub(crate) fgroup: Option<FrontendGroup>,
    pub(crate) maps_dir: PathBuf,
    pub(crate) global: Global,
    pub(crate) frontend: Frontend,
    pub(crate) hosts: Hosts,
    pub(crate) tcp_backends: Vec<TcpBackend>,
    pub(crate) backends: BackendRegistry,
    pub(crate) userlists: Vec<Userlist>,
    pub(crate) default_x509_cert: String,
}

impl Config {
    pub fn new(options: ConfigOptions) -> Self {
        Self {
            acme_data: AcmeData::default(),
            acme: Acme::default(),
            fgroup: None,
            maps_dir: options.maps_dir,
            global: Global::default(),
            frontend: Frontend {
                name: FRONTEND_NAME.to_string(),
                ..Default::default()
            },
            hosts: Hosts::default(),
            tcp_backends: Vec::new(),
            backends: BackendRegistry::new(),
            userlists: Vec::new(),
            default_x509_cert: String::new(),
        }
    }

    /// Find or create a TCP backend, keeping them sorted by name and port
    pub fn acquire_tcp_backend(&mut self, service_name: &str, port: i32) -> &mut TcpBackend {
        let found = self
            .tcp_backends
            .iter()
            .position(|b| b.name == service_name && b.port == port);
        let pos = match found {
            Some(pos) => pos,
            None => {
                self.tcp_backends.push(TcpBackend {
                    name: service_name.to_string(),
                    port,
                    ..Default::default()
                });
                self.tcp_backends.sort_by(compare_tcp_backends);
                debug!("Created TCP backend: {}:{}", service_name, port);
                self.tcp_backends
                    .iter()
                    .position(|b| b.name == service_name && b.port == port)
                    .unwrap_or(self.tcp_backends.len() - 1)
            }
        };
        &mut self.tcp_backends[pos]
    }

    pub fn acquire_backend(&mut self, namespace: &str, name: &str, port: &str) -> &mut Backend {
        self.backends.acquire(namespace, name, port)
    }

    pub fn find_backend(&self, namespace: &str, name: &str, port: &str) -> Option<&Backend> {
        self.backends.find(namespace, name, port)
    }

    pub fn find_backend_mut(
        &mut self,
        namespace: &str,
        name: &str,
        port: &str,
    ) -> Option<&mut Backend> {
        self.backends.find_mut(namespace, name, port)
    }

    /// Designate the default backend by identity, `None` clears it
    pub fn config_default_backend(&mut self, key: Option<&BackendKey>) {
        self.backends.set_default(key);
    }

    pub fn config_default_x509_cert(&mut self, filename: &str) {
        self.default_x509_cert = filename.to_string();
    }

    /// Register a userlist; users and userlists are kept sorted by name
    pub fn add_userlist(&mut self, name: &str, mut users: Vec<User>) -> &Userlist {
        users.sort_by(|a, b| a.name.cmp(&b.name));
        self.userlists.retain(|u| u.name != name);
        self.userlists.push(Userlist {
            name: name.to_string(),
            users,
        });
        self.userlists.sort_by(|a, b| a.name.cmp(&b.name));
        let pos = self
            .userlists
            .iter()
            .position(|u| u.name == name)
            .unwrap_or(self.userlists.len() - 1);
        &self.userlists[pos]
    }

    pub fn find_userlist(&self, name: &str) -> Option<&Userlist> {
        self.userlists.iter().find(|u| u.name == name)
    }

    pub fn frontend(&self) -> &Frontend {
        &self.frontend
    }

    /// Compiled frontend maps, available after a successful build
    pub fn frontend_group(&self) -> Option<&FrontendGroup> {
        self.fgroup.as_ref()
    }

    pub fn default_backend(&self) -> Option<&Backend> {
        self.backends.default_backend()
    }

    pub fn default_x509_cert(&self) -> &str {
        &self.default_x509_cert
    }

    pub fn maps_dir(&self) -> &Path {
        &self.maps_dir
    }

    pub fn acme_data(&self) -> &AcmeData {
        &self.acme_data
    }

    pub fn acme_data_mut(&mut self) -> &mut AcmeData {
        &mut self.acme_data
    }

    pub fn acme(&self) -> &Acme {
        &self.acme
    }

    pub fn acme_mut(&mut self) -> &mut Acme {
        &mut self.acme
    }

    pub fn global(&self) -> &Global {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut Global {
        &mut self.global
    }

    pub fn tcp_backends(&self) -> &[TcpBackend] {
        &self.tcp_backends
    }

    pub fn hosts(&self) -> &Hosts {
        &self.hosts
    }

    pub fn hosts_mut(&mut self) -> &mut Hosts {
        &mut self.hosts
    }

    pub fn backends(&self) -> &[Backend] {
        self.backends.items()
    }

    pub fn userlists(&self) -> &[Userlist] {
        &self.userlists
    }

    /// Read-only view of the model handed to the map compilers
    pub fn snapshot(&self) -> ModelSnapshot<'_> {
        ModelSnapshot {
            global: &self.global,
            frontend: &self.frontend,
            hosts: &self.hosts,
            backends: &self.backends,
            maps_dir: &self.maps_dir,
            default_x509_cert: &self.default_x509_cert,
        }
    }

    /// Whether two configurations would produce the same proxy configuration
    ///
    /// Every field takes part except `acme_data`, which belongs to the
    /// certificate issuance client.
    pub fn equals(&self, other: &Config) -> bool {
        let Config {
            acme_data: _,
            acme,
            fgroup,
            maps_dir,
            global,
            frontend,
            hosts,
            tcp_backends,
            backends,
            userlists,
            default_x509_cert,
        } = self;
        *acme == other.acme
            && *fgroup == other.fgroup
            && *maps_dir == other.maps_dir
            && *global == other.global
            && *frontend == other.frontend
            && *hosts == other.hosts
            && *tcp_backends == other.tcp_backends
            && *backends == other.backends
            && *userlists == other.userlists
            && *default_x509_cert == other.default_x509_cert
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

/// Finalized model as seen by the map compilers
#[derive(Clone, Copy, Debug)]
pub struct ModelSnapshot<'a> {
    pub global: &'a Global,
    pub frontend: &'a Frontend,
    pub hosts: &'a Hosts,
    pub backends: &'a BackendRegistry,
    pub maps_dir: &'a Path,
    pub default_x509_cert: &'a str,
}
