//! Router model types
//!
//! This library defines the data the routing compiler works on:
//! - Backend: an upstream service with its hostpaths and endpoints
//! - TcpBackend: a plain TCP service
//! - Host: a virtual host with paths, aliases and TLS settings
//! - Global, Frontend, Userlist, Acme: process-wide policy and state
//! - HostsMap, FrontendGroup: the compiled routing maps

pub mod backend;
pub mod global;
pub mod host;
pub mod maps;

pub use backend::{
    build_id, Backend, BackendKey, BackendPath, BackendTls, Endpoint, ServerConfig, TcpBackend,
    DEFAULT_BACKEND_ID,
};
pub use global::{Acme, AcmeData, Frontend, Global, GlobalBind, User, Userlist};
pub use host::{non_empty, Host, HostAlias, HostPath, HostTls, Hosts, DEFAULT_HOST};
pub use maps::{FrontendGroup, HostsMap, HostsMapEntry};
