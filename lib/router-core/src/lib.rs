//! Routing configuration compiler
//!
//! This library provides:
//! - Backend, TCP backend and userlist registries with a deterministic order
//! - Final synchronization of a populated host and backend model
//! - Compilation of the frontend routing maps and the backend ACL maps
//! - Structural comparison of two compiled configurations

pub mod backend_maps;
pub mod config;
pub mod error;
pub mod frontend_maps;
pub mod registry;
pub mod sync;
pub mod writer;

pub use backend_maps::compile_backend_maps;
pub use config::{Config, ConfigOptions, ModelSnapshot, FRONTEND_NAME};
pub use error::{CoreError, Result};
pub use frontend_maps::{compile_frontend_group, NAMESPACE_PLACEHOLDER};
pub use registry::{compare_backends, compare_tcp_backends, BackendRegistry};
pub use writer::{render_entries, write_maps, FileMapWriter, MapWriter, MemoryMapWriter};
