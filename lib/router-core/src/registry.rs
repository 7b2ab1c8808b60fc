//! Backend registry with a deterministic order and a movable default backend

use router_api::{Backend, BackendKey, TcpBackend, DEFAULT_BACKEND_ID};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Order of the backend registry
///
/// The designated default backend sorts after every other backend, the
/// remaining ones sort by ID. Identity breaks ties between IDs that happen to
/// collide, so the order never depends on acquisition order.
pub fn compare_backends(a: &Backend, b: &Backend, default: Option<&BackendKey>) -> Ordering {
    let is_default = |backend: &Backend| {
        default.is_some_and(|key| backend.matches(&key.namespace, &key.name, &key.port))
    };
    match (is_default(a), is_default(b)) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => a
            .id
            .cmp(&b.id)
            .then_with(|| (&a.namespace, &a.name, &a.port).cmp(&(&b.namespace, &b.name, &b.port))),
    }
}

/// Order of TCP backends: name, then port
pub fn compare_tcp_backends(a: &TcpBackend, b: &TcpBackend) -> Ordering {
    a.name.cmp(&b.name).then(a.port.cmp(&b.port))
}

/// BackendRegistry owns every HTTP backend of a configuration
///
/// The default backend is kept as an identity handle instead of a second
/// reference, so re-sorting never invalidates it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackendRegistry {
    backends: Vec<Backend>,
    default_backend: Option<BackendKey>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create a backend, keeping the registry sorted
    pub fn acquire(&mut self, namespace: &str, name: &str, port: &str) -> &mut Backend {
        let pos = match self.position(namespace, name, port) {
            Some(pos) => pos,
            None => {
                self.backends.push(Backend::new(namespace, name, port));
                self.sort();
                debug!("Created backend: {}", build_label(namespace, name, port));
                self.position(namespace, name, port)
                    .unwrap_or(self.backends.len() - 1)
            }
        };
        &mut self.backends[pos]
    }

    pub fn find(&self, namespace: &str, name: &str, port: &str) -> Option<&Backend> {
        self.backends.iter().find(|b| b.matches(namespace, name, port))
    }

    pub fn find_mut(&mut self, namespace: &str, name: &str, port: &str) -> Option<&mut Backend> {
        self.backends.iter_mut().find(|b| b.matches(namespace, name, port))
    }

    pub fn get(&self, key: &BackendKey) -> Option<&Backend> {
        self.find(&key.namespace, &key.name, &key.port)
    }

    pub fn get_mut(&mut self, key: &BackendKey) -> Option<&mut Backend> {
        self.find_mut(&key.namespace, &key.name, &key.port)
    }

    /// Designate the default backend, or clear it with `None`
    ///
    /// The previous default gets its derived ID back before the new one is
    /// renamed to the reserved ID.
    pub fn set_default(&mut self, key: Option<&BackendKey>) {
        if let Some(previous) = self.default_backend.take() {
            if let Some(backend) = self.get_mut(&previous) {
                backend.id = previous.derived_id();
            }
        }
        if let Some(key) = key {
            match self.get_mut(key) {
                Some(backend) => {
                    backend.id = DEFAULT_BACKEND_ID.to_string();
                    self.default_backend = Some(key.clone());
                    debug!("Default backend: {}", key.derived_id());
                }
                None => warn!("Default backend {} not found, clearing", key.derived_id()),
            }
        }
        self.sort();
    }

    pub fn default_backend(&self) -> Option<&Backend> {
        self.default_backend.as_ref().and_then(|key| self.get(key))
    }

    pub fn default_key(&self) -> Option<&BackendKey> {
        self.default_backend.as_ref()
    }

    pub fn items(&self) -> &[Backend] {
        &self.backends
    }

    /// Mutable access that cannot change the registry order
    pub(crate) fn items_mut(&mut self) -> impl Iterator<Item = &mut Backend> {
        self.backends.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    fn position(&self, namespace: &str, name: &str, port: &str) -> Option<usize> {
        self.backends.iter().position(|b| b.matches(namespace, name, port))
    }

    fn sort(&mut self) {
        let default = self.default_backend.clone();
        self.backends
            .sort_by(|a, b| compare_backends(a, b, default.as_ref()));
    }
}

fn build_label(namespace: &str, name: &str, port: &str) -> String {
    format!("{}/{}:{}", namespace, name, port)
}
