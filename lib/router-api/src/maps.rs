//! Routing maps: key/value tables the proxy looks up at request time

use crate::global::Frontend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One `<key> <value>` line of a map; lists use an empty value
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostsMapEntry {
    pub key: String,
    pub value: String,
}

/// A named map with an exact-match half and a regex half
///
/// Entries keep insertion order, the compilers append them in a
/// deterministic order so that rendered files are comparable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostsMap {
    pub match_entries: Vec<HostsMapEntry>,
    pub regex_entries: Vec<HostsMapEntry>,
    pub match_file: PathBuf,
    pub regex_file: PathBuf,
}

impl HostsMap {
    pub fn new(match_file: PathBuf) -> Self {
        let regex_file = regex_filename(&match_file);
        Self {
            match_entries: Vec::new(),
            regex_entries: Vec::new(),
            match_file,
            regex_file,
        }
    }

    /// Append a `hostname/path` key; `*.domain` wildcards go to the regex half
    pub fn append_hostname(&mut self, base: &str, value: &str) {
        if base.is_empty() {
            return;
        }
        let (hostname, path) = split_hostpath(base);
        match hostname.strip_prefix('*') {
            Some(domain) if domain.starts_with('.') => {
                let key = format!("^[^.]+{}{}", regex::escape(domain), regex::escape(path));
                self.push_regex(key, value);
            }
            _ => self.push_match(base.to_string(), value),
        }
    }

    /// Append an alias hostname key, skipped when the alias was not honored
    pub fn append_alias_name(&mut self, base: Option<&str>, value: &str) {
        if let Some(base) = base {
            self.append_hostname(base, value);
        }
    }

    /// Append an alias regex key verbatim into the regex half
    pub fn append_alias_regex(&mut self, base: Option<&str>, value: &str) {
        if let Some(base) = base.filter(|b| !b.is_empty()) {
            self.push_regex(base.to_string(), value);
        }
    }

    /// Append a hostpath key of a backend map
    pub fn append_path(&mut self, hostpath: &str, id: &str) {
        self.push_match(hostpath.to_string(), id);
    }

    /// Append a bare line, used by list files
    pub fn append_item(&mut self, item: &str) {
        self.push_match(item.to_string(), "");
    }

    pub fn is_empty(&self) -> bool {
        self.match_entries.is_empty() && self.regex_entries.is_empty()
    }

    /// Value of an exact-match key, first occurrence wins
    pub fn match_value(&self, key: &str) -> Option<&str> {
        self.match_entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Value of a regex key, first occurrence wins
    pub fn regex_value(&self, key: &str) -> Option<&str> {
        self.regex_entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    fn push_match(&mut self, key: String, value: &str) {
        self.match_entries.push(HostsMapEntry {
            key,
            value: value.to_string(),
        });
    }

    fn push_regex(&mut self, key: String, value: &str) {
        self.regex_entries.push(HostsMapEntry {
            key,
            value: value.to_string(),
        });
    }
}

fn split_hostpath(base: &str) -> (&str, &str) {
    match base.find('/') {
        Some(pos) => base.split_at(pos),
        None => (base, ""),
    }
}

/// `/maps/_front001_host.map` -> `/maps/_front001_host_regex.map`
fn regex_filename(match_file: &Path) -> PathBuf {
    let stem = match_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match match_file.extension() {
        Some(ext) => format!("{}_regex.{}", stem, ext.to_string_lossy()),
        None => format!("{}_regex", stem),
    };
    match_file.with_file_name(name)
}

/// Compiled routing artifacts of the single synthetic frontend
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontendGroup {
    pub frontend: Frontend,

    pub http_fronts_map: HostsMap,
    pub http_root_redir_map: HostsMap,
    pub https_redir_map: HostsMap,
    pub ssl_passthrough_map: HostsMap,

    pub host_backends_map: HostsMap,
    pub root_redir_map: HostsMap,
    pub max_body_size_map: HostsMap,
    pub sni_backends_map: HostsMap,
    pub var_namespace_map: HostsMap,

    pub tls_invalid_crt_error_list: HostsMap,
    pub tls_invalid_crt_error_pages_map: HostsMap,
    pub tls_no_crt_error_list: HostsMap,
    pub tls_no_crt_error_pages_map: HostsMap,

    pub crt_list: HostsMap,
    pub use_server_list: HostsMap,
}

impl FrontendGroup {
    /// Empty maps named after `maps_dir` and the frontend name
    pub fn new(maps_dir: &Path, frontend: &Frontend) -> Self {
        let global = |suffix: &str| HostsMap::new(maps_dir.join(format!("_global_{}", suffix)));
        let front = |suffix: &str| {
            HostsMap::new(maps_dir.join(format!("{}_{}", frontend.name, suffix)))
        };
        Self {
            frontend: frontend.clone(),
            http_fronts_map: global("http_front.map"),
            http_root_redir_map: global("http_root_redir.map"),
            https_redir_map: global("https_redir.map"),
            ssl_passthrough_map: global("sslpassthrough.map"),
            host_backends_map: front("host.map"),
            root_redir_map: front("root_redir.map"),
            max_body_size_map: front("max_body_size.map"),
            sni_backends_map: front("sni.map"),
            var_namespace_map: front("k8s_ns.map"),
            tls_invalid_crt_error_list: front("inv_crt.list"),
            tls_invalid_crt_error_pages_map: front("inv_crt_redir.map"),
            tls_no_crt_error_list: front("no_crt.list"),
            tls_no_crt_error_pages_map: front("no_crt_redir.map"),
            crt_list: front("bind_crt.list"),
            use_server_list: front("use_server.list"),
        }
    }

    /// Every map, in the order they are persisted
    pub fn maps(&self) -> [&HostsMap; 15] {
        [
            &self.http_fronts_map,
            &self.http_root_redir_map,
            &self.https_redir_map,
            &self.ssl_passthrough_map,
            &self.host_backends_map,
            &self.root_redir_map,
            &self.max_body_size_map,
            &self.sni_backends_map,
            &self.var_namespace_map,
            &self.tls_invalid_crt_error_list,
            &self.tls_invalid_crt_error_pages_map,
            &self.tls_no_crt_error_list,
            &self.tls_no_crt_error_pages_map,
            &self.crt_list,
            &self.use_server_list,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_filename() {
        assert_eq!(
            regex_filename(Path::new("/maps/_front001_host.map")),
            PathBuf::from("/maps/_front001_host_regex.map")
        );
        assert_eq!(
            regex_filename(Path::new("/maps/_front001_no_crt.list")),
            PathBuf::from("/maps/_front001_no_crt_regex.list")
        );
    }

    #[test]
    fn test_append_hostname_exact() {
        let mut map = HostsMap::new(PathBuf::from("/maps/host.map"));
        map.append_hostname("d1.local/app", "default_app_8080");
        assert_eq!(map.match_value("d1.local/app"), Some("default_app_8080"));
        assert!(map.regex_entries.is_empty());
    }

    #[test]
    fn test_append_hostname_wildcard_goes_to_regex() {
        let mut map = HostsMap::new(PathBuf::from("/maps/host.map"));
        map.append_hostname("*.d1.local/", "default_app_8080");
        assert!(map.match_entries.is_empty());
        assert_eq!(map.regex_value(r"^[^.]+\.d1\.local/"), Some("default_app_8080"));
    }

    #[test]
    fn test_append_hostname_ignores_empty_key() {
        let mut map = HostsMap::new(PathBuf::from("/maps/host.map"));
        map.append_hostname("", "x");
        assert!(map.is_empty());
    }

    #[test]
    fn test_append_alias() {
        let mut map = HostsMap::new(PathBuf::from("/maps/host.map"));
        map.append_alias_name(None, "b1");
        map.append_alias_regex(None, "b1");
        assert!(map.is_empty());
        map.append_alias_name(Some("alias.local/"), "b1");
        map.append_alias_regex(Some(r"^d[0-9]\.local/"), "b1");
        assert_eq!(map.match_value("alias.local/"), Some("b1"));
        assert_eq!(map.regex_value(r"^d[0-9]\.local/"), Some("b1"));
    }

    #[test]
    fn test_frontend_group_filenames() {
        let frontend = Frontend {
            name: "_front001".to_string(),
            ..Default::default()
        };
        let fgroup = FrontendGroup::new(Path::new("/maps"), &frontend);
        assert_eq!(
            fgroup.http_fronts_map.match_file,
            PathBuf::from("/maps/_global_http_front.map")
        );
        assert_eq!(
            fgroup.host_backends_map.match_file,
            PathBuf::from("/maps/_front001_host.map")
        );
        assert_eq!(
            fgroup.host_backends_map.regex_file,
            PathBuf::from("/maps/_front001_host_regex.map")
        );
        assert_eq!(fgroup.maps().len(), 15);
        assert!(fgroup.maps().iter().all(|m| m.is_empty()));
    }
}
