//! Backend hostpath ACL maps

use crate::config::{Config, ModelSnapshot};
use crate::writer::{write_maps, MapWriter};
use crate::Result;
use router_api::{BackendKey, HostsMap};
use std::collections::HashMap;
use tracing::info;

impl Config {
    /// Compile and persist the idpath map of every backend that needs one
    ///
    /// Maps are attached to their backends only after all of them were
    /// written; backends that don't need ACLs end up without a map.
    pub fn build_backend_maps<W: MapWriter + ?Sized>(&mut self, writer: &W) -> Result<()> {
        let maps = compile_backend_maps(self.snapshot());
        write_maps(maps.iter().map(|(_, map)| map), writer)?;
        info!("Built backend maps: {} of {} backends", maps.len(), self.backends.len());
        let mut maps: HashMap<BackendKey, HostsMap> = maps.into_iter().collect();
        for backend in self.backends.items_mut() {
            backend.paths_map = maps.remove(&backend.key());
        }
        Ok(())
    }
}

/// Hostpath to path ID maps, in registry order
pub fn compile_backend_maps(model: ModelSnapshot<'_>) -> Vec<(BackendKey, HostsMap)> {
    model
        .backends
        .items()
        .iter()
        .filter(|backend| backend.need_acl())
        .map(|backend| {
            let filename = format!("_back_{}_idpath.map", backend.id);
            let mut paths_map = HostsMap::new(model.maps_dir.join(filename));
            for path in &backend.paths {
                paths_map.append_path(&path.hostpath, &path.id);
            }
            (backend.key(), paths_map)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOptions;
    use crate::writer::MemoryMapWriter;
    use router_api::HostsMapEntry;
    use std::path::{Path, PathBuf};

    fn new_config() -> Config {
        Config::new(ConfigOptions {
            maps_dir: PathBuf::from("/maps"),
        })
    }

    #[test]
    fn test_backend_maps_only_for_acl_backends() {
        let mut config = new_config();
        {
            let backend = config.acquire_backend("default", "app", "8080");
            backend.add_hostpath("d1.local/");
            backend.add_hostpath("d1.local/api").ssl_redirect = true;
        }
        config.acquire_backend("default", "web", "8080").add_hostpath("d1.local/web");
        let writer = MemoryMapWriter::new();
        config.build_backend_maps(&writer).unwrap();

        let app = config.find_backend("default", "app", "8080").unwrap();
        let map = app.paths_map.as_ref().unwrap();
        assert_eq!(
            map.match_entries,
            vec![
                HostsMapEntry { key: "d1.local/api".to_string(), value: "path02".to_string() },
                HostsMapEntry { key: "d1.local/".to_string(), value: "path01".to_string() },
            ]
        );
        assert_eq!(map.match_file, Path::new("/maps/_back_default_app_8080_idpath.map"));
        assert!(config.find_backend("default", "web", "8080").unwrap().paths_map.is_none());
        assert_eq!(
            writer.paths(),
            vec![PathBuf::from("/maps/_back_default_app_8080_idpath.map")]
        );
        assert_eq!(
            writer.file("/maps/_back_default_app_8080_idpath.map").as_deref(),
            Some("d1.local/api path02\nd1.local/ path01\n")
        );
    }

    #[test]
    fn test_backend_maps_reset_when_acl_no_longer_needed() {
        let mut config = new_config();
        {
            let backend = config.acquire_backend("default", "app", "8080");
            backend.add_hostpath("d1.local/");
            backend.add_hostpath("d1.local/api").max_body_size = 10;
        }
        let writer = MemoryMapWriter::new();
        config.build_backend_maps(&writer).unwrap();
        assert!(config.find_backend("default", "app", "8080").unwrap().paths_map.is_some());

        config
            .find_backend_mut("default", "app", "8080")
            .unwrap()
            .add_hostpath("d1.local/api")
            .max_body_size = 0;
        config.build_backend_maps(&writer).unwrap();
        assert!(config.find_backend("default", "app", "8080").unwrap().paths_map.is_none());
    }

    #[test]
    fn test_backend_map_uses_default_backend_id() {
        let mut config = new_config();
        let key = {
            let backend = config.acquire_backend("system", "default", "8080");
            backend.add_hostpath("d1.local/");
            backend.add_hostpath("d1.local/api").ssl_redirect = true;
            backend.key()
        };
        config.config_default_backend(Some(&key));
        let maps = compile_backend_maps(config.snapshot());
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].1.match_file, Path::new("/maps/_back__default_backend_idpath.map"));
    }
}
