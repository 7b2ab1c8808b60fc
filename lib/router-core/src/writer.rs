//! Persistence of compiled maps

use crate::{CoreError, Result};
use router_api::{HostsMap, HostsMapEntry};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output writer of map files
pub trait MapWriter {
    /// Persist `entries` to `path`, replacing any previous content
    fn write_output(&self, entries: &[HostsMapEntry], path: &Path) -> Result<()>;
}

/// Render entries as `<key> <value>` lines, or a bare `<key>` for list items
pub fn render_entries(entries: &[HostsMapEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.key);
        if !entry.value.is_empty() {
            out.push(' ');
            out.push_str(&entry.value);
        }
        out.push('\n');
    }
    out
}

/// Writes map files to the filesystem
#[derive(Clone, Debug, Default)]
pub struct FileMapWriter;

impl MapWriter for FileMapWriter {
    fn write_output(&self, entries: &[HostsMapEntry], path: &Path) -> Result<()> {
        let write_err = |source| CoreError::WriteMap {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, render_entries(entries)).map_err(write_err)?;
        debug!("Wrote {} entries to {}", entries.len(), path.display());
        Ok(())
    }
}

/// Keeps rendered map files in memory, for dry runs
#[derive(Debug, Default)]
pub struct MemoryMapWriter {
    files: RefCell<BTreeMap<PathBuf, String>>,
}

impl MemoryMapWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered content of a file, if it was written
    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.borrow().get(path.as_ref()).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }
}

impl MapWriter for MemoryMapWriter {
    fn write_output(&self, entries: &[HostsMapEntry], path: &Path) -> Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), render_entries(entries));
        Ok(())
    }
}

/// Fails the `fail_at`-th write (1-based), recording the others in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingMapWriter {
    pub(crate) inner: MemoryMapWriter,
    pub(crate) fail_at: usize,
    pub(crate) attempts: std::cell::Cell<usize>,
}

#[cfg(test)]
impl FailingMapWriter {
    pub(crate) fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            ..Default::default()
        }
    }
}

#[cfg(test)]
impl MapWriter for FailingMapWriter {
    fn write_output(&self, entries: &[HostsMapEntry], path: &Path) -> Result<()> {
        let attempt = self.attempts.get() + 1;
        self.attempts.set(attempt);
        if attempt == self.fail_at {
            return Err(CoreError::WriteMap {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.inner.write_output(entries, path)
    }
}

/// Persist every map: the exact-match file always, the regex file only when
/// the map has regex entries. Stops at the first failure.
pub fn write_maps<'a, W, I>(maps: I, writer: &W) -> Result<()>
where
    W: MapWriter + ?Sized,
    I: IntoIterator<Item = &'a HostsMap>,
{
    for map in maps {
        writer.write_output(&map.match_entries, &map.match_file)?;
        if !map.regex_entries.is_empty() {
            writer.write_output(&map.regex_entries, &map.regex_file)?;
        }
    }
    Ok(())
}
