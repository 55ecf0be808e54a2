use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Read-through cache of file contents keyed by absolute path, valid for one run.
///
/// The filesystem is assumed unchanged during a run, so entries are never
/// invalidated. Failed reads are not cached.
#[derive(Debug, Default)]
pub struct ContentCache {
    entries: HashMap<PathBuf, String>,
    hits: usize,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, path: &Path) -> Result<&str> {
        if self.entries.contains_key(path) {
            self.hits += 1;
        } else {
            let content = fs::read_to_string(path).map_err(|e| AppError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })?;
            log::trace!("Read {} bytes from {}", content.len(), path.display());
            self.entries.insert(path.to_path_buf(), content);
        }
        Ok(self.entries[path].as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn serves_repeated_reads_from_memory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.ts");
        fs::write(&path, "first").unwrap();

        let mut cache = ContentCache::new();
        assert_eq!(cache.get(&path).unwrap(), "first");
        fs::write(&path, "second").unwrap();
        assert_eq!(cache.get(&path).unwrap(), "first");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn missing_and_binary_files_are_errors() {
        let tmp = TempDir::new().unwrap();
        let mut cache = ContentCache::new();
        assert!(matches!(
            cache.get(&tmp.path().join("missing.ts")),
            Err(AppError::FileRead { .. })
        ));

        let binary = tmp.path().join("blob.bin");
        fs::write(&binary, [0xff, 0xfe, 0x00, 0x80]).unwrap();
        assert!(cache.get(&binary).is_err());
        assert!(cache.is_empty());
    }
}
