// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct MockState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    /// Paths whose writes and removals fail, to exercise error paths.
    read_only: BTreeSet<PathBuf>,
    /// Explicit modification times; files without one report 0.
    mtimes: BTreeMap<PathBuf, i64>,
}

/// In-memory filesystem for tests. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.state.lock().unwrap();
        Self::ensure_parents(&mut state, &path);
        state.files.insert(path, content.into());
    }

    /// Make writes to and removals of `path` fail.
    pub fn set_read_only(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.read_only.insert(path.as_ref().to_path_buf());
    }

    pub fn set_modified(&self, path: impl AsRef<Path>, epoch: i64) {
        let mut state = self.state.lock().unwrap();
        state.mtimes.insert(path.as_ref().to_path_buf(), epoch);
    }

    /// All file paths currently stored, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let state = self.state.lock().unwrap();
        state.files.keys().cloned().collect()
    }

    fn ensure_parents(state: &mut MockState, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            state.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        {
            let state = self.state.lock().unwrap();
            if state.read_only.contains(path) {
                return Err(anyhow!("Permission denied: {:?}", path));
            }
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.read_only.contains(path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_parents(&mut state, path);
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.files.contains_key(path)
    }

    fn modified(&self, path: &Path) -> Result<i64> {
        let state = self.state.lock().unwrap();
        if !state.files.contains_key(path) {
            return Err(anyhow!("File not found: {:?}", path));
        }
        Ok(state.mtimes.get(path).copied().unwrap_or(0))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.state.lock().unwrap();
        if !state.dirs.contains(path) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        let children = state
            .files
            .keys()
            .chain(state.dirs.iter())
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();
        Ok(children)
    }
}
