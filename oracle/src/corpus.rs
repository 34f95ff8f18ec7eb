//! On-disk seed corpora.
//!
//! Seeds are raw SSZ byte files named by the SHA-256 of their content
//! (`<hex>.ssz`) in a flat directory per target, which keeps stores
//! content-addressed and de-duplicated by construction.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A flat directory of content-addressed seeds.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    root: PathBuf,
    limit: usize,
}

impl CorpusStore {
    /// Opens a store rooted at `root`, loading at most `limit` seeds.
    pub fn new<P: Into<PathBuf>>(root: P, limit: usize) -> Self {
        Self {
            root: root.into(),
            limit,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` under its content hash, returning the path. Saving
    /// the same bytes twice is a no-op.
    pub fn save(&self, bytes: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let digest = Sha256::digest(bytes);
        let path = self.root.join(format!("{}.ssz", hex::encode(digest)));
        if !path.exists() {
            fs::write(&path, bytes)?;
        }
        Ok(path)
    }

    /// Loads up to the configured limit of seeds, in file-name order so the
    /// selection is stable across runs.
    pub fn load(&self) -> io::Result<Vec<Vec<u8>>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map_or(false, |ext| ext == "ssz"))
            .collect();
        paths.sort();
        paths
            .into_iter()
            .take(self.limit)
            .map(fs::read)
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn saved_seeds_are_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path(), 16);

        let path = store.save(b"\x04\x00\x00\x00abc").unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(".ssz"));
        assert_eq!(name.len(), 64 + 4);

        // Saving the same bytes again lands on the same file.
        assert_eq!(store.save(b"\x04\x00\x00\x00abc").unwrap(), path);
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn load_respects_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path(), 2);
        for i in 0u8..5 {
            store.save(&[i]).unwrap();
        }
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn missing_directory_is_an_empty_corpus() {
        let store = CorpusStore::new("/nonexistent/corpus/dir", 8);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn non_seed_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path(), 8);
        store.save(b"seed").unwrap();
        fs::write(dir.path().join("README.md"), "not a seed").unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
