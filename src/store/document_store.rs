use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AppError, Result};

const CODERS_FILE: &str = "coders.xml";
const EXTENSION: &str = "xml";

// ---------------------------------------------------------------------------
// DocKey
// ---------------------------------------------------------------------------

/// Cache key: the coder directory or one round's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocKey {
    Coders,
    Round(u64),
}

impl DocKey {
    fn file_name(self) -> String {
        match self {
            DocKey::Coders => CODERS_FILE.to_string(),
            DocKey::Round(id) => format!("{id}.{EXTENSION}"),
        }
    }

    /// Inverse of `file_name`. Anything else in the directory is not ours.
    fn from_file_name(name: &str) -> Option<Self> {
        if name == CODERS_FILE {
            return Some(DocKey::Coders);
        }
        let stem = name.strip_suffix(EXTENSION)?.strip_suffix('.')?;
        if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        stem.parse().ok().map(DocKey::Round)
    }
}

impl std::fmt::Display for DocKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocKey::Coders => write!(f, "coders"),
            DocKey::Round(id) => write!(f, "round {id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// Whole-document file cache, one file per key. Writes are not atomic.
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Opens the cache at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self, key: DocKey) -> Result<Vec<u8>> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, key: DocKey, bytes: &[u8]) -> Result<()> {
        fs::write(self.path(key), bytes)?;
        debug!(key = %key, bytes = bytes.len(), "cached document");
        Ok(())
    }

    pub fn exists(&self, key: DocKey) -> bool {
        self.path(key).is_file()
    }

    pub fn list_keys(&self) -> Result<BTreeSet<DocKey>> {
        let mut keys = BTreeSet::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(key) = entry.file_name().to_str().and_then(DocKey::from_file_name) {
                keys.insert(key);
            }
        }
        Ok(keys)
    }

    fn path(&self, key: DocKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}
