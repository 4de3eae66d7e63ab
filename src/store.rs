//! Key/value persistence for settings, cooldown marker and the cached brief.
//!
//! Every write replaces a whole key. `FileStore` keeps all keys in one JSON
//! object on disk and rewrites it through a temp file + rename, so readers
//! never observe a partially written value.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub const PROVIDER_KEY: &str = "cf_api_provider";
pub const STRICT_MODE_KEY: &str = "cf_strict_mode";
pub const COOLDOWN_KEY: &str = "cf_ai_cooldown_until";
pub const LATEST_BRIEF_KEY: &str = "cf_latest_brief";

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Process-local store; used by tests and when no store path is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let g = self.inner.read().unwrap_or_else(|p| p.into_inner());
        g.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        g.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        g.remove(key);
        Ok(())
    }
}

/// JSON-file backed store. The whole map lives in memory and is flushed on
/// every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`. A missing or corrupt file
    /// starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let map = match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "store file unreadable, starting empty");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            inner: RwLock::new(map),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, map: &HashMap<String, String>) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(map)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut f = fs::File::create(&tmp)?;
        f.write_all(&json)?;
        f.sync_all()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let g = self.inner.read().unwrap_or_else(|p| p.into_inner());
        g.get(key).cloned()
    }

    /// The in-memory map only changes once the new state is on disk.
    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        let mut next = g.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *g = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        if !g.contains_key(key) {
            return Ok(());
        }
        let mut next = g.clone();
        next.remove(key);
        self.flush(&next)?;
        *g = next;
        Ok(())
    }
}
