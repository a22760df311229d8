// ── Durable key/value storage ──
//
// The transaction needs exactly one persisted boolean. Hosts plug in their
// own store through `DurableStore`; `FileStore` covers desktop/server hosts
// and `MemoryStore` covers tests and ephemeral embeddings.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::Error;

/// Namespace the install flag lives in.
pub const STORE_NAMESPACE: &str = "com.sessionm.cpi.prefsfile";

/// Key of the durable "install already sent" flag.
pub const INSTALL_SENT_KEY: &str = "com.sessionm.cpi.install.sent";

/// A durable boolean map scoped to the application.
///
/// Writes must be durable by the time `put_bool` returns `Ok`.
pub trait DurableStore: Send + Sync {
    /// Read `key`, falling back to `default` when it was never written.
    fn get_bool(&self, key: &str, default: bool) -> Result<bool, Error>;

    /// Persist `value` under `key`.
    fn put_bool(&self, key: &str, value: bool) -> Result<(), Error>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── MemoryStore ─────────────────────────────────────────────────────

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn get_bool(&self, key: &str, default: bool) -> Result<bool, Error> {
        Ok(lock(&self.entries).get(key).copied().unwrap_or(default))
    }

    fn put_bool(&self, key: &str, value: bool) -> Result<(), Error> {
        lock(&self.entries).insert(key.to_owned(), value);
        Ok(())
    }
}

// ── FileStore ───────────────────────────────────────────────────────

/// One JSON object per namespace at `<dir>/<namespace>.json`.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>, namespace: &str) -> Self {
        let path = dir.as_ref().join(format!("{namespace}.json"));
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Store for the install flag's namespace under `dir`.
    pub fn for_install(dir: impl AsRef<Path>) -> Self {
        Self::open(dir, STORE_NAMESPACE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, Value>, Error> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, Value>) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "store persisted");
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get_bool(&self, key: &str, default: bool) -> Result<bool, Error> {
        let entries = self.load()?;
        match entries.get(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(Error::Store {
                message: format!("'{key}' is not a boolean: {other}"),
            }),
        }
    }

    fn put_bool(&self, key: &str, value: bool) -> Result<(), Error> {
        let _guard = lock(&self.write_lock);
        let mut entries = self.load()?;
        entries.insert(key.to_owned(), Value::Bool(value));
        trace!(key, value, "writing durable flag");
        self.persist(&entries)
    }
}
