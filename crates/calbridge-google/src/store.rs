//! Token stores.
//!
//! A store holds the raw token payload between requests. [`FileStore`] keeps
//! it in a JSON file; [`MemoryStore`] keeps it in a string the caller owns,
//! typically copied in from and back out to a web session.
//!
//! Every store hands out a refresh guard. All `FileStore`s opened on the same
//! path in one process share a guard, as do all clones of a `MemoryStore`.
//! The token manager holds it across load, refresh and save.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::error::{GoogleError, GoogleResult};

/// Guard serializing token refreshes for one store.
pub type RefreshGuard = Arc<AsyncMutex<()>>;

/// Durable or transient holder of the current token payload.
pub trait TokenStore: Send + Sync + fmt::Debug {
    /// Returns the stored payload, or `None` when the store is empty.
    ///
    /// Whitespace-only content counts as empty.
    fn load(&self) -> GoogleResult<Option<String>>;

    /// Replaces the stored payload.
    fn save(&self, payload: &str) -> GoogleResult<()>;

    /// Empties the store. Clearing an empty store is not an error.
    fn clear(&self) -> GoogleResult<()>;

    /// The guard shared by every handle onto the same underlying storage.
    fn refresh_guard(&self) -> RefreshGuard;
}

fn path_guards() -> &'static Mutex<HashMap<PathBuf, RefreshGuard>> {
    static GUARDS: OnceLock<Mutex<HashMap<PathBuf, RefreshGuard>>> = OnceLock::new();
    GUARDS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Registry key for `path`: absolute, with the parent directory resolved when it exists.
fn guard_key(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|dir| dir.join(name))
            .unwrap_or(absolute),
        _ => absolute,
    }
}

/// Token payload persisted as a JSON file.
///
/// The parent directory is created owner-only (0700) on first write and the
/// file itself is written owner-only (0600) through a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    guard: RefreshGuard,
}

impl FileStore {
    /// Opens a store at `path`. Nothing is touched on disk until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let guard = {
            let mut guards = path_guards().lock().unwrap_or_else(PoisonError::into_inner);
            guards.entry(guard_key(&path)).or_default().clone()
        };
        Self { path, guard }
    }

    /// Returns the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> GoogleResult<()> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || parent.exists() {
            return Ok(());
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(parent).map_err(|e| {
            GoogleError::store_io(
                format!("failed to create token directory {}", parent.display()),
                e,
            )
        })?;
        debug!("created token directory {:?}", parent);
        Ok(())
    }

    /// Writes `payload` to `temp_path`, restricts it, and moves it over the token file.
    fn write_via(&self, temp_path: &Path, payload: &str) -> GoogleResult<()> {
        fs::write(temp_path, payload).map_err(|e| {
            GoogleError::store_io(
                format!("failed to write token file {}", temp_path.display()),
                e,
            )
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                GoogleError::store_io("failed to restrict token file permissions", e)
            })?;
        }

        fs::rename(temp_path, &self.path).map_err(|e| {
            GoogleError::store_io(
                format!("failed to replace token file {}", self.path.display()),
                e,
            )
        })
    }
}

impl TokenStore for FileStore {
    fn load(&self) -> GoogleResult<Option<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no token file at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => {
                return Err(GoogleError::store_io(
                    format!("failed to read token file {}", self.path.display()),
                    e,
                ));
            }
        };

        if content.trim().is_empty() {
            debug!("token file {:?} is empty", self.path);
            return Ok(None);
        }
        Ok(Some(content))
    }

    fn save(&self, payload: &str) -> GoogleResult<()> {
        self.ensure_parent_dir()?;

        let temp_path = self.path.with_extension("json.tmp");
        if let Err(e) = self.write_via(&temp_path, payload) {
            if let Err(cleanup) = fs::remove_file(&temp_path)
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                warn!("failed to remove {:?}: {}", temp_path, cleanup);
            }
            return Err(e);
        }

        debug!("saved token to {:?}", self.path);
        Ok(())
    }

    fn clear(&self) -> GoogleResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("removed token file {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GoogleError::store_io(
                format!("failed to remove token file {}", self.path.display()),
                e,
            )),
        }
    }

    fn refresh_guard(&self) -> RefreshGuard {
        self.guard.clone()
    }
}

/// Token payload held in memory by the caller.
///
/// Clones share the same slot, so a caller can hand one clone to the token
/// manager and read the (possibly refreshed) payload back from another
/// after the request.
#[derive(Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
    guard: RefreshGuard,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a payload, e.g. from a user session.
    ///
    /// Empty strings are treated as no payload.
    pub fn from_session(payload: Option<String>) -> Self {
        let store = Self::new();
        *store.lock_slot() = payload.filter(|p| !p.trim().is_empty());
        store
    }

    /// The current payload, for writing back to the session.
    pub fn contents(&self) -> Option<String> {
        self.lock_slot().clone()
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("occupied", &self.lock_slot().is_some())
            .finish()
    }
}

impl TokenStore for MemoryStore {
    fn load(&self) -> GoogleResult<Option<String>> {
        Ok(self
            .lock_slot()
            .as_ref()
            .filter(|p| !p.trim().is_empty())
            .cloned())
    }

    fn save(&self, payload: &str) -> GoogleResult<()> {
        *self.lock_slot() = Some(payload.to_string());
        Ok(())
    }

    fn clear(&self) -> GoogleResult<()> {
        *self.lock_slot() = None;
        Ok(())
    }

    fn refresh_guard(&self) -> RefreshGuard {
        self.guard.clone()
    }
}
