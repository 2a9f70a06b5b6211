//! # Filesystem-backed key-value store
//!
//! [`FileStore`] is a [`KeyValueStore`] implementation that persists each key
//! as one file under a base directory. It is the store used on devices so a
//! session survives app restarts.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! ├── userToken          # file content is the value string
//! ├── userType
//! ├── walkId
//! └── ...
//! ```
//!
//! ## Platform data directories
//!
//! [`FileStore::in_data_dir`] uses [`dirs::data_dir()`] to obtain a
//! platform-appropriate base:
//!
//! | Platform | Path |
//! |----------|------|
//! | macOS / iOS | `~/Library/Application Support/safewalk/` |
//! | Linux | `~/.local/share/safewalk/` |
//! | Windows | `C:\Users\<user>\AppData\Roaming\safewalk\` |
//! | Android | App-internal storage (via `dirs`) |
//!
//! Read errors are reported as an absent key; write errors are ignored at
//! this layer and the session simply fails to persist — callers treat the
//! next boot's empty read as "signed out."

use std::path::{Path, PathBuf};

use crate::session::KeyValueStore;

/// Filesystem-backed KeyValueStore for device persistence.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    /// Store rooted at the platform data directory, falling back to the
    /// current directory when the platform reports none.
    pub fn in_data_dir() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("safewalk");
        Self::new(base)
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base.join(key)
    }

    /// Delete the whole store directory.
    pub fn delete_all(base: &Path) {
        let _ = std::fs::remove_dir_all(base);
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.key_path(key)).ok()
    }

    async fn put(&self, key: &str, value: &str) {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::write(path, value);
    }

    async fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.key_path(key));
    }
}
