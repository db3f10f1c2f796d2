//! File-backed local store.
//!
//! One pretty-printed JSON file per key inside a configured directory,
//! accessed via `tokio::fs`.

use crate::backend::LocalStore;
use crate::error::{ErrorKind, Result};
use crate::key::validate as validate_key;
use async_trait::async_trait;
use exn::ResultExt;
use serde_json::Value;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;

const EXTENSION: &str = "json";

/// Local store keeping each blob in `<root>/<key>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous mirror intact rather than a truncated
/// file.
///
/// # Examples
///
/// ```no_run
/// use binge_store::backend::FileLocalStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FileLocalStore::new("device", "/var/lib/binge")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FileLocalStore {
    name: String,
    /// Directory holding one file per key
    root: PathBuf,
}

impl FileLocalStore {
    /// Create a new file-backed store, creating `root` if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is not
    /// absolute or exists but isn't a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Use non-async here; it'll only happen once on start-up and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let key = validate_key(key)?;
        Ok(self.root.join(format!("{key}.{EXTENSION}")))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.display().to_string()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl LocalStore for FileLocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_blob(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => exn::bail!(Self::map_io_error(e, &path)),
        };
        let value = serde_json::from_slice(&bytes)
            .or_raise(|| ErrorKind::InvalidData(format!("{} is not valid JSON", path.display())))?;
        Ok(Some(value))
    }

    async fn set_blob(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.path_for(key)?;
        let temporary = path.with_extension(format!("{EXTENSION}.tmp"));
        let bytes = serde_json::to_vec_pretty(value)
            .or_raise(|| ErrorKind::InvalidData(format!("cannot serialize blob for {key}")))?;
        fs::write(&temporary, &bytes).await.map_err(|e| Self::map_io_error(e, &temporary))?;
        if let Err(e) = fs::rename(&temporary, &path).await {
            // Don't leave the temporary file lying around; the original
            // error is the interesting one.
            _ = fs::remove_file(&temporary).await;
            exn::bail!(Self::map_io_error(e, &path));
        }
        tracing::trace!(store = %self.name, key, bytes = bytes.len(), "Wrote local blob");
        Ok(())
    }
}
