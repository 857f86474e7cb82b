use anyhow::{Context, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_RETRY: Duration = Duration::from_millis(100);

/// A single YAML document on disk, guarded by a sibling lock file
/// for rudimentary multi-user support
pub struct Storage {
    file_path: PathBuf,
    lock_file_path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let lock_file_path = file_path.with_extension("yaml.lock");
        Self {
            file_path,
            lock_file_path,
        }
    }

    /// Returns the path to the storage file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn exists(&self) -> bool {
        self.file_path.exists()
    }

    /// Retries `try_lock` until it succeeds or the timeout expires
    fn wait_for_lock(&self, lock_file: &File, try_lock: fn(&File) -> std::io::Result<()>) -> Result<()> {
        let start = Instant::now();

        loop {
            match try_lock(lock_file) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        anyhow::bail!(
                            "Timeout waiting for file lock - another user may be editing: {:?}",
                            self.file_path
                        );
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to acquire lock on {:?}", self.lock_file_path)
                    })
                }
            }
        }
    }

    /// Acquire an exclusive lock on the file for writing
    /// Returns the lock file handle which must be held during the operation
    fn acquire_write_lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to create lock file: {:?}", self.lock_file_path))?;

        self.wait_for_lock(&lock_file, |f| FileExt::try_lock_exclusive(f))?;

        // Lock holder info, for debugging stale locks
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );
        Ok(lock_file)
    }

    /// Acquire a shared lock on the file for reading
    fn acquire_read_lock(&self) -> Result<Option<File>> {
        if !self.lock_file_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to open lock file: {:?}", self.lock_file_path))?;

        self.wait_for_lock(&lock_file, |f| FileExt::try_lock_shared(f))?;
        Ok(Some(lock_file))
    }

    fn read_unlocked<T: DeserializeOwned>(&self) -> Result<T> {
        let file = File::open(&self.file_path)
            .with_context(|| format!("Failed to open file: {:?}", self.file_path))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader)
            .with_context(|| format!("Failed to parse YAML from {:?}", self.file_path))
    }

    fn write_unlocked<T: Serialize>(&self, value: &T) -> Result<()> {
        let yaml = serde_yaml::to_string(value)?;
        fs::write(&self.file_path, yaml)
            .with_context(|| format!("Failed to write file: {:?}", self.file_path))
    }

    /// Loads the document, or `None` if the file does not exist yet
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let _lock = self.acquire_read_lock()?;
        self.read_unlocked().map(Some)
    }

    /// Saves the document with file locking
    pub fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let _lock = self.acquire_write_lock()?;
        self.write_unlocked(value)?;
        debug!(path = %self.file_path.display(), "Saved document");
        Ok(())
    }

    /// Perform an atomic update operation with proper locking
    ///
    /// Reloads the file under an exclusive lock (starting from `init` if it
    /// does not exist), applies `update_fn`, and writes back only if the
    /// update succeeds.
    pub fn update_atomically<T, R, F>(&self, init: impl FnOnce() -> T, update_fn: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<R>,
    {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let _lock = self.acquire_write_lock()?;

        let mut value = if self.file_path.exists() {
            self.read_unlocked()?
        } else {
            init()
        };

        let result = update_fn(&mut value)?;
        self.write_unlocked(&value)?;

        // Lock is released when _lock is dropped
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ProjectStore;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("alpha.yaml"));
        let loaded: Option<ProjectStore> = storage.load().unwrap();
        assert!(loaded.is_none());
        assert!(!storage.exists());
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = Storage::new(dir.path().join("nested").join("alpha.yaml"));

        let mut store = ProjectStore::new("alpha");
        store.create_requirement("Login", "", None, Vec::new(), "ana");
        storage.save(&store)?;

        let loaded: ProjectStore = storage.load()?.unwrap();
        assert_eq!(loaded.name, "alpha");
        assert_eq!(loaded.requirements.len(), 1);
        assert_eq!(loaded.next_requirement_number, 2);
        Ok(())
    }

    #[test]
    fn test_update_atomically_skips_write_on_error() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = Storage::new(dir.path().join("alpha.yaml"));

        storage.update_atomically(
            || ProjectStore::new("alpha"),
            |store: &mut ProjectStore| {
                store.create_requirement("Login", "", None, Vec::new(), "ana");
                Ok(())
            },
        )?;

        let failed: Result<()> = storage.update_atomically(
            || ProjectStore::new("alpha"),
            |store: &mut ProjectStore| {
                store.create_requirement("Never saved", "", None, Vec::new(), "ana");
                anyhow::bail!("rejected")
            },
        );
        assert!(failed.is_err());

        let loaded: ProjectStore = storage.load()?.unwrap();
        assert_eq!(loaded.requirements.len(), 1);
        Ok(())
    }
}
