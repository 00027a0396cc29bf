//! Key-value persistence adapters for cart state

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where cart state is persisted between runs
pub trait CartStorage {
    /// The stored value, `None` when the key was never written
    fn load(&self, key: &str) -> io::Result<Option<String>>;

    fn save(&mut self, key: &str, value: &str) -> io::Result<()>;

    fn remove(&mut self, key: &str) -> io::Result<()>;
}

/// One JSON file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl CartStorage for FileStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&mut self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Write to a sibling temp file, then rename into place
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-process storage, used by tests and the preview server
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
