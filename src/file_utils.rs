use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

// @module: File and directory utilities

/// Directory name under the user's data directory
const DATA_DIRNAME: &str = "polyharvest";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @creates: Parent directory of a file path
    pub fn ensure_parent_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        match path.as_ref().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Self::ensure_dir(parent),
            _ => Ok(()),
        }
    }

    // @returns: Per-user data directory for stores and caches
    pub fn data_dir() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(DATA_DIRNAME))
    }

    /// Write a value as pretty JSON, replacing the target atomically
    ///
    /// The document is written to a temporary file in the same directory and
    /// renamed over the target, so readers never observe a half-written file.
    pub fn write_json_atomic<P: AsRef<Path>, T: Serialize + ?Sized>(path: P, value: &T) -> Result<()> {
        let path = path.as_ref();
        Self::ensure_parent_dir(path)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;
        serde_json::to_writer_pretty(&mut temp, value)
            .with_context(|| format!("Failed to serialize JSON for {:?}", path))?;
        temp.write_all(b"\n")?;
        temp.flush()?;
        temp.persist(path)
            .with_context(|| format!("Failed to replace {:?}", path))?;

        Ok(())
    }

    /// Read and decode a JSON document
    pub fn read_json<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {:?}", path))?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON file: {:?}", path))?;
        Ok(value)
    }
}
