// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON file-based storage

use fs2::FileExt;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOCK_FILE: &str = ".lock";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not found: {kind}/{id}")]
    NotFound { kind: String, id: String },
    #[error("already exists: {kind}/{id}")]
    AlreadyExists { kind: String, id: String },
    #[error("invalid id for {kind}: {id:?}")]
    InvalidId { kind: String, id: String },
}

/// JSON file-based storage, one document per file under `<base>/<kind>/`
#[derive(Clone, Debug)]
pub struct JsonStore {
    base_path: PathBuf,
}

impl JsonStore {
    /// Open a store at the given path
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Run `f` while holding the store-wide exclusive lock
    pub(crate) fn with_lock<T>(
        &self,
        f: impl FnOnce() -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.base_path.join(LOCK_FILE))?;
        lock_file.lock_exclusive()?;
        // Released when lock_file is dropped
        f()
    }

    /// Write a document, replacing any previous version atomically
    pub(crate) fn save<T: Serialize>(
        &self,
        kind: &str,
        id: &str,
        data: &T,
    ) -> Result<(), StorageError> {
        let path = self.path_for(kind, id)?;
        let dir = self.base_path.join(kind);
        fs::create_dir_all(&dir)?;

        let temp_path = dir.join(format!(".{}.json.tmp", id));
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&temp_path, json)?;
        // Atomic replace (rename is atomic on POSIX)
        fs::rename(&temp_path, &path)?;
        tracing::debug!(kind, id, "document saved");
        Ok(())
    }

    /// Write a new document. Callers hold the store lock.
    pub(crate) fn create<T: Serialize>(
        &self,
        kind: &str,
        id: &str,
        data: &T,
    ) -> Result<(), StorageError> {
        if self.exists(kind, id)? {
            return Err(StorageError::AlreadyExists {
                kind: kind.to_string(),
                id: id.to_string(),
            });
        }
        self.save(kind, id, data)
    }

    /// Load a document
    pub(crate) fn load<T: DeserializeOwned>(&self, kind: &str, id: &str) -> Result<T, StorageError> {
        let path = self.path_for(kind, id)?;
        if !path.exists() {
            return Err(StorageError::NotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            });
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load every document of a kind
    pub(crate) fn load_all<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<T>, StorageError> {
        let dir = self.base_path.join(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let json = fs::read_to_string(&path)?;
                documents.push(serde_json::from_str(&json)?);
            }
        }
        Ok(documents)
    }

    /// Move a document to another kind, keeping its id. Callers hold the
    /// store lock.
    pub(crate) fn archive<T: Serialize>(
        &self,
        kind: &str,
        archive_kind: &str,
        id: &str,
        data: &T,
    ) -> Result<(), StorageError> {
        self.save(archive_kind, id, data)?;
        fs::remove_file(self.path_for(kind, id)?)?;
        Ok(())
    }

    /// Check if a document exists
    pub(crate) fn exists(&self, kind: &str, id: &str) -> Result<bool, StorageError> {
        Ok(self.path_for(kind, id)?.exists())
    }

    fn path_for(&self, kind: &str, id: &str) -> Result<PathBuf, StorageError> {
        let invalid = id.is_empty()
            || id.starts_with('.')
            || id.contains(&['/', '\\'][..])
            || id.chars().any(char::is_control);
        if invalid {
            return Err(StorageError::InvalidId {
                kind: kind.to_string(),
                id: id.to_string(),
            });
        }
        Ok(self.base_path.join(kind).join(format!("{}.json", id)))
    }
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
