//! Where referenced container files come from. Normalization only sees
//! this trait, so tests and embedders can supply in-memory bytes.

use std::collections::HashMap;
use std::path::PathBuf;

use rheedh5_format::File;

use crate::error::ExtractError;

pub trait FileAccess {
    /// Open the container registered under `name`.
    fn open(&self, name: &str) -> Result<File, ExtractError>;
}

/// Containers resolved against a base directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryAccess {
    base: PathBuf,
}

impl DirectoryAccess {
    pub fn new(base: impl Into<PathBuf>) -> DirectoryAccess {
        DirectoryAccess { base: base.into() }
    }
}

impl FileAccess for DirectoryAccess {
    fn open(&self, name: &str) -> Result<File, ExtractError> {
        Ok(File::open(self.base.join(name))?)
    }
}

/// Containers held in memory, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccess {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAccess {
    pub fn new() -> MemoryAccess {
        MemoryAccess::default()
    }

    pub fn insert(&mut self, name: &str, bytes: Vec<u8>) -> &mut MemoryAccess {
        self.files.insert(name.to_owned(), bytes);
        self
    }
}

impl FileAccess for MemoryAccess {
    fn open(&self, name: &str) -> Result<File, ExtractError> {
        let bytes = self
            .files
            .get(name)
            .ok_or_else(|| ExtractError::FileUnavailable(name.to_owned()))?;
        Ok(File::from_bytes(bytes.clone())?)
    }
}
