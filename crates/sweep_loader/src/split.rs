//! Deterministic train/test split of a directory of radar files.
//!
//! Files are ordered by the SHA-256 digest of their name, so a file lands in
//! the same subset on every machine and every run, and adding files only
//! moves files near the cut.

use anyhow::{ensure, Context, Result};
use log::info;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Marker file kept in otherwise empty data directories.
const PLACEHOLDER: &str = ".gitkeep";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// File name within the split directory.
    pub name: String,
    pub path: PathBuf,
    /// Lowercase hex SHA-256 of `name`.
    pub hash: String,
}

impl FileEntry {
    pub fn new(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        let hash = hex::encode(Sha256::digest(name.as_bytes()));
        Some(Self { name, path, hash })
    }
}

#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    folder: PathBuf,
    train: Vec<FileEntry>,
    test: Vec<FileEntry>,
}

impl TrainTestSplit {
    /// Splits the files directly inside `folder`, putting
    /// `round(len * train_percentage / 100)` of them in the training set.
    ///
    /// # Errors
    /// - `train_percentage` outside `[0, 100]`
    /// - `folder` cannot be listed
    pub fn from_dir(folder: impl AsRef<Path>, train_percentage: f64) -> Result<Self> {
        ensure!(
            (0.0..=100.0).contains(&train_percentage),
            "train_percentage must be within [0, 100], but got {}",
            train_percentage
        );
        let folder = folder.as_ref();

        let pattern = format!("{}/*", glob::Pattern::escape(&folder.to_string_lossy()));

        let mut files = Vec::new();
        for entry in glob::glob(&pattern)
            .with_context(|| format!("Invalid directory pattern for {}", folder.display()))?
        {
            let path = entry.with_context(|| format!("Failed to list {}", folder.display()))?;
            if !path.is_file() {
                continue;
            }
            if let Some(file) = FileEntry::new(path) {
                if file.name != PLACEHOLDER {
                    files.push(file);
                }
            }
        }
        info!("Found {} files in {}", files.len(), folder.display());

        Ok(Self::from_entries(folder, files, train_percentage))
    }

    fn from_entries(folder: &Path, mut files: Vec<FileEntry>, train_percentage: f64) -> Self {
        files.sort_by(|a, b| a.hash.cmp(&b.hash));
        let split_location = ((files.len() as f64 * train_percentage / 100.0).round() as usize)
            .min(files.len());
        let test = files.split_off(split_location);
        Self {
            folder: folder.to_path_buf(),
            train: files,
            test,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn train(&self) -> &[FileEntry] {
        &self.train
    }

    pub fn test(&self) -> &[FileEntry] {
        &self.test
    }

    pub fn train_paths(&self) -> Vec<PathBuf> {
        self.train.iter().map(|f| f.path.clone()).collect()
    }

    pub fn test_paths(&self) -> Vec<PathBuf> {
        self.test.iter().map(|f| f.path.clone()).collect()
    }
}
