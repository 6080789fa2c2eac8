//! Source file enumeration
//!
//! A [`FileSet`] is a snapshot of the files that will be packaged, taken
//! once before anything is built. It is used for reporting and for the
//! check against the partition size.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A file that will be packaged into the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifFile {
    /// File name as it will appear in the image
    pub name: String,
    /// Full path on the host
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

/// Files matching an extension in a source directory, ordered by name
#[derive(Debug, Clone)]
pub struct FileSet {
    dir: PathBuf,
    files: Vec<GifFile>,
}

impl FileSet {
    /// Scan `dir` (non-recursively) for regular files ending in `.<extension>`
    ///
    /// The extension match is case-sensitive, and dot files are included.
    pub fn scan(dir: &Path, extension: &str) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::DirectoryNotFound(dir.to_path_buf()));
        }

        let suffix = format!(".{}", extension);
        let mut files = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                log::warn!("Skipping non UTF-8 file name {:?}", entry.file_name());
                continue;
            };
            // Like a "*.gif" glob, hidden files and a bare ".gif" match too
            if !name.ends_with(&suffix) {
                continue;
            }

            let path = entry.path();
            let meta = fs::metadata(&path)?;
            if !meta.is_file() {
                log::debug!("Skipping {}: not a regular file", path.display());
                continue;
            }

            files.push(GifFile {
                name,
                path,
                size: meta.len(),
            });
        }

        if files.is_empty() {
            return Err(Error::NoFiles {
                dir: dir.to_path_buf(),
                extension: extension.to_string(),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        log::debug!("Found {} files in {}", files.len(), dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    /// Directory that was scanned
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files in name order
    pub fn files(&self) -> &[GifFile] {
        &self.files
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Always false; a scan with no matches is an error
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of all file sizes
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Files whose SPIFFS object name would not fit in `obj_name_len` bytes
    ///
    /// SPIFFS stores the name as "/<name>" followed by a NUL terminator.
    pub fn names_too_long(&self, obj_name_len: usize) -> Vec<&GifFile> {
        self.files
            .iter()
            .filter(|f| f.name.len() + 2 > obj_name_len)
            .collect()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a GifFile;
    type IntoIter = std::slice::Iter<'a, GifFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
