//! Temporary directory holding one cleaned HTML file per downloaded chapter.
//!
//! Files are named `{index:0>width}_{title}.html`, so sorting by file name gives
//! reading order. The directory is removed once the EPUB is written.

use crate::clean::normalize_fragment;
use crate::model::Chapter;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const CHAPTER_EXT: &str = "html";

/// Title budget in a file name; leaves room for the index prefix and extension under the usual 255-byte limit.
const MAX_TITLE_BYTES: usize = 200;

#[derive(Debug, Error)]
pub enum WorkDirError {
    #[error("Work directory {path} already exists and is not empty. Remove it or pass a different --path.")]
    NotEmpty { path: PathBuf },

    #[error("Work directory {path} exists and is not a directory.")]
    NotADirectory { path: PathBuf },

    #[error("Cannot create work directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write chapter file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read work directory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot remove work directory {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Number of decimal digits needed for `total` (at least 1).
pub fn index_width(total: usize) -> usize {
    total.max(1).to_string().len()
}

/// File name for the chapter written at 0-based `index`.
pub fn chapter_file_name(index: usize, width: usize, title: &str) -> String {
    let title = sanitize_file_title(title);
    let title = if title.is_empty() {
        format!("Chapter {}", index + 1)
    } else {
        title
    };
    format!("{:0>width$}_{}.{}", index, title, CHAPTER_EXT, width = width)
}

/// Path separators and control characters cannot appear in a file name.
fn sanitize_file_title(title: &str) -> String {
    let title = title
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect::<String>();
    truncate_at_char_boundary(title.trim(), MAX_TITLE_BYTES)
        .trim_end()
        .to_string()
}

fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Split `007_Title` into `Title`. Stems without a numeric prefix are returned whole.
fn title_from_stem(stem: &str) -> &str {
    match stem.split_once('_') {
        Some((prefix, rest))
            if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) =>
        {
            rest
        }
        _ => stem,
    }
}

#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Create the directory, or reuse it when it already exists and is empty.
    pub fn create(path: &Path) -> Result<Self, WorkDirError> {
        let path = path.to_path_buf();
        if path.exists() {
            if !path.is_dir() {
                return Err(WorkDirError::NotADirectory { path });
            }
            let mut entries = fs::read_dir(&path).map_err(|e| WorkDirError::Read {
                path: path.clone(),
                source: e,
            })?;
            if entries.next().is_some() {
                return Err(WorkDirError::NotEmpty { path });
            }
            debug!("Reusing empty work directory {}", path.display());
        } else {
            fs::create_dir_all(&path).map_err(|e| WorkDirError::Create {
                path: path.clone(),
                source: e,
            })?;
            debug!("Created work directory {}", path.display());
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one cleaned chapter and return the file path.
    pub fn write_chapter(
        &self,
        index: usize,
        width: usize,
        title: &str,
        body: &str,
    ) -> Result<PathBuf, WorkDirError> {
        let path = self.path.join(chapter_file_name(index, width, title));
        fs::write(&path, body).map_err(|e| WorkDirError::Write {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    fn chapter_files(&self) -> Result<Vec<PathBuf>, WorkDirError> {
        let read_err = |e| WorkDirError::Read {
            path: self.path.clone(),
            source: e,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            let is_chapter = path.extension().and_then(|e| e.to_str()) == Some(CHAPTER_EXT);
            if is_chapter && path.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Read every `.html` file back in file-name order.
    pub fn read_chapters(&self) -> Result<Vec<Chapter>, WorkDirError> {
        let mut chapters = Vec::new();
        for (i, path) in self.chapter_files()?.into_iter().enumerate() {
            let html = fs::read_to_string(&path).map_err(|e| WorkDirError::Read {
                path: path.clone(),
                source: e,
            })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let stem = file_name
                .strip_suffix(&format!(".{}", CHAPTER_EXT))
                .unwrap_or(&file_name);
            chapters.push(Chapter {
                title: title_from_stem(stem).to_string(),
                index: i as u32 + 1,
                body: normalize_fragment(&html),
            });
        }
        Ok(chapters)
    }

    /// Delete the chapter files and then the directory itself.
    pub fn remove(self) -> Result<(), WorkDirError> {
        let remove_err = |e| WorkDirError::Remove {
            path: self.path.clone(),
            source: e,
        };
        for path in self.chapter_files()? {
            fs::remove_file(&path).map_err(remove_err)?;
        }
        fs::remove_dir(&self.path).map_err(remove_err)?;
        debug!("Removed work directory {}", self.path.display());
        Ok(())
    }
}
