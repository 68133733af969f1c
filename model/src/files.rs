//! Directory helpers for the extracted PMZ layout. Archives are authored on
//! case-insensitive filesystems, so every lookup has to tolerate case drift.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::ImportError;

pub fn find_files_by_extension(path: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs_err::read_dir(path)? {
        let entry = entry?;
        let file = entry.path();
        if file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(ext))
            .unwrap_or(false)
        {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

pub fn find_file_by_extension(path: &Path, ext: &str) -> Result<PathBuf> {
    find_files_by_extension(path, ext)?
        .into_iter()
        .next()
        .ok_or_else(|| ImportError::MissingFile(format!("*.{} in {}", ext, path.display())).into())
}

/// Picks the named file out of a listing, ignoring case. References inside
/// map files rarely match the on-disk casing exactly.
pub fn find_appropriate_file(path: PathBuf) -> PathBuf {
    if path.is_file() {
        return path;
    }
    let (Some(parent), Some(name)) = (path.parent(), path.file_name().and_then(|n| n.to_str()))
    else {
        return path;
    };
    if let Ok(entries) = fs_err::read_dir(parent) {
        for entry in entries.flatten() {
            if let Some(existing) = entry.file_name().to_str() {
                if existing.eq_ignore_ascii_case(name) {
                    return parent.join(existing);
                }
            }
        }
    }
    path
}

pub fn file_stem_lowercase(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// The stem of a file reference like `Railway.map`, lowercased.
pub fn reference_stem(reference: &str) -> String {
    file_stem_lowercase(Path::new(reference.trim()))
}
