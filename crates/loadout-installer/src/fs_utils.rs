use std::cmp::Reverse;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Walks `root` with an explicit work queue (bounded stack depth) and
/// returns every file with its size. Entries within a directory are
/// visited in name order, so the result is deterministic.
pub fn walk_files(root: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let mut files = Vec::new();
    let mut queue = VecDeque::from([root.to_path_buf()]);

    while let Some(dir) = queue.pop_front() {
        let mut entries: Vec<_> = fs::read_dir(&dir)
            .with_context(|| format!("failed to read {}", dir.display()))?
            .collect::<io::Result<Vec<_>>>()
            .with_context(|| format!("failed to read entries of {}", dir.display()))?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let metadata = fs::symlink_metadata(&path)
                .with_context(|| format!("failed to stat {}", path.display()))?;
            if metadata.is_dir() {
                queue.push_back(path);
            } else {
                files.push((path, metadata.len()));
            }
        }
    }

    Ok(files)
}

/// Number of files under `root`, directories excluded.
pub fn count_files(root: &Path) -> Result<u64> {
    Ok(walk_files(root)?.len() as u64)
}

/// Recursive directory copy with an explicit work queue. Creates `dst`
/// even for an empty source tree; returns the number of files copied.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<u64> {
    fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;

    let mut copied = 0u64;
    let mut queue = VecDeque::from([src.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        for entry in
            fs::read_dir(&dir).with_context(|| format!("failed to read {}", dir.display()))?
        {
            let entry = entry?;
            let src_path = entry.path();
            let rel = src_path
                .strip_prefix(src)
                .with_context(|| format!("failed to relativize {}", src_path.display()))?;
            let dst_path = dst.join(rel);

            let metadata = fs::symlink_metadata(&src_path)
                .with_context(|| format!("failed to stat {}", src_path.display()))?;
            if metadata.is_dir() {
                fs::create_dir_all(&dst_path)
                    .with_context(|| format!("failed to create {}", dst_path.display()))?;
                queue.push_back(src_path);
                continue;
            }

            if let Some(parent) = dst_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Removes empty directories under `root` bottom-up, then `root` itself if
/// it ended up empty. Directories holding surviving files are left intact.
/// Best-effort by design; returns the number of directories removed.
pub fn prune_empty_dirs(root: &Path) -> u64 {
    let mut dirs = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if let Ok(entries) = fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                }
            }
        }
        dirs.push(dir);
    }

    // Deepest first so parents empty out as children disappear.
    dirs.sort_by_key(|dir| Reverse(dir.components().count()));

    let mut removed = 0;
    for dir in dirs {
        let is_empty = fs::read_dir(&dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty && fs::remove_dir(&dir).is_ok() {
            removed += 1;
        }
    }
    removed
}
