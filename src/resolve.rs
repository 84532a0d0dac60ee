//! Mapping request paths onto the filesystem below the root directory.
//!
//! Containment is enforced lexically: `..` segments are resolved on the path string before it
//! touches the filesystem, and the result must stay below the root component by component.
//! Symbolic links inside the root are followed as-is, so a link pointing outside the root *is*
//! served. Keep untrusted symlinks out of the served tree.

use std::fs::metadata;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::ServeError;

/// What a resolved path turned out to be on disk.
#[derive(Debug)]
pub enum TargetKind {
    RegularFile,
    Directory,
    Missing,
    /// Exists but can't be served: stat failed for a reason other than non-existence, or it's
    /// neither a regular file nor a directory (FIFO, socket, device).
    Unreadable(io::Error),
}

#[derive(Debug)]
pub struct ResolvedTarget {
    pub path: PathBuf,
    pub kind: TargetKind,
}

/// Resolve `//`, `/./`, and `/../` in a path, without touching the filesystem.
///
/// A `..` at the start of a rooted path is dropped, a `..` at the start of a relative path is
/// kept. An empty result becomes `/` or `.`.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if !rooted => segments.push(".."),
                _ => {}
            },
            segment => segments.push(segment),
        }
    }
    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Return true if `path` is `root` or lies below it.
///
/// Compares whole components, so `/srv2` is not inside `/srv`.
pub fn is_contained(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

/// Turn a raw request path into a classified filesystem target below `root`.
///
/// `root` must be absolute and already clean, as `ServerConfig` guarantees.
pub fn resolve(raw_path: &str, root: &Path) -> Result<ResolvedTarget, ServeError> {
    let cleaned = clean_path(raw_path);
    // Built on `Path` so a root that isn't valid UTF-8 survives intact. `cleaned` only has `..`
    // at its start, and only when it's relative.
    let mut candidate = root.to_path_buf();
    for component in Path::new(&cleaned).components() {
        match component {
            Component::Normal(name) => candidate.push(name),
            Component::ParentDir => {
                candidate.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    if !is_contained(&candidate, root) {
        return Err(ServeError::PathEscape(raw_path.to_string()));
    }
    let kind = classify(&candidate);
    Ok(ResolvedTarget {
        path: candidate,
        kind,
    })
}

/// Stat a path, following symlinks.
fn classify(path: &Path) -> TargetKind {
    match metadata(path) {
        Ok(metadata) if metadata.is_dir() => TargetKind::Directory,
        Ok(metadata) if metadata.is_file() => TargetKind::RegularFile,
        Ok(_) => TargetKind::Unreadable(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )),
        Err(e) if is_missing(&e) => TargetKind::Missing,
        Err(e) => TargetKind::Unreadable(e),
    }
}

/// Return true if the error means nothing exists at the path. A path running through a regular
/// file (`/a.txt/b`) counts as missing.
fn is_missing(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(libc::ENOTDIR)
}
