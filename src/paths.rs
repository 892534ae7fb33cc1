use std::path::{Component, Path, PathBuf};

use crate::error::NoteError;

/// Lexically removes `.` and `..` segments and redundant separators.
/// Leading `..` segments of a relative path are kept; `..` above a root is dropped.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Maps a client-supplied relative path onto the notes folder.
///
/// The returned path is `root` joined with the normalized input, and is only
/// returned when it stays inside `root`. Containment is checked per path
/// component, so `notes-old` is never considered inside `notes`.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf, NoteError> {
    if relative.is_empty() {
        return Err(NoteError::InvalidInput("Path parameter is required"));
    }

    let cleaned = normalize(Path::new(relative));
    if cleaned.is_absolute() || cleaned.has_root() {
        return Err(NoteError::InvalidInput("Path must be relative to notes folder"));
    }
    // "." or "a/.." would name the notes folder itself.
    if cleaned.as_os_str().is_empty() {
        return Err(NoteError::InvalidInput("Path must name an entry inside notes folder"));
    }

    let full = root.join(&cleaned);
    let root_abs = absolute(root)?;
    let full_abs = absolute(&full)?;
    if !full_abs.starts_with(&root_abs) {
        return Err(NoteError::AccessDenied { path: full_abs });
    }

    Ok(full)
}

/// Path of `path` relative to `root` with `/` separators, as sent to clients.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

fn absolute(path: &Path) -> Result<PathBuf, NoteError> {
    std::path::absolute(path)
        .map(|p| normalize(&p))
        .map_err(|e| NoteError::io("Failed to resolve path", e))
}
