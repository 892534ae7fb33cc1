use std::fs;
use std::io;
use std::path::Path;

use crate::error::NoteError;
use crate::paths::resolve;

/// Returns the exact bytes of the note at `relative`.
pub fn read_note(root: &Path, relative: &str) -> Result<Vec<u8>, NoteError> {
    let full_path = resolve(root, relative)?;
    if full_path.is_dir() {
        return Err(NoteError::NotFound { path: full_path });
    }
    match fs::read(&full_path) {
        Ok(data) => {
            log::debug!("Read {} bytes from {}", data.len(), full_path.display());
            Ok(data)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(NoteError::NotFound { path: full_path }),
        Err(e) => Err(NoteError::io("Failed to read note", e)),
    }
}

/// Writes `content` to the note at `relative`, creating parent directories.
/// The file is overwritten in place; concurrent writers to the same note are
/// last-write-wins.
pub fn write_note(root: &Path, relative: &str, content: &[u8]) -> Result<(), NoteError> {
    let full_path = resolve(root, relative)?;
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent).map_err(|e| NoteError::io("Failed to create directory", e))?;
    }
    fs::write(&full_path, content).map_err(|e| NoteError::io("Failed to save note", e))?;
    log::info!("Saved note: {}", full_path.display());
    Ok(())
}

/// Creates the folder at `relative` and any missing ancestors. Succeeds if it
/// already exists.
pub fn create_folder(root: &Path, relative: &str) -> Result<(), NoteError> {
    if relative.is_empty() {
        return Err(NoteError::InvalidInput("Folder path is required"));
    }
    let full_path = resolve(root, relative)?;
    fs::create_dir_all(&full_path).map_err(|e| NoteError::io("Failed to create folder", e))?;
    log::info!("Created folder: {}", full_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_then_read_returns_same_bytes() {
        let temp = TempDir::new().unwrap();
        let body = b"# Title\r\n\xff\x00 raw bytes".to_vec();
        write_note(temp.path(), "deep/nested/note.md", &body).unwrap();
        assert_eq!(read_note(temp.path(), "deep/nested/note.md").unwrap(), body);
    }

    #[test]
    fn write_overwrites_existing_content() {
        let temp = TempDir::new().unwrap();
        write_note(temp.path(), "a.md", b"a much longer first version").unwrap();
        write_note(temp.path(), "a.md", b"short").unwrap();
        assert_eq!(read_note(temp.path(), "a.md").unwrap(), b"short");
    }

    #[test]
    fn missing_note_is_not_found() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            read_note(temp.path(), "ghost.md"),
            Err(NoteError::NotFound { .. })
        ));
    }

    #[test]
    fn directory_is_not_a_note() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("dir")).unwrap();
        assert!(matches!(
            read_note(temp.path(), "dir"),
            Err(NoteError::NotFound { .. })
        ));
    }

    #[test]
    fn write_to_root_alias_is_invalid_input() {
        let temp = TempDir::new().unwrap();
        for path in [".", "drafts/.."] {
            let err = write_note(temp.path(), path, b"x").unwrap_err();
            assert!(matches!(err, NoteError::InvalidInput(_)), "{path}: {err:?}");
        }
        assert!(!temp.path().join("drafts").exists());
    }

    #[test]
    fn escaping_write_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("notes");
        fs::create_dir(&root).unwrap();

        let err = write_note(&root, "../outside/x.md", b"nope").unwrap_err();
        assert!(matches!(err, NoteError::AccessDenied { .. }));
        assert!(!temp.path().join("outside").exists());
    }

    #[test]
    fn create_folder_is_idempotent() {
        let temp = TempDir::new().unwrap();
        create_folder(temp.path(), "a/b/c").unwrap();
        create_folder(temp.path(), "a/b/c").unwrap();
        assert!(temp.path().join("a/b/c").is_dir());
    }

    #[test]
    fn create_folder_rejects_bad_paths() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            create_folder(temp.path(), ""),
            Err(NoteError::InvalidInput(_))
        ));
        assert!(matches!(
            create_folder(temp.path(), "/abs"),
            Err(NoteError::InvalidInput(_))
        ));
        assert!(matches!(
            create_folder(temp.path(), "../escape"),
            Err(NoteError::AccessDenied { .. })
        ));
    }
}
