use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::domain::{Folder, NoteInfo, Omitted};
use crate::error::NoteError;
use crate::paths::relative_to;

pub const ROOT_FOLDER_NAME: &str = "Root";

/// Files with one of these suffixes are notes. The match is case-sensitive.
pub const NOTE_SUFFIXES: [&str; 2] = [".md", ".txt"];

pub fn is_note_name(name: &str) -> bool {
    NOTE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Result of indexing the notes folder. Subtrees and files that could not be
/// read are left out of `root` and listed in `omitted`.
#[derive(Debug)]
pub struct FolderIndex {
    pub root: Folder,
    pub omitted: Vec<Omitted>,
}

/// Builds the folder tree under `root`. Only a failure to read `root` itself
/// is an error.
pub fn index(root: &Path) -> Result<FolderIndex, NoteError> {
    index_with(root, list_dir)
}

/// One directory entry the indexer cares about.
#[derive(Debug)]
enum Entry {
    Dir(PathBuf),
    Note(NoteInfo),
}

/// Lists `dir` in directory order. Non-note files are dropped; entries whose
/// type or metadata cannot be read come back as `Omitted`.
type Lister = fn(&Path) -> io::Result<Vec<Result<Entry, Omitted>>>;

fn index_with(root: &Path, list: Lister) -> Result<FolderIndex, NoteError> {
    let mut omitted = Vec::new();
    let folder = walk_folder(root, root, list, &mut omitted)
        .map_err(|e| NoteError::io("Failed to read notes folder", e))?;

    for skipped in &omitted {
        log::debug!("Omitted {} from index: {}", skipped.path.display(), skipped.error);
    }

    Ok(FolderIndex {
        root: folder,
        omitted,
    })
}

fn list_dir(dir: &Path) -> io::Result<Vec<Result<Entry, Omitted>>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                entries.push(Err(Omitted {
                    path: dir.to_path_buf(),
                    error,
                }));
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(error) => {
                entries.push(Err(Omitted { path, error }));
                continue;
            }
        };
        if file_type.is_dir() {
            entries.push(Ok(Entry::Dir(path)));
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_note_name(&name) {
            continue;
        }
        entries.push(match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => Ok(Entry::Note(NoteInfo {
                name,
                modified: DateTime::<Utc>::from(modified),
            })),
            Err(error) => Err(Omitted { path, error }),
        });
    }
    Ok(entries)
}

fn walk_folder(
    root: &Path,
    dir: &Path,
    list: Lister,
    omitted: &mut Vec<Omitted>,
) -> io::Result<Folder> {
    let (name, path) = if dir == root {
        (ROOT_FOLDER_NAME.to_string(), String::new())
    } else {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        (name, relative_to(root, dir).unwrap_or_default())
    };

    let mut notes = Vec::new();
    let mut subfolders = Vec::new();

    for entry in list(dir)? {
        match entry {
            Ok(Entry::Dir(sub_dir)) => match walk_folder(root, &sub_dir, list, omitted) {
                Ok(sub) => subfolders.push(sub),
                Err(error) => omitted.push(Omitted {
                    path: sub_dir,
                    error,
                }),
            },
            Ok(Entry::Note(note)) => notes.push(note),
            Err(skipped) => omitted.push(skipped),
        }
    }

    // Stable, so equal timestamps keep listing order.
    notes.sort_by(|a, b| b.modified.cmp(&a.modified));

    Ok(Folder {
        name,
        path,
        notes,
        subfolders,
    })
}
