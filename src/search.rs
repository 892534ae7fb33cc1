use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::domain::Omitted;
use crate::index::is_note_name;
use crate::paths::relative_to;

#[derive(Debug, Default)]
pub struct SearchReport {
    /// Root-relative paths of matching notes, in walk order.
    pub matches: Vec<String>,
    /// Entries that could not be walked or read.
    pub skipped: Vec<Omitted>,
}

/// Case-insensitive substring search over every note under `root`.
/// Entries are visited in file-name order so results are stable for a given tree.
pub fn search(root: &Path, query: &str) -> SearchReport {
    let needle = query.to_lowercase();
    let mut report = SearchReport::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                report.skipped.push(Omitted {
                    path,
                    error: e.into(),
                });
                continue;
            }
        };
        if entry.file_type().is_dir() || !is_note_name(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let path = entry.path();
        let content = match fs::read(path) {
            Ok(data) => data,
            Err(error) => {
                report.skipped.push(Omitted {
                    path: path.to_path_buf(),
                    error,
                });
                continue;
            }
        };
        if String::from_utf8_lossy(&content).to_lowercase().contains(&needle) {
            if let Some(rel) = relative_to(root, path) {
                report.matches.push(rel);
            }
        }
    }

    for skipped in &report.skipped {
        log::debug!("Search skipped {}: {}", skipped.path.display(), skipped.error);
    }
    report
}
