use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Deserialize, Debug, Serialize, Default)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub date: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// One directory of the notes tree. `path` is relative to the notes root and
/// empty for the root itself.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Folder {
    pub name: String,
    pub path: String,
    pub notes: Vec<NoteInfo>,
    pub subfolders: Vec<Folder>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NoteInfo {
    pub name: String,
    pub modified: DateTime<Utc>,
}

/// An entry skipped during a walk because reading it failed.
#[derive(Debug)]
pub struct Omitted {
    pub path: PathBuf,
    pub error: std::io::Error,
}

#[derive(Debug, Serialize)]
pub struct Preview {
    pub title: String,
    pub date: Option<String>,
    pub tags: Option<Vec<String>>,
    pub html: String,
}
