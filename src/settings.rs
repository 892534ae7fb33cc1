use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::NoteError;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Fields missing from the config file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub notes_folder: PathBuf,
    pub font_family: String,
    pub font_size: String,
}

impl Default for Settings {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            notes_folder: home.join("Documents").join("ASAPNotes"),
            font_family: "monospace".to_string(),
            font_size: "16".to_string(),
        }
    }
}

/// Partial settings sent by the client. Missing or empty fields keep their
/// current value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    pub notes_folder: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
}

/// Process-wide settings persisted to a JSON file on every change.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<Settings>,
    /// Serializes updaters. Readers only ever take `current`.
    writer: Mutex<()>,
}

impl SettingsStore {
    /// Loads settings from `path`. When the file is missing or unreadable the
    /// defaults are used and written back. The notes folder is created if needed.
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let settings = match fs::read(&path) {
            Ok(data) => match serde_json::from_slice::<Settings>(&data) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Ignoring malformed {}: {e}", path.display());
                    Settings::default()
                }
            },
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!("Could not read {}: {e}", path.display());
                }
                let settings = Settings::default();
                if let Err(e) = write_settings(&path, &settings) {
                    log::warn!("Could not save default settings to {}: {e}", path.display());
                }
                settings
            }
        };

        fs::create_dir_all(&settings.notes_folder)?;
        Ok(Self {
            path,
            current: RwLock::new(settings),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Settings {
        self.current.read().clone()
    }

    pub fn notes_root(&self) -> PathBuf {
        self.current.read().notes_folder.clone()
    }

    /// Applies `update` and persists the result. Folder creation and the file
    /// write happen before `current` is locked, so readers never wait on disk.
    pub fn update(&self, update: SettingsUpdate) -> Result<Settings, NoteError> {
        let _writer = self.writer.lock();
        let previous = self.get();
        let mut next = previous.clone();

        if let Some(folder) = non_empty(update.notes_folder) {
            let folder = PathBuf::from(folder);
            fs::create_dir_all(&folder)
                .map_err(|e| NoteError::io("Failed to create notes folder", e))?;
            next.notes_folder = folder;
        }
        if let Some(family) = non_empty(update.font_family) {
            next.font_family = family;
        }
        if let Some(size) = non_empty(update.font_size) {
            next.font_size = size;
        }

        write_settings(&self.path, &next).map_err(|e| NoteError::io("Failed to save settings", e))?;
        if next.notes_folder != previous.notes_folder {
            log::info!("Notes folder changed to {}", next.notes_folder.display());
        }
        *self.current.write() = next.clone();
        Ok(next)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn write_settings(path: &Path, settings: &Settings) -> io::Result<()> {
    let data = serde_json::to_vec_pretty(settings).map_err(io::Error::other)?;
    fs::write(path, data)
}

/// Where the config file lives: inside the bundle's Resources directory when
/// running from a macOS `.app`, otherwise the working directory.
pub fn default_config_path() -> PathBuf {
    match bundle_resources_dir() {
        Some(resources) => resources.join(CONFIG_FILE_NAME),
        None => PathBuf::from(CONFIG_FILE_NAME),
    }
}

/// Where the bundled UI assets live.
pub fn default_static_dir() -> PathBuf {
    match bundle_resources_dir() {
        Some(resources) => resources.join("web").join("static"),
        None => PathBuf::from("web").join("static"),
    }
}

fn bundle_resources_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    bundle_resources_for(&exe)
}

fn bundle_resources_for(exe: &Path) -> Option<PathBuf> {
    if !exe.to_string_lossy().contains(".app/Contents/MacOS/") {
        return None;
    }
    // <Name>.app/Contents/MacOS/<exe>
    let bundle = exe.parent()?.parent()?.parent()?;
    Some(bundle.join("Contents").join("Resources"))
}
