use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const APP_DIR: &str = "snapedit";
const SETTINGS_FILE: &str = "settings.json";

/// User preferences kept between runs of the GUI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Device opened by "Capture from webcam".
    pub camera_index: u32,
    /// Folder the file dialog opens in.
    pub last_directory: Option<PathBuf>,
    pub window_size: [f32; 2],
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            last_directory: None,
            window_size: [1024.0, 768.0],
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Loads from the platform config directory, falling back to defaults.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// A missing file gives the defaults silently; an unreadable or
    /// malformed one gives the defaults with a warning.
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                log::warn!("Could not read settings {}: {}", path.display(), err);
                return Self::default();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|err| {
            log::warn!("Ignoring malformed settings {}: {}", path.display(), err);
            Self::default()
        })
    }

    pub fn save(&self) -> std::io::Result<()> {
        match Self::default_path() {
            Some(path) => self.save_to(&path),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no configuration directory on this platform",
            )),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}
