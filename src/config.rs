use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::FixedOffset;
use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use which::which;

use crate::{resolve_offset, JournalError, Result};

const CONFIG_FILE_NAME: &str = "config.json";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the journal file
    pub data_dir: PathBuf,

    /// File name of the journal inside `data_dir`
    pub store_file: String,

    /// Minutes east of UTC used to group trips by day; local time when unset
    pub utc_offset_minutes: Option<i32>,

    /// Editor used to write trip notes
    pub editor_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".icebite"));

        Self {
            data_dir,
            store_file: "journal.json".to_string(),
            utc_offset_minutes: None,
            editor_command: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "icebite")
}

impl Config {
    /// Platform location of the configuration file, if one can be determined
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads the configuration from `path`, or from the platform config
    /// directory when no path is given. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => {
                    debug!("No platform config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| JournalError::ConfigError {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Full path of the journal file
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }

    /// Offset used for calendar grouping
    pub fn offset(&self) -> FixedOffset {
        resolve_offset(self.utc_offset_minutes)
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        // First try the configured editor
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        // Then try environment variable
        if let Ok(editor) = std::env::var("EDITOR") {
            return editor;
        }

        // Fall back to platform defaults
        if cfg!(windows) {
            "notepad".to_string()
        } else {
            for editor in &["nano", "vim", "vi"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "vi".to_string()
        }
    }
}
