use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AnnotatorError, Result};

const MAX_RECENT_FOLDERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    /// Subfolder of the image folder that holds the label files.
    #[serde(default = "default_label_dir_name")]
    pub label_dir_name: String,
    #[serde(default = "default_classes_file")]
    pub classes_file: String,
    /// Matched case-insensitively against the file extension.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    /// Written to a folder's class file the first time it is opened.
    #[serde(default = "default_classes")]
    pub default_classes: Vec<String>,
    /// Drawn rectangles smaller than this many physical pixels on the screen are ignored.
    #[serde(default = "default_min_box_size")]
    pub min_box_size: f32,
    #[serde(default = "default_max_texture_size")]
    pub max_texture_size: [u32; 2],
    #[serde(default)]
    pub recent_folders: Vec<PathBuf>,
}

fn default_label_dir_name() -> String {
    "Yolov8".to_string()
}

fn default_classes_file() -> String {
    "classes.csv".to_string()
}

fn default_image_extensions() -> Vec<String> {
    vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()]
}

fn default_classes() -> Vec<String> {
    vec!["person".to_string(), "fish".to_string()]
}

fn default_min_box_size() -> f32 {
    5.0
}

fn default_max_texture_size() -> [u32; 2] {
    [1920, 1080]
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            label_dir_name: default_label_dir_name(),
            classes_file: default_classes_file(),
            image_extensions: default_image_extensions(),
            default_classes: default_classes(),
            min_box_size: default_min_box_size(),
            max_texture_size: default_max_texture_size(),
            recent_folders: Vec::new(),
        }
    }
}

impl AnnotatorConfig {
    pub fn is_image_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| {
                self.image_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }

    /// Moves `folder` to the front of the recent list.
    pub fn add_recent_folder(&mut self, folder: &Path) {
        self.recent_folders.retain(|p| p != folder);
        self.recent_folders.insert(0, folder.to_path_buf());
        self.recent_folders.truncate(MAX_RECENT_FOLDERS);
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("label_space").join("config.toml"))
}

/// Loads the user config, falling back to defaults when it is missing or broken.
pub fn load_config() -> AnnotatorConfig {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => {
            warn!("No config directory on this platform, using defaults");
            AnnotatorConfig::default()
        }
    }
}

pub fn load_config_from(path: &Path) -> AnnotatorConfig {
    if !path.exists() {
        info!("Config file not found at {:?}, using defaults", path);
        return AnnotatorConfig::default();
    }
    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("Failed to parse config file {:?}: {}. Using defaults.", path, e);
                AnnotatorConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read config file {:?}: {}. Using defaults.", path, e);
            AnnotatorConfig::default()
        }
    }
}

pub fn save_config(config: &AnnotatorConfig) -> Result<()> {
    match config_path() {
        Some(path) => save_config_to(config, &path),
        None => Ok(()),
    }
}

pub fn save_config_to(config: &AnnotatorConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AnnotatorError::io("create config directory", parent, e))?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content).map_err(|e| AnnotatorError::io("write config", path, e))?;
    info!("Saved config to {:?}", path);
    Ok(())
}
