// src/config.rs

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::model::options::{DEFAULT_ANGLE_TOLERANCE, DEFAULT_DISTANCE_TOLERANCE};
use crate::model::{Chirality, CompareOptions, Tolerance};

fn default_distance_tolerance() -> f64 {
    DEFAULT_DISTANCE_TOLERANCE
}

fn default_angle_tolerance() -> f64 {
    DEFAULT_ANGLE_TOLERANCE
}

// --- Main Config Struct ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_distance_tolerance")]
    pub distance_tolerance: f64,

    #[serde(default = "default_angle_tolerance")]
    pub angle_tolerance: f64,

    #[serde(default)]
    pub chirality: Chirality,

    #[serde(default)]
    pub parallel: bool,

    /// 0 = warnings only, 1 = info, 2 = debug, 3 = trace
    #[serde(default)]
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            distance_tolerance: DEFAULT_DISTANCE_TOLERANCE,
            angle_tolerance: DEFAULT_ANGLE_TOLERANCE,
            chirality: Chirality::default(),
            parallel: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Loads config from standard OS location (e.g., ~/.config/xtalcomp/settings.json)
    pub fn load() -> (Self, String) {
        let path = Self::get_path();
        if path.exists() {
            match File::open(&path) {
                Ok(file) => {
                    let reader = BufReader::new(file);
                    match serde_json::from_reader(reader) {
                        Ok(cfg) => (cfg, format!("Config loaded from {:?}", path)),
                        Err(e) => (Self::default(), format!("Error parsing config: {}", e)),
                    }
                }
                Err(e) => (Self::default(), format!("Error opening config: {}", e)),
            }
        } else {
            (
                Self::default(),
                "No config found. Using defaults.".to_string(),
            )
        }
    }

    /// Saves config to standard OS location
    pub fn save(&self) -> String {
        self.save_to(&Self::get_path())
    }

    pub fn save_to(&self, path: &Path) -> String {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                return format!("Could not create config directory {:?}: {}", parent, e);
            }
        }

        match File::create(path) {
            Ok(file) => {
                let writer = BufWriter::new(file);
                match serde_json::to_writer_pretty(writer, self) {
                    Ok(_) => format!("Config saved to {:?}", path),
                    Err(e) => format!("Failed to save config: {}", e),
                }
            }
            Err(e) => format!("Could not create config file: {}", e),
        }
    }

    pub fn get_path() -> PathBuf {
        if let Some(proj) = ProjectDirs::from("org", "xtalcomp", "xtalcomp") {
            proj.config_dir().join("settings.json")
        } else {
            PathBuf::from("settings.json")
        }
    }

    /// Tolerances are validated later, when the comparison starts.
    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            tolerance: Tolerance {
                distance: self.distance_tolerance,
                angle: self.angle_tolerance,
            },
            chirality: self.chirality,
            parallel: self.parallel,
        }
    }
}
