use std::path::{Path, PathBuf};

use log::warn;
use preferences::{AppInfo, Preferences};
use serde::{Serialize, Deserialize};

const APP_INFO: AppInfo = AppInfo {
    name: "portalsim",
    author: "portalsim"
};

pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

#[derive(Default, Serialize, Deserialize)]
pub struct Settings {
    pub last_device: Option<PathBuf>,
}

impl Settings {
    pub fn load() -> Settings {
        <Settings as Preferences>::load(&APP_INFO, "settings")
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Err(e) = <Settings as Preferences>::save(self, &APP_INFO, "settings") {
            warn!("Failed to save settings: {e}");
        }
    }

    /// The device to use: the one given, else the last one used, else the
    /// default.
    pub fn device(&self, requested: Option<&Path>) -> PathBuf {
        requested
            .or(self.last_device.as_deref())
            .unwrap_or(Path::new(DEFAULT_DEVICE))
            .to_path_buf()
    }
}
