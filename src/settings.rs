use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::overlay::OverlayTiming;

const SETTINGS_FILE_NAME: &str = "settings.json";

/// Overrides the settings file location.
pub const SETTINGS_PATH_ENV: &str = "KEYDISPLAY_SETTINGS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// How long an icon stays fully visible before it starts fading.
    pub timeout_ms: u64,

    /// Delay between the 25 fade steps.
    pub fade_interval_ms: u64,

    /// Lock-state sampling interval.
    pub poll_interval_ms: u64,

    /// Enable polling and show the "on" icon at launch.
    pub start_active: bool,

    /// Directory holding `<key>.png` icons. Defaults to the bundled icons.
    pub icon_dir: Option<PathBuf>,

    /// Cap on display tasks alive at once.
    pub max_inflight_displays: usize,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            fade_interval_ms: 40,
            poll_interval_ms: 5,
            start_active: true,
            icon_dir: None,
            max_inflight_displays: crate::overlay::dispatch::DEFAULT_MAX_INFLIGHT,
        }
    }
}

impl OverlaySettings {
    pub fn timing(&self) -> OverlayTiming {
        OverlayTiming {
            timeout: Duration::from_millis(self.timeout_ms),
            fade_interval: Duration::from_millis(self.fade_interval_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero interval would make tokio::time::interval panic
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Where settings are read from: `$KEYDISPLAY_SETTINGS`, else
/// `~/.config/keydisplay/settings.json`.
pub fn settings_path() -> Result<PathBuf, String> {
    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let dir =
        dirs::config_dir().ok_or_else(|| "Could not determine config directory".to_string())?;
    Ok(dir.join("keydisplay").join(SETTINGS_FILE_NAME))
}

pub fn load_settings() -> OverlaySettings {
    match settings_path() {
        Ok(path) => load_settings_from(&path),
        Err(e) => {
            log::warn!("Settings: {}", e);
            OverlaySettings::default()
        }
    }
}

pub fn load_settings_from(path: &Path) -> OverlaySettings {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<OverlaySettings>(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Settings: failed to parse {:?}: {}", path, e);
                OverlaySettings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => OverlaySettings::default(),
        Err(e) => {
            log::warn!("Settings: failed to read {:?}: {}", path, e);
            OverlaySettings::default()
        }
    }
}

pub fn save_settings_to(path: &Path, settings: &OverlaySettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory {:?}: {}", parent, e))?;
    }

    let contents =
        serde_json::to_string_pretty(settings).map_err(|e| format!("Serialize settings: {}", e))?;

    // Write to a sibling temp file, then rename over the real one
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &contents)
        .map_err(|e| format!("Write temp settings {:?}: {}", tmp_path, e))?;

    std::fs::rename(&tmp_path, path)
        .map_err(|e| format!("Rename temp settings {:?} to {:?}: {}", tmp_path, path, e))?;
    Ok(())
}
