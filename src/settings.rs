use crate::error::SettingsError;
use crate::interaction::InteractionOptions;
use crate::model::{BandFill, DrawingStyle, Rgba};
use crate::persist::SyncOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub symbol: String,
    pub timeframe: String,
    pub drawings_dir: String,
    pub debounce_ms: u64,
    pub retry_ms: u64,
    pub handle_radius: f32,
    pub hit_tolerance: f32,
    pub style: DrawingStyle,
    pub fill_color: Option<Rgba>,
    pub fill_opacity: f32,
    pub bands: Vec<BandFill>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            symbol: "DEMO".to_string(),
            timeframe: "1h".to_string(),
            drawings_dir: "drawings".to_string(),
            debounce_ms: 750,
            retry_ms: 5_000,
            handle_radius: 8.0,
            hit_tolerance: 6.0,
            style: DrawingStyle::default(),
            fill_color: Some(Rgba::rgb(41, 98, 255)),
            fill_opacity: 0.15,
            bands: vec![BandFill {
                upper: "upper".to_string(),
                lower: "lower".to_string(),
                color: Rgba::rgb(41, 98, 255).with_opacity(0.08),
            }],
        }
    }
}

impl AppSettings {
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            debounce: Duration::from_millis(self.debounce_ms),
            retry: Duration::from_millis(self.retry_ms.max(1)),
        }
    }

    pub fn interaction_options(&self) -> InteractionOptions {
        InteractionOptions {
            handle_radius: self.handle_radius.max(1.0),
            hit_tolerance: self.hit_tolerance.max(0.0),
            style: self.style,
            fill: self.fill_color.map(|c| (c, self.fill_opacity.clamp(0.0, 1.0))),
        }
    }
}

/// Candidate settings files, most specific first.
pub fn settings_paths() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(home) = std::env::var_os("HOME") {
        out.push(PathBuf::from(home).join(".config").join("chartscribe.toml"));
    }
    out.push(PathBuf::from("settings.toml"));
    out.push(PathBuf::from("settings.json"));
    out
}

/// First settings file that exists and parses, else defaults.
pub fn load_or_default() -> (AppSettings, Option<PathBuf>) {
    for path in settings_paths() {
        if !path.exists() {
            continue;
        }
        match load_settings(&path) {
            Ok(settings) => {
                tracing::info!(path = %path.display(), "settings loaded");
                return (settings, Some(path));
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring settings file"),
        }
    }
    (AppSettings::default(), None)
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "toml")
}

pub fn load_settings(path: &Path) -> Result<AppSettings, SettingsError> {
    let s = std::fs::read_to_string(path)?;
    let (primary, fallback) = if is_toml(path) {
        (
            toml::from_str::<AppSettings>(&s).map_err(|e| e.to_string()),
            serde_json::from_str::<AppSettings>(&s).map_err(|e| e.to_string()),
        )
    } else {
        (
            serde_json::from_str::<AppSettings>(&s).map_err(|e| e.to_string()),
            toml::from_str::<AppSettings>(&s).map_err(|e| e.to_string()),
        )
    };
    primary.or_else(|e| fallback.map_err(|_| SettingsError::Parse(e)))
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
    let text = if is_toml(path) {
        toml::to_string_pretty(settings).map_err(|e| SettingsError::Write(e.to_string()))?
    } else {
        serde_json::to_string_pretty(settings).map_err(|e| SettingsError::Write(e.to_string()))?
    };
    std::fs::write(path, text).map_err(|e| SettingsError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "symbol = \"ETHUSD\"\ndebounce_ms = 250\n").unwrap();
        let s = load_settings(&path).unwrap();
        assert_eq!(s.symbol, "ETHUSD");
        assert_eq!(s.sync_options().debounce, Duration::from_millis(250));
        assert_eq!(s.timeframe, "1h");
    }

    #[test]
    fn save_then_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut s = AppSettings::default();
        s.hit_tolerance = 3.0;
        save_settings(&path, &s).unwrap();
        assert_eq!(load_settings(&path).unwrap(), s);
    }
}
