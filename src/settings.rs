use crate::storage::{bump_refresh_marker, KeyValueStore};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

pub const PREFERENCES_KEY: &str = "display-preferences";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitorArea {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowPosition {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// How display surfaces present themselves. The schedule never reads these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayPreferences {
    pub always_fullscreen: bool,
    pub preferred_monitor: Option<MonitorArea>,
    pub window_position: Option<WindowPosition>,
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self {
            always_fullscreen: true,
            preferred_monitor: None,
            window_position: None,
        }
    }
}

pub fn load<S>(store: &S) -> Result<DisplayPreferences>
where
    S: KeyValueStore + ?Sized,
{
    let prefs = match store.get(PREFERENCES_KEY)? {
        Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("display preferences unreadable, using defaults: {}", err);
            DisplayPreferences::default()
        }),
        None => DisplayPreferences::default(),
    };
    Ok(prefs)
}

/// Stores the preferences and bumps the refresh marker so running displays
/// pick them up.
pub fn save<S>(store: &mut S, prefs: &DisplayPreferences, now: DateTime<Utc>) -> Result<()>
where
    S: KeyValueStore + ?Sized,
{
    let json = serde_json::to_string(prefs).context("serializing display preferences")?;
    store.set(PREFERENCES_KEY, json)?;
    bump_refresh_marker(store, now)?;
    Ok(())
}
