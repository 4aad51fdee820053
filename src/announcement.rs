use crate::model::ScheduleError;
use crate::storage::KeyValueStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

pub const ANNOUNCEMENT_KEY: &str = "announcement";
pub const DEFAULT_DURATION_MS: u64 = 60_000;

/// A message overlaid on every display until it expires. Independent of the
/// schedule; it has its own lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub text: String,
    pub duration_ms: u64,
    pub posted_at: DateTime<Utc>,
}

impl Announcement {
    pub fn new(
        text: &str,
        minutes: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ScheduleError::EmptyAnnouncement);
        }
        let duration_ms = match minutes {
            Some(m) if m > 0 => u64::from(m) * 60_000,
            _ => DEFAULT_DURATION_MS,
        };
        Ok(Announcement {
            text: text.to_string(),
            duration_ms,
            posted_at: now,
        })
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let ms = i64::try_from(self.duration_ms).unwrap_or(i64::MAX);
        self.posted_at + Duration::milliseconds(ms)
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

pub fn post<S>(store: &mut S, announcement: &Announcement) -> Result<()>
where
    S: KeyValueStore + ?Sized,
{
    let json = serde_json::to_string(announcement).context("serializing announcement")?;
    store.set(ANNOUNCEMENT_KEY, json)
}

pub fn clear<S>(store: &mut S) -> Result<()>
where
    S: KeyValueStore + ?Sized,
{
    store.remove(ANNOUNCEMENT_KEY)
}

/// The announcement to show at `now`, if any. Readers only hide expired
/// entries; removing them is left to the control surface.
pub fn current<S>(store: &S, now: DateTime<Utc>) -> Result<Option<Announcement>>
where
    S: KeyValueStore + ?Sized,
{
    let raw = match store.get(ANNOUNCEMENT_KEY)? {
        Some(raw) => raw,
        None => return Ok(None),
    };
    match serde_json::from_str::<Announcement>(&raw) {
        Ok(a) if a.is_active(now) => Ok(Some(a)),
        Ok(_) => Ok(None),
        Err(err) => {
            debug!("ignoring unreadable announcement: {}", err);
            Ok(None)
        }
    }
}
