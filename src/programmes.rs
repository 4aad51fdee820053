//! Named programmes saved as `title;start;duration` text under `saved-set:<name>`.

use crate::model::{Schedule, ScheduleError};
use crate::parser::serialize;
use crate::storage::KeyValueStore;
use anyhow::Result;

const PREFIX: &str = "saved-set:";

pub const SAMPLE_PROGRAMMES: &[(&str, &str)] = &[
    (
        "Morning Routine",
        "Breakfast;07:00;30\nExercise;07:30;45\nShower;08:15;15\nCommute;08:30;30",
    ),
    (
        "Conference Day",
        "Opening Remarks;09:00;15\nKeynote;09:15;45\nBreak;10:00;15\nSession 1;10:15;60\nLunch;11:15;60",
    ),
    (
        "Default Sunday",
        "Prayer;09:15;35\nWorship;09:50;30\nWord;10:20;70\nAdmin and Announcements;11:30;15",
    ),
];

fn key(name: &str) -> String {
    format!("{}{}", PREFIX, name)
}

/// Adds any missing sample programme; existing ones are left alone.
pub fn seed_samples<S>(store: &mut S) -> Result<usize>
where
    S: KeyValueStore + ?Sized,
{
    let mut added = 0;
    for (name, text) in SAMPLE_PROGRAMMES {
        if store.get(&key(name))?.is_none() {
            store.set(&key(name), text.to_string())?;
            added += 1;
        }
    }
    Ok(added)
}

pub fn list<S>(store: &S) -> Result<Vec<String>>
where
    S: KeyValueStore + ?Sized,
{
    Ok(store
        .keys()?
        .into_iter()
        .filter_map(|k| k.strip_prefix(PREFIX).map(str::to_string))
        .collect())
}

pub fn save<S>(store: &mut S, name: &str, schedule: &Schedule) -> Result<()>
where
    S: KeyValueStore + ?Sized,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(ScheduleError::MissingProgrammeName.into());
    }
    store.set(&key(name), serialize(schedule.activities()))
}

pub fn load<S>(store: &S, name: &str) -> Result<String>
where
    S: KeyValueStore + ?Sized,
{
    store
        .get(&key(name.trim()))?
        .ok_or_else(|| ScheduleError::UnknownProgramme(name.to_string()).into())
}

pub fn delete<S>(store: &mut S, name: &str) -> Result<()>
where
    S: KeyValueStore + ?Sized,
{
    let k = key(name.trim());
    if store.get(&k)?.is_none() {
        return Err(ScheduleError::UnknownProgramme(name.to_string()).into());
    }
    store.remove(&k)
}
