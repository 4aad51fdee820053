use crate::model::{Activity, Schedule, ScheduleSnapshot};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use log::{debug, log, warn, Level};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const SCHEDULE_KEY: &str = "schedule";
pub const REFRESH_KEY: &str = "refresh-marker";
pub const SKIP_TARGET_KEY: &str = "skip-target";

const STORE_ENV: &str = "NOWPLAYING_STORE";
const PROJECT_DIR: &str = ".nowplaying";
const STORE_FILE: &str = "store.yml";

/// String-valued key/value store shared by every surface on the machine.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Project,
    Global,
    Override,
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub scope: StoreScope,
}

impl StoreScope {
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Project => "project",
            StoreScope::Global => "global",
            StoreScope::Override => "env",
        }
    }
}

/// YAML-file store. Every write rewrites the file; readers call
/// [`FileStore::reload`] to observe other processes.
#[derive(Debug)]
pub struct FileStore {
    location: StoreLocation,
    data: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(location: StoreLocation) -> Result<Self> {
        let mut store = FileStore {
            location,
            data: BTreeMap::new(),
        };
        store.read(Level::Warn)?;
        Ok(store)
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Re-reads the backing file. A missing file is an empty store; an
    /// unreadable one keeps the last good contents.
    ///
    /// Display surfaces call this every tick, so a bad file is only logged
    /// at debug level here. `open` reports it as a warning once.
    pub fn reload(&mut self) -> Result<()> {
        self.read(Level::Debug)
    }

    fn read(&mut self, level: Level) -> Result<()> {
        let path = &self.location.path;
        if !path.exists() {
            self.data.clear();
            return Ok(());
        }
        let raw = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        if raw.trim().is_empty() {
            self.data.clear();
            return Ok(());
        }
        match serde_yaml::from_str(&raw) {
            Ok(data) => self.data = data,
            Err(err) => log!(level, "ignoring unreadable store {:?}: {}", path, err),
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let path = &self.location.path;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        let serialized = serde_yaml::to_string(&self.data).context("serializing store")?;
        let tmp = path.with_extension("yml.tmp");
        fs::write(&tmp, serialized).with_context(|| format!("writing {:?}", tmp))?;
        fs::rename(&tmp, path).with_context(|| format!("replacing {:?}", path))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.data.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.data.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.data.keys().cloned().collect())
    }
}

pub fn init_project_store() -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(PROJECT_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {} directory", PROJECT_DIR))?;
    Ok(StoreLocation {
        path: dir.join(STORE_FILE),
        scope: StoreScope::Project,
    })
}

/// Environment override first, then the nearest project store, then the
/// per-user global store.
pub fn locate_store(start: &Path) -> Result<StoreLocation> {
    if let Some(path) = env::var_os(STORE_ENV).filter(|p| !p.is_empty()) {
        return Ok(StoreLocation {
            path: PathBuf::from(path),
            scope: StoreScope::Override,
        });
    }
    if let Some(project_path) = find_project_store(start) {
        return Ok(StoreLocation {
            path: project_path,
            scope: StoreScope::Project,
        });
    }
    Ok(StoreLocation {
        path: global_store_path()?,
        scope: StoreScope::Global,
    })
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR).join(STORE_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_store_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "nowplaying").context("locating data directory")?;
    Ok(dirs.data_dir().join(STORE_FILE))
}

/// Writes the full schedule and bumps the refresh marker so every reader
/// reloads. Only the control surface calls this.
pub fn save_schedule<S>(store: &mut S, schedule: &Schedule, now: DateTime<Utc>) -> Result<()>
where
    S: KeyValueStore + ?Sized,
{
    let snapshot = schedule.snapshot();
    let json = serde_json::to_string(&snapshot.activities).context("serializing schedule")?;
    store.set(SCHEDULE_KEY, json)?;
    match snapshot.skip_target {
        Some(index) => store.set(SKIP_TARGET_KEY, index.to_string())?,
        None => store.remove(SKIP_TARGET_KEY)?,
    }
    bump_refresh_marker(store, now)?;
    Ok(())
}

/// Reads the schedule, treating missing or corrupt data as an empty programme.
pub fn load_schedule<S>(store: &S) -> Result<Schedule>
where
    S: KeyValueStore + ?Sized,
{
    let activities = match store.get(SCHEDULE_KEY)? {
        None => {
            debug!("no schedule stored; starting empty");
            Vec::new()
        }
        Some(raw) => serde_json::from_str::<Vec<Activity>>(&raw).unwrap_or_else(|err| {
            warn!("stored schedule is unreadable, treating as empty: {}", err);
            Vec::new()
        }),
    };
    let skip_target = store
        .get(SKIP_TARGET_KEY)?
        .and_then(|raw| raw.trim().parse::<usize>().ok());
    Ok(Schedule::restore(ScheduleSnapshot {
        activities,
        skip_target,
    }))
}

/// Advances the marker to the current epoch milliseconds, or one past the
/// previous value if the clock has not moved forward. A marker with no
/// successor restarts from the clock.
pub fn bump_refresh_marker<S>(store: &mut S, now: DateTime<Utc>) -> Result<u64>
where
    S: KeyValueStore + ?Sized,
{
    let previous = store
        .get(REFRESH_KEY)?
        .and_then(|raw| raw.trim().parse::<u64>().ok());
    let now_ms = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let next = match previous {
        Some(prev) => prev.checked_add(1).map_or(now_ms, |after| now_ms.max(after)),
        None => now_ms,
    };
    store.set(REFRESH_KEY, next.to_string())?;
    Ok(next)
}

/// Change subscription for read-only surfaces: any difference in the refresh
/// marker since the last poll means "reload everything".
#[derive(Debug, Default)]
pub struct RefreshWatcher {
    last_seen: Option<Option<String>>,
}

impl RefreshWatcher {
    pub fn new() -> Self {
        RefreshWatcher::default()
    }

    /// Returns true on the first poll and whenever the marker has changed.
    pub fn poll<S>(&mut self, store: &S) -> Result<bool>
    where
        S: KeyValueStore + ?Sized,
    {
        let current = store.get(REFRESH_KEY)?;
        let changed = self.last_seen.as_ref() != Some(&current);
        self.last_seen = Some(current);
        Ok(changed)
    }
}

#[cfg(test)]
pub mod memory {
    use super::KeyValueStore;
    use anyhow::Result;
    use std::collections::BTreeMap;

    #[derive(Debug, Default)]
    pub struct MemoryStore {
        data: BTreeMap<String, String>,
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.data.get(key).cloned())
        }

        fn set(&mut self, key: &str, value: String) -> Result<()> {
            self.data.insert(key.to_string(), value);
            Ok(())
        }

        fn remove(&mut self, key: &str) -> Result<()> {
            self.data.remove(key);
            Ok(())
        }

        fn keys(&self) -> Result<Vec<String>> {
            Ok(self.data.keys().cloned().collect())
        }
    }
}
