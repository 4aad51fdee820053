use crate::announcement::{self, Announcement};
use crate::model::{PauseChange, Schedule};
use crate::parser::{clock_label, serialize};
use crate::programmes;
use crate::projector::{future_items, previous_items, project, ScheduleItem};
use crate::settings;
use crate::storage::{
    init_project_store, load_schedule, locate_store, save_schedule, FileStore, KeyValueStore,
    SCHEDULE_KEY,
};
use crate::ui;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

pub fn init() -> Result<()> {
    let location = init_project_store()?;
    let mut store = FileStore::open(location)?;
    let seeded = programmes::seed_samples(&mut store)?;
    if store.get(SCHEDULE_KEY)?.is_none() {
        save_schedule(&mut store, &Schedule::new(), Utc::now())?;
    }
    println!(
        "Initialized store at {} ({} sample programmes)",
        store.location().path.display(),
        seeded
    );
    Ok(())
}

pub fn load(file: Option<PathBuf>) -> Result<()> {
    let text = match file {
        Some(path) if path.as_os_str() != "-" => {
            fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading programme from stdin")?;
            buf
        }
    };
    let (mut store, mut schedule) = open_current()?;
    let now = Utc::now();
    let count = schedule.process_input(&text, now);
    save_schedule(&mut store, &schedule, now)?;
    if count == 0 {
        println!("No activities found; programme is empty");
    } else {
        println!("Loaded {} activities; started {}", count, schedule.activities()[0].title);
    }
    Ok(())
}

pub fn add(title: String, duration: String, start: Option<String>) -> Result<()> {
    let (mut store, mut schedule) = open_current()?;
    let now = Utc::now();
    let first = schedule.is_empty();
    let index = schedule.append_activity(&title, &duration, start.as_deref(), now)?;
    save_schedule(&mut store, &schedule, now)?;
    if first {
        println!("First activity added and started: {}", title.trim());
    } else {
        let added = &schedule.activities()[index];
        println!("Added #{} {} at {}", index + 1, added.title, added.start_time);
    }
    Ok(())
}

pub fn next() -> Result<()> {
    let (mut store, mut schedule) = open_current()?;
    let now = Utc::now();
    let index = schedule.start_next(now)?;
    save_schedule(&mut store, &schedule, now)?;
    println!("Started: {}", schedule.activities()[index].title);
    Ok(())
}

pub fn end() -> Result<()> {
    let (mut store, mut schedule) = open_current()?;
    let now = Utc::now();
    let index = schedule.end_current(now)?;
    save_schedule(&mut store, &schedule, now)?;
    println!("Ended: {}", schedule.activities()[index].title);
    Ok(())
}

pub fn pause() -> Result<()> {
    let (mut store, mut schedule) = open_current()?;
    let now = Utc::now();
    let change = schedule.toggle_pause(now)?;
    save_schedule(&mut store, &schedule, now)?;
    match change {
        PauseChange::Paused => println!("Paused"),
        PauseChange::Resumed => println!("Resumed"),
    }
    Ok(())
}

pub fn restart(position: usize) -> Result<()> {
    let index = to_index(position)?;
    let (mut store, mut schedule) = open_current()?;
    let now = Utc::now();
    schedule.restart_activity(index, now)?;
    save_schedule(&mut store, &schedule, now)?;
    println!("Re-started: {}", schedule.activities()[index].title);
    Ok(())
}

pub fn skip(position: usize) -> Result<()> {
    let index = to_index(position)?;
    let (mut store, mut schedule) = open_current()?;
    schedule.select_skip_target(index)?;
    save_schedule(&mut store, &schedule, Utc::now())?;
    println!(
        "Selected activity: {}. Use `nowplaying next` to begin.",
        schedule.activities()[index].title
    );
    Ok(())
}

pub fn edit(title: Option<String>, start: Option<String>, duration: Option<String>) -> Result<()> {
    let (mut store, mut schedule) = open_current()?;
    let now = Utc::now();
    let current = schedule
        .edit_target(now)
        .map(|i| schedule.activities()[i].clone())
        .ok_or_else(|| anyhow!("no currently running activity to edit"))?;
    let title = title.unwrap_or(current.title);
    let duration = duration.unwrap_or(current.duration);
    let index = schedule.edit_running(&title, start.as_deref(), &duration, now)?;
    save_schedule(&mut store, &schedule, now)?;
    println!("Updated: {}", schedule.activities()[index].title);
    Ok(())
}

pub fn clear() -> Result<()> {
    let (mut store, mut schedule) = open_current()?;
    schedule.end_programme();
    save_schedule(&mut store, &schedule, Utc::now())?;
    println!("Programme ended and cleared.");
    Ok(())
}

pub fn status() -> Result<()> {
    let (store, schedule) = open_current()?;
    let now = Utc::now();
    let view = project(schedule.activities(), now);
    println!("Store: {} ({})", store.location().path.display(), store.location().scope.label());
    println!();
    println!("  {}", view.title);
    let paused = if view.paused { " (paused)" } else { "" };
    println!("  {}  [{}]{}", view.remaining, view.color.label(), paused);
    if let Some(notice) = announcement::current(&store, now)? {
        println!("  ** {} **", notice.text);
    }

    let previous = previous_items(schedule.activities(), now);
    let future = future_items(schedule.activities(), now);
    print_items("Previous", &previous, view.index, schedule.skip_target());
    print_items("Upcoming", &future, view.index, schedule.skip_target());
    Ok(())
}

pub fn export() -> Result<()> {
    let (_, schedule) = open_current()?;
    println!("{}", serialize(schedule.activities()));
    Ok(())
}

pub fn programmes() -> Result<()> {
    let (mut store, _) = open_current()?;
    programmes::seed_samples(&mut store)?;
    let names = programmes::list(&store)?;
    if names.is_empty() {
        println!("(no saved programmes)");
    }
    for name in names {
        println!("  - {}", name);
    }
    Ok(())
}

pub fn save(name: String) -> Result<()> {
    let (mut store, schedule) = open_current()?;
    programmes::save(&mut store, &name, &schedule)
        .with_context(|| format!("saving programme {}", name))?;
    println!("Programme saved: {}", name.trim());
    Ok(())
}

pub fn open(name: String) -> Result<()> {
    let (mut store, mut schedule) = open_current()?;
    programmes::seed_samples(&mut store)?;
    let text = programmes::load(&store, &name)?;
    let now = Utc::now();
    let count = schedule.open_saved_set(&text, now)?;
    save_schedule(&mut store, &schedule, now)?;
    if count == 0 {
        println!("Programme {} has no activities", name);
    } else {
        println!("Programme {} loaded and first activity started!", name);
    }
    Ok(())
}

pub fn delete(name: String) -> Result<()> {
    let (mut store, _) = open_current()?;
    programmes::delete(&mut store, &name)?;
    println!("Programme deleted: {}", name);
    Ok(())
}

pub fn announce(text: Option<String>, minutes: Option<u32>, clear: bool) -> Result<()> {
    let (mut store, _) = open_current()?;
    if clear {
        announcement::clear(&mut store)?;
        println!("Announcement cleared");
        return Ok(());
    }
    let notice = Announcement::new(text.as_deref().unwrap_or_default(), minutes, Utc::now())?;
    announcement::post(&mut store, &notice)?;
    println!(
        "Announcing until {}: {}",
        notice.expires_at().with_timezone(&chrono::Local).format("%H:%M:%S"),
        notice.text
    );
    Ok(())
}

pub fn prefs(always_fullscreen: Option<bool>) -> Result<()> {
    let (mut store, _) = open_current()?;
    let mut prefs = settings::load(&store)?;
    if let Some(value) = always_fullscreen {
        prefs.always_fullscreen = value;
        settings::save(&mut store, &prefs, Utc::now())?;
    }
    println!("always fullscreen: {}", prefs.always_fullscreen);
    match prefs.preferred_monitor {
        Some(m) => println!("preferred monitor: {}x{} at {},{}", m.width, m.height, m.x, m.y),
        None => println!("preferred monitor: (none)"),
    }
    match prefs.window_position {
        Some(w) => println!("window: {}x{} at {},{}", w.width, w.height, w.left, w.top),
        None => println!("window: (none)"),
    }
    Ok(())
}

pub fn tui(role: ui::Role) -> Result<()> {
    let (store, _) = open_current()?;
    ui::run(store, role)
}

fn open_current() -> Result<(FileStore, Schedule)> {
    let cwd = env::current_dir()?;
    let location = locate_store(&cwd)?;
    let store = FileStore::open(location)?;
    let schedule = load_schedule(&store)?;
    Ok((store, schedule))
}

fn to_index(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| anyhow!("positions start at 1"))
}

fn print_items(
    heading: &str,
    items: &[ScheduleItem],
    running: Option<usize>,
    selected: Option<usize>,
) {
    println!();
    println!("{}", heading);
    if items.is_empty() {
        println!("  (empty)");
    }
    for item in items {
        let marker = if Some(item.index) == running {
            ">"
        } else if Some(item.index) == selected {
            "*"
        } else {
            " "
        };
        println!(
            "  {} #{} {} {}",
            marker,
            item.index + 1,
            clock_label(item.scheduled_start),
            item.title
        );
    }
}
