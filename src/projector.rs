//! Read-only view of a schedule at an instant: what is on now, how long is
//! left, and what comes before and after. Safe to call on every tick.

use crate::model::Activity;
use crate::parser::add_duration;
use chrono::{DateTime, Utc};

pub const IDLE_TITLE: &str = "No active activity";
pub const IDLE_PROMPT: &str = "Waiting for manual start";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayColor {
    Normal,
    Warning,
    Critical,
    Overrun,
    Inactive,
}

impl DisplayColor {
    /// Color band for a remaining time; boundaries sit at 0, 2 and 5 minutes.
    pub fn for_remaining(ms: i64) -> Self {
        let minutes = ms as f64 / 60_000.0;
        if minutes < 0.0 {
            DisplayColor::Overrun
        } else if minutes > 5.0 {
            DisplayColor::Normal
        } else if minutes > 2.0 {
            DisplayColor::Warning
        } else {
            DisplayColor::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayColor::Normal => "normal",
            DisplayColor::Warning => "warning",
            DisplayColor::Critical => "critical",
            DisplayColor::Overrun => "overrun",
            DisplayColor::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    pub index: Option<usize>,
    pub title: String,
    pub remaining: String,
    pub remaining_ms: Option<i64>,
    pub color: DisplayColor,
    pub paused: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleItem {
    pub index: usize,
    pub title: String,
    pub scheduled_start: DateTime<Utc>,
}

pub fn running_activity(activities: &[Activity]) -> Option<(usize, &Activity)> {
    activities.iter().enumerate().find(|(_, a)| a.is_running())
}

/// Milliseconds until the running activity's deadline, with paused time
/// (including an ongoing pause) credited back. Negative means overrun.
pub fn remaining_ms(activity: &Activity, now: DateTime<Utc>) -> i64 {
    let deadline = match (activity.computed_end, activity.actual_start) {
        (Some(end), _) => end,
        (None, Some(start)) => add_duration(start, &activity.duration),
        (None, None) => activity.scheduled_end,
    };
    let ongoing = match (activity.paused, activity.paused_at) {
        (true, Some(at)) => (now - at).num_milliseconds().max(0),
        _ => 0,
    };
    let effective_paused = activity.total_paused_ms + ongoing;
    (deadline - now).num_milliseconds() + effective_paused
}

pub fn project(activities: &[Activity], now: DateTime<Utc>) -> Countdown {
    match running_activity(activities) {
        Some((index, activity)) => {
            let ms = remaining_ms(activity, now);
            let color = if activity.paused {
                DisplayColor::Inactive
            } else {
                DisplayColor::for_remaining(ms)
            };
            Countdown {
                index: Some(index),
                title: activity.title.clone(),
                remaining: format_remaining(ms),
                remaining_ms: Some(ms),
                color,
                paused: activity.paused,
            }
        }
        None => Countdown {
            index: None,
            title: IDLE_TITLE.to_string(),
            remaining: IDLE_PROMPT.to_string(),
            remaining_ms: None,
            color: DisplayColor::Inactive,
            paused: false,
        },
    }
}

/// `M:SS`, or `H:MM:SS` from an hour up, with a leading `-` on overrun.
pub fn format_remaining(ms: i64) -> String {
    let total_secs = ms.unsigned_abs() / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let body = if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    };
    if ms < 0 {
        format!("-{}", body)
    } else {
        body
    }
}

pub fn future_items(activities: &[Activity], now: DateTime<Utc>) -> Vec<ScheduleItem> {
    items_where(activities, |a| a.actual_end.is_none() || a.scheduled_start > now)
}

pub fn previous_items(activities: &[Activity], now: DateTime<Utc>) -> Vec<ScheduleItem> {
    items_where(activities, |a| {
        a.actual_end.is_some() || a.actual_start.is_some() || a.scheduled_start <= now
    })
}

fn items_where<F>(activities: &[Activity], keep: F) -> Vec<ScheduleItem>
where
    F: Fn(&Activity) -> bool,
{
    activities
        .iter()
        .enumerate()
        .filter(|(_, a)| keep(a))
        .map(|(index, a)| ScheduleItem {
            index,
            title: a.title.clone(),
            scheduled_start: a.scheduled_start,
        })
        .collect()
}
