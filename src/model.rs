use crate::parser::{add_duration, clock_label, parse, parse_clock_time, parse_duration, records};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

/// One timed entry in a programme.
///
/// `scheduled_*` are planning hints produced by chaining durations. Once the
/// operator takes manual control, `actual_*` and `computed_end` are what count.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub title: String,
    pub start_time: String,
    pub duration: String,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_paused_ms: i64,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("please fill in the title")]
    MissingTitle,
    #[error("please fill in the duration")]
    MissingDuration,
    #[error("invalid duration (use minutes or minutes:seconds): {0}")]
    InvalidDuration(String),
    #[error("the first activity needs a start time")]
    MissingStartTime,
    #[error("please fill in the start time")]
    EmptyStartTime,
    #[error("invalid start time (use HH:MM): {0}")]
    InvalidStartTime(String),
    #[error("no activity is running")]
    NoRunningActivity,
    #[error("no more activities to start")]
    NoUnstartedActivity,
    #[error("no activity at position {0}")]
    IndexOutOfRange(usize),
    #[error("{0} has already been started")]
    AlreadyStarted(String),
    #[error("programme not found: {0}")]
    UnknownProgramme(String),
    #[error("programme name is required")]
    MissingProgrammeName,
    #[error("announcement text is empty")]
    EmptyAnnouncement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseChange {
    Paused,
    Resumed,
}

/// Persistable form of a [`Schedule`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleSnapshot {
    pub activities: Vec<Activity>,
    pub skip_target: Option<usize>,
}

/// The live programme and every operator transition applied to it.
///
/// Mutating methods take the current instant explicitly and validate before
/// touching anything, so an `Err` always leaves the sequence as it was.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    activities: Vec<Activity>,
    skip_target: Option<usize>,
}

impl Activity {
    pub fn planned(
        title: impl Into<String>,
        start_time: impl Into<String>,
        duration: impl Into<String>,
        scheduled_start: DateTime<Utc>,
    ) -> Self {
        let duration = duration.into();
        let scheduled_end = add_duration(scheduled_start, &duration);
        Activity {
            title: title.into(),
            start_time: start_time.into(),
            duration,
            scheduled_start,
            scheduled_end,
            actual_start: None,
            actual_end: None,
            computed_end: None,
            paused: false,
            paused_at: None,
            total_paused_ms: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.actual_start.is_some() && self.actual_end.is_none()
    }

    pub fn is_unstarted(&self) -> bool {
        self.actual_start.is_none() && self.actual_end.is_none()
    }

    /// Marks the activity started at `now` and moves its plan onto the real clock.
    fn start(&mut self, now: DateTime<Utc>) {
        let end = add_duration(now, &self.duration);
        self.actual_start = Some(now);
        self.actual_end = None;
        self.computed_end = Some(end);
        self.scheduled_start = now;
        self.scheduled_end = end;
    }

    fn reset_pause(&mut self) {
        self.paused = false;
        self.paused_at = None;
        self.total_paused_ms = 0;
    }
}

impl Schedule {
    pub fn new() -> Self {
        Schedule::default()
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn skip_target(&self) -> Option<usize> {
        self.skip_target
    }

    pub fn running_index(&self) -> Option<usize> {
        self.activities.iter().position(Activity::is_running)
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            activities: self.activities.clone(),
            skip_target: self.skip_target,
        }
    }

    /// Rebuilds a schedule from persisted state, discarding a skip selection
    /// that no longer points at an unstarted activity.
    pub fn restore(snapshot: ScheduleSnapshot) -> Self {
        let mut schedule = Schedule {
            activities: snapshot.activities,
            skip_target: snapshot.skip_target,
        };
        schedule.skip_target = schedule.valid_skip_target();
        schedule
    }

    /// Replaces the whole sequence without starting anything.
    pub fn load_sequence(&mut self, activities: Vec<Activity>) {
        self.activities = activities;
        self.skip_target = None;
    }

    /// Parses `text`, installs it and starts the first activity.
    pub fn process_input(&mut self, text: &str, now: DateTime<Utc>) -> usize {
        self.load_sequence(parse(text, now));
        self.start_first_if_idle(now);
        info!("loaded programme with {} activities", self.activities.len());
        self.activities.len()
    }

    /// Auto-start step used when a programme is first loaded: starts element 0
    /// unless something is already running.
    pub fn start_first_if_idle(&mut self, now: DateTime<Utc>) {
        if self.running_index().is_some() {
            return;
        }
        if let Some(first) = self.activities.first_mut() {
            first.start(now);
        }
    }

    /// Loads an edited saved programme: every record is rechained from `now`,
    /// its start label rewritten, and the first activity started.
    pub fn open_saved_set(&mut self, text: &str, now: DateTime<Utc>) -> Result<usize, ScheduleError> {
        let items = records(text);
        for (title, _, duration) in &items {
            if title.is_empty() {
                return Err(ScheduleError::MissingTitle);
            }
            if duration.is_empty() {
                return Err(ScheduleError::MissingDuration);
            }
        }
        let mut cursor = now;
        let mut activities = Vec::with_capacity(items.len());
        for (title, _, duration) in items {
            let activity = Activity::planned(title, clock_label(cursor), duration, cursor);
            cursor = activity.scheduled_end;
            activities.push(activity);
        }
        self.load_sequence(activities);
        self.start_first_if_idle(now);
        Ok(self.activities.len())
    }

    /// Adds an activity at the end of the programme.
    ///
    /// The first activity of an empty programme requires an `HH:MM` start
    /// time and starts immediately. Later ones chain behind the last
    /// scheduled end and wait for `start_next`.
    pub fn append_activity(
        &mut self,
        title: &str,
        duration: &str,
        start_time: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<usize, ScheduleError> {
        let title = title.trim();
        let duration = duration.trim();
        if title.is_empty() {
            return Err(ScheduleError::MissingTitle);
        }
        if duration.is_empty() {
            return Err(ScheduleError::MissingDuration);
        }
        if parse_duration(duration)?.is_zero() {
            return Err(ScheduleError::MissingDuration);
        }

        let activity = match self.activities.last() {
            None => {
                let label = start_time.map(str::trim).unwrap_or_default();
                parse_clock_time(label, now)?;
                let mut first = Activity::planned(title, label, duration, now);
                first.start(now);
                first
            }
            Some(last) => {
                let anchor = last.scheduled_end;
                Activity::planned(title, clock_label(anchor), duration, anchor)
            }
        };
        self.activities.push(activity);
        Ok(self.activities.len() - 1)
    }

    /// Ends whatever is running and starts the selected or earliest-scheduled
    /// unstarted activity, rechaining everything unstarted after it.
    pub fn start_next(&mut self, now: DateTime<Utc>) -> Result<usize, ScheduleError> {
        let next = self
            .valid_skip_target()
            .or_else(|| self.earliest_unstarted())
            .ok_or(ScheduleError::NoUnstartedActivity)?;

        if let Some(running) = self.running_index() {
            self.activities[running].actual_end = Some(now);
        }
        self.activities[next].start(now);
        self.skip_target = None;

        let mut cursor = self.activities[next].scheduled_end;
        for activity in self.activities.iter_mut().skip(next + 1) {
            if !activity.is_unstarted() {
                continue;
            }
            activity.scheduled_start = cursor;
            activity.scheduled_end = add_duration(cursor, &activity.duration);
            activity.start_time = clock_label(cursor);
            cursor = activity.scheduled_end;
        }
        info!("started {}", self.activities[next].title);
        Ok(next)
    }

    /// Ends the running activity without starting a replacement.
    pub fn end_current(&mut self, now: DateTime<Utc>) -> Result<usize, ScheduleError> {
        let running = self
            .running_index()
            .ok_or(ScheduleError::NoRunningActivity)?;
        self.activities[running].actual_end = Some(now);
        info!("ended {}", self.activities[running].title);
        Ok(running)
    }

    pub fn toggle_pause(&mut self, now: DateTime<Utc>) -> Result<PauseChange, ScheduleError> {
        let running = self
            .running_index()
            .ok_or(ScheduleError::NoRunningActivity)?;
        let activity = &mut self.activities[running];
        if activity.paused {
            let since = activity.paused_at.unwrap_or(now);
            let delta = (now - since).num_milliseconds().max(0);
            activity.total_paused_ms += delta;
            activity.paused = false;
            activity.paused_at = None;
            Ok(PauseChange::Resumed)
        } else {
            activity.paused = true;
            activity.paused_at = Some(now);
            Ok(PauseChange::Paused)
        }
    }

    /// Runs activity `index` again from `now`.
    ///
    /// Later activities keep their planned times; only `start_next` reflows.
    pub fn restart_activity(&mut self, index: usize, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        if index >= self.activities.len() {
            return Err(ScheduleError::IndexOutOfRange(index));
        }
        if let Some(running) = self.running_index() {
            self.activities[running].actual_end = Some(now);
        }
        for activity in &mut self.activities[..index] {
            if activity.is_running() {
                activity.actual_end = Some(now);
            }
        }
        let target = &mut self.activities[index];
        target.reset_pause();
        target.start(now);
        if self.skip_target == Some(index) {
            self.skip_target = None;
        }
        info!("re-started {}", self.activities[index].title);
        Ok(())
    }

    /// Rewrites the running activity in place, or the activity whose planned
    /// window contains `now` when nothing has been started.
    ///
    /// A `None` start keeps the stored label as it is; only a newly supplied
    /// label has to be an `HH:MM` time.
    pub fn edit_running(
        &mut self,
        title: &str,
        start_time: Option<&str>,
        duration: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, ScheduleError> {
        let title = title.trim();
        let start_time = start_time.map(str::trim);
        let duration = duration.trim();
        if title.is_empty() {
            return Err(ScheduleError::MissingTitle);
        }
        if duration.is_empty() {
            return Err(ScheduleError::MissingDuration);
        }
        parse_duration(duration)?;
        if let Some(label) = start_time {
            if label.is_empty() {
                return Err(ScheduleError::EmptyStartTime);
            }
            parse_clock_time(label, now)?;
        }

        let index = self
            .edit_target(now)
            .ok_or(ScheduleError::NoRunningActivity)?;

        let activity = &mut self.activities[index];
        activity.title = title.to_string();
        if let Some(label) = start_time {
            activity.start_time = label.to_string();
        }
        activity.duration = duration.to_string();
        match activity.actual_start {
            Some(started) => {
                activity.computed_end = Some(add_duration(started, duration));
            }
            None => {
                let end = add_duration(activity.scheduled_start, duration);
                activity.scheduled_end = end;
                activity.computed_end = Some(end);
            }
        }
        Ok(index)
    }

    /// The activity `edit_running` would change: the running one, else the
    /// one whose planned window contains `now`.
    pub fn edit_target(&self, now: DateTime<Utc>) -> Option<usize> {
        self.running_index().or_else(|| {
            self.activities
                .iter()
                .position(|a| a.scheduled_start <= now && now < a.scheduled_end)
        })
    }

    /// Chooses which unstarted activity the next `start_next` will run.
    pub fn select_skip_target(&mut self, index: usize) -> Result<(), ScheduleError> {
        let activity = self
            .activities
            .get(index)
            .ok_or(ScheduleError::IndexOutOfRange(index))?;
        if !activity.is_unstarted() {
            return Err(ScheduleError::AlreadyStarted(activity.title.clone()));
        }
        self.skip_target = Some(index);
        Ok(())
    }

    pub fn end_programme(&mut self) {
        self.load_sequence(Vec::new());
        info!("programme ended and cleared");
    }

    fn valid_skip_target(&self) -> Option<usize> {
        self.skip_target
            .filter(|&i| self.activities.get(i).is_some_and(Activity::is_unstarted))
    }

    fn earliest_unstarted(&self) -> Option<usize> {
        self.activities
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_unstarted())
            .min_by_key(|(_, a)| a.scheduled_start)
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()
    }

    fn loaded(text: &str, now: DateTime<Utc>) -> Schedule {
        let mut schedule = Schedule::new();
        schedule.load_sequence(parse(text, now));
        schedule
    }

    fn running_count(schedule: &Schedule) -> usize {
        schedule.activities().iter().filter(|a| a.is_running()).count()
    }

    #[test]
    fn load_sequence_does_not_start() {
        let schedule = loaded("A;09:00;30\nB;09:30;15", t0());
        assert_eq!(schedule.running_index(), None);
    }

    #[test]
    fn process_input_starts_only_the_first() {
        let now = t0();
        let mut schedule = Schedule::new();
        assert_eq!(schedule.process_input("A;09:00;30\nB;09:30;15", now), 2);
        let first = &schedule.activities()[0];
        assert_eq!(first.actual_start, Some(now));
        assert_eq!(first.computed_end, Some(now + Duration::minutes(30)));
        assert!(schedule.activities()[1].is_unstarted());
    }

    #[test]
    fn process_input_with_nothing_valid_is_empty() {
        let mut schedule = Schedule::new();
        assert_eq!(schedule.process_input("nothing here", t0()), 0);
        assert!(schedule.is_empty());
    }

    #[test]
    fn append_chains_behind_last_scheduled_end() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30\nB;09:30;15", now);
        let idx = schedule.append_activity("C", "10", None, now).unwrap();
        let c = &schedule.activities()[idx];
        assert_eq!(c.scheduled_start, now + Duration::minutes(45));
        assert_eq!(c.scheduled_end, now + Duration::minutes(55));
        assert!(c.is_unstarted());
    }

    #[test]
    fn append_first_activity_autostarts() {
        let now = t0();
        let mut schedule = Schedule::new();
        let label = clock_label(now + Duration::minutes(5));
        schedule
            .append_activity("Opening", "15", Some(&label), now)
            .unwrap();
        let first = &schedule.activities()[0];
        assert_eq!(first.actual_start, Some(now));
        assert_eq!(first.computed_end, Some(now + Duration::minutes(15)));
        assert_eq!(first.start_time, label);
    }

    #[test]
    fn append_validation_leaves_schedule_unchanged() {
        let now = t0();
        let mut schedule = Schedule::new();
        assert_eq!(
            schedule.append_activity("", "10", Some("09:00"), now),
            Err(ScheduleError::MissingTitle)
        );
        assert_eq!(
            schedule.append_activity("A", " ", Some("09:00"), now),
            Err(ScheduleError::MissingDuration)
        );
        assert_eq!(
            schedule.append_activity("A", "0", Some("09:00"), now),
            Err(ScheduleError::MissingDuration)
        );
        assert!(matches!(
            schedule.append_activity("A", "ten", Some("09:00"), now),
            Err(ScheduleError::InvalidDuration(_))
        ));
        assert_eq!(
            schedule.append_activity("A", "10", None, now),
            Err(ScheduleError::MissingStartTime)
        );
        assert!(matches!(
            schedule.append_activity("A", "10", Some("25:00"), now),
            Err(ScheduleError::InvalidStartTime(_))
        ));
        assert!(schedule.is_empty());
    }

    #[test]
    fn start_next_twice_never_runs_two() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30\nB;09:30;15\nC;09:45;10", now);
        assert_eq!(schedule.start_next(now).unwrap(), 0);
        assert_eq!(running_count(&schedule), 1);

        let later = now + Duration::minutes(3);
        assert_eq!(schedule.start_next(later).unwrap(), 1);
        assert_eq!(running_count(&schedule), 1);
        assert_eq!(schedule.activities()[0].actual_end, Some(later));
        assert_eq!(schedule.activities()[1].actual_start, Some(later));
    }

    #[test]
    fn start_next_rechains_unstarted_followers() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30\nB;09:30;15\nC;09:45;10", now);
        schedule.start_next(now).unwrap();
        let later = now + Duration::minutes(40);
        schedule.start_next(later).unwrap();

        let b = &schedule.activities()[1];
        let c = &schedule.activities()[2];
        assert_eq!(b.computed_end, Some(later + Duration::minutes(15)));
        assert_eq!(c.scheduled_start, later + Duration::minutes(15));
        assert_eq!(c.scheduled_end, later + Duration::minutes(25));
        assert_eq!(c.start_time, clock_label(c.scheduled_start));
    }

    #[test]
    fn start_next_without_candidates_changes_nothing() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30", now);
        schedule.start_next(now).unwrap();
        let before = schedule.clone();
        assert_eq!(
            schedule.start_next(now + Duration::minutes(1)),
            Err(ScheduleError::NoUnstartedActivity)
        );
        assert_eq!(schedule, before);
    }

    #[test]
    fn skip_selection_decides_next_start() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30\nB;09:30;15\nC;09:45;10", now);
        schedule.start_next(now).unwrap();
        schedule.select_skip_target(2).unwrap();
        assert_eq!(running_count(&schedule), 1);
        assert_eq!(schedule.running_index(), Some(0));

        assert_eq!(schedule.start_next(now + Duration::minutes(1)).unwrap(), 2);
        assert_eq!(schedule.skip_target(), None);
        assert!(schedule.activities()[1].is_unstarted());
        assert_eq!(schedule.start_next(now + Duration::minutes(2)).unwrap(), 1);
    }

    #[test]
    fn skip_selection_rejects_started_or_missing() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30\nB;09:30;15", now);
        schedule.start_next(now).unwrap();
        assert!(matches!(
            schedule.select_skip_target(0),
            Err(ScheduleError::AlreadyStarted(_))
        ));
        assert_eq!(
            schedule.select_skip_target(5),
            Err(ScheduleError::IndexOutOfRange(5))
        );
        assert_eq!(schedule.skip_target(), None);
    }

    #[test]
    fn end_current_does_not_advance() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30\nB;09:30;15", now);
        schedule.start_next(now).unwrap();
        assert_eq!(schedule.end_current(now).unwrap(), 0);
        assert_eq!(schedule.running_index(), None);
        assert!(schedule.activities()[1].is_unstarted());
        assert_eq!(
            schedule.end_current(now),
            Err(ScheduleError::NoRunningActivity)
        );
    }

    #[test]
    fn pause_pairs_accumulate_and_never_move_deadline() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30", now);
        schedule.start_next(now).unwrap();
        let deadline = schedule.activities()[0].computed_end;

        assert_eq!(schedule.toggle_pause(now).unwrap(), PauseChange::Paused);
        assert_eq!(schedule.toggle_pause(now).unwrap(), PauseChange::Resumed);
        assert_eq!(schedule.activities()[0].total_paused_ms, 0);

        let pause_at = now + Duration::minutes(2);
        schedule.toggle_pause(pause_at).unwrap();
        assert!(schedule.activities()[0].paused);
        schedule
            .toggle_pause(pause_at + Duration::minutes(5))
            .unwrap();
        let a = &schedule.activities()[0];
        assert!(!a.paused);
        assert_eq!(a.paused_at, None);
        assert_eq!(a.total_paused_ms, 5 * 60_000);
        assert_eq!(a.computed_end, deadline);
    }

    #[test]
    fn pause_needs_a_running_activity() {
        let mut schedule = loaded("A;09:00;30", t0());
        assert_eq!(
            schedule.toggle_pause(t0()),
            Err(ScheduleError::NoRunningActivity)
        );
    }

    #[test]
    fn restart_rewinds_without_reflow() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30\nB;09:30;15\nC;09:45;10", now);
        schedule.start_next(now).unwrap();
        schedule.toggle_pause(now + Duration::minutes(1)).unwrap();
        let b_at = now + Duration::minutes(10);
        schedule.start_next(b_at).unwrap();
        let planned_c = schedule.activities()[2].clone();

        let again = now + Duration::minutes(12);
        schedule.restart_activity(0, again).unwrap();
        let a = &schedule.activities()[0];
        assert_eq!(a.actual_start, Some(again));
        assert_eq!(a.actual_end, None);
        assert!(!a.paused);
        assert_eq!(a.paused_at, None);
        assert_eq!(a.total_paused_ms, 0);
        assert_eq!(a.computed_end, Some(again + Duration::minutes(30)));
        assert_eq!(schedule.activities()[1].actual_end, Some(again));
        assert_eq!(schedule.activities()[2], planned_c);
        assert_eq!(running_count(&schedule), 1);
        assert_eq!(
            schedule.restart_activity(9, again),
            Err(ScheduleError::IndexOutOfRange(9))
        );
    }

    #[test]
    fn edit_running_recomputes_from_actual_start() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30\nB;09:30;15", now);
        schedule.start_next(now).unwrap();
        let later = now + Duration::minutes(5);
        let label = clock_label(later);
        let idx = schedule.edit_running("A+", Some(&label), "45", later).unwrap();
        assert_eq!(idx, 0);
        let a = &schedule.activities()[0];
        assert_eq!(a.title, "A+");
        assert_eq!(a.duration, "45");
        assert_eq!(a.computed_end, Some(now + Duration::minutes(45)));
        assert_eq!(
            schedule.activities()[1].scheduled_start,
            now + Duration::minutes(30)
        );
    }

    #[test]
    fn edit_falls_back_to_planned_window() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30\nB;09:30;15", now);
        let inside_b = now + Duration::minutes(35);
        let label = clock_label(inside_b);
        let idx = schedule.edit_running("B", Some(&label), "20", inside_b).unwrap();
        assert_eq!(idx, 1);
        let b = &schedule.activities()[1];
        assert_eq!(b.scheduled_end, now + Duration::minutes(50));
        assert!(b.is_unstarted());
    }

    #[test]
    fn edit_rejects_bad_input_untouched() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30", now);
        schedule.start_next(now).unwrap();
        let before = schedule.clone();
        assert!(schedule.edit_running("A", Some("xx"), "10", now).is_err());
        assert!(schedule.edit_running("A", Some("10:00"), "abc", now).is_err());
        assert!(schedule.edit_running(" ", Some("10:00"), "10", now).is_err());
        assert_eq!(
            schedule.edit_running("A", Some("  "), "10", now),
            Err(ScheduleError::EmptyStartTime)
        );
        assert_eq!(schedule, before);
    }

    #[test]
    fn edit_keeps_free_text_start_label() {
        let now = t0();
        let mut schedule = Schedule::new();
        schedule.process_input("Intro;TBD;5\nTalk;;30\nWrap;9am;10", now);

        let idx = schedule.edit_running("Intro", None, "10", now).unwrap();
        assert_eq!(idx, 0);
        let intro = &schedule.activities()[0];
        assert_eq!(intro.start_time, "TBD");
        assert_eq!(intro.duration, "10");
        assert_eq!(intro.computed_end, Some(now + Duration::minutes(10)));

        let later = now + Duration::minutes(10);
        schedule.start_next(later).unwrap();
        let idx = schedule.edit_running("Talk (long)", None, "30", later).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(schedule.activities()[1].title, "Talk (long)");
        assert_eq!(schedule.activities()[1].start_time, "");
    }

    #[test]
    fn open_saved_set_rechains_from_now() {
        let now = t0();
        let mut schedule = Schedule::new();
        let count = schedule
            .open_saved_set("Prayer;09:15;35\nWorship;09:50;30", now)
            .unwrap();
        assert_eq!(count, 2);
        let acts = schedule.activities();
        assert_eq!(acts[0].actual_start, Some(now));
        assert_eq!(acts[0].start_time, clock_label(now));
        assert_eq!(acts[1].scheduled_start, now + Duration::minutes(35));
        assert_eq!(acts[1].start_time, clock_label(now + Duration::minutes(35)));

        assert_eq!(
            schedule.open_saved_set("Broken;09:00;", now),
            Err(ScheduleError::MissingDuration)
        );
        assert_eq!(schedule.activities().len(), 2);
    }

    #[test]
    fn end_programme_clears_everything() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30\nB;09:30;15", now);
        schedule.select_skip_target(1).unwrap();
        schedule.end_programme();
        assert!(schedule.is_empty());
        assert_eq!(schedule.skip_target(), None);
    }

    #[test]
    fn restore_drops_stale_skip_target() {
        let now = t0();
        let mut schedule = loaded("A;09:00;30\nB;09:30;15", now);
        schedule.start_next(now).unwrap();
        let mut snapshot = schedule.snapshot();
        snapshot.skip_target = Some(0);
        assert_eq!(Schedule::restore(snapshot.clone()).skip_target(), None);
        snapshot.skip_target = Some(1);
        assert_eq!(Schedule::restore(snapshot).skip_target(), Some(1));
    }
}
