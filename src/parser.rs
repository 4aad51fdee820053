//! Text format for programmes: one `title;start;duration` record per line.
//!
//! The `start` column is advisory. Scheduled times are always derived by
//! chaining durations from an anchor instant, so a reimported file lines up
//! behind whatever "now" is at import time.

use crate::model::{Activity, ScheduleError};
use chrono::{DateTime, Duration, Local, LocalResult, NaiveTime, TimeZone, Utc};
use log::warn;

/// Parses programme text into chained activities anchored at `now`.
///
/// Lines that do not split into exactly three fields are dropped without
/// complaint. A malformed duration only produces a warning and contributes
/// no time.
pub fn parse(text: &str, now: DateTime<Utc>) -> Vec<Activity> {
    let mut activities = Vec::new();
    let mut cursor = now;
    for (title, start_time, duration) in records(text) {
        let activity = Activity::planned(title, start_time, duration, cursor);
        cursor = activity.scheduled_end;
        activities.push(activity);
    }
    activities
}

/// Splits text into its well-formed `(title, start, duration)` records.
pub fn records(text: &str) -> Vec<(String, String, String)> {
    text.lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(';').collect();
            match parts.as_slice() {
                [title, start, duration] => Some((
                    title.trim().to_string(),
                    start.trim().to_string(),
                    duration.trim().to_string(),
                )),
                _ => None,
            }
        })
        .collect()
}

pub fn serialize(activities: &[Activity]) -> String {
    activities
        .iter()
        .map(|a| format!("{};{};{}", a.title, a.start_time, a.duration))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strict duration grammar: `M` or `M:S`, non-negative integers.
pub fn parse_duration(text: &str) -> Result<Duration, ScheduleError> {
    let raw = text.trim();
    let invalid = || ScheduleError::InvalidDuration(raw.to_string());
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    let (minutes, seconds) = match parts.as_slice() {
        [m] => (*m, "0"),
        [m, s] => (*m, *s),
        _ => return Err(invalid()),
    };
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    let seconds: u32 = seconds.parse().map_err(|_| invalid())?;
    Ok(Duration::minutes(i64::from(minutes)) + Duration::seconds(i64::from(seconds)))
}

/// Advances `start` by a duration string, leaving it untouched when the
/// duration cannot be read.
pub fn add_duration(start: DateTime<Utc>, duration: &str) -> DateTime<Utc> {
    match parse_duration(duration) {
        Ok(d) => start + d,
        Err(err) => {
            warn!("{}; adding no time", err);
            start
        }
    }
}

/// Resolves an `HH:MM` wall-clock time to the next occurrence at or after `now`.
pub fn parse_clock_time(text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
    let raw = text.trim();
    if raw.is_empty() {
        return Err(ScheduleError::MissingStartTime);
    }
    let invalid = || ScheduleError::InvalidStartTime(raw.to_string());
    let (h, m) = raw.split_once(':').ok_or_else(invalid)?;
    let hours: u32 = h.trim().parse().map_err(|_| invalid())?;
    let minutes: u32 = m.trim().parse().map_err(|_| invalid())?;
    let time = NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)?;

    let local_now = now.with_timezone(&Local);
    let mut date = local_now.date_naive();
    for _ in 0..2 {
        let candidate = match Local.from_local_datetime(&date.and_time(time)) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
            LocalResult::None => return Err(invalid()),
        };
        if candidate >= now {
            return Ok(candidate);
        }
        date = date.succ_opt().ok_or_else(invalid)?;
    }
    Err(invalid())
}

pub fn clock_label(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn chains_scheduled_times_from_now() {
        let now = t0();
        let parsed = parse("A;09:00;30\nB;09:30;15", now);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].scheduled_start, now);
        assert_eq!(parsed[0].scheduled_end, now + Duration::minutes(30));
        assert_eq!(parsed[1].scheduled_start, now + Duration::minutes(30));
        assert_eq!(parsed[1].scheduled_end, now + Duration::minutes(45));
        for pair in parsed.windows(2) {
            assert_eq!(pair[0].scheduled_end, pair[1].scheduled_start);
        }
    }

    #[test]
    fn parsing_never_starts_anything() {
        let parsed = parse("A;09:00;30\nB;09:30;15", t0());
        assert!(parsed
            .iter()
            .all(|a| a.actual_start.is_none() && a.actual_end.is_none()));
    }

    #[test]
    fn drops_malformed_lines() {
        let text = "Intro;09:00;5\njust a title\nToo;many;fields;here\n\nOutro;09:05;10";
        let parsed = parse(text, t0());
        let titles: Vec<&str> = parsed.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Intro", "Outro"]);
    }

    #[test]
    fn bad_duration_adds_no_time() {
        let now = t0();
        let parsed = parse("Broken;09:00;ten\nNext;09:00;5", now);
        assert_eq!(parsed[0].scheduled_end, now);
        assert_eq!(parsed[1].scheduled_start, now);
        assert_eq!(parsed[1].scheduled_end, now + Duration::minutes(5));
    }

    #[test]
    fn duration_grammar() {
        assert_eq!(parse_duration("30").unwrap(), Duration::minutes(30));
        assert_eq!(
            parse_duration(" 2:30 ").unwrap(),
            Duration::milliseconds(60_000 * 2 + 1000 * 30)
        );
        assert_eq!(parse_duration("0:45").unwrap(), Duration::seconds(45));
        assert_eq!(parse_duration("90").unwrap(), Duration::minutes(90));
        for bad in ["", "abc", "1:2:3", "-5", "1.5", "5:", ":30"] {
            assert!(parse_duration(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn add_duration_advances_exact_milliseconds() {
        let start = t0();
        for (m, s) in [(0u32, 0u32), (1, 0), (12, 7), (59, 59), (120, 5)] {
            let text = if s == 0 { m.to_string() } else { format!("{m}:{s}") };
            let expected = i64::from(60_000 * m + 1000 * s);
            assert_eq!((add_duration(start, &text) - start).num_milliseconds(), expected);
        }
        assert_eq!(add_duration(start, "nope"), start);
    }

    #[test]
    fn serialize_keeps_normalized_records() {
        let text = "  Welcome ; 09:00 ; 10 \ngarbage\nTalk;09:10;45:30\n";
        let out = serialize(&parse(text, t0()));
        assert_eq!(out, "Welcome;09:00;10\nTalk;09:10;45:30");
    }

    #[test]
    fn clock_time_rolls_forward_to_next_day() {
        let now = t0();
        assert_eq!(parse_clock_time(&clock_label(now), now).unwrap(), now);

        let earlier = now - Duration::hours(1);
        let resolved = parse_clock_time(&clock_label(earlier), now).unwrap();
        assert!(resolved > now);
        assert!(resolved - now <= Duration::hours(24));
    }

    #[test]
    fn clock_time_validation() {
        let now = t0();
        assert!(matches!(
            parse_clock_time("   ", now),
            Err(ScheduleError::MissingStartTime)
        ));
        for bad in ["9", "24:00", "12:60", "ab:cd", "-1:30"] {
            assert!(matches!(
                parse_clock_time(bad, now),
                Err(ScheduleError::InvalidStartTime(_))
            ));
        }
    }
}
