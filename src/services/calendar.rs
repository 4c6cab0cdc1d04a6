//! Calendar projection: schedule + logged sessions per date

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::types::{CalendarDay, Session, WeeklySchedule};

/// One `CalendarDay` per date in `from..=to`, ascending.
///
/// Sessions are matched to days by their local start date. Without a
/// schedule, every day has no projection.
pub fn build_days(
    sessions: &[Session],
    schedule: Option<&WeeklySchedule>,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<CalendarDay> {
    if from > to {
        return Vec::new();
    }

    let mut by_date: HashMap<NaiveDate, Vec<Session>> = HashMap::new();
    for session in sessions {
        let date = session.local_date();
        if date >= from && date <= to {
            by_date.entry(date).or_default().push(session.clone());
        }
    }

    from.iter_days()
        .take_while(|d| *d <= to)
        .map(|date| {
            let mut sessions = by_date.remove(&date).unwrap_or_default();
            sessions.sort_by_key(|s| s.started_at);
            CalendarDay {
                date,
                projection: schedule.map(|s| s.projection_for(date)),
                sessions,
            }
        })
        .collect()
}
