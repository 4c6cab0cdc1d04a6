//! Plain-text reports for the CLI

use chrono::Weekday;
use std::fmt::Write;

use crate::services::{ReplayReport, WorkoutStats};
use crate::types::{is_client_id, CompletedSet, MutationStatus, QueuedMutation, Session};

const BAR_WIDTH: u32 = 20;
const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// `m:ss` for the rest countdown
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Bar scaled against the busiest weekday
fn bar(count: u32, max: u32) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (count * BAR_WIDTH).div_ceil(max);
    "█".repeat(len as usize)
}

pub fn render_stats(stats: &WorkoutStats) -> String {
    let mut out = String::new();

    if let (Some(start), Some(end)) = (stats.period_start, stats.period_end) {
        let _ = writeln!(out, "Period        {} .. {}", start, end);
    }
    let _ = writeln!(
        out,
        "Completion    {}% ({} of {} scheduled days)",
        stats.completion_rate, stats.completed_days, stats.scheduled_days
    );
    let _ = writeln!(out, "Streak        {} (best {})", stats.current_streak, stats.best_streak);
    let _ = writeln!(
        out,
        "Sessions      {} ({} total, {} avg)",
        stats.completed_sessions,
        format_duration(stats.total_duration_seconds),
        format_duration(stats.average_duration_seconds)
    );

    let mix: Vec<String> = stats
        .mix
        .iter()
        .map(|m| format!("{} {}%", m.workout_type.label(), m.percent))
        .collect();
    let _ = writeln!(out, "Mix           {}", mix.join(" · "));

    let _ = writeln!(out);
    let max = stats.weekday_counts.iter().copied().max().unwrap_or(0);
    for (weekday, count) in WEEKDAYS.iter().zip(stats.weekday_counts) {
        let _ = writeln!(out, "{}  {:>3} {}", weekday, count, bar(count, max));
    }
    out
}

fn id_note(id: &str) -> &'static str {
    if is_client_id(id) {
        " (offline)"
    } else {
        ""
    }
}

pub fn render_started(session: &Session) -> String {
    format!(
        "Started {} ({}), session {}{}\n",
        session.kind.title(),
        session.workout_type().label(),
        session.id,
        id_note(&session.id)
    )
}

pub fn render_set(set: &CompletedSet) -> String {
    let weight = set
        .weight_kg
        .map(|w| format!(" @ {} kg", w))
        .unwrap_or_default();
    format!(
        "{} set {}: {} reps{}{}\n",
        set.exercise_id,
        set.set_number,
        set.reps,
        weight,
        id_note(&set.id)
    )
}

pub fn render_completed(session: &Session) -> String {
    let duration = session
        .duration_seconds
        .map(|d| format!(" in {}", format_duration(u64::from(d))))
        .unwrap_or_default();
    format!(
        "Completed {}{}{}\n",
        session.kind.title(),
        duration,
        id_note(&session.id)
    )
}

pub fn render_queue(entries: &[QueuedMutation]) -> String {
    if entries.is_empty() {
        return "Offline queue is empty.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{} queued write(s):", entries.len());
    for entry in entries {
        let status = match entry.status {
            MutationStatus::Pending => "pending",
            MutationStatus::Syncing => "syncing",
            MutationStatus::Failed => "failed",
        };
        let _ = write!(
            out,
            "  {}  {:<16} {:<8} attempts={}",
            entry.enqueued_at.format("%Y-%m-%d %H:%M"),
            entry.mutation.label(),
            status,
            entry.attempts
        );
        if let Some(err) = &entry.last_error {
            let _ = write!(out, "  ({})", err);
        }
        let _ = writeln!(out);
    }
    out
}

pub fn render_replay(report: &ReplayReport) -> String {
    let mut out = format!(
        "Synced {}, rejected {}, deferred {}, {} still queued.\n",
        report.synced, report.rejected, report.deferred, report.remaining
    );
    if report.interrupted {
        out.push_str("Connection lost during sync; run again when back online.\n");
    }
    out
}
