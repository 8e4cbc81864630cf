//! Plain-text rendering of tasks and calendars.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate, Timelike};
use taskdeck_core::tasks::calendar::MonthView;
use taskdeck_core::tasks::TaskCounts;
use taskdeck_core::Task;

/// Maximum title width in task lists
const TITLE_WIDTH: usize = 48;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Due date for display; the time is shown only when it is not midnight
pub fn format_due(task: &Task) -> String {
    match task.due_in(&Local) {
        Some(due) if due.hour() == 0 && due.minute() == 0 => due.format("%b %d, %Y").to_string(),
        Some(due) => due.format("%b %d, %Y %H:%M").to_string(),
        None => match task.due_date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw.to_string(),
            _ => "No due date".to_string(),
        },
    }
}

pub fn task_line(task: &Task) -> String {
    let check = if task.completed { "x" } else { " " };
    let mut line = format!(
        "[{}] #{:<5} {:<width$}",
        check,
        task.id,
        truncate_string(&task.title, TITLE_WIDTH),
        width = TITLE_WIDTH
    );
    if task.due_date.is_some() {
        line.push_str(&format!("  due {}", format_due(task)));
    }
    line.trim_end().to_string()
}

pub fn task_detail(task: &Task) -> String {
    let mut out = task_line(task);
    if let Some(description) = task.description.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push_str("\n        ");
        out.push_str(description);
    }
    out
}

pub fn counts_line(counts: &TaskCounts) -> String {
    format!(
        "{} tasks: {} pending, {} completed ({}% done)",
        counts.total,
        counts.pending,
        counts.completed,
        counts.completion_percent()
    )
}

/// Month grid with a task count under each day that has due tasks
pub fn month_grid(
    month: &MonthView,
    due: &BTreeMap<NaiveDate, Vec<&Task>>,
    today: NaiveDate,
) -> String {
    let mut out = format!("{:^35}\n", month.title());
    out.push_str(" Sun  Mon  Tue  Wed  Thu  Fri  Sat\n");

    for week in month.cells().chunks(7) {
        let mut days = String::new();
        let mut marks = String::new();
        for cell in week {
            match cell {
                Some(day) => {
                    let marker = if *day == today { '*' } else { ' ' };
                    days.push_str(&format!(" {:>3}{}", day.format("%-d"), marker));
                    match due.get(day).map(Vec::len) {
                        Some(n) if n > 0 => marks.push_str(&format!(" {:>3} ", format!("({})", n))),
                        _ => marks.push_str("     "),
                    }
                }
                None => {
                    days.push_str("     ");
                    marks.push_str("     ");
                }
            }
        }
        out.push_str(days.trim_end());
        out.push('\n');
        if !marks.trim().is_empty() {
            out.push_str(marks.trim_end());
            out.push('\n');
        }
    }
    out
}
