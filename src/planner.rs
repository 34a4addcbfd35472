use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{Assignment, AssignmentStatus, Priority};

/// Completion wins over lateness; lateness wins over logged work.
pub fn derive_status(
    completed: bool,
    due_date: NaiveDate,
    actual_minutes: i32,
    now: NaiveDateTime,
) -> AssignmentStatus {
    if completed {
        AssignmentStatus::Completed
    } else if now > due_start(due_date) {
        AssignmentStatus::Overdue
    } else if actual_minutes > 0 {
        AssignmentStatus::InProgress
    } else {
        AssignmentStatus::NotStarted
    }
}

pub fn priority_for(due_date: NaiveDate, now: NaiveDateTime) -> Priority {
    let hours_until_due = (due_start(due_date) - now).num_hours();
    match hours_until_due {
        h if h < 24 => Priority::Urgent,
        h if h < 72 => Priority::High,
        h if h < 168 => Priority::Medium,
        _ => Priority::Low,
    }
}

pub fn assignment_status(assignment: &Assignment, now: NaiveDateTime) -> AssignmentStatus {
    derive_status(
        assignment.completed,
        assignment.due_date,
        assignment.actual_minutes,
        now,
    )
}

// Due dates carry no time of day; they fall due at midnight.
fn due_start(due_date: NaiveDate) -> NaiveDateTime {
    due_date.and_time(chrono::NaiveTime::MIN)
}
