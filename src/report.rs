use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::grades::{grade_band, letter_grade};
use crate::models::{Assignment, AssignmentStatus, Course, GradeSnapshot};
use crate::planner;

const UPCOMING_LIMIT: usize = 10;

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.1}% ({})", letter_grade(value)),
        None => "n/a".to_string(),
    }
}

/// One line describing what is needed on the remaining work.
pub fn requirement_line(snapshot: &GradeSnapshot, target: f64) -> String {
    match snapshot.required_grade_on_remaining {
        None => "No remaining weighted work.".to_string(),
        Some(required) if !required.is_achievable() => format!(
            "Target {target:.1}% is out of reach: it would take {:.1}% on remaining work.",
            required.raw
        ),
        Some(required) => format!(
            "Average {:.1}% on remaining work to reach {target:.1}%.",
            required.clamped
        ),
    }
}

pub fn build_report(
    course: &Course,
    assignments: &[Assignment],
    snapshot: &GradeSnapshot,
    target: f64,
    now: NaiveDateTime,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {} Grade Report", course.name);
    let _ = writeln!(
        output,
        "{} {}{} (target {:.1}%)",
        course.semester,
        course.year,
        course
            .code
            .as_deref()
            .map(|code| format!(", {code}"))
            .unwrap_or_default(),
        target
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Standing");
    let _ = writeln!(output, "- Current grade: {}", format_percent(snapshot.current_grade));
    let _ = writeln!(output, "- Projected grade: {}", format_percent(snapshot.projected_grade));
    if let Some(current) = snapshot.current_grade {
        let _ = writeln!(output, "- Standing: {}", grade_band(current));
    }
    let _ = writeln!(
        output,
        "- Graded weight: {:.1}% of {:.1}%",
        snapshot.completed_weight, snapshot.total_weight
    );
    let _ = writeln!(output, "- {}", requirement_line(snapshot, target));
    if !snapshot.weights_balanced() {
        let _ = writeln!(
            output,
            "- Warning: weights sum to {:.1}%, not 100%.",
            snapshot.total_weight
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## What-If Scenarios");
    if snapshot.scenarios.is_empty() {
        let _ = writeln!(output, "No ungraded work left to project.");
    } else {
        for scenario in snapshot.scenarios.iter() {
            let _ = writeln!(
                output,
                "- {} ({}): {}",
                scenario.name,
                scenario.description,
                format_percent(Some(scenario.projected_grade))
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Breakdown");
    if course.grade_breakdown.is_empty() {
        let _ = writeln!(output, "No breakdown recorded.");
    } else {
        for entry in course.grade_breakdown.iter() {
            let _ = writeln!(output, "- {}: {:.1}%", entry.category, entry.weight);
        }
    }

    let mut upcoming: Vec<&Assignment> = assignments
        .iter()
        .filter(|a| planner::assignment_status(a, now) != AssignmentStatus::Completed)
        .collect();
    upcoming.sort_by(|a, b| a.due_date.cmp(&b.due_date));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Open Assignments");
    if upcoming.is_empty() {
        let _ = writeln!(output, "Nothing open.");
    } else {
        for assignment in upcoming.iter().take(UPCOMING_LIMIT) {
            let _ = writeln!(
                output,
                "- {} ({}, {:.1}%) due {} [{}, {} priority]",
                assignment.name,
                assignment.category,
                assignment.weight,
                assignment.due_date,
                planner::assignment_status(assignment, now),
                planner::priority_for(assignment.due_date, now)
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::grades::project;
    use crate::models::Category;

    fn course() -> Course {
        Course {
            id: Uuid::new_v4(),
            name: "Linear Algebra".to_string(),
            code: Some("MATH 221".to_string()),
            semester: "Fall".to_string(),
            year: 2025,
            target_grade: 90.0,
            grade_breakdown: Vec::new(),
        }
    }

    fn assignment(name: &str, day: u32, weight: f64, earned: Option<f64>) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            category: Category::Exam,
            due_date: NaiveDate::from_ymd_opt(2025, 10, day).unwrap(),
            weight,
            total_points: 100.0,
            earned_points: earned,
            completed: earned.is_some(),
            actual_minutes: 0,
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn report_lists_standing_scenarios_and_open_work() {
        let assignments = vec![
            assignment("Midterm", 1, 50.0, Some(80.0)),
            assignment("Final", 20, 50.0, None),
        ];
        let items: Vec<_> = assignments.iter().map(Assignment::grade_item).collect();
        let snapshot = project(&items, 90.0).unwrap();
        let report = build_report(&course(), &assignments, &snapshot, 90.0, now());

        assert!(report.contains("# Linear Algebra Grade Report"));
        assert!(report.contains("Fall 2025, MATH 221 (target 90.0%)"));
        assert!(report.contains("- Current grade: 80.0% (B-)"));
        assert!(report.contains("- Standing: good"));
        assert!(report.contains("Average 100.0% on remaining work to reach 90.0%."));
        assert!(report.contains("- Perfect Scores (100% on all remaining work): 90.0% (A-)"));
        assert!(report.contains("- Final (Exam, 50.0%) due 2025-10-20 [not-started, low priority]"));
        assert!(!report.contains("- Midterm (Exam"));
        assert!(report.contains("No breakdown recorded."));
    }

    #[test]
    fn unreachable_target_is_called_out() {
        let items = vec![
            assignment("Midterm", 1, 90.0, Some(50.0)).grade_item(),
            assignment("Quiz", 2, 10.0, None).grade_item(),
        ];
        let snapshot = project(&items, 90.0).unwrap();
        let line = requirement_line(&snapshot, 90.0);
        assert!(line.starts_with("Target 90.0% is out of reach"));
        assert!(line.contains("450.0%"));
    }

    #[test]
    fn empty_course_reports_without_grades() {
        let snapshot = project(&[], 90.0).unwrap();
        let report = build_report(&course(), &[], &snapshot, 90.0, now());
        assert!(report.contains("- Current grade: n/a"));
        assert!(report.contains("No remaining weighted work."));
        assert!(report.contains("No ungraded work left to project."));
        assert!(report.contains("Nothing open."));
    }
}
