//! Storage seam for courses and assignments.
//!
//! `AssignmentStore` is implemented by the Postgres store in `db` and by the
//! in-memory `MemoryStore` used in tests and dry runs. Workflows that combine
//! extraction, persistence and projection are written against the trait.

use std::sync::Mutex;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::grades;
use crate::models::{
    Assignment, AssignmentCandidate, Category, Course, GradeBreakdownEntry, GradeSnapshot,
    NewAssignment, NewCourse,
};

pub const DEFAULT_TOTAL_POINTS: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Typed assignment query. Every set field narrows the result; dates are
/// inclusive bounds on the due date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentFilter {
    pub course_id: Option<Uuid>,
    pub category: Option<Category>,
    pub completed: Option<bool>,
    pub due_from: Option<NaiveDate>,
    pub due_until: Option<NaiveDate>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl AssignmentFilter {
    pub fn for_course(course_id: Uuid) -> Self {
        Self {
            course_id: Some(course_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, assignment: &Assignment) -> bool {
        self.course_id.map_or(true, |id| assignment.course_id == id)
            && self.category.map_or(true, |c| assignment.category == c)
            && self.completed.map_or(true, |c| assignment.completed == c)
            && self.due_from.map_or(true, |d| assignment.due_date >= d)
            && self.due_until.map_or(true, |d| assignment.due_date <= d)
    }
}

#[allow(async_fn_in_trait)]
pub trait AssignmentStore {
    async fn create_course(&self, course: NewCourse) -> anyhow::Result<Course>;

    async fn course(&self, id: Uuid) -> anyhow::Result<Option<Course>>;

    async fn replace_breakdown(
        &self,
        course_id: Uuid,
        breakdown: &[GradeBreakdownEntry],
    ) -> anyhow::Result<()>;

    async fn insert_assignment(&self, assignment: NewAssignment) -> anyhow::Result<Assignment>;

    async fn assignments(&self, filter: &AssignmentFilter) -> anyhow::Result<Vec<Assignment>>;

    /// Returns false when no assignment has that id.
    async fn record_grade(
        &self,
        id: Uuid,
        earned_points: f64,
        total_points: Option<f64>,
    ) -> anyhow::Result<bool>;

    /// Adds time spent on an assignment. Returns false when no assignment has
    /// that id.
    async fn log_minutes(&self, id: Uuid, minutes: u32) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmOutcome {
    pub created: usize,
    pub skipped: usize,
}

/// Persists reviewed candidates. Candidates without a title or due date are
/// skipped; a non-empty breakdown replaces the course's stored one.
pub async fn confirm_candidates<S: AssignmentStore>(
    store: &S,
    course_id: Uuid,
    candidates: &[AssignmentCandidate],
    breakdown: &[GradeBreakdownEntry],
) -> anyhow::Result<ConfirmOutcome> {
    store
        .course(course_id)
        .await?
        .with_context(|| format!("course {course_id} not found"))?;

    if !breakdown.is_empty() {
        store.replace_breakdown(course_id, breakdown).await?;
    }

    let mut outcome = ConfirmOutcome::default();
    for candidate in candidates {
        let title = candidate.title.trim();
        let Some(due_date) = candidate.due_date.filter(|_| !title.is_empty()) else {
            outcome.skipped += 1;
            continue;
        };
        store
            .insert_assignment(NewAssignment {
                course_id,
                name: title.to_string(),
                description: candidate.description.clone(),
                category: candidate.category,
                due_date,
                weight: candidate.weight.unwrap_or(0.0),
                total_points: DEFAULT_TOTAL_POINTS,
                earned_points: None,
            })
            .await?;
        outcome.created += 1;
    }

    info!(
        %course_id,
        created = outcome.created,
        skipped = outcome.skipped,
        "confirmed syllabus assignments"
    );
    Ok(outcome)
}

/// Loads a course with its assignments and projects them. `target_grade`
/// falls back to the course's own target.
pub async fn course_snapshot<S: AssignmentStore>(
    store: &S,
    course_id: Uuid,
    target_grade: Option<f64>,
) -> anyhow::Result<(Course, Vec<Assignment>, GradeSnapshot)> {
    let course = store
        .course(course_id)
        .await?
        .with_context(|| format!("course {course_id} not found"))?;
    let assignments = store
        .assignments(&AssignmentFilter::for_course(course_id))
        .await?;
    let items: Vec<_> = assignments.iter().map(Assignment::grade_item).collect();
    let snapshot = grades::project(&items, target_grade.unwrap_or(course.target_grade))?;
    Ok((course, assignments, snapshot))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    courses: Mutex<Vec<Course>>,
    assignments: Mutex<Vec<Assignment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("memory store lock poisoned")
}

impl AssignmentStore for MemoryStore {
    async fn create_course(&self, course: NewCourse) -> anyhow::Result<Course> {
        let course = Course {
            id: Uuid::new_v4(),
            name: course.name,
            code: course.code,
            semester: course.semester,
            year: course.year,
            target_grade: course.target_grade,
            grade_breakdown: Vec::new(),
        };
        self.courses.lock().map_err(poisoned)?.push(course.clone());
        Ok(course)
    }

    async fn course(&self, id: Uuid) -> anyhow::Result<Option<Course>> {
        let courses = self.courses.lock().map_err(poisoned)?;
        Ok(courses.iter().find(|course| course.id == id).cloned())
    }

    async fn replace_breakdown(
        &self,
        course_id: Uuid,
        breakdown: &[GradeBreakdownEntry],
    ) -> anyhow::Result<()> {
        let mut courses = self.courses.lock().map_err(poisoned)?;
        let course = courses
            .iter_mut()
            .find(|course| course.id == course_id)
            .with_context(|| format!("course {course_id} not found"))?;
        course.grade_breakdown = breakdown.to_vec();
        Ok(())
    }

    async fn insert_assignment(&self, assignment: NewAssignment) -> anyhow::Result<Assignment> {
        let assignment = Assignment {
            id: Uuid::new_v4(),
            course_id: assignment.course_id,
            name: assignment.name,
            description: assignment.description,
            category: assignment.category,
            due_date: assignment.due_date,
            weight: assignment.weight,
            total_points: assignment.total_points,
            completed: assignment.earned_points.is_some(),
            earned_points: assignment.earned_points,
            actual_minutes: 0,
        };
        self.assignments
            .lock()
            .map_err(poisoned)?
            .push(assignment.clone());
        Ok(assignment)
    }

    async fn assignments(&self, filter: &AssignmentFilter) -> anyhow::Result<Vec<Assignment>> {
        let mut found: Vec<Assignment> = self
            .assignments
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|assignment| filter.matches(assignment))
            .cloned()
            .collect();

        found.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.name.cmp(&b.name)));
        if filter.order == SortOrder::Descending {
            found.reverse();
        }
        if let Some(limit) = filter.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn record_grade(
        &self,
        id: Uuid,
        earned_points: f64,
        total_points: Option<f64>,
    ) -> anyhow::Result<bool> {
        let mut assignments = self.assignments.lock().map_err(poisoned)?;
        let Some(assignment) = assignments.iter_mut().find(|a| a.id == id) else {
            return Ok(false);
        };
        assignment.earned_points = Some(earned_points);
        assignment.completed = true;
        if let Some(total) = total_points {
            assignment.total_points = total;
        }
        Ok(true)
    }

    async fn log_minutes(&self, id: Uuid, minutes: u32) -> anyhow::Result<bool> {
        let minutes = i32::try_from(minutes).context("minutes out of range")?;
        let mut assignments = self.assignments.lock().map_err(poisoned)?;
        let Some(assignment) = assignments.iter_mut().find(|a| a.id == id) else {
            return Ok(false);
        };
        assignment.actual_minutes = assignment.actual_minutes.saturating_add(minutes);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssignmentStatus;
    use crate::planner;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded_course(store: &MemoryStore) -> Course {
        store
            .create_course(NewCourse {
                name: "Intro to Algorithms".to_string(),
                code: Some("CS 161".to_string()),
                semester: "Fall".to_string(),
                year: 2025,
                target_grade: 90.0,
            })
            .await
            .unwrap()
    }

    fn candidate(title: &str, due_date: Option<NaiveDate>, weight: Option<f64>) -> AssignmentCandidate {
        AssignmentCandidate {
            title: title.to_string(),
            due_date,
            weight,
            category: Category::Exam,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn confirm_skips_candidates_without_due_dates() {
        let store = MemoryStore::new();
        let course = seeded_course(&store).await;
        let candidates = vec![
            candidate("Midterm", Some(date(2025, 10, 15)), Some(30.0)),
            candidate("Final exam", None, Some(40.0)),
            candidate("   ", Some(date(2025, 12, 10)), None),
            candidate("Quiz 1", Some(date(2025, 9, 20)), None),
        ];
        let breakdown = vec![GradeBreakdownEntry {
            category: "Exams".to_string(),
            weight: 70.0,
        }];

        let outcome = confirm_candidates(&store, course.id, &candidates, &breakdown)
            .await
            .unwrap();
        assert_eq!(outcome, ConfirmOutcome { created: 2, skipped: 2 });

        let stored = store
            .assignments(&AssignmentFilter::for_course(course.id))
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].name, "Quiz 1");
        assert_eq!(stored[0].weight, 0.0);
        assert_eq!(stored[1].total_points, DEFAULT_TOTAL_POINTS);

        let course = store.course(course.id).await.unwrap().unwrap();
        assert_eq!(course.grade_breakdown, breakdown);
    }

    #[tokio::test]
    async fn confirm_requires_existing_course() {
        let store = MemoryStore::new();
        let result = confirm_candidates(&store, Uuid::new_v4(), &[], &[]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn filter_orders_and_limits() {
        let store = MemoryStore::new();
        let course = seeded_course(&store).await;
        for (name, day) in [("Lab 3", 21), ("Lab 1", 7), ("Lab 2", 14)] {
            store
                .insert_assignment(NewAssignment {
                    course_id: course.id,
                    name: name.to_string(),
                    description: String::new(),
                    category: Category::Lab,
                    due_date: date(2025, 9, day),
                    weight: 10.0,
                    total_points: 20.0,
                    earned_points: None,
                })
                .await
                .unwrap();
        }

        let filter = AssignmentFilter {
            course_id: Some(course.id),
            due_from: Some(date(2025, 9, 10)),
            order: SortOrder::Descending,
            limit: Some(1),
            ..AssignmentFilter::default()
        };
        let found = store.assignments(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Lab 3");

        let exams = AssignmentFilter {
            category: Some(Category::Exam),
            ..AssignmentFilter::default()
        };
        assert!(store.assignments(&exams).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_uses_recorded_grades_and_course_target() {
        let store = MemoryStore::new();
        let course = seeded_course(&store).await;
        let mut ids = Vec::new();
        for name in ["Midterm", "Final"] {
            let created = store
                .insert_assignment(NewAssignment {
                    course_id: course.id,
                    name: name.to_string(),
                    description: String::new(),
                    category: Category::Exam,
                    due_date: date(2025, 12, 1),
                    weight: 50.0,
                    total_points: 100.0,
                    earned_points: None,
                })
                .await
                .unwrap();
            ids.push(created.id);
        }

        assert!(store.record_grade(ids[0], 45.0, Some(50.0)).await.unwrap());
        assert!(!store.record_grade(Uuid::new_v4(), 1.0, None).await.unwrap());

        let (_, assignments, snapshot) = course_snapshot(&store, course.id, None).await.unwrap();
        assert_eq!(assignments.len(), 2);
        assert!((snapshot.current_grade.unwrap() - 90.0).abs() < 1e-9);
        let required = snapshot.required_grade_on_remaining.unwrap();
        assert!((required.clamped - 90.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn logged_minutes_move_open_work_in_progress() {
        let store = MemoryStore::new();
        let course = seeded_course(&store).await;
        let created = store
            .insert_assignment(NewAssignment {
                course_id: course.id,
                name: "Problem set 4".to_string(),
                description: String::new(),
                category: Category::Assignment,
                due_date: date(2025, 10, 20),
                weight: 5.0,
                total_points: 100.0,
                earned_points: None,
            })
            .await
            .unwrap();
        let now = date(2025, 10, 12).and_hms_opt(18, 0, 0).unwrap();
        assert_eq!(
            planner::assignment_status(&created, now),
            AssignmentStatus::NotStarted
        );

        assert!(store.log_minutes(created.id, 45).await.unwrap());
        assert!(store.log_minutes(created.id, 30).await.unwrap());
        assert!(!store.log_minutes(Uuid::new_v4(), 10).await.unwrap());

        let stored = store
            .assignments(&AssignmentFilter::for_course(course.id))
            .await
            .unwrap();
        assert_eq!(stored[0].actual_minutes, 75);
        assert_eq!(
            planner::assignment_status(&stored[0], now),
            AssignmentStatus::InProgress
        );
    }
}
