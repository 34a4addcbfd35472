use chrono::NaiveDate;
use taskflow_core::grades::{letter_grade, project};
use taskflow_core::models::{Category, GradeItem, LetterGrade, NewCourse};
use taskflow_core::store::{confirm_candidates, AssignmentFilter, AssignmentStore, MemoryStore};
use taskflow_core::syllabus::{extract_assignments, extract_syllabus, parse_reviewed};

const SYLLABUS: &str = "\
CHEM 201: Organic Chemistry I
Instructor: Dr. Rivera
Office hours: Tuesdays 2-4pm

Grading Breakdown
Homework: 15%
Quizzes: 10%
Lab Reports: 25%
Midterm Exam: 20%
Final Exam: 30%

Schedule
Week 2: Homework 1 due 09/12/2025 (20 points)
Week 4: Quiz 1 on September 26, 2025
Week 6: Lab report 2 due 10 October 2025
Midterm exam 10/20/2025 worth 20%
Final exam: December 15, 2025 (30%)
";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn realistic_syllabus_yields_dated_candidates() {
    let extraction = extract_syllabus(SYLLABUS);

    let homework = extraction
        .assignments
        .iter()
        .find(|c| c.title.starts_with("Week 2: Homework 1"))
        .unwrap();
    assert_eq!(homework.due_date, Some(date(2025, 9, 12)));
    assert_eq!(homework.weight, Some(20.0));
    assert_eq!(homework.category, Category::Assignment);

    let midterm = extraction
        .assignments
        .iter()
        .find(|c| c.title.starts_with("Midterm exam"))
        .unwrap();
    assert_eq!(midterm.due_date, Some(date(2025, 10, 20)));
    assert_eq!(midterm.weight, Some(20.0));
    assert_eq!(midterm.category, Category::Exam);

    let final_exam = extraction
        .assignments
        .iter()
        .find(|c| c.title.starts_with("Final exam:"))
        .unwrap();
    // The numeric date on the line above comes first.
    assert_eq!(final_exam.due_date, Some(date(2025, 10, 20)));
    assert_eq!(final_exam.weight, Some(30.0));

    let labels: Vec<&str> = extraction
        .grade_breakdown
        .iter()
        .map(|entry| entry.category.as_str())
        .collect();
    assert_eq!(
        labels,
        vec!["Homework", "Quizzes", "Lab Reports", "Midterm Exam", "Final Exam"]
    );
    let total: f64 = extraction.grade_breakdown.iter().map(|e| e.weight).sum();
    assert_eq!(total, 100.0);
}

#[test]
fn embedded_numeric_dates_are_found_on_keyword_lines() {
    for (month, day, year) in [(1, 5, 2024), (12, 31, 2025), (2, 29, 2028), (7, 4, 2026)] {
        let text = format!("Lorem ipsum quiz #3 xx{month:02}/{day}/{year}yy trailing words");
        let candidates = extract_assignments(&text);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].due_date, Some(date(year, month, day)));
    }
}

#[test]
fn extraction_is_repeatable() {
    assert_eq!(extract_syllabus(SYLLABUS), extract_syllabus(SYLLABUS));
}

#[tokio::test]
async fn reviewed_extraction_json_confirms_into_a_course() {
    let extraction = extract_syllabus(SYLLABUS);
    let mut reviewed = serde_json::to_value(&extraction).unwrap();
    reviewed.as_object_mut().unwrap().remove("preview");

    // The reviewer drops the undated breakdown lines but keeps the final,
    // giving it a clearer title and its real date.
    let candidates = reviewed["assignments"].as_array_mut().unwrap();
    candidates.retain(|c| !c["dueDate"].is_null() || c["title"] == "Final Exam: 30%");
    for candidate in candidates.iter_mut() {
        if candidate["title"] == "Final Exam: 30%" {
            candidate["title"] = "Final exam (cumulative)".into();
            candidate["dueDate"] = "2025-12-15".into();
        }
    }
    let kept = candidates.len();
    assert!(kept >= 4);
    let edited = serde_json::to_string_pretty(&reviewed).unwrap();

    let parsed = parse_reviewed(&edited).unwrap();
    assert!(parsed.preview.is_empty());
    assert_eq!(parsed.grade_breakdown, extraction.grade_breakdown);

    let store = MemoryStore::new();
    let course = store
        .create_course(NewCourse {
            name: "Organic Chemistry I".to_string(),
            code: Some("CHEM 201".to_string()),
            semester: "Fall".to_string(),
            year: 2025,
            target_grade: 90.0,
        })
        .await
        .unwrap();
    let outcome = confirm_candidates(&store, course.id, &parsed.assignments, &parsed.grade_breakdown)
        .await
        .unwrap();
    assert_eq!(outcome.created, kept);
    assert_eq!(outcome.skipped, 0);

    let stored = store
        .assignments(&AssignmentFilter::for_course(course.id))
        .await
        .unwrap();
    assert_eq!(stored.len(), kept);
    let final_exam = stored
        .iter()
        .find(|a| a.name == "Final exam (cumulative)")
        .unwrap();
    assert_eq!(final_exam.due_date, date(2025, 12, 15));
    assert_eq!(final_exam.weight, 30.0);
    assert_eq!(final_exam.category, Category::Exam);
    assert!(stored.iter().all(|a| a.name != "Homework: 15%"));

    let course = store.course(course.id).await.unwrap().unwrap();
    assert_eq!(course.grade_breakdown.len(), 5);
}

#[test]
fn projection_matches_documented_examples() {
    let items = vec![
        GradeItem {
            id: "1".to_string(),
            name: "Midterm".to_string(),
            weight: 50.0,
            score: Some(90.0),
            max_score: 100.0,
        },
        GradeItem {
            id: "2".to_string(),
            name: "Final".to_string(),
            weight: 50.0,
            score: None,
            max_score: 100.0,
        },
    ];
    let snapshot = project(&items, 90.0).unwrap();
    assert!((snapshot.current_grade.unwrap() - 90.0).abs() < 1e-9);
    assert!((snapshot.remaining_weight - 50.0).abs() < 1e-9);
    assert!((snapshot.required_grade_on_remaining.unwrap().clamped - 90.0).abs() < 1e-9);
    assert_eq!(letter_grade(snapshot.projected_grade.unwrap().round()), LetterGrade::AMinus);
}
