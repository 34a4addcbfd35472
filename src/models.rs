use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Assignment,
    Quiz,
    Exam,
    Project,
    Lab,
    Paper,
    Discussion,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Assignment,
        Category::Quiz,
        Category::Exam,
        Category::Project,
        Category::Lab,
        Category::Paper,
        Category::Discussion,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Assignment => "Assignment",
            Category::Quiz => "Quiz",
            Category::Exam => "Exam",
            Category::Project => "Project",
            Category::Lab => "Lab",
            Category::Paper => "Paper",
            Category::Discussion => "Discussion",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts the stored names case-insensitively, plus the legacy
    /// `Homework` and `Participation` labels.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.trim().to_lowercase();
        match lower.as_str() {
            "homework" => return Ok(Category::Assignment),
            "participation" => return Ok(Category::Discussion),
            _ => {}
        }
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(&lower))
            .ok_or_else(|| format!("unknown category '{value}'"))
    }
}

/// A date found in syllabus text, with the text around it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateCandidate {
    pub original_text: String,
    pub parsed_date: NaiveDate,
    pub context_window: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentCandidate {
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub category: Category,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBreakdownEntry {
    pub category: String,
    pub weight: f64,
}

/// Output of `extract --json`. It deserializes again so a reviewed copy can
/// be confirmed; `preview` may be dropped during review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyllabusExtraction {
    pub assignments: Vec<AssignmentCandidate>,
    #[serde(default)]
    pub grade_breakdown: Vec<GradeBreakdownEntry>,
    #[serde(default)]
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeItem {
    pub id: String,
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
}

fn default_max_score() -> f64 {
    100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub multiplier: f64,
    pub projected_grade: f64,
}

/// Grade needed on the remaining weight. `raw` is the unclamped value so
/// callers can flag unreachable targets; `clamped` is limited to 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredGrade {
    pub raw: f64,
    pub clamped: f64,
}

impl RequiredGrade {
    pub fn is_achievable(&self) -> bool {
        self.raw <= 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSnapshot {
    pub current_grade: Option<f64>,
    pub projected_grade: Option<f64>,
    pub required_grade_on_remaining: Option<RequiredGrade>,
    pub earned_points: f64,
    pub completed_weight: f64,
    pub remaining_weight: f64,
    pub total_weight: f64,
    pub scenarios: Vec<Scenario>,
}

impl GradeSnapshot {
    pub fn weights_balanced(&self) -> bool {
        (self.total_weight - 100.0).abs() < 0.01
    }
}

/// Declared worst to best so the derived ordering follows grade rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LetterGrade {
    F,
    DMinus,
    D,
    DPlus,
    CMinus,
    C,
    CPlus,
    BMinus,
    B,
    BPlus,
    AMinus,
    A,
}

impl LetterGrade {
    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::AMinus => "A-",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::BMinus => "B-",
            LetterGrade::CPlus => "C+",
            LetterGrade::C => "C",
            LetterGrade::CMinus => "C-",
            LetterGrade::DPlus => "D+",
            LetterGrade::D => "D",
            LetterGrade::DMinus => "D-",
            LetterGrade::F => "F",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Badge colour bucket for a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GradeBand {
    Excellent,
    Good,
    Fair,
    AtRisk,
}

impl fmt::Display for GradeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GradeBand::Excellent => "excellent",
            GradeBand::Good => "good",
            GradeBand::Fair => "fair",
            GradeBand::AtRisk => "at-risk",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentStatus {
    NotStarted,
    InProgress,
    Completed,
    Overdue,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::NotStarted => "not-started",
            AssignmentStatus::InProgress => "in-progress",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "not-started" => Ok(AssignmentStatus::NotStarted),
            "in-progress" => Ok(AssignmentStatus::InProgress),
            "completed" => Ok(AssignmentStatus::Completed),
            "overdue" => Ok(AssignmentStatus::Overdue),
            _ => Err(format!("unknown status '{value}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub semester: String,
    pub year: i32,
    pub target_grade: f64,
    pub grade_breakdown: Vec<GradeBreakdownEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub due_date: NaiveDate,
    pub weight: f64,
    pub total_points: f64,
    pub earned_points: Option<f64>,
    pub completed: bool,
    pub actual_minutes: i32,
}

impl Assignment {
    pub fn grade_item(&self) -> GradeItem {
        GradeItem {
            id: self.id.to_string(),
            name: self.name.clone(),
            weight: self.weight,
            score: self.earned_points,
            max_score: self.total_points,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub name: String,
    pub code: Option<String>,
    pub semester: String,
    pub year: i32,
    pub target_grade: f64,
}

/// Fields for an assignment that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssignment {
    pub course_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub due_date: NaiveDate,
    pub weight: f64,
    pub total_points: f64,
    pub earned_points: Option<f64>,
}
