use tracing::warn;

use crate::error::InputError;
use crate::models::{GradeBand, GradeItem, GradeSnapshot, LetterGrade, RequiredGrade, Scenario};

const FULL_WEIGHT: f64 = 100.0;

const LETTER_BREAKPOINTS: [(f64, LetterGrade); 11] = [
    (93.0, LetterGrade::A),
    (90.0, LetterGrade::AMinus),
    (87.0, LetterGrade::BPlus),
    (83.0, LetterGrade::B),
    (80.0, LetterGrade::BMinus),
    (77.0, LetterGrade::CPlus),
    (73.0, LetterGrade::C),
    (70.0, LetterGrade::CMinus),
    (67.0, LetterGrade::DPlus),
    (63.0, LetterGrade::D),
    (60.0, LetterGrade::DMinus),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioPreset {
    pub name: String,
    pub description: String,
    pub multiplier: f64,
}

impl ScenarioPreset {
    pub fn new(name: &str, description: &str, multiplier: f64) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            multiplier,
        }
    }
}

pub fn default_scenarios() -> Vec<ScenarioPreset> {
    vec![
        ScenarioPreset::new("Perfect Scores", "100% on all remaining work", 1.0),
        ScenarioPreset::new("Good Performance", "85% on remaining work", 0.85),
        ScenarioPreset::new("Average Performance", "75% on remaining work", 0.75),
        ScenarioPreset::new("Minimum Passing", "60% on remaining work", 0.60),
    ]
}

#[derive(Debug, Clone)]
pub struct GradeProjector {
    scenarios: Vec<ScenarioPreset>,
}

impl Default for GradeProjector {
    fn default() -> Self {
        Self::with_scenarios(default_scenarios())
    }
}

impl GradeProjector {
    pub fn with_scenarios(scenarios: Vec<ScenarioPreset>) -> Self {
        Self { scenarios }
    }

    /// Current grade is normalised by graded weight only. Remaining weight
    /// assumes the course weights sum to 100; a different total is logged and
    /// otherwise passed through. The target must be a finite percentage.
    pub fn project(
        &self,
        items: &[GradeItem],
        target_grade: f64,
    ) -> Result<GradeSnapshot, InputError> {
        let target_grade = validate_target(target_grade)?;
        let mut earned_points = 0.0;
        let mut completed_weight = 0.0;
        let mut total_weight = 0.0;
        let mut has_ungraded = false;

        for item in items {
            total_weight += item.weight;
            match item_percentage(item) {
                Some(percentage) => {
                    earned_points += percentage * (item.weight / FULL_WEIGHT);
                    completed_weight += item.weight;
                }
                None => has_ungraded = true,
            }
        }

        if !items.is_empty() && (total_weight - FULL_WEIGHT).abs() >= 0.01 {
            warn!(total_weight, "grade weights do not sum to 100");
        }

        let current_grade =
            (completed_weight > 0.0).then(|| earned_points / completed_weight * FULL_WEIGHT);
        let remaining_weight = FULL_WEIGHT - completed_weight;
        let projected_grade =
            current_grade.map(|current| earned_points + (current / FULL_WEIGHT) * remaining_weight);

        let open_work = has_ungraded && remaining_weight > 0.0;
        let required_grade_on_remaining = open_work.then(|| {
            let raw = (target_grade - earned_points) / remaining_weight * FULL_WEIGHT;
            RequiredGrade {
                raw,
                clamped: raw.clamp(0.0, FULL_WEIGHT),
            }
        });

        let scenarios = if open_work {
            self.scenarios
                .iter()
                .map(|preset| Scenario {
                    name: preset.name.clone(),
                    description: preset.description.clone(),
                    multiplier: preset.multiplier,
                    projected_grade: earned_points
                        + preset.multiplier * FULL_WEIGHT * (remaining_weight / FULL_WEIGHT),
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(GradeSnapshot {
            current_grade,
            projected_grade,
            required_grade_on_remaining,
            earned_points,
            completed_weight,
            remaining_weight,
            total_weight,
            scenarios,
        })
    }
}

/// Projects with the default scenario set.
pub fn project(items: &[GradeItem], target_grade: f64) -> Result<GradeSnapshot, InputError> {
    GradeProjector::default().project(items, target_grade)
}

/// Score as a percentage, or `None` when the item is ungraded or its maximum
/// is not positive.
pub fn item_percentage(item: &GradeItem) -> Option<f64> {
    let score = item.score?;
    (item.max_score > 0.0).then(|| score / item.max_score * FULL_WEIGHT)
}

pub fn letter_grade(percentage: f64) -> LetterGrade {
    LETTER_BREAKPOINTS
        .iter()
        .find(|(floor, _)| percentage >= *floor)
        .map(|(_, letter)| *letter)
        .unwrap_or(LetterGrade::F)
}

pub fn grade_band(percentage: f64) -> GradeBand {
    if percentage >= 90.0 {
        GradeBand::Excellent
    } else if percentage >= 80.0 {
        GradeBand::Good
    } else if percentage >= 70.0 {
        GradeBand::Fair
    } else {
        GradeBand::AtRisk
    }
}

pub fn validate_target(target_grade: f64) -> Result<f64, InputError> {
    if target_grade.is_finite() && (0.0..=FULL_WEIGHT).contains(&target_grade) {
        Ok(target_grade)
    } else {
        Err(InputError::InvalidTarget(target_grade))
    }
}

/// Parses a JSON array of grade items.
pub fn parse_grade_items(json: &str) -> Result<Vec<GradeItem>, InputError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let kind = match &value {
        serde_json::Value::Array(_) => return Ok(serde_json::from_value(value)?),
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Object(_) => "an object",
    };
    Err(InputError::NotAnArray(kind))
}
