//! Heuristic extraction of assignments and grade weights from syllabus text.
//!
//! Every pass is line oriented and regex driven. Nothing here fails on odd
//! input: an unparseable date or weight just leaves the field empty, and the
//! worst case is an empty or noisy candidate list that a person reviews.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use crate::error::InputError;
use crate::models::{
    AssignmentCandidate, Category, DateCandidate, GradeBreakdownEntry, SyllabusExtraction,
};

const ASSIGNMENT_KEYWORDS: [&str; 13] = [
    "assignment",
    "homework",
    "hw",
    "quiz",
    "exam",
    "midterm",
    "final",
    "project",
    "paper",
    "presentation",
    "lab",
    "test",
    "due",
];

/// First matching rule wins, so a line mentioning both a quiz and an exam is
/// a quiz.
const CATEGORY_RULES: [(&[&str], Category); 8] = [
    (&["homework", "hw"], Category::Assignment),
    (&["quiz"], Category::Quiz),
    (&["exam", "midterm", "final"], Category::Exam),
    (&["project"], Category::Project),
    (&["lab"], Category::Lab),
    (&["paper"], Category::Paper),
    (&["discussion", "participation"], Category::Discussion),
    (&["assignment"], Category::Assignment),
];

const GRADING_HEADINGS: [&str; 3] = ["grading", "grade breakdown", "assessment"];
const GRADING_SECTION_LINES: usize = 20;
const BREAKDOWN_EXCLUDED_WORDS: [&str; 2] = ["student", "attendance"];

const WINDOW_RADIUS_LINES: usize = 2;
const DATE_CONTEXT_CHARS: usize = 50;
const TITLE_MAX_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 200;
const PREVIEW_MAX_CHARS: usize = 1000;
const MAX_WEIGHT: f64 = 100.0;

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})").expect("numeric date pattern")
});
static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s+(\d{1,2}),?\s+(\d{4})").expect("month-day-year pattern")
});
static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\s+(\w+)\s+(\d{4})").expect("day-month-year pattern")
});
static PERCENT_WEIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("percent pattern"));
static POINTS_WEIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:points|pts)").expect("points pattern"));
static SECTION_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(.+?)\s*[:=\-]\s*(\d+(?:\.\d+)?)\s*%").expect("section entry pattern")
});
static LOOSE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(.{5,50}?)\s*[:=\-]?\s*(\d+(?:\.\d+)?)\s*%").expect("loose entry pattern")
});
static FOUR_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}").expect("four digit pattern"));

#[derive(Clone, Copy)]
enum DateShape {
    MonthDayYear,
    NamedMonthFirst,
    NamedMonthSecond,
}

/// Runs all candidate passes over one document.
pub fn extract_syllabus(text: &str) -> SyllabusExtraction {
    SyllabusExtraction {
        assignments: extract_assignments(text),
        grade_breakdown: extract_grade_breakdown(text),
        preview: truncate_chars(text, PREVIEW_MAX_CHARS),
    }
}

/// Decodes uploaded bytes as syllabus text.
pub fn text_from_bytes(bytes: Vec<u8>) -> Result<String, InputError> {
    Ok(String::from_utf8(bytes)?)
}

/// Reads an extraction back after a person has reviewed it. Titles, dates,
/// weights and categories may have been edited; `preview` and
/// `gradeBreakdown` may be missing.
pub fn parse_reviewed(raw: &str) -> Result<SyllabusExtraction, InputError> {
    Ok(serde_json::from_str(raw)?)
}

/// Extracts the text layer of a PDF.
#[cfg(feature = "pdf")]
pub fn text_from_pdf(bytes: &[u8]) -> anyhow::Result<String> {
    use anyhow::Context;

    pdf_extract::extract_text_from_mem(bytes).context("failed to extract text from PDF")
}

/// All dates in `text`, grouped by pattern family and then by position.
pub fn extract_dates(text: &str) -> Vec<DateCandidate> {
    let families = [
        (&*NUMERIC_DATE, DateShape::MonthDayYear),
        (&*MONTH_DAY_YEAR, DateShape::NamedMonthFirst),
        (&*DAY_MONTH_YEAR, DateShape::NamedMonthSecond),
    ];

    let mut dates = Vec::new();
    for (pattern, shape) in families {
        for caps in pattern.captures_iter(text) {
            let (Some(full), Some(a), Some(b), Some(c)) =
                (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            let Some(parsed_date) = parse_date_parts(shape, a.as_str(), b.as_str(), c.as_str())
            else {
                continue;
            };
            dates.push(DateCandidate {
                original_text: full.as_str().to_string(),
                parsed_date,
                context_window: context_around(text, full.start(), full.end()),
            });
        }
    }
    dates
}

pub fn extract_assignments(text: &str) -> Vec<AssignmentCandidate> {
    let lines: Vec<&str> = text.lines().collect();
    let mut candidates = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let lower = line.to_lowercase();
        if !ASSIGNMENT_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
            continue;
        }

        let title = line.trim();
        if title.chars().count() <= 3 {
            continue;
        }

        let window_start = index.saturating_sub(WINDOW_RADIUS_LINES);
        let window_end = (index + WINDOW_RADIUS_LINES + 1).min(lines.len());
        let window = lines[window_start..window_end].join(" ");

        candidates.push(AssignmentCandidate {
            title: truncate_chars(title, TITLE_MAX_CHARS),
            due_date: extract_dates(&window).first().map(|date| date.parsed_date),
            weight: extract_weight(line),
            category: classify(&lower),
            description: truncate_chars(&window, DESCRIPTION_MAX_CHARS),
        });
    }

    debug!(
        lines = lines.len(),
        candidates = candidates.len(),
        "scanned syllabus for assignments"
    );
    candidates
}

/// A percentage on the line, else a points value. Values outside 0..=100 are
/// dropped.
pub fn extract_weight(line: &str) -> Option<f64> {
    let value = match PERCENT_WEIGHT.captures(line) {
        Some(caps) => caps.get(1)?.as_str().parse::<f64>().ok()?,
        None => {
            let caps = POINTS_WEIGHT.captures(line)?;
            caps.get(1)?.as_str().parse::<u32>().ok()? as f64
        }
    };
    (0.0..=MAX_WEIGHT).contains(&value).then_some(value)
}

/// Expects an already lower-cased line.
pub fn classify(lower_line: &str) -> Category {
    CATEGORY_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| lower_line.contains(keyword)))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Other)
}

/// `label: N%` pairs from the grading section, or from the whole document when
/// there is no such section or it holds no pairs.
pub fn extract_grade_breakdown(text: &str) -> Vec<GradeBreakdownEntry> {
    let lines: Vec<&str> = text.lines().collect();
    let mut breakdown = Vec::new();

    let heading = lines.iter().position(|line| {
        let lower = line.to_lowercase();
        GRADING_HEADINGS.iter().any(|heading| lower.contains(heading))
    });

    if let Some(start) = heading {
        let end = (start + GRADING_SECTION_LINES).min(lines.len());
        for line in &lines[start..end] {
            let Some(caps) = SECTION_ENTRY.captures(line) else {
                continue;
            };
            if let Some(entry) = breakdown_entry(caps.get(1), caps.get(2)) {
                breakdown.push(entry);
            }
        }
    }

    if breakdown.is_empty() {
        for caps in LOOSE_ENTRY.captures_iter(text) {
            let Some(entry) = breakdown_entry(caps.get(1), caps.get(2)) else {
                continue;
            };
            let lower = entry.category.to_lowercase();
            if FOUR_DIGITS.is_match(&entry.category)
                || BREAKDOWN_EXCLUDED_WORDS.iter().any(|word| lower.contains(word))
                || entry.category.chars().count() <= 3
            {
                continue;
            }
            breakdown.push(entry);
        }
    }

    debug!(
        entries = breakdown.len(),
        section_found = heading.is_some(),
        "scanned syllabus for grade breakdown"
    );
    breakdown
}

fn breakdown_entry(
    label: Option<regex::Match<'_>>,
    weight: Option<regex::Match<'_>>,
) -> Option<GradeBreakdownEntry> {
    Some(GradeBreakdownEntry {
        category: label?.as_str().trim().to_string(),
        weight: weight?.as_str().parse().ok()?,
    })
}

fn parse_date_parts(shape: DateShape, a: &str, b: &str, c: &str) -> Option<NaiveDate> {
    let (month, day) = match shape {
        DateShape::MonthDayYear => (a.parse().ok()?, b.parse().ok()?),
        DateShape::NamedMonthFirst => (month_from_name(a)?, b.parse().ok()?),
        DateShape::NamedMonthSecond => (month_from_name(b)?, a.parse().ok()?),
    };
    NaiveDate::from_ymd_opt(expand_year(c)?, month, day)
}

/// Two-digit years pivot at 50; three-digit years are rejected.
fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    match raw.len() {
        2 if year < 50 => Some(2000 + year),
        2 => Some(1900 + year),
        4 => Some(year),
        _ => None,
    }
}

/// Full month names and any prefix of at least three letters (`Sep`, `Sept`).
fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];

    let lower = name.to_lowercase();
    if lower.chars().count() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|month| month.starts_with(&lower))
        .map(|index| index as u32 + 1)
}

fn context_around(text: &str, start: usize, end: usize) -> String {
    let head: usize = text[..start]
        .chars()
        .rev()
        .take(DATE_CONTEXT_CHARS)
        .map(char::len_utf8)
        .sum();
    let tail: usize = text[end..]
        .chars()
        .take(DATE_CONTEXT_CHARS)
        .map(char::len_utf8)
        .sum();
    text[start - head..end + tail].to_string()
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
