use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use taskflow_core::config::Config;
use taskflow_core::db::{self, PgStore};
use taskflow_core::grades::{self, letter_grade};
use taskflow_core::models::{AssignmentStatus, Category, GradeSnapshot, NewCourse};
use taskflow_core::store::{
    confirm_candidates, course_snapshot, AssignmentFilter, AssignmentStore, SortOrder,
};
use taskflow_core::{planner, report, syllabus};

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "Syllabus extraction and grade projection for student courses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    Asc,
    Desc,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract assignment candidates and grade weights from syllabus text
    Extract {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Project grades from a JSON array of grade items
    Project {
        #[arg(long)]
        items: PathBuf,
        #[arg(long)]
        target: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Map a percentage to a letter grade
    Letter { percent: f64 },
    /// Create or upgrade the database schema
    InitDb,
    /// Register a course
    AddCourse {
        #[arg(long)]
        name: String,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        semester: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        target: Option<f64>,
    },
    /// Store the assignments of a reviewed `extract --json` file for a course
    Confirm {
        #[arg(long)]
        course: Uuid,
        #[arg(long)]
        input: PathBuf,
    },
    /// Import assignments for a course from a CSV file
    Import {
        #[arg(long)]
        course: Uuid,
        #[arg(long)]
        csv: PathBuf,
    },
    /// List stored assignments
    List {
        #[arg(long)]
        course: Option<Uuid>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        status: Option<AssignmentStatus>,
        #[arg(long)]
        due_after: Option<NaiveDate>,
        #[arg(long)]
        due_before: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = Order::Asc)]
        order: Order,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Record the score for an assignment
    Grade {
        #[arg(long)]
        assignment: Uuid,
        #[arg(long)]
        earned: f64,
        #[arg(long)]
        total: Option<f64>,
    },
    /// Add minutes spent on an assignment
    LogTime {
        #[arg(long)]
        assignment: Uuid,
        #[arg(long)]
        minutes: u32,
    },
    /// Project the grade for a stored course
    Grades {
        #[arg(long)]
        course: Uuid,
        #[arg(long)]
        target: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report for a course
    Report {
        #[arg(long)]
        course: Uuid,
        #[arg(long)]
        target: Option<f64>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taskflow=info,taskflow_core=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { input, json } => {
            let text = read_syllabus(&input)?;
            let extraction = syllabus::extract_syllabus(&text);

            if json {
                println!("{}", serde_json::to_string_pretty(&extraction)?);
                return Ok(());
            }

            if extraction.assignments.is_empty() {
                println!("No assignment candidates found.");
            } else {
                println!("Assignment candidates:");
                for candidate in extraction.assignments.iter() {
                    println!(
                        "- [{}] {} (due {}, weight {})",
                        candidate.category,
                        candidate.title,
                        candidate
                            .due_date
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "unknown".to_string()),
                        candidate
                            .weight
                            .map(|w| format!("{w}"))
                            .unwrap_or_else(|| "unknown".to_string()),
                    );
                }
            }
            if !extraction.grade_breakdown.is_empty() {
                println!("Grade breakdown:");
                for entry in extraction.grade_breakdown.iter() {
                    println!("- {}: {}%", entry.category, entry.weight);
                }
            }
        }
        Commands::Project {
            items,
            target,
            json,
        } => {
            let raw = std::fs::read_to_string(&items)
                .with_context(|| format!("failed to read {}", items.display()))?;
            let items = grades::parse_grade_items(&raw)?;
            let target = Config::target_from_env(target)?;
            let snapshot = grades::project(&items, target)?;
            print_snapshot(&snapshot, target, json)?;
        }
        Commands::Letter { percent } => {
            println!("{}", letter_grade(percent));
        }
        Commands::InitDb => {
            let store = open_store().await?;
            store.init_db().await?;
            println!("Schema ready.");
        }
        Commands::AddCourse {
            name,
            code,
            semester,
            year,
            target,
        } => {
            let config = Config::from_env()?;
            let target_grade = config.target_or_default(target)?;
            let store = PgStore::connect(&config).await?;
            let course = store
                .create_course(NewCourse {
                    name,
                    code,
                    semester,
                    year,
                    target_grade,
                })
                .await?;
            println!("Created course {} ({}).", course.name, course.id);
        }
        Commands::Confirm { course, input } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let reviewed = syllabus::parse_reviewed(&raw)
                .with_context(|| format!("{} is not an extraction JSON file", input.display()))?;
            let store = open_store().await?;
            let outcome = confirm_candidates(
                &store,
                course,
                &reviewed.assignments,
                &reviewed.grade_breakdown,
            )
            .await?;
            println!(
                "Created {} assignments ({} skipped for a missing title or due date).",
                outcome.created, outcome.skipped
            );
        }
        Commands::Import { course, csv } => {
            let store = open_store().await?;
            let inserted = db::import_csv(&store, course, &csv).await?;
            println!("Inserted {inserted} assignments from {}.", csv.display());
        }
        Commands::List {
            course,
            category,
            status,
            due_after,
            due_before,
            order,
            limit,
        } => {
            let filter = AssignmentFilter {
                course_id: course,
                category,
                completed: None,
                due_from: due_after,
                due_until: due_before,
                order: match order {
                    Order::Asc => SortOrder::Ascending,
                    Order::Desc => SortOrder::Descending,
                },
                // Status is derived, so the limit waits until after that filter.
                limit: if status.is_some() { None } else { limit },
            };
            let store = open_store().await?;
            let now = chrono::Local::now().naive_local();

            let mut assignments = store.assignments(&filter).await?;
            if let Some(status) = status {
                assignments.retain(|a| planner::assignment_status(a, now) == status);
                if let Some(limit) = limit {
                    assignments.truncate(limit);
                }
            }

            if assignments.is_empty() {
                println!("No assignments match.");
                return Ok(());
            }
            for assignment in assignments.iter() {
                println!(
                    "- {} [{}] due {} weight {:.1}% ({}, {} priority) {}",
                    assignment.name,
                    assignment.category,
                    assignment.due_date,
                    assignment.weight,
                    planner::assignment_status(assignment, now),
                    planner::priority_for(assignment.due_date, now),
                    assignment.id
                );
            }
        }
        Commands::Grade {
            assignment,
            earned,
            total,
        } => {
            let store = open_store().await?;
            if store.record_grade(assignment, earned, total).await? {
                println!("Recorded grade for {assignment}.");
            } else {
                anyhow::bail!("assignment {assignment} not found");
            }
        }
        Commands::LogTime {
            assignment,
            minutes,
        } => {
            let store = open_store().await?;
            if store.log_minutes(assignment, minutes).await? {
                println!("Logged {minutes} minutes on {assignment}.");
            } else {
                anyhow::bail!("assignment {assignment} not found");
            }
        }
        Commands::Grades {
            course,
            target,
            json,
        } => {
            let store = open_store().await?;
            let (course, _, snapshot) = course_snapshot(&store, course, target).await?;
            let target = target.unwrap_or(course.target_grade);
            if !json {
                println!("{}", course.name);
            }
            print_snapshot(&snapshot, target, json)?;
        }
        Commands::Report {
            course,
            target,
            out,
        } => {
            let store = open_store().await?;
            let (course, assignments, snapshot) =
                course_snapshot(&store, course, target).await?;
            let target = target.unwrap_or(course.target_grade);
            let now = chrono::Local::now().naive_local();
            let report = report::build_report(&course, &assignments, &snapshot, target, now);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Database commands read the environment here, so offline commands run
/// regardless of database settings.
async fn open_store() -> anyhow::Result<PgStore> {
    let config = Config::from_env()?;
    PgStore::connect(&config).await
}

fn read_syllabus(path: &Path) -> anyhow::Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        #[cfg(feature = "pdf")]
        return syllabus::text_from_pdf(&bytes);
        #[cfg(not(feature = "pdf"))]
        anyhow::bail!("PDF input needs the `pdf` feature; pass extracted text instead");
    }

    Ok(syllabus::text_from_bytes(bytes)?)
}

fn print_snapshot(snapshot: &GradeSnapshot, target: f64, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    println!("Current grade: {}", report::format_percent(snapshot.current_grade));
    println!("Projected grade: {}", report::format_percent(snapshot.projected_grade));
    println!("{}", report::requirement_line(snapshot, target));
    if !snapshot.weights_balanced() {
        println!("Warning: weights sum to {:.1}%, not 100%.", snapshot.total_weight);
    }
    for scenario in snapshot.scenarios.iter() {
        println!(
            "- {}: {}",
            scenario.name,
            report::format_percent(Some(scenario.projected_grade))
        );
    }
    Ok(())
}
