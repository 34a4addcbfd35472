use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::InputError;
use crate::models::{Assignment, Category, Course, GradeBreakdownEntry, NewAssignment, NewCourse};
use crate::store::{AssignmentFilter, AssignmentStore, SortOrder, DEFAULT_TOTAL_POINTS};

const ASSIGNMENT_COLUMNS: &str = "id, course_id, name, description, category, due_date, weight, \
     total_points, earned_points, completed, actual_minutes";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let database_url = config.database_url()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        Ok(Self { pool })
    }

    pub async fn init_db(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn assignment_from_row(row: &PgRow) -> anyhow::Result<Assignment> {
    let category: String = row.try_get("category")?;
    Ok(Assignment {
        id: row.try_get("id")?,
        course_id: row.try_get("course_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: category.parse().map_err(|e: String| anyhow!(e))?,
        due_date: row.try_get("due_date")?,
        weight: row.try_get("weight")?,
        total_points: row.try_get("total_points")?,
        earned_points: row.try_get("earned_points")?,
        completed: row.try_get("completed")?,
        actual_minutes: row.try_get("actual_minutes")?,
    })
}

impl AssignmentStore for PgStore {
    async fn create_course(&self, course: NewCourse) -> anyhow::Result<Course> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO taskflow.courses (id, name, code, semester, year, target_grade)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&course.name)
        .bind(&course.code)
        .bind(&course.semester)
        .bind(course.year)
        .bind(course.target_grade)
        .execute(&self.pool)
        .await
        .context("failed to insert course")?;

        info!(%id, name = %course.name, "created course");
        Ok(Course {
            id,
            name: course.name,
            code: course.code,
            semester: course.semester,
            year: course.year,
            target_grade: course.target_grade,
            grade_breakdown: Vec::new(),
        })
    }

    async fn course(&self, id: Uuid) -> anyhow::Result<Option<Course>> {
        let Some(row) = sqlx::query(
            "SELECT id, name, code, semester, year, target_grade FROM taskflow.courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let breakdown = sqlx::query(
            "SELECT category, weight FROM taskflow.grade_breakdown \
             WHERE course_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(GradeBreakdownEntry {
                category: row.try_get("category")?,
                weight: row.try_get("weight")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(Some(Course {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            code: row.try_get("code")?,
            semester: row.try_get("semester")?,
            year: row.try_get("year")?,
            target_grade: row.try_get("target_grade")?,
            grade_breakdown: breakdown,
        }))
    }

    async fn replace_breakdown(
        &self,
        course_id: Uuid,
        breakdown: &[GradeBreakdownEntry],
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM taskflow.grade_breakdown WHERE course_id = $1")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

        for (position, entry) in breakdown.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO taskflow.grade_breakdown (course_id, position, category, weight)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(course_id)
            .bind(position as i32)
            .bind(&entry.category)
            .bind(entry.weight)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await.context("failed to store grade breakdown")?;
        Ok(())
    }

    async fn insert_assignment(&self, assignment: NewAssignment) -> anyhow::Result<Assignment> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO taskflow.assignments
            (id, course_id, name, description, category, due_date, weight,
             total_points, earned_points, completed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(assignment.course_id)
        .bind(&assignment.name)
        .bind(&assignment.description)
        .bind(assignment.category.as_str())
        .bind(assignment.due_date)
        .bind(assignment.weight)
        .bind(assignment.total_points)
        .bind(assignment.earned_points)
        .bind(assignment.earned_points.is_some())
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to insert assignment '{}'", assignment.name))?;

        assignment_from_row(&row)
    }

    async fn assignments(&self, filter: &AssignmentFilter) -> anyhow::Result<Vec<Assignment>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM taskflow.assignments WHERE TRUE"
        ));

        if let Some(course_id) = filter.course_id {
            query.push(" AND course_id = ").push_bind(course_id);
        }
        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(completed) = filter.completed {
            query.push(" AND completed = ").push_bind(completed);
        }
        if let Some(from) = filter.due_from {
            query.push(" AND due_date >= ").push_bind(from);
        }
        if let Some(until) = filter.due_until {
            query.push(" AND due_date <= ").push_bind(until);
        }

        query.push(match filter.order {
            SortOrder::Ascending => " ORDER BY due_date ASC, name ASC",
            SortOrder::Descending => " ORDER BY due_date DESC, name DESC",
        });
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(assignment_from_row).collect()
    }

    async fn record_grade(
        &self,
        id: Uuid,
        earned_points: f64,
        total_points: Option<f64>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE taskflow.assignments
            SET earned_points = $2,
                total_points = COALESCE($3, total_points),
                completed = TRUE
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(earned_points)
        .bind(total_points)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn log_minutes(&self, id: Uuid, minutes: u32) -> anyhow::Result<bool> {
        let minutes = i32::try_from(minutes).context("minutes out of range")?;
        let result = sqlx::query(
            r#"
            UPDATE taskflow.assignments
            SET actual_minutes = actual_minutes + $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(minutes)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    name: String,
    category: String,
    due_date: NaiveDate,
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default)]
    total_points: Option<f64>,
    #[serde(default)]
    earned_points: Option<f64>,
}

/// Reads `name,category,due_date,weight,total_points,earned_points` rows.
/// Unknown categories are stored as `Other`.
pub fn read_assignment_rows<R: Read>(
    course_id: Uuid,
    reader: R,
) -> Result<Vec<NewAssignment>, InputError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        rows.push(NewAssignment {
            course_id,
            name: row.name.trim().to_string(),
            description: String::new(),
            category: row.category.parse().unwrap_or(Category::Other),
            due_date: row.due_date,
            weight: row.weight.unwrap_or(0.0),
            total_points: row.total_points.unwrap_or(DEFAULT_TOTAL_POINTS),
            earned_points: row.earned_points,
        });
    }

    Ok(rows)
}

pub async fn import_csv<S: AssignmentStore>(
    store: &S,
    course_id: Uuid,
    csv_path: &Path,
) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let rows = read_assignment_rows(course_id, file)?;

    let mut inserted = 0usize;
    for row in rows {
        store.insert_assignment(row).await?;
        inserted += 1;
    }

    info!(%course_id, inserted, "imported assignments from CSV");
    Ok(inserted)
}
