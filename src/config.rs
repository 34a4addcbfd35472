use anyhow::Context;

use crate::error::InputError;
use crate::grades;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_TARGET_GRADE: f64 = 90.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub target_grade: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            target_grade: DEFAULT_TARGET_GRADE,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            ..Self::default()
        };

        if let Some(raw) = lookup("TASKFLOW_MAX_CONNECTIONS") {
            config.max_connections = raw
                .trim()
                .parse()
                .with_context(|| format!("TASKFLOW_MAX_CONNECTIONS is not a number: {raw}"))?;
        }
        if let Some(target) = configured_target(&lookup)? {
            config.target_grade = target;
        }

        Ok(config)
    }

    /// Target for commands that never touch the database: the flag, else
    /// `TASKFLOW_TARGET_GRADE`, else the default. No other variable is read.
    pub fn target_from_env(flag: Option<f64>) -> anyhow::Result<f64> {
        Self::target_from_lookup(flag, |key| std::env::var(key).ok())
    }

    pub fn target_from_lookup<F>(flag: Option<f64>, lookup: F) -> anyhow::Result<f64>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(target) = flag {
            return Ok(grades::validate_target(target)?);
        }
        Ok(configured_target(&lookup)?.unwrap_or(DEFAULT_TARGET_GRADE))
    }

    pub fn database_url(&self) -> Result<&str, anyhow::Error> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance")
    }

    pub fn target_or_default(&self, flag: Option<f64>) -> Result<f64, InputError> {
        grades::validate_target(flag.unwrap_or(self.target_grade))
    }
}

fn configured_target<F>(lookup: &F) -> anyhow::Result<Option<f64>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup("TASKFLOW_TARGET_GRADE") else {
        return Ok(None);
    };
    let target: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("TASKFLOW_TARGET_GRADE is not a number: {raw}"))?;
    Ok(Some(grades::validate_target(target)?))
}
