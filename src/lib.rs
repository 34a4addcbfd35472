//! Syllabus extraction and grade projection for the taskflow course planner.

pub mod config;
pub mod db;
pub mod error;
pub mod grades;
pub mod models;
pub mod planner;
pub mod report;
pub mod store;
pub mod syllabus;

pub use error::InputError;
pub use grades::{project, GradeProjector};
pub use syllabus::{extract_assignments, extract_syllabus};
