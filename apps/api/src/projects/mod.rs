//! Client projects moving through the studio pipeline.

pub mod handlers;

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::project::ProjectStatus;
use crate::validation::require_text;

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInput {
    pub name: String,
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub client_name: String,
    pub status: Option<String>,
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub description: String,
    pub started_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressUpdate {
    pub progress: Option<i32>,
    pub status: Option<String>,
}

pub fn parse_status(value: &str) -> Result<ProjectStatus, AppError> {
    ProjectStatus::parse(value)
        .ok_or_else(|| AppError::Validation(format!("Unknown project status '{value}'")))
}

pub fn check_progress(progress: i32) -> Result<i32, AppError> {
    if !(0..=100).contains(&progress) {
        return Err(AppError::Validation(
            "progress must be between 0 and 100".to_string(),
        ));
    }
    Ok(progress)
}

/// Completing a project always reports full progress.
pub fn settle(status: ProjectStatus, progress: i32) -> Result<(ProjectStatus, i32), AppError> {
    let progress = check_progress(progress)?;
    if status == ProjectStatus::Completed {
        return Ok((status, 100));
    }
    Ok((status, progress))
}

/// Applies a partial progress/status change on top of the stored values.
pub fn apply_progress_update(
    current_status: &str,
    current_progress: i32,
    update: &ProgressUpdate,
) -> Result<(ProjectStatus, i32), AppError> {
    if update.progress.is_none() && update.status.is_none() {
        return Err(AppError::Validation(
            "progress or status must be provided".to_string(),
        ));
    }
    let status = match &update.status {
        Some(label) => parse_status(label)?,
        None => ProjectStatus::parse(current_status).unwrap_or(ProjectStatus::Lead),
    };
    settle(status, update.progress.unwrap_or(current_progress))
}

pub struct ValidatedProject {
    pub name: String,
    pub client_id: Option<Uuid>,
    pub client_name: String,
    pub status: ProjectStatus,
    pub progress: i32,
    pub description: String,
    pub started_on: Option<NaiveDate>,
}

impl ProjectInput {
    pub fn validated(self) -> Result<ValidatedProject, AppError> {
        let status = match self.status.as_deref() {
            Some(label) => parse_status(label)?,
            None => ProjectStatus::Lead,
        };
        let (status, progress) = settle(status, self.progress)?;
        Ok(ValidatedProject {
            name: require_text("name", &self.name)?,
            client_id: self.client_id,
            client_name: self.client_name.trim().to_string(),
            status,
            progress,
            description: self.description.trim().to_string(),
            started_on: self.started_on,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_case_insensitive() {
        assert_eq!(parse_status("design").unwrap(), ProjectStatus::Design);
        assert_eq!(parse_status("CONSTRUCTION").unwrap(), ProjectStatus::Construction);
        assert!(parse_status("ARCHIVED").is_err());
    }

    #[test]
    fn test_progress_bounds() {
        assert!(check_progress(0).is_ok());
        assert!(check_progress(100).is_ok());
        assert!(check_progress(-1).is_err());
        assert!(check_progress(101).is_err());
    }

    #[test]
    fn test_completed_forces_full_progress() {
        let update = ProgressUpdate {
            progress: None,
            status: Some("COMPLETED".to_string()),
        };
        let (status, progress) = apply_progress_update("CONSTRUCTION", 70, &update).unwrap();
        assert_eq!(status, ProjectStatus::Completed);
        assert_eq!(progress, 100);
    }

    #[test]
    fn test_progress_only_keeps_status() {
        let update = ProgressUpdate {
            progress: Some(45),
            status: None,
        };
        let (status, progress) = apply_progress_update("DESIGN", 10, &update).unwrap();
        assert_eq!(status, ProjectStatus::Design);
        assert_eq!(progress, 45);
    }

    #[test]
    fn test_empty_update_rejected() {
        let update = ProgressUpdate {
            progress: None,
            status: None,
        };
        assert!(apply_progress_update("DESIGN", 10, &update).is_err());
    }

    #[test]
    fn test_new_project_defaults_to_lead() {
        let input = ProjectInput {
            name: "Hillside House".to_string(),
            client_id: None,
            client_name: " Dana ".to_string(),
            status: None,
            progress: 0,
            description: String::new(),
            started_on: None,
        };
        let project = input.validated().unwrap();
        assert_eq!(project.status, ProjectStatus::Lead);
        assert_eq!(project.client_name, "Dana");
    }
}
