//! Consultations and site visits on the studio calendar.

pub mod handlers;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::schedule::ScheduleStatus;
use crate::validation::{optional_text, require_text};

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleInput {
    pub client_id: Option<Uuid>,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub service_id: Option<Uuid>,
    pub service_type: String,
    #[serde(default)]
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub is_online: bool,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// A schedule row ready to insert, shared with the booking flow.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub client_id: Option<Uuid>,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub service_id: Option<Uuid>,
    pub service_type: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub is_online: bool,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
    pub status: ScheduleStatus,
    pub notes: Option<String>,
}

pub fn parse_status(value: &str) -> Result<ScheduleStatus, AppError> {
    ScheduleStatus::parse(value)
        .ok_or_else(|| AppError::Validation(format!("Unknown schedule status '{value}'")))
}

/// Offline meetings need somewhere to meet; online ones keep only the link.
pub fn check_meeting_mode(
    is_online: bool,
    location: Option<String>,
    meeting_link: Option<String>,
) -> Result<(Option<String>, Option<String>), AppError> {
    if is_online {
        return Ok((None, meeting_link));
    }
    match location {
        Some(location) => Ok((Some(location), None)),
        None => Err(AppError::Validation(
            "location is required for offline meetings".to_string(),
        )),
    }
}

impl ScheduleInput {
    pub fn validated(self) -> Result<NewSchedule, AppError> {
        let status = match self.status.as_deref() {
            Some(label) => parse_status(label)?,
            None => ScheduleStatus::Scheduled,
        };
        let (location, meeting_link) = check_meeting_mode(
            self.is_online,
            optional_text(self.location.as_deref()),
            optional_text(self.meeting_link.as_deref()),
        )?;

        Ok(NewSchedule {
            client_id: self.client_id,
            client_name: require_text("client_name", &self.client_name)?,
            client_email: optional_text(self.client_email.as_deref()),
            client_phone: optional_text(self.client_phone.as_deref()),
            service_id: self.service_id,
            service_type: require_text("service_type", &self.service_type)?,
            description: self.description.trim().to_string(),
            scheduled_at: self.scheduled_at,
            is_online: self.is_online,
            location,
            meeting_link,
            status,
            notes: optional_text(self.notes.as_deref()),
        })
    }
}

/// Clients may only cancel a visit that is still scheduled.
pub fn check_cancellable(id: Uuid, status: &str) -> Result<(), AppError> {
    if ScheduleStatus::parse(status) != Some(ScheduleStatus::Scheduled) {
        return Err(AppError::Conflict(format!(
            "Schedule {id} is already {status}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_scheduled_visits_are_cancellable() {
        let id = Uuid::new_v4();
        assert!(check_cancellable(id, "scheduled").is_ok());
        assert!(matches!(check_cancellable(id, "done"), Err(AppError::Conflict(_))));
        assert!(matches!(check_cancellable(id, "cancelled"), Err(AppError::Conflict(_))));
    }
    use serde_json::json;

    fn input(value: serde_json::Value) -> ScheduleInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_offline_requires_location() {
        let result = input(json!({
            "client_name": "Dana",
            "service_type": "Interior Design",
            "scheduled_at": "2030-03-01T10:00:00Z",
            "is_online": false,
            "location": "  "
        }))
        .validated();
        assert!(result.is_err());
    }

    #[test]
    fn test_online_drops_location() {
        let schedule = input(json!({
            "client_name": "Dana",
            "service_type": "Interior Design",
            "scheduled_at": "2030-03-01T10:00:00Z",
            "is_online": true,
            "location": "Studio",
            "meeting_link": "https://meet.example/abc"
        }))
        .validated()
        .unwrap();
        assert_eq!(schedule.location, None);
        assert_eq!(schedule.meeting_link.as_deref(), Some("https://meet.example/abc"));
        assert_eq!(schedule.status, ScheduleStatus::Scheduled);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let result = input(json!({
            "client_name": "Dana",
            "service_type": "Architecture",
            "scheduled_at": "2030-03-01T10:00:00Z",
            "is_online": true,
            "status": "postponed"
        }))
        .validated();
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
