//! Booking wizard state machine.
//!
//! Steps run strictly in order. Each step has a completion predicate that gates
//! `next()`; the last step additionally requires a signed-in identity before a
//! request can be produced. Nothing here touches storage, so the same rules back
//! both the per-step validation endpoint and the final submit.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Service,
    Schedule,
    Contact,
    Confirmation,
}

impl WizardStep {
    pub const ORDER: [WizardStep; 4] = [
        WizardStep::Service,
        WizardStep::Schedule,
        WizardStep::Contact,
        WizardStep::Confirmation,
    ];

    pub fn next(&self) -> Option<WizardStep> {
        match self {
            WizardStep::Service => Some(WizardStep::Schedule),
            WizardStep::Schedule => Some(WizardStep::Contact),
            WizardStep::Contact => Some(WizardStep::Confirmation),
            WizardStep::Confirmation => None,
        }
    }

    pub fn previous(&self) -> Option<WizardStep> {
        match self {
            WizardStep::Service => None,
            WizardStep::Schedule => Some(WizardStep::Service),
            WizardStep::Contact => Some(WizardStep::Schedule),
            WizardStep::Confirmation => Some(WizardStep::Contact),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MeetingMode {
    Online,
    Offline,
}

/// Everything the visitor has entered so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingDraft {
    pub service_id: Option<Uuid>,
    #[serde(default)]
    pub description: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    /// Offset of the visitor's local clock from UTC, in minutes (UTC+2 → 120).
    #[serde(default)]
    pub utc_offset_minutes: i32,
    pub meeting_mode: Option<MeetingMode>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

impl BookingDraft {
    /// The requested slot in UTC, if date, time and offset form a valid instant.
    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        let offset = FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)?;
        let local = self.date?.and_time(self.time?);
        offset
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// The signed-in person the booking is made for.
#[derive(Debug, Clone)]
pub struct BookingIdentity {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

/// A fully validated booking, ready to become a schedule row.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub client_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub service_id: Uuid,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub is_online: bool,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum WizardError {
    #[error("step '{step:?}' is incomplete: missing {}", missing.join(", "))]
    Incomplete {
        step: WizardStep,
        missing: Vec<&'static str>,
    },

    #[error("booking can only be submitted from the confirmation step")]
    NotAtConfirmation,

    #[error("sign in or register to submit the booking")]
    AuthRequired,
}

impl From<WizardError> for AppError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::AuthRequired => AppError::AuthRequired,
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// Lists the fields `step` still needs. Empty means the step is complete.
pub fn missing_fields(
    step: WizardStep,
    draft: &BookingDraft,
    now: DateTime<Utc>,
) -> Vec<&'static str> {
    let mut missing = Vec::new();
    match step {
        WizardStep::Service => {
            if draft.service_id.is_none() {
                missing.push("service_id");
            }
            if draft.description.trim().is_empty() {
                missing.push("description");
            }
        }
        WizardStep::Schedule => {
            if draft.date.is_none() {
                missing.push("date");
            }
            if draft.time.is_none() {
                missing.push("time");
            }
            if draft.date.is_some() && draft.time.is_some() {
                match draft.scheduled_at() {
                    Some(at) if at > now => {}
                    _ => missing.push("future_datetime"),
                }
            }
        }
        WizardStep::Contact => {
            match draft.meeting_mode {
                None => missing.push("meeting_mode"),
                Some(MeetingMode::Offline) if draft.address.trim().is_empty() => {
                    missing.push("address")
                }
                Some(_) => {}
            }
            if draft.phone.trim().is_empty() {
                missing.push("phone");
            }
        }
        WizardStep::Confirmation => {}
    }
    missing
}

pub fn is_complete(step: WizardStep, draft: &BookingDraft, now: DateTime<Utc>) -> bool {
    missing_fields(step, draft, now).is_empty()
}

/// Per-step report backing the UI's Next button.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepReport {
    pub step: WizardStep,
    pub complete: bool,
    pub missing: Vec<&'static str>,
    pub next_step: Option<WizardStep>,
}

pub fn report(step: WizardStep, draft: &BookingDraft, now: DateTime<Utc>) -> StepReport {
    let missing = missing_fields(step, draft, now);
    let complete = missing.is_empty();
    StepReport {
        step,
        complete,
        next_step: if complete { step.next() } else { None },
        missing,
    }
}

#[derive(Debug, Clone)]
pub struct BookingWizard {
    step: WizardStep,
    draft: BookingDraft,
}

impl Default for BookingWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Service,
            draft: BookingDraft::default(),
        }
    }

    /// Replays a complete draft from the first step, stopping at the first gap.
    pub fn resume(draft: BookingDraft, now: DateTime<Utc>) -> Result<Self, WizardError> {
        let mut wizard = Self {
            step: WizardStep::Service,
            draft,
        };
        while wizard.step != WizardStep::Confirmation {
            wizard.next(now)?;
        }
        Ok(wizard)
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut BookingDraft {
        &mut self.draft
    }

    pub fn can_advance(&self, now: DateTime<Utc>) -> bool {
        self.step.next().is_some() && is_complete(self.step, &self.draft, now)
    }

    pub fn next(&mut self, now: DateTime<Utc>) -> Result<WizardStep, WizardError> {
        let missing = missing_fields(self.step, &self.draft, now);
        if !missing.is_empty() {
            return Err(WizardError::Incomplete {
                step: self.step,
                missing,
            });
        }
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    /// Steps back once; a no-op on the first step.
    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Produces the booking request. Every step is re-checked because the slot
    /// may have slipped into the past while the visitor was on the last step.
    pub fn submit(
        &self,
        identity: Option<&BookingIdentity>,
        now: DateTime<Utc>,
    ) -> Result<BookingRequest, WizardError> {
        if self.step != WizardStep::Confirmation {
            return Err(WizardError::NotAtConfirmation);
        }
        for step in WizardStep::ORDER {
            let missing = missing_fields(step, &self.draft, now);
            if !missing.is_empty() {
                return Err(WizardError::Incomplete { step, missing });
            }
        }
        let identity = identity.ok_or(WizardError::AuthRequired)?;

        let draft = &self.draft;
        let is_online = draft.meeting_mode == Some(MeetingMode::Online);
        let (Some(service_id), Some(scheduled_at)) = (draft.service_id, draft.scheduled_at()) else {
            return Err(WizardError::Incomplete {
                step: WizardStep::Service,
                missing: vec!["service_id"],
            });
        };

        Ok(BookingRequest {
            client_id: identity.user_id,
            client_name: identity.name.clone(),
            client_email: identity.email.clone(),
            client_phone: draft.phone.trim().to_string(),
            service_id,
            description: draft.description.trim().to_string(),
            scheduled_at,
            is_online,
            location: (!is_online).then(|| draft.address.trim().to_string()),
            notes: Some(draft.notes.trim().to_string()).filter(|n| !n.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 10, 9, 0, 0).unwrap()
    }

    fn complete_draft() -> BookingDraft {
        BookingDraft {
            service_id: Some(Uuid::new_v4()),
            description: "Two-bedroom apartment renovation".to_string(),
            date: NaiveDate::from_ymd_opt(2030, 1, 15),
            time: NaiveTime::from_hms_opt(14, 30, 0),
            utc_offset_minutes: 0,
            meeting_mode: Some(MeetingMode::Offline),
            address: "12 Harbour Road".to_string(),
            phone: "+1 555 0100".to_string(),
            notes: String::new(),
        }
    }

    fn identity() -> BookingIdentity {
        BookingIdentity {
            user_id: Uuid::new_v4(),
            name: "Dana Reyes".to_string(),
            email: "dana@example.com".to_string(),
        }
    }

    #[test]
    fn test_new_wizard_cannot_advance() {
        let wizard = BookingWizard::new();
        assert_eq!(wizard.step(), WizardStep::Service);
        assert!(!wizard.can_advance(now()));
    }

    #[test]
    fn test_service_step_requires_id_and_description() {
        let mut wizard = BookingWizard::new();
        wizard.draft_mut().service_id = Some(Uuid::new_v4());
        let err = wizard.next(now()).unwrap_err();
        assert_eq!(
            err,
            WizardError::Incomplete {
                step: WizardStep::Service,
                missing: vec!["description"],
            }
        );

        wizard.draft_mut().description = "   ".to_string();
        assert!(wizard.next(now()).is_err(), "whitespace is not a description");

        wizard.draft_mut().description = "Kitchen remodel".to_string();
        assert_eq!(wizard.next(now()).unwrap(), WizardStep::Schedule);
    }

    #[test]
    fn test_schedule_in_past_is_incomplete() {
        let mut draft = complete_draft();
        draft.date = NaiveDate::from_ymd_opt(2030, 1, 9);
        assert_eq!(
            missing_fields(WizardStep::Schedule, &draft, now()),
            vec!["future_datetime"]
        );
    }

    #[test]
    fn test_utc_offset_applied() {
        let mut draft = complete_draft();
        draft.utc_offset_minutes = 120;
        let at = draft.scheduled_at().unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2030, 1, 15, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_contact_offline_needs_address() {
        let mut draft = complete_draft();
        draft.address = String::new();
        assert_eq!(missing_fields(WizardStep::Contact, &draft, now()), vec!["address"]);

        draft.meeting_mode = Some(MeetingMode::Online);
        assert!(is_complete(WizardStep::Contact, &draft, now()));
    }

    #[test]
    fn test_contact_needs_mode_and_phone() {
        let mut draft = complete_draft();
        draft.meeting_mode = None;
        draft.phone = " ".to_string();
        assert_eq!(
            missing_fields(WizardStep::Contact, &draft, now()),
            vec!["meeting_mode", "phone"]
        );
    }

    #[test]
    fn test_back_from_first_step_is_noop() {
        let mut wizard = BookingWizard::new();
        assert_eq!(wizard.back(), WizardStep::Service);
    }

    #[test]
    fn test_back_then_next_keeps_draft() {
        let mut wizard = BookingWizard::resume(complete_draft(), now()).unwrap();
        assert_eq!(wizard.back(), WizardStep::Contact);
        assert_eq!(wizard.next(now()).unwrap(), WizardStep::Confirmation);
    }

    #[test]
    fn test_resume_stops_at_first_gap() {
        let mut draft = complete_draft();
        draft.phone = String::new();
        let err = BookingWizard::resume(draft, now()).unwrap_err();
        assert_eq!(
            err,
            WizardError::Incomplete {
                step: WizardStep::Contact,
                missing: vec!["phone"],
            }
        );
    }

    #[test]
    fn test_submit_without_identity_requires_auth() {
        let wizard = BookingWizard::resume(complete_draft(), now()).unwrap();
        assert_eq!(wizard.submit(None, now()), Err(WizardError::AuthRequired));
        assert!(matches!(
            AppError::from(WizardError::AuthRequired),
            AppError::AuthRequired
        ));
    }

    #[test]
    fn test_submit_before_confirmation_rejected() {
        let wizard = BookingWizard::new();
        assert_eq!(
            wizard.submit(Some(&identity()), now()),
            Err(WizardError::NotAtConfirmation)
        );
    }

    #[test]
    fn test_submit_builds_request() {
        let draft = complete_draft();
        let service_id = draft.service_id.unwrap();
        let wizard = BookingWizard::resume(draft, now()).unwrap();
        let who = identity();
        let request = wizard.submit(Some(&who), now()).unwrap();

        assert_eq!(request.client_id, who.user_id);
        assert_eq!(request.service_id, service_id);
        assert!(!request.is_online);
        assert_eq!(request.location.as_deref(), Some("12 Harbour Road"));
        assert_eq!(request.notes, None);
        assert_eq!(
            request.scheduled_at,
            Utc.with_ymd_and_hms(2030, 1, 15, 14, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_online_submit_has_no_location() {
        let mut draft = complete_draft();
        draft.meeting_mode = Some(MeetingMode::Online);
        let wizard = BookingWizard::resume(draft, now()).unwrap();
        let request = wizard.submit(Some(&identity()), now()).unwrap();
        assert!(request.is_online);
        assert_eq!(request.location, None);
    }

    #[test]
    fn test_submit_rechecks_slot_against_clock() {
        let wizard = BookingWizard::resume(complete_draft(), now()).unwrap();
        let later = Utc.with_ymd_and_hms(2030, 2, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            wizard.submit(Some(&identity()), later),
            Err(WizardError::Incomplete {
                step: WizardStep::Schedule,
                ..
            })
        ));
    }

    #[test]
    fn test_report_gates_next_step() {
        let draft = BookingDraft::default();
        let r = report(WizardStep::Service, &draft, now());
        assert!(!r.complete);
        assert_eq!(r.next_step, None);
        assert_eq!(r.missing, vec!["service_id", "description"]);

        let r = report(WizardStep::Service, &complete_draft(), now());
        assert!(r.complete);
        assert_eq!(r.next_step, Some(WizardStep::Schedule));
    }

    #[test]
    fn test_confirmation_is_terminal() {
        let r = report(WizardStep::Confirmation, &BookingDraft::default(), now());
        assert!(r.complete);
        assert_eq!(r.next_step, None);
    }
}
