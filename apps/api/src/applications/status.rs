//! Application status lifecycle.
//!
//! ```text
//! planning <-> in_progress -> submitted -> accepted | rejected | waitlisted | awarded
//!     \___________________________^              waitlisted -> accepted | rejected
//! ```
//!
//! `accepted`, `rejected` and `awarded` are final. `awarded` is scholarship-only,
//! `accepted` and `waitlisted` are college-only.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationKind {
    College,
    Scholarship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Planning,
    InProgress,
    Submitted,
    Accepted,
    Rejected,
    Waitlisted,
    Awarded,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Waitlisted => "waitlisted",
            Self::Awarded => "awarded",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Awarded)
    }

    /// Submitted or any outcome of a submission.
    pub fn is_submitted(&self) -> bool {
        !matches!(self, Self::Planning | Self::InProgress)
    }

    pub fn applies_to(&self, kind: ApplicationKind) -> bool {
        match self {
            Self::Accepted | Self::Waitlisted => kind == ApplicationKind::College,
            Self::Awarded => kind == ApplicationKind::Scholarship,
            _ => true,
        }
    }

    pub fn can_move_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        match (self, next) {
            (a, b) if *a == b => true,
            (Planning | InProgress, Planning | InProgress | Submitted) => true,
            (Submitted, Accepted | Rejected | Waitlisted | Awarded) => true,
            (Waitlisted, Accepted | Rejected) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planning" => Ok(Self::Planning),
            "in_progress" => Ok(Self::InProgress),
            "submitted" => Ok(Self::Submitted),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "waitlisted" => Ok(Self::Waitlisted),
            "awarded" => Ok(Self::Awarded),
            other => Err(AppError::UnprocessableEntity(format!(
                "unknown application status '{other}'"
            ))),
        }
    }
}

/// Parses a requested status and checks it is valid for the application kind.
pub fn parse_status(raw: &str, kind: ApplicationKind) -> Result<ApplicationStatus, AppError> {
    let status: ApplicationStatus = raw.parse()?;
    if !status.applies_to(kind) {
        return Err(AppError::UnprocessableEntity(format!(
            "status '{status}' does not apply to {} applications",
            match kind {
                ApplicationKind::College => "college",
                ApplicationKind::Scholarship => "scholarship",
            }
        )));
    }
    Ok(status)
}

/// `submitted_at` for a freshly created application.
pub fn initial_submitted_at(status: ApplicationStatus, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    status.is_submitted().then_some(now)
}

/// Validates `current -> next` and returns the resulting `submitted_at`.
/// Re-setting the current status changes nothing.
pub fn transition(
    current: ApplicationStatus,
    next: ApplicationStatus,
    submitted_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    if current == next {
        return Ok(submitted_at);
    }
    if !current.can_move_to(next) {
        return Err(AppError::UnprocessableEntity(format!(
            "cannot change status from '{current}' to '{next}'"
        )));
    }
    if next == ApplicationStatus::Submitted {
        return Ok(Some(now));
    }
    Ok(submitted_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    #[test]
    fn test_parse_status_respects_kind() {
        assert_eq!(
            parse_status("Awarded", ApplicationKind::Scholarship).unwrap(),
            Awarded
        );
        assert!(matches!(
            parse_status("awarded", ApplicationKind::College),
            Err(AppError::UnprocessableEntity(_))
        ));
        assert!(parse_status("waitlisted", ApplicationKind::Scholarship).is_err());
        assert!(parse_status("withdrawn", ApplicationKind::College).is_err());
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(Planning.can_move_to(InProgress));
        assert!(InProgress.can_move_to(Planning));
        assert!(Planning.can_move_to(Submitted));
        assert!(Submitted.can_move_to(Waitlisted));
        assert!(Waitlisted.can_move_to(Accepted));
        assert!(Waitlisted.can_move_to(Rejected));
    }

    #[test]
    fn test_final_states_are_final() {
        for status in [Accepted, Rejected, Awarded] {
            assert!(status.is_final());
            for next in [Planning, InProgress, Submitted, Accepted, Rejected, Waitlisted, Awarded] {
                assert_eq!(status.can_move_to(next), status == next);
            }
        }
    }

    #[test]
    fn test_no_decision_before_submission() {
        assert!(!Planning.can_move_to(Accepted));
        assert!(!InProgress.can_move_to(Awarded));
        assert!(!Submitted.can_move_to(InProgress));
        assert!(!Waitlisted.can_move_to(Submitted));
    }

    #[test]
    fn test_transition_stamps_submitted_at() {
        let now = Utc::now();
        assert_eq!(transition(InProgress, Submitted, None, now).unwrap(), Some(now));

        let earlier = now - chrono::Duration::days(3);
        assert_eq!(
            transition(Submitted, Accepted, Some(earlier), now).unwrap(),
            Some(earlier)
        );
        assert_eq!(
            transition(Submitted, Submitted, Some(earlier), now).unwrap(),
            Some(earlier)
        );
        assert!(transition(Rejected, Accepted, Some(earlier), now).is_err());
    }

    #[test]
    fn test_initial_submitted_at() {
        let now = Utc::now();
        assert_eq!(initial_submitted_at(Planning, now), None);
        assert_eq!(initial_submitted_at(Submitted, now), Some(now));
        assert_eq!(initial_submitted_at(Awarded, now), Some(now));
    }
}
