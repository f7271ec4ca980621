/// Error types surfaced by the scheduling core.
///
/// Callers get one of three outcomes: a referenced record is missing, a
/// business rule was violated, or something went wrong underneath. Storage
/// details never leave the process; they are logged where they happen.

use crate::store::{Label, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: Label, id: String },

    #[error("validation failed: {0}")]
    Validation(#[from] Violation),

    #[error("internal error")]
    Internal,
}

impl SchedulingError {
    pub fn not_found(entity: Label, id: impl Into<String>) -> Self {
        SchedulingError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// The rule that failed, if this is a validation failure.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            SchedulingError::Validation(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SchedulingError::NotFound { .. })
    }
}

impl From<StoreError> for SchedulingError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "storage failure");
        SchedulingError::Internal
    }
}

/// A business rule that rejected an otherwise well-formed request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("invalid date format '{0}', expected ISO 8601 such as 2024-12-01T14:30:00Z")]
    InvalidDateFormat(String),

    #[error("duration must be a positive number of minutes, got {0}")]
    InvalidDuration(i64),

    #[error("appointment time is outside clinic opening hours")]
    OutsideClinicHours,

    #[error("appointment time does not fit doctor work shifts")]
    OutsideWorkShift,

    #[error("doctor's schedule conflicts with an existing appointment")]
    DoctorConflict,

    #[error("patient's schedule conflicts with an existing appointment")]
    PatientConflict,

    #[error("invalid status '{0}', valid statuses are: Scheduled, Cancelled, Completed")]
    InvalidStatus(String),

    #[error("cannot move appointment from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    #[error("invalid time '{0}', use HH:mm between 00:00 and 23:59")]
    InvalidTimeFormat(String),

    #[error("start time {start} must be earlier than end time {end}")]
    InvalidTimeRange { start: String, end: String },

    #[error("invalid day '{0}', expected Monday through Sunday")]
    InvalidDay(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("work shift overlaps an existing shift on {0}")]
    WorkShiftOverlap(String),

    #[error("doctor already attends this appointment")]
    AlreadyAttending,

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_become_opaque() {
        let err: SchedulingError = StoreError::Unavailable("bolt://db:7687 refused".into()).into();
        assert!(matches!(err, SchedulingError::Internal));
        assert_eq!(err.to_string(), "internal error");
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = SchedulingError::not_found(Label::Clinic, "c-1");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Clinic 'c-1' not found");
    }

    #[test]
    fn violation_is_exposed() {
        let err = SchedulingError::from(Violation::DoctorConflict);
        assert_eq!(err.violation(), Some(&Violation::DoctorConflict));
        assert!(!err.is_not_found());
    }
}
