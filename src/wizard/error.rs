//! Wizard error types

use thiserror::Error;
use uuid::Uuid;

use super::steps::StepId;
use super::validation::FieldError;
use crate::finance::FinanceError;

/// Errors raised while driving an application wizard
#[derive(Error, Debug)]
pub enum WizardError {
    /// Session is unknown, expired or owned by someone else
    #[error("Wizard session {0} not found")]
    NotFound(Uuid),

    /// Field does not belong to any step
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// One or more fields failed validation
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(Vec<FieldError>),

    /// Step cannot be opened before earlier steps are complete
    #[error("Step {0} is not available yet")]
    StepLocked(StepId),

    /// Owner already has the maximum number of open sessions
    #[error("Too many open applications in progress (max {0})")]
    TooManySessions(usize),

    /// Pricing the submission failed
    #[error("Pricing error: {0}")]
    Finance(#[from] FinanceError),
}

pub type WizardResult<T> = Result<T, WizardError>;
