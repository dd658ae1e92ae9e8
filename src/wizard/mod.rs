//! LendBridge Application Wizard
//!
//! Multi-step borrower intake:
//!
//! - **steps**: Static form definition (steps, fields, field kinds)
//! - **validation**: Per-field and cross-field checks
//! - **session**: One borrower's progress through the form
//! - **registry**: Open sessions, owner scoping and idle expiry
//!
//! # Example
//!
//! ```rust
//! use lendbridge::wizard::{StepId, WizardSession};
//! use serde_json::json;
//! use uuid::Uuid;
//!
//! let mut session = WizardSession::new(Uuid::new_v4());
//! let values = json!({
//!     "product_type": "term_loan",
//!     "loan_amount": "25,000",
//!     "term_months": 24,
//!     "loan_purpose": "Working capital for inventory"
//! });
//! session.update(values.as_object().unwrap().clone()).unwrap();
//! assert_eq!(session.next().unwrap(), StepId::BusinessInfo);
//! ```

pub mod error;
pub mod registry;
pub mod session;
pub mod steps;
pub mod validation;

pub use error::{WizardError, WizardResult};
pub use registry::{WizardConfig, WizardRegistry};
pub use session::{StepView, WizardSession, WizardView};
pub use steps::{FieldKind, FieldSpec, StepId};
pub use validation::{validate_field, validate_step, FieldError};
