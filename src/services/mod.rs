//! Application services.
//!
//! The study service is the single entry point callers use; it wraps the
//! scheduler, due-set selection and storage behind one handle.

pub mod study;

pub use study::{AnswerOutcome, CardWithProgress, StudyProgress, StudyService};
