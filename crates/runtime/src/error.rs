//! Run failures
//!
//! A fault raised inside any unit ends the whole run. The engine records
//! the first one together with the labels that were on the nexting stack
//! at that moment, drains the stack, and hands the result back from
//! [`crate::Engine::run`].

use cringe_core::{Fault, Label};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub fault: Fault,
    /// Frame labels at the time of the fault, innermost first
    pub nexting: Vec<Label>,
}

impl Failure {
    pub fn new(fault: Fault, nexting: Vec<Label>) -> Self {
        Failure { fault, nexting }
    }

    pub fn exit_code(&self) -> i32 {
        self.fault.exit_code()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fault)?;
        // The innermost label is where the last NEXT went, not the
        // statement that failed
        for label in &self.nexting {
            write!(f, "\n    at {}", label)?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.fault)
    }
}

impl From<Fault> for Failure {
    fn from(fault: Fault) -> Self {
        Failure::new(fault, Vec::new())
    }
}

/// Format a panic payload into an error message
pub fn format_panic_payload(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
