//! # Reproduction Oracle
//!
//! Answers one question about a candidate statement: does it still make
//! the planner fail the same way the seed did?
//!
//! "The same way" is decided by [`signatures_equal`]. When the expected
//! failure carries a classification ([`ErrorState`]) only the
//! classification is compared, so a candidate may fail on a different
//! column name and still count. Unclassified failures fall back to exact
//! message equality.
//!
//! The oracle holds no per-run state. Memoization and call counting are
//! owned by the minimization run.

use crate::ast::Statement;
use crate::parser::parse_statement;
use crate::planner::{ErrorState, PlanFailure, Planner};
use crate::schema::SchemaContext;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

/// Why the oracle could not judge a candidate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The candidate cannot be evaluated faithfully (e.g. it does not
    /// survive a render/parse round trip). Skipped, never accepted.
    #[error("candidate is unusable: {0}")]
    Unusable(String),

    /// The planner itself could not run. Says nothing about the candidate.
    #[error("planner infrastructure failure: {0}")]
    Infrastructure(String),
}

// ============================================================================
// Failure signatures
// ============================================================================

/// Comparable identity of a planner failure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FailureSignature {
    pub state: Option<ErrorState>,
    pub message: String,
}

impl FailureSignature {
    /// Signature of a planner failure
    pub fn classify(failure: &PlanFailure) -> Self {
        FailureSignature {
            state: failure.state,
            message: failure.message.clone(),
        }
    }

    /// Plan `statement` once and capture how it fails.
    ///
    /// Returns `Ok(None)` when planning succeeds. A planner panic is
    /// captured as an [`ErrorState::Crash`] failure.
    pub fn capture<P: Planner>(
        planner: &P,
        statement: &Statement,
        schema: &SchemaContext,
    ) -> Result<Option<Self>, OracleError> {
        match run_planner(planner, statement, schema) {
            Ok(()) => Ok(None),
            Err(failure) if failure.is_infrastructure() => {
                Err(OracleError::Infrastructure(failure.message))
            }
            Err(failure) => Ok(Some(Self::classify(&failure))),
        }
    }

    /// Check if `failure` counts as a reproduction of this signature
    pub fn matches(&self, failure: &PlanFailure) -> bool {
        signatures_equal(self, &Self::classify(failure))
    }
}

impl fmt::Display for FailureSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            Some(state) => write!(f, "[{state}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Compare an observed failure against the expected one.
///
/// Not symmetric: the expected side decides whether classifications or
/// messages are compared.
pub fn signatures_equal(expected: &FailureSignature, actual: &FailureSignature) -> bool {
    match expected.state {
        Some(state) => actual.state == Some(state),
        None => expected.message == actual.message,
    }
}

/// Run the planner with panics converted into crash failures
fn run_planner<P: Planner>(
    planner: &P,
    statement: &Statement,
    schema: &SchemaContext,
) -> Result<(), PlanFailure> {
    match catch_unwind(AssertUnwindSafe(|| planner.plan(statement, schema))) {
        Ok(Ok(_plan)) => Ok(()),
        Ok(Err(failure)) => Err(failure),
        Err(payload) => Err(PlanFailure::planning(
            ErrorState::Crash,
            format!("planner panicked: {}", panic_message(payload.as_ref())),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ============================================================================
// Oracles
// ============================================================================

/// Reproduction predicate consulted by the minimizer
pub trait Oracle {
    /// Check if `statement` still reproduces the failure
    fn reproduces(&self, statement: &Statement) -> Result<bool, OracleError>;
}

impl<O: Oracle + ?Sized> Oracle for &O {
    fn reproduces(&self, statement: &Statement) -> Result<bool, OracleError> {
        (**self).reproduces(statement)
    }
}

/// Oracle backed by a planner and a captured failure signature
pub struct ReproductionOracle<'a, P> {
    planner: P,
    schema: &'a SchemaContext,
    expected: FailureSignature,
    check_round_trip: bool,
}

impl<'a, P: Planner> ReproductionOracle<'a, P> {
    /// Create an oracle that accepts failures matching `expected`
    pub fn new(planner: P, schema: &'a SchemaContext, expected: FailureSignature) -> Self {
        ReproductionOracle {
            planner,
            schema,
            expected,
            check_round_trip: true,
        }
    }

    /// Enable or disable the render/parse round-trip check
    pub fn with_round_trip_check(mut self, enabled: bool) -> Self {
        self.check_round_trip = enabled;
        self
    }

    pub fn expected(&self) -> &FailureSignature {
        &self.expected
    }

    fn check_round_trip(&self, statement: &Statement) -> Result<(), OracleError> {
        let text = statement.to_string();
        match parse_statement(&text) {
            Ok(reparsed) if reparsed == *statement => Ok(()),
            Ok(_) => Err(OracleError::Unusable(format!(
                "rendering does not parse back to the same tree: {text}"
            ))),
            Err(e) => Err(OracleError::Unusable(format!("{e}: {text}"))),
        }
    }
}

impl<P: Planner> Oracle for ReproductionOracle<'_, P> {
    fn reproduces(&self, statement: &Statement) -> Result<bool, OracleError> {
        if self.check_round_trip {
            self.check_round_trip(statement)?;
        }
        match run_planner(&self.planner, statement, self.schema) {
            Ok(()) => Ok(false),
            Err(failure) if failure.is_infrastructure() => {
                Err(OracleError::Infrastructure(failure.message))
            }
            Err(failure) => {
                let matched = self.expected.matches(&failure);
                tracing::trace!(
                    state = ?failure.state,
                    matched,
                    "planner failure: {}",
                    failure.message
                );
                Ok(matched)
            }
        }
    }
}

/// Oracle backed by a caller-supplied predicate. A panicking predicate
/// counts as "does not reproduce".
pub struct PredicateOracle<F> {
    predicate: F,
}

impl<F> PredicateOracle<F>
where
    F: Fn(&Statement) -> bool,
{
    pub fn new(predicate: F) -> Self {
        PredicateOracle { predicate }
    }
}

impl<F> Oracle for PredicateOracle<F>
where
    F: Fn(&Statement) -> bool,
{
    fn reproduces(&self, statement: &Statement) -> Result<bool, OracleError> {
        match catch_unwind(AssertUnwindSafe(|| (self.predicate)(statement))) {
            Ok(verdict) => Ok(verdict),
            Err(payload) => {
                tracing::warn!(
                    "reproduction predicate panicked: {}",
                    panic_message(payload.as_ref())
                );
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(state: Option<ErrorState>, message: &str) -> FailureSignature {
        FailureSignature {
            state,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_classified_signatures_compare_states() {
        let expected = signature(Some(ErrorState::BadField), "Unknown column 'a'");
        assert!(signatures_equal(
            &expected,
            &signature(Some(ErrorState::BadField), "Unknown column 'b'")
        ));
        assert!(!signatures_equal(
            &expected,
            &signature(Some(ErrorState::BadTable), "Unknown column 'a'")
        ));
        assert!(!signatures_equal(
            &expected,
            &signature(None, "Unknown column 'a'")
        ));
    }

    #[test]
    fn test_unclassified_signatures_compare_messages() {
        let expected = signature(None, "boom");
        assert!(signatures_equal(&expected, &signature(None, "boom")));
        assert!(signatures_equal(
            &expected,
            &signature(Some(ErrorState::Internal), "boom")
        ));
        assert!(!signatures_equal(&expected, &signature(None, "boom!")));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload = catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload = catch_unwind(|| panic!("formatted {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 1");
    }

    #[test]
    fn test_signature_display() {
        let classified = signature(Some(ErrorState::Crash), "planner panicked: x");
        assert_eq!(classified.to_string(), "[crash] planner panicked: x");
    }
}
