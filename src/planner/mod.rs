//! # Query Planner Interface
//!
//! The minimizer treats the planner as a black box: it hands over a
//! statement plus the schema and gets back either a plan or a
//! [`PlanFailure`]. Failures carry an optional [`ErrorState`], the stable
//! classification used to decide whether two failures are "the same bug".
//!
//! [`SchemaPlanner`] is the reference implementation: it resolves names
//! against a [`SchemaContext`], validates grouping and aggregate use, and
//! can be told to reject specific features to emulate planner gaps.

mod reference;

pub use reference::{LogicalPlan, PlannerFeature, SchemaPlanner, KNOWN_FUNCTIONS};

use crate::ast::Statement;
use crate::schema::SchemaContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable classification of a planning failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorState {
    /// Unknown table
    BadTable,
    /// Unknown column
    BadField,
    /// Unqualified column matches more than one table
    AmbiguousField,
    /// Table alias used twice in one FROM clause
    NonUniqueTable,
    /// Non-aggregated column outside GROUP BY
    WrongFieldWithGroup,
    /// Aggregate used where it is not allowed
    InvalidGroupFunction,
    /// Function name not known to the planner
    UnknownFunction,
    /// Set operation branches disagree on column count
    WrongNumberOfColumns,
    /// Feature the planner does not implement
    Unsupported,
    /// Planner bug detected by an internal check
    Internal,
    /// Planner panicked
    Crash,
}

impl ErrorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorState::BadTable => "bad_table",
            ErrorState::BadField => "bad_field",
            ErrorState::AmbiguousField => "ambiguous_field",
            ErrorState::NonUniqueTable => "non_unique_table",
            ErrorState::WrongFieldWithGroup => "wrong_field_with_group",
            ErrorState::InvalidGroupFunction => "invalid_group_function",
            ErrorState::UnknownFunction => "unknown_function",
            ErrorState::WrongNumberOfColumns => "wrong_number_of_columns",
            ErrorState::Unsupported => "unsupported",
            ErrorState::Internal => "internal",
            ErrorState::Crash => "crash",
        }
    }
}

impl fmt::Display for ErrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a failure is about the statement or about the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The planner rejected or mishandled the statement
    Planning,
    /// The planner could not be reached or run at all
    Infrastructure,
}

/// Failure reported by a planner
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PlanFailure {
    pub kind: FailureKind,
    /// Classification, when the planner provides one
    pub state: Option<ErrorState>,
    pub message: String,
}

impl PlanFailure {
    /// Classified planning failure
    pub fn planning(state: ErrorState, message: impl Into<String>) -> Self {
        PlanFailure {
            kind: FailureKind::Planning,
            state: Some(state),
            message: message.into(),
        }
    }

    /// Planning failure with no classification; compared by message
    pub fn unclassified(message: impl Into<String>) -> Self {
        PlanFailure {
            kind: FailureKind::Planning,
            state: None,
            message: message.into(),
        }
    }

    /// Environment failure; says nothing about the statement
    pub fn infrastructure(message: impl Into<String>) -> Self {
        PlanFailure {
            kind: FailureKind::Infrastructure,
            state: None,
            message: message.into(),
        }
    }

    pub fn is_infrastructure(&self) -> bool {
        self.kind == FailureKind::Infrastructure
    }
}

/// A query planner the minimizer can consult
pub trait Planner {
    type Plan;

    /// Plan `statement` against `schema`
    fn plan(&self, statement: &Statement, schema: &SchemaContext) -> Result<Self::Plan, PlanFailure>;
}

impl<P: Planner + ?Sized> Planner for &P {
    type Plan = P::Plan;

    fn plan(&self, statement: &Statement, schema: &SchemaContext) -> Result<Self::Plan, PlanFailure> {
        (**self).plan(statement, schema)
    }
}
