//! # sqlmin: SQL Statement Minimizer
//!
//! Delta-debugging for query planners. Given a statement that makes a
//! planner fail, sqlmin repeatedly applies small size-reducing rewrites
//! and keeps each one that still makes the planner fail the same way,
//! until no single rewrite helps.
//!
//! ## Pipeline
//!
//! ```text
//! SQL text
//!     ↓
//! [Parser]                  → Statement (AST)
//!     ↓
//! [Planner + Schema]        → FailureSignature of the seed
//!     ↓
//! [Minimizer] ─ locations ─→ [Rule Catalog] → Candidates (strictly smaller)
//!     ↑                                           ↓
//!     └──── accepted ───────  [Oracle] ← render / re-parse / plan
//!     ↓
//! Locally minimal Statement
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use sqlmin::{minimize, parse_statement, FailureSignature, SchemaContext, SchemaPlanner};
//!
//! let mut schema = SchemaContext::new();
//! schema.register_table("t1", ["a", "b"]).unwrap();
//!
//! let seed = parse_statement("select a, b from t1 where a > 1 and nope = 2").unwrap();
//! let planner = SchemaPlanner::new();
//! let signature = FailureSignature::capture(&planner, &seed, &schema)
//!     .unwrap()
//!     .expect("seed fails to plan");
//!
//! let minimal = minimize(&planner, &seed, &schema, &signature).unwrap();
//! assert_eq!(minimal.to_string(), "select b from t1 where nope");
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `ast` | Statement tree, paths, sizes, canonical rendering |
//! | `parser` | SQL text → `Statement` |
//! | `schema` | Tables and columns visible to the planner |
//! | `planner` | `Planner` trait and the reference `SchemaPlanner` |
//! | `oracle` | Failure signatures and the reproduction predicate |
//! | `traversal` | Deterministic pre-order locations |
//! | `rules` | Closed catalog of size-reducing rewrites |
//! | `minimizer` | Fixed-point search, budget, deadline, verification |
//! | `config` | Layered configuration (figment) |

// Statement model
pub mod ast;
pub mod parser;

// Planning collaborators
pub mod planner;
pub mod schema;

// Reduction
pub mod minimizer;
pub mod oracle;
pub mod rules;
pub mod traversal;

// Configuration system
pub mod config;

// Re-export public types
pub use ast::{Size, Statement};
pub use config::Config;
pub use minimizer::{
    verify_local_minimum, CancelHandle, MinimizeError, Minimizer, Reduction, RunDeadline,
    SearchStats, Step, StopReason,
};
pub use oracle::{
    signatures_equal, FailureSignature, Oracle, OracleError, PredicateOracle, ReproductionOracle,
};
pub use parser::{parse_statement, ParseError};
pub use planner::{ErrorState, FailureKind, PlanFailure, Planner, SchemaPlanner};
pub use rules::{Candidate, RuleCatalog, RuleKind};
pub use schema::{SchemaContext, SchemaError};

/// Minimize `statement` with default settings.
///
/// Returns `None` when the seed does not fail with `signature`, or when
/// the run cannot complete (unusable seed, unavailable or inconsistent
/// oracle). Use [`Minimizer`] directly for statistics and error details.
pub fn minimize<P>(
    planner: P,
    statement: &Statement,
    schema: &SchemaContext,
    signature: &FailureSignature,
) -> Option<Statement>
where
    P: Planner + Sync,
{
    let oracle = ReproductionOracle::new(planner, schema, signature.clone());
    match Minimizer::new().minimize(statement.clone(), &oracle) {
        Ok(reduction) => Some(reduction.statement),
        Err(e) => {
            tracing::warn!(error = %e, "minimization did not produce a result");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SchemaContext {
        let mut schema = SchemaContext::new();
        schema.register_table("t1", ["a", "b"]).unwrap();
        schema.register_table("t2", ["id", "c"]).unwrap();
        schema
    }

    #[test]
    fn test_minimize_returns_none_for_passing_seed() {
        let schema = schema();
        let seed = parse_statement("select a from t1").unwrap();
        let signature = FailureSignature {
            state: Some(ErrorState::BadField),
            message: "Unknown column 'x' in 'field list'".to_string(),
        };
        assert_eq!(minimize(SchemaPlanner::new(), &seed, &schema, &signature), None);
    }

    #[test]
    fn test_minimize_unknown_table() {
        let schema = schema();
        let seed = parse_statement("select t1.a, nope.b from t1, nope where t1.a > 1").unwrap();
        let planner = SchemaPlanner::new();
        let signature = FailureSignature::capture(&planner, &seed, &schema)
            .unwrap()
            .unwrap();
        assert_eq!(signature.state, Some(ErrorState::BadTable));

        let minimal = minimize(&planner, &seed, &schema, &signature).unwrap();
        assert_eq!(minimal.to_string(), "select b from nope");
    }
}
