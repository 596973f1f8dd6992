//! # Reduction Rules
//!
//! A closed catalog of local tree transformations. Each rule looks at one
//! [`Location`] of a statement and proposes rewritten copies of the whole
//! statement.
//!
//! ## Catalog order
//!
//! Coarse structural removals come first, fine expression simplification
//! last:
//!
//! 1. `CollapseSetOperation`
//! 2. `DropRelation`
//! 3. `DropSelectItem`
//! 4. `DropConjunct`, `CollapseConnective`
//! 5. `DropGroupingKey`, `DropOrderingTerm`
//! 6. `DropLimit`, `DropDistinct`
//! 7. `SimplifyExpression`
//! 8. `LiteralizeOperand`
//!
//! ## Size contract
//!
//! Every candidate must be strictly smaller than its input under
//! [`Size`]. [`Candidate`] can only be built through a check that enforces
//! this, and [`RuleCatalog::propose`] discards (and reports) anything that
//! fails it, so a faulty rule can never make the search loop forever.

mod clauses;
mod expressions;
mod relations;

use crate::ast::{Size, Statement};
use crate::traversal::Location;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rule families, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Replace a set operation by one branch; demote `UNION ALL` to `UNION`
    CollapseSetOperation,
    /// Drop one table and everything qualified by it
    DropRelation,
    /// Drop one select-list item
    DropSelectItem,
    /// Drop one top-level conjunct of WHERE, HAVING or a join condition
    DropConjunct,
    /// Replace AND/OR with a subset of its children, `NOT x` with `x`
    CollapseConnective,
    /// Drop one GROUP BY key
    DropGroupingKey,
    /// Drop one ORDER BY term
    DropOrderingTerm,
    /// Drop LIMIT, or just its OFFSET
    DropLimit,
    /// Drop `SELECT DISTINCT`
    DropDistinct,
    /// Replace an expression with an operand or a simpler literal
    SimplifyExpression,
    /// Replace a comparison operand with the simplest literal of its type
    LiteralizeOperand,
}

impl RuleKind {
    /// Every rule, in priority order
    pub const CATALOG: &'static [RuleKind] = &[
        RuleKind::CollapseSetOperation,
        RuleKind::DropRelation,
        RuleKind::DropSelectItem,
        RuleKind::DropConjunct,
        RuleKind::CollapseConnective,
        RuleKind::DropGroupingKey,
        RuleKind::DropOrderingTerm,
        RuleKind::DropLimit,
        RuleKind::DropDistinct,
        RuleKind::SimplifyExpression,
        RuleKind::LiteralizeOperand,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::CollapseSetOperation => "collapse_set_operation",
            RuleKind::DropRelation => "drop_relation",
            RuleKind::DropSelectItem => "drop_select_item",
            RuleKind::DropConjunct => "drop_conjunct",
            RuleKind::CollapseConnective => "collapse_connective",
            RuleKind::DropGroupingKey => "drop_grouping_key",
            RuleKind::DropOrderingTerm => "drop_ordering_term",
            RuleKind::DropLimit => "drop_limit",
            RuleKind::DropDistinct => "drop_distinct",
            RuleKind::SimplifyExpression => "simplify_expression",
            RuleKind::LiteralizeOperand => "literalize_operand",
        }
    }

    /// Raw proposals of this rule, not yet checked against the size contract
    pub fn propose(self, statement: &Statement, location: &Location) -> Vec<Statement> {
        match (self, location) {
            (RuleKind::CollapseSetOperation, Location::Query(path)) => {
                clauses::collapse_set_operation(statement, path)
            }
            (RuleKind::DropRelation, Location::Query(path)) => {
                relations::drop_relation(statement, path)
            }
            (RuleKind::DropSelectItem, Location::Query(path)) => {
                clauses::drop_select_item(statement, path)
            }
            (RuleKind::DropConjunct, Location::Query(path)) => {
                clauses::drop_conjunct(statement, path)
            }
            (RuleKind::DropGroupingKey, Location::Query(path)) => {
                clauses::drop_grouping_key(statement, path)
            }
            (RuleKind::DropOrderingTerm, Location::Query(path)) => {
                clauses::drop_ordering_term(statement, path)
            }
            (RuleKind::DropLimit, Location::Query(path)) => clauses::drop_limit(statement, path),
            (RuleKind::DropDistinct, Location::Query(path)) => {
                clauses::drop_distinct(statement, path)
            }
            (RuleKind::CollapseConnective, Location::Expr(path)) => {
                expressions::collapse_connective(statement, path)
            }
            (RuleKind::SimplifyExpression, Location::Expr(path)) => {
                expressions::simplify_expression(statement, path)
            }
            (RuleKind::LiteralizeOperand, Location::Expr(path)) => {
                expressions::literalize_operand(statement, path)
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        RuleKind::CATALOG
            .iter()
            .find(|rule| rule.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("unknown rule '{s}'"))
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// A proposed statement, verified strictly smaller than the statement it
/// was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    statement: Statement,
    rule: RuleKind,
    size: Size,
}

impl Candidate {
    /// Wrap `statement` if it is strictly smaller than `base`; hand it back
    /// otherwise
    pub fn verified(base: Size, statement: Statement, rule: RuleKind) -> Result<Self, Statement> {
        let size = statement.size();
        if size < base {
            Ok(Candidate {
                statement,
                rule,
                size,
            })
        } else {
            Err(statement)
        }
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn rule(&self) -> RuleKind {
        self.rule
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn into_statement(self) -> Statement {
        self.statement
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// The enabled rules, in priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCatalog {
    rules: Vec<RuleKind>,
}

impl Default for RuleCatalog {
    fn default() -> Self {
        RuleCatalog {
            rules: RuleKind::CATALOG.to_vec(),
        }
    }
}

impl RuleCatalog {
    /// Catalog with every rule enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog restricted to a single rule
    pub fn only(rule: RuleKind) -> Self {
        RuleCatalog { rules: vec![rule] }
    }

    /// Remove `disabled` rules, keeping priority order
    pub fn without(mut self, disabled: &[RuleKind]) -> Self {
        self.rules.retain(|rule| !disabled.contains(rule));
        self
    }

    pub fn rules(&self) -> &[RuleKind] {
        &self.rules
    }

    /// Verified candidates for one location, in priority order
    pub fn propose(&self, statement: &Statement, location: &Location) -> Vec<Candidate> {
        let base = statement.size();
        let mut candidates = Vec::new();
        for &rule in &self.rules {
            for proposal in rule.propose(statement, location) {
                match Candidate::verified(base, proposal, rule) {
                    Ok(candidate) => candidates.push(candidate),
                    Err(rejected) => {
                        tracing::error!(
                            %rule,
                            %location,
                            base = ?base,
                            size = ?rejected.size(),
                            "rule proposed a candidate that is not smaller; discarded"
                        );
                    }
                }
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_statement;
    use crate::traversal::locations;

    #[test]
    fn test_candidate_rejects_non_smaller() {
        let statement = parse_statement("select a from t").unwrap();
        let size = statement.size();
        assert!(Candidate::verified(size, statement.clone(), RuleKind::DropLimit).is_err());

        let smaller = parse_statement("select a").unwrap();
        let candidate = Candidate::verified(size, smaller.clone(), RuleKind::DropRelation).unwrap();
        assert_eq!(candidate.statement(), &smaller);
        assert!(candidate.size() < size);
    }

    #[test]
    fn test_catalog_order_is_priority_order() {
        let mut sorted = RuleKind::CATALOG.to_vec();
        sorted.sort();
        assert_eq!(sorted, RuleKind::CATALOG);
    }

    #[test]
    fn test_without_keeps_order() {
        let catalog = RuleCatalog::new().without(&[RuleKind::DropRelation, RuleKind::DropLimit]);
        assert_eq!(catalog.rules().len(), RuleKind::CATALOG.len() - 2);
        assert_eq!(catalog.rules()[0], RuleKind::CollapseSetOperation);
        assert_eq!(catalog.rules()[1], RuleKind::DropSelectItem);
    }

    #[test]
    fn test_rule_names_round_trip() {
        for rule in RuleKind::CATALOG {
            assert_eq!(rule.as_str().parse::<RuleKind>(), Ok(*rule));
        }
        assert_eq!("drop-limit".parse::<RuleKind>(), Ok(RuleKind::DropLimit));
    }

    #[test]
    fn test_every_proposal_is_smaller() {
        let statement = parse_statement(
            "select distinct t1.a, count(distinct b) as n, 'label' from t1 \
             left join t2 on t1.id = t2.id and t2.c > 100 \
             where t1.a in (1, 2, 3) and not (b like 'x%' or t2.c is null) \
             group by t1.a, b having count(*) > 10 order by n desc limit 5 offset 10 \
             union all select 1, 2, 3",
        )
        .unwrap();
        let base = statement.size();
        for location in locations(&statement) {
            for rule in RuleKind::CATALOG {
                for proposal in rule.propose(&statement, &location) {
                    assert!(
                        proposal.size() < base,
                        "{rule} at {location} did not shrink: {proposal}"
                    );
                }
            }
        }
    }
}
