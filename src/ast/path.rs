//! Structural paths into a statement tree.
//!
//! A path names a subtree by how to reach it from the root, so a location
//! computed on one tree can be re-applied to a structurally equal copy.

use std::fmt;

/// Which branch of a binary node to descend into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// Path from the root statement to a query block, through set operations
pub type QueryPath = Vec<Side>;

/// Path to a relation: a FROM entry, then sides through nested joins
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationPath {
    pub index: usize,
    pub sides: Vec<Side>,
}

/// Clause of a query block that owns an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Clause {
    /// Select item by position
    Projection(usize),
    /// ON condition of the join at this path
    JoinCondition(RelationPath),
    /// `WHERE`
    Selection,
    /// Grouping key by position
    GroupBy(usize),
    /// `HAVING`
    Having,
    /// Ordering term by position
    OrderBy(usize),
}

/// Path to an expression: query block, clause, then child indexes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExprPath {
    pub query: QueryPath,
    pub clause: Clause,
    pub steps: Vec<usize>,
}

impl ExprPath {
    /// Path to the root expression of `clause` in the query at `query`
    pub fn root(query: QueryPath, clause: Clause) -> Self {
        ExprPath {
            query,
            clause,
            steps: Vec::new(),
        }
    }

    /// Path to child `index` of the expression at this path
    pub fn child(&self, index: usize) -> Self {
        let mut steps = self.steps.clone();
        steps.push(index);
        ExprPath {
            query: self.query.clone(),
            clause: self.clause.clone(),
            steps,
        }
    }
}

fn fmt_sides(f: &mut fmt::Formatter<'_>, sides: &[Side]) -> fmt::Result {
    if sides.is_empty() {
        return write!(f, "^");
    }
    for side in sides {
        match side {
            Side::Left => write!(f, "L")?,
            Side::Right => write!(f, "R")?,
        }
    }
    Ok(())
}

impl fmt::Display for RelationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.index)?;
        fmt_sides(f, &self.sides)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Projection(i) => write!(f, "select[{i}]"),
            Clause::JoinCondition(path) => write!(f, "on[{path}]"),
            Clause::Selection => write!(f, "where"),
            Clause::GroupBy(i) => write!(f, "group[{i}]"),
            Clause::Having => write!(f, "having"),
            Clause::OrderBy(i) => write!(f, "order[{i}]"),
        }
    }
}

impl fmt::Display for ExprPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_sides(f, &self.query)?;
        write!(f, "/{}", self.clause)?;
        for step in &self.steps {
            write!(f, ".{step}")?;
        }
        Ok(())
    }
}
