//! Search locations in deterministic pre-order.
//!
//! A location is where the rule catalog is asked for candidates: a query
//! node (set operation or SELECT block) or one expression inside a SELECT.
//! The order is recomputed from the current tree after every accepted
//! reduction, so paths never go stale.
//!
//! Order for a query node:
//!
//! 1. the node itself
//! 2. for a set operation, the left branch then the right branch
//! 3. for a SELECT, its expressions clause by clause: select items, join
//!    conditions, WHERE, GROUP BY, HAVING, ORDER BY; inside an expression
//!    the node comes before its children

use crate::ast::{Clause, ExprPath, QueryPath, Select, SelectItem, Side, Statement};
use std::fmt;

/// A place in the tree where reductions are attempted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// A set operation or SELECT block
    Query(QueryPath),
    /// An expression inside a SELECT block
    Expr(ExprPath),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Query(path) if path.is_empty() => write!(f, "query ^"),
            Location::Query(path) => {
                write!(f, "query ")?;
                for side in path {
                    match side {
                        Side::Left => write!(f, "L")?,
                        Side::Right => write!(f, "R")?,
                    }
                }
                Ok(())
            }
            Location::Expr(path) => write!(f, "expr {path}"),
        }
    }
}

/// Every location of `statement`, in search order
pub fn locations(statement: &Statement) -> Vec<Location> {
    let mut out = Vec::new();
    visit_query(statement, &mut Vec::new(), &mut out);
    out
}

fn visit_query(statement: &Statement, path: &mut QueryPath, out: &mut Vec<Location>) {
    out.push(Location::Query(path.clone()));
    match statement {
        Statement::SetOperation { left, right, .. } => {
            path.push(Side::Left);
            visit_query(left, path, out);
            path.pop();
            path.push(Side::Right);
            visit_query(right, path, out);
            path.pop();
        }
        Statement::Select(select) => {
            for clause in clauses(select) {
                let root = ExprPath::root(path.clone(), clause);
                if let Some(expr) = select.clause_expr(&root.clause) {
                    visit_expr(expr, root, out);
                }
            }
        }
    }
}

/// Clauses of a SELECT that own an expression, in rendering order
fn clauses(select: &Select) -> Vec<Clause> {
    let mut clauses = Vec::new();
    for (i, item) in select.projection.iter().enumerate() {
        if matches!(item, SelectItem::Expr { .. }) {
            clauses.push(Clause::Projection(i));
        }
    }
    clauses.extend(
        select
            .join_condition_paths()
            .into_iter()
            .map(Clause::JoinCondition),
    );
    if select.selection.is_some() {
        clauses.push(Clause::Selection);
    }
    clauses.extend((0..select.group_by.len()).map(Clause::GroupBy));
    if select.having.is_some() {
        clauses.push(Clause::Having);
    }
    clauses.extend((0..select.order_by.len()).map(Clause::OrderBy));
    clauses
}

fn visit_expr(expr: &crate::ast::Expr, path: ExprPath, out: &mut Vec<Location>) {
    let children = expr.children();
    out.push(Location::Expr(path.clone()));
    for (i, child) in children.into_iter().enumerate() {
        visit_expr(child, path.child(i), out);
    }
}
