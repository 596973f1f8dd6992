//! Builder Patterns for AST Construction
//!
//! Provides fluent APIs for constructing statements, particularly useful for tests.
//!
//! ## Example
//!
//! ```rust
//! use sqlmin::ast::builders::SelectBuilder;
//! use sqlmin::ast::{BinaryOp, Expr};
//!
//! // select a, b from t1 join t2 on t1.id = t2.id where a > 1
//! let statement = SelectBuilder::new()
//!     .columns(["a", "b"])
//!     .from("t1")
//!     .join("t2", Expr::binary(BinaryOp::Eq, Expr::qualified("t1", "id"), Expr::qualified("t2", "id")))
//!     .filter(Expr::binary(BinaryOp::Gt, Expr::column("a"), Expr::int(1)))
//!     .build();
//!
//! assert_eq!(
//!     statement.to_string(),
//!     "select a, b from t1 join t2 on t1.id = t2.id where a > 1"
//! );
//! ```

use super::{
    Expr, JoinKind, Limit, OrderTerm, Select, SelectItem, SetOperator, Statement, TableExpr,
};

// SelectBuilder
/// Builder for constructing single-block SELECT statements
#[derive(Debug, Clone, Default)]
pub struct SelectBuilder {
    select: Select,
}

impl SelectBuilder {
    /// Create a new, empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the query as `SELECT DISTINCT`
    pub fn distinct(mut self) -> Self {
        self.select.distinct = true;
        self
    }

    /// Add an unqualified column to the select list
    pub fn column(self, name: impl Into<String>) -> Self {
        self.item(Expr::column(name))
    }

    /// Add several unqualified columns to the select list
    pub fn columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self = self.column(name);
        }
        self
    }

    /// Add an expression to the select list
    pub fn item(mut self, expr: Expr) -> Self {
        self.select
            .projection
            .push(SelectItem::Expr { expr, alias: None });
        self
    }

    /// Add an aliased expression to the select list
    pub fn item_as(mut self, expr: Expr, alias: impl Into<String>) -> Self {
        self.select.projection.push(SelectItem::Expr {
            expr,
            alias: Some(alias.into()),
        });
        self
    }

    /// Add `*` to the select list
    pub fn wildcard(mut self) -> Self {
        self.select.projection.push(SelectItem::Wildcard);
        self
    }

    /// Add a table as a new comma-separated FROM entry
    pub fn from(mut self, name: impl Into<String>) -> Self {
        self.select.from.push(TableExpr::table(name));
        self
    }

    /// Add an aliased table as a new FROM entry
    pub fn from_as(mut self, name: impl Into<String>, alias: impl Into<String>) -> Self {
        self.select.from.push(TableExpr::Table {
            name: name.into(),
            alias: Some(alias.into()),
        });
        self
    }

    /// Inner-join a table onto the last FROM entry
    pub fn join(self, name: impl Into<String>, on: Expr) -> Self {
        self.join_with(JoinKind::Inner, TableExpr::table(name), Some(on))
    }

    /// Left-join a table onto the last FROM entry
    pub fn left_join(self, name: impl Into<String>, on: Expr) -> Self {
        self.join_with(JoinKind::Left, TableExpr::table(name), Some(on))
    }

    /// Join any relation onto the last FROM entry
    ///
    /// With an empty FROM list the relation becomes the first entry.
    pub fn join_with(mut self, kind: JoinKind, relation: TableExpr, on: Option<Expr>) -> Self {
        match self.select.from.pop() {
            Some(left) => self.select.from.push(TableExpr::Join {
                kind,
                left: Box::new(left),
                right: Box::new(relation),
                on,
            }),
            None => self.select.from.push(relation),
        }
        self
    }

    /// AND a predicate onto the WHERE clause
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.select.selection = Some(conjoin(self.select.selection.take(), predicate));
        self
    }

    /// Add a grouping key
    pub fn group_by(mut self, expr: Expr) -> Self {
        self.select.group_by.push(expr);
        self
    }

    /// AND a predicate onto the HAVING clause
    pub fn having(mut self, predicate: Expr) -> Self {
        self.select.having = Some(conjoin(self.select.having.take(), predicate));
        self
    }

    /// Add an ascending ordering term
    pub fn order_by(mut self, expr: Expr) -> Self {
        self.select.order_by.push(OrderTerm {
            expr,
            descending: false,
        });
        self
    }

    /// Add a descending ordering term
    pub fn order_by_desc(mut self, expr: Expr) -> Self {
        self.select.order_by.push(OrderTerm {
            expr,
            descending: true,
        });
        self
    }

    /// Set `LIMIT count`
    pub fn limit(mut self, count: u64) -> Self {
        self.select.limit = Some(Limit {
            count,
            offset: None,
        });
        self
    }

    /// Set `LIMIT count OFFSET offset`
    pub fn limit_offset(mut self, count: u64, offset: u64) -> Self {
        self.select.limit = Some(Limit {
            count,
            offset: Some(offset),
        });
        self
    }

    /// Build the query block alone
    pub fn build_select(self) -> Select {
        self.select
    }

    /// Build the statement
    pub fn build(self) -> Statement {
        Statement::select(self.select)
    }
}

/// Extend an optional predicate with one more conjunct, keeping `And` flat
fn conjoin(existing: Option<Expr>, predicate: Expr) -> Expr {
    match existing {
        None => predicate,
        Some(Expr::And(mut children)) => {
            children.push(predicate);
            Expr::And(children)
        }
        Some(other) => Expr::And(vec![other, predicate]),
    }
}

/// `left UNION right`
pub fn union(left: Statement, right: Statement) -> Statement {
    Statement::SetOperation {
        op: SetOperator::Union,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// `left UNION ALL right`
pub fn union_all(left: Statement, right: Statement) -> Statement {
    Statement::SetOperation {
        op: SetOperator::UnionAll,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Function call `name(args...)`
pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
        distinct: false,
    }
}

/// `count(*)`
pub fn count_star() -> Expr {
    call("count", vec![Expr::Star])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    #[test]
    fn test_filter_flattens_conjunction() {
        let select = SelectBuilder::new()
            .column("a")
            .from("t")
            .filter(Expr::binary(BinaryOp::Eq, Expr::column("a"), Expr::int(1)))
            .filter(Expr::binary(BinaryOp::Eq, Expr::column("b"), Expr::int(2)))
            .filter(Expr::binary(BinaryOp::Eq, Expr::column("c"), Expr::int(3)))
            .build_select();

        match select.selection {
            Some(Expr::And(children)) => assert_eq!(children.len(), 3),
            other => panic!("expected flat conjunction, got {other:?}"),
        }
    }

    #[test]
    fn test_join_attaches_to_last_entry() {
        let select = SelectBuilder::new()
            .wildcard()
            .from("t1")
            .from("t2")
            .join(
                "t3",
                Expr::binary(
                    BinaryOp::Eq,
                    Expr::qualified("t2", "id"),
                    Expr::qualified("t3", "id"),
                ),
            )
            .build_select();

        assert_eq!(select.from.len(), 2);
        assert!(matches!(select.from[1], TableExpr::Join { .. }));
    }

    #[test]
    fn test_union_rendering() {
        let statement = union_all(
            SelectBuilder::new().column("a").from("t1").build(),
            SelectBuilder::new().column("a").from("t2").limit(1).build(),
        );
        assert_eq!(
            statement.to_string(),
            "select a from t1 union all (select a from t2 limit 1)"
        );
    }
}
