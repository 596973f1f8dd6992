//! # SQL Statement Model
//!
//! Tree representation of the SQL statements the minimizer reduces:
//! a `SELECT` query block, or a set operation over two statements.
//!
//! Trees are immutable by convention. Every rewrite goes through the
//! path-based helpers in this module (`replace_expr`, `replace_query`,
//! `with_select`), which rebuild the parents along the path and leave the
//! input untouched, so candidates derived from the same base never alias.
//!
//! ## Size
//!
//! [`Size`] orders trees by `(node count, rendered text length)`. Every
//! reduction rule must produce a candidate that is strictly smaller under
//! this order, which is what makes the minimization loop terminate.
//!
//! ## Builders
//!
//! For programmatic construction, see the [`builders`] module.

use serde::Serialize;

pub mod builders;
mod display;
mod path;

pub use path::{Clause, ExprPath, QueryPath, RelationPath, Side};

/// Aggregate function names recognised by [`Expr::is_aggregate`]
pub const AGGREGATE_FUNCTIONS: &[&str] = &["count", "sum", "min", "max", "avg", "group_concat"];

// ============================================================================
// Size
// ============================================================================

/// Total order used to decide whether a candidate is smaller than its input.
///
/// Compared lexicographically: node count first, rendered length second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Size {
    /// Number of tree nodes
    pub nodes: usize,
    /// Length of the canonical rendering in bytes
    pub text_len: usize,
}

// ============================================================================
// Statement
// ============================================================================

/// Root of a SQL statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Statement {
    /// A single query block
    Select(Box<Select>),
    /// `left UNION [ALL] right`
    SetOperation {
        op: SetOperator,
        left: Box<Statement>,
        right: Box<Statement>,
    },
}

/// Set operator joining two statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOperator {
    Union,
    UnionAll,
}

impl SetOperator {
    /// Get the SQL keyword(s) for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            SetOperator::Union => "union",
            SetOperator::UnionAll => "union all",
        }
    }
}

impl Statement {
    /// Wrap a query block into a statement
    pub fn select(select: Select) -> Self {
        Statement::Select(Box::new(select))
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        match self {
            Statement::Select(select) => 1 + select.node_count(),
            Statement::SetOperation { left, right, .. } => {
                1 + left.node_count() + right.node_count()
            }
        }
    }

    /// Size of this statement under the reduction order
    pub fn size(&self) -> Size {
        Size {
            nodes: self.node_count(),
            text_len: self.to_string().len(),
        }
    }

    /// Get the query block if this statement is a plain SELECT
    pub fn as_select(&self) -> Option<&Select> {
        match self {
            Statement::Select(select) => Some(select),
            Statement::SetOperation { .. } => None,
        }
    }

    /// Check if this statement is a set operation
    pub fn is_set_operation(&self) -> bool {
        matches!(self, Statement::SetOperation { .. })
    }

    /// Get the sub-statement at `path`
    pub fn query_at(&self, path: &[Side]) -> Option<&Statement> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match self {
            Statement::SetOperation { left, right, .. } => match first {
                Side::Left => left.query_at(rest),
                Side::Right => right.query_at(rest),
            },
            Statement::Select(_) => None,
        }
    }

    /// Get the query block at `path`
    pub fn select_at(&self, path: &[Side]) -> Option<&Select> {
        self.query_at(path)?.as_select()
    }

    /// Return a new statement with the sub-statement at `path` replaced
    pub fn replace_query(&self, path: &[Side], replacement: Statement) -> Option<Statement> {
        let Some((first, rest)) = path.split_first() else {
            return Some(replacement);
        };
        match self {
            Statement::SetOperation { op, left, right } => match first {
                Side::Left => Some(Statement::SetOperation {
                    op: *op,
                    left: Box::new(left.replace_query(rest, replacement)?),
                    right: right.clone(),
                }),
                Side::Right => Some(Statement::SetOperation {
                    op: *op,
                    left: left.clone(),
                    right: Box::new(right.replace_query(rest, replacement)?),
                }),
            },
            Statement::Select(_) => None,
        }
    }

    /// Rewrite the query block at `path` through `f`
    ///
    /// Returns `None` when the path does not address a query block or when
    /// `f` declines to produce a rewrite.
    pub fn with_select<F>(&self, path: &[Side], f: F) -> Option<Statement>
    where
        F: FnOnce(&Select) -> Option<Select>,
    {
        let rewritten = f(self.select_at(path)?)?;
        self.replace_query(path, Statement::select(rewritten))
    }

    /// Get the expression addressed by `path`
    pub fn expr_at(&self, path: &ExprPath) -> Option<&Expr> {
        self.select_at(&path.query)?
            .clause_expr(&path.clause)?
            .at(&path.steps)
    }

    /// Return a new statement with the expression at `path` replaced
    pub fn replace_expr(&self, path: &ExprPath, replacement: Expr) -> Option<Statement> {
        self.with_select(&path.query, |select| {
            let root = select.clause_expr(&path.clause)?;
            let rewritten = root.replace_at(&path.steps, replacement)?;
            select.with_clause_expr(&path.clause, rewritten)
        })
    }
}

// ============================================================================
// Select
// ============================================================================

/// A single `SELECT` query block
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Select {
    /// `SELECT DISTINCT`
    pub distinct: bool,
    /// Select list (never empty in a well-formed statement)
    pub projection: Vec<SelectItem>,
    /// Comma-separated source relations
    pub from: Vec<TableExpr>,
    /// `WHERE` predicate
    pub selection: Option<Expr>,
    /// `GROUP BY` keys
    pub group_by: Vec<Expr>,
    /// `HAVING` predicate
    pub having: Option<Expr>,
    /// `ORDER BY` terms
    pub order_by: Vec<OrderTerm>,
    /// `LIMIT n [OFFSET m]`
    pub limit: Option<Limit>,
}

/// `LIMIT count [OFFSET offset]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limit {
    pub count: u64,
    pub offset: Option<u64>,
}

/// One entry of the select list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// `t.*`
    QualifiedWildcard(String),
    /// `expr [AS alias]`
    Expr { expr: Expr, alias: Option<String> },
}

/// One `ORDER BY` term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderTerm {
    pub expr: Expr,
    pub descending: bool,
}

impl Select {
    /// Number of nodes in this query block
    pub fn node_count(&self) -> usize {
        let mut count = usize::from(self.distinct);
        count += self
            .projection
            .iter()
            .map(|item| match item {
                SelectItem::Wildcard | SelectItem::QualifiedWildcard(_) => 1,
                SelectItem::Expr { expr, .. } => expr.node_count(),
            })
            .sum::<usize>();
        count += self.from.iter().map(TableExpr::node_count).sum::<usize>();
        count += self.selection.as_ref().map_or(0, Expr::node_count);
        count += self.group_by.iter().map(Expr::node_count).sum::<usize>();
        count += self.having.as_ref().map_or(0, Expr::node_count);
        count += self
            .order_by
            .iter()
            .map(|term| term.expr.node_count())
            .sum::<usize>();
        count += self
            .limit
            .map_or(0, |limit| 1 + usize::from(limit.offset.is_some()));
        count
    }

    /// Get the root expression of a clause
    pub fn clause_expr(&self, clause: &Clause) -> Option<&Expr> {
        match clause {
            Clause::Projection(i) => match self.projection.get(*i)? {
                SelectItem::Expr { expr, .. } => Some(expr),
                SelectItem::Wildcard | SelectItem::QualifiedWildcard(_) => None,
            },
            Clause::JoinCondition(path) => match self.relation_at(path)? {
                TableExpr::Join { on, .. } => on.as_ref(),
                TableExpr::Table { .. } => None,
            },
            Clause::Selection => self.selection.as_ref(),
            Clause::GroupBy(i) => self.group_by.get(*i),
            Clause::Having => self.having.as_ref(),
            Clause::OrderBy(i) => self.order_by.get(*i).map(|term| &term.expr),
        }
    }

    /// Return a copy with the root expression of `clause` replaced
    pub fn with_clause_expr(&self, clause: &Clause, expr: Expr) -> Option<Select> {
        let mut select = self.clone();
        match clause {
            Clause::Projection(i) => match select.projection.get_mut(*i)? {
                SelectItem::Expr { expr: slot, .. } => *slot = expr,
                SelectItem::Wildcard | SelectItem::QualifiedWildcard(_) => return None,
            },
            Clause::JoinCondition(path) => {
                let entry = select.from.get(path.index)?;
                let rewritten = entry.map_relation(&path.sides, |relation| match relation {
                    TableExpr::Join {
                        kind,
                        left,
                        right,
                        on: Some(_),
                    } => Some(TableExpr::Join {
                        kind: *kind,
                        left: left.clone(),
                        right: right.clone(),
                        on: Some(expr),
                    }),
                    _ => None,
                })?;
                select.from[path.index] = rewritten;
            }
            Clause::Selection => {
                select.selection.as_ref()?;
                select.selection = Some(expr);
            }
            Clause::GroupBy(i) => *select.group_by.get_mut(*i)? = expr,
            Clause::Having => {
                select.having.as_ref()?;
                select.having = Some(expr);
            }
            Clause::OrderBy(i) => select.order_by.get_mut(*i)?.expr = expr,
        }
        Some(select)
    }

    /// Get the relation addressed by `path`
    pub fn relation_at(&self, path: &RelationPath) -> Option<&TableExpr> {
        self.from.get(path.index)?.relation_at(&path.sides)
    }

    /// Paths of every table leaf, in pre-order
    pub fn table_paths(&self) -> Vec<RelationPath> {
        let mut paths = Vec::new();
        for (index, entry) in self.from.iter().enumerate() {
            entry.collect_paths(&mut Vec::new(), &mut |sides, relation| {
                if matches!(relation, TableExpr::Table { .. }) {
                    paths.push(RelationPath {
                        index,
                        sides: sides.to_vec(),
                    });
                }
            });
        }
        paths
    }

    /// Paths of every join carrying an ON condition, in pre-order
    pub fn join_condition_paths(&self) -> Vec<RelationPath> {
        let mut paths = Vec::new();
        for (index, entry) in self.from.iter().enumerate() {
            entry.collect_paths(&mut Vec::new(), &mut |sides, relation| {
                if matches!(relation, TableExpr::Join { on: Some(_), .. }) {
                    paths.push(RelationPath {
                        index,
                        sides: sides.to_vec(),
                    });
                }
            });
        }
        paths
    }

    /// Check if any select item, or the HAVING clause, uses an aggregate
    pub fn has_aggregate(&self) -> bool {
        self.projection.iter().any(|item| match item {
            SelectItem::Expr { expr, .. } => expr.contains_aggregate(),
            SelectItem::Wildcard | SelectItem::QualifiedWildcard(_) => false,
        }) || self.having.as_ref().is_some_and(Expr::contains_aggregate)
    }
}

// ============================================================================
// Relations
// ============================================================================

/// Join kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
    Cross,
}

impl JoinKind {
    /// Get the SQL keyword(s) for this join
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "join",
            JoinKind::Left => "left join",
            JoinKind::Cross => "cross join",
        }
    }
}

/// A source relation: a table reference or a join of two relations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableExpr {
    /// `name [AS alias]`
    Table { name: String, alias: Option<String> },
    /// `left <kind> right [ON condition]`
    Join {
        kind: JoinKind,
        left: Box<TableExpr>,
        right: Box<TableExpr>,
        on: Option<Expr>,
    },
}

impl TableExpr {
    /// Create a table reference without alias
    pub fn table(name: impl Into<String>) -> Self {
        TableExpr::Table {
            name: name.into(),
            alias: None,
        }
    }

    /// Number of nodes in this relation tree
    pub fn node_count(&self) -> usize {
        match self {
            TableExpr::Table { .. } => 1,
            TableExpr::Join {
                left, right, on, ..
            } => 1 + left.node_count() + right.node_count() + on.as_ref().map_or(0, Expr::node_count),
        }
    }

    /// Name a table leaf is referenced by: its alias, or its name
    pub fn binding(&self) -> Option<&str> {
        match self {
            TableExpr::Table { name, alias } => Some(alias.as_deref().unwrap_or(name)),
            TableExpr::Join { .. } => None,
        }
    }

    /// Get the relation reached by descending through `sides`
    pub fn relation_at(&self, sides: &[Side]) -> Option<&TableExpr> {
        let Some((first, rest)) = sides.split_first() else {
            return Some(self);
        };
        match self {
            TableExpr::Join { left, right, .. } => match first {
                Side::Left => left.relation_at(rest),
                Side::Right => right.relation_at(rest),
            },
            TableExpr::Table { .. } => None,
        }
    }

    /// Rebuild this relation with the node at `sides` rewritten through `f`
    pub fn map_relation<F>(&self, sides: &[Side], f: F) -> Option<TableExpr>
    where
        F: FnOnce(&TableExpr) -> Option<TableExpr>,
    {
        let Some((first, rest)) = sides.split_first() else {
            return f(self);
        };
        match self {
            TableExpr::Join {
                kind,
                left,
                right,
                on,
            } => {
                let (left, right) = match first {
                    Side::Left => (Box::new(left.map_relation(rest, f)?), right.clone()),
                    Side::Right => (left.clone(), Box::new(right.map_relation(rest, f)?)),
                };
                Some(TableExpr::Join {
                    kind: *kind,
                    left,
                    right,
                    on: on.clone(),
                })
            }
            TableExpr::Table { .. } => None,
        }
    }

    /// Table leaves of this relation, in pre-order
    pub fn tables(&self) -> Vec<&TableExpr> {
        match self {
            TableExpr::Table { .. } => vec![self],
            TableExpr::Join { left, right, .. } => {
                let mut tables = left.tables();
                tables.extend(right.tables());
                tables
            }
        }
    }

    fn collect_paths<'a, F>(&'a self, sides: &mut Vec<Side>, visit: &mut F)
    where
        F: FnMut(&[Side], &'a TableExpr),
    {
        visit(sides, self);
        if let TableExpr::Join { left, right, .. } = self {
            sides.push(Side::Left);
            left.collect_paths(sides, visit);
            sides.pop();
            sides.push(Side::Right);
            right.collect_paths(sides, visit);
            sides.pop();
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// Literal value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Null,
    Bool(bool),
    /// Unsigned integer; negative numbers are `Expr::Negate` over a literal
    Int(u64),
    /// Decimal number, kept as written so rendering is lossless
    Decimal(String),
    String(String),
}

impl Literal {
    /// Simplest literal of the same type
    pub fn simplest_of_same_type(&self) -> Literal {
        match self {
            Literal::Null => Literal::Null,
            Literal::Bool(_) => Literal::Bool(false),
            Literal::Int(_) | Literal::Decimal(_) => Literal::Int(0),
            Literal::String(_) => Literal::String(String::new()),
        }
    }
}

/// Column reference, optionally qualified by a table name or alias
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
}

impl BinaryOp {
    /// Get the SQL spelling of this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Like => "like",
            BinaryOp::NotLike => "not like",
        }
    }

    /// Comparison operators (including `LIKE`) yield booleans
    pub fn is_comparison(&self) -> bool {
        !self.is_arithmetic()
    }

    /// `+ - * / %`
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Literal(Literal),
    Column(ColumnRef),
    /// `*` as a function argument, as in `count(*)`
    Star,
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary minus
    Negate(Box<Expr>),
    Not(Box<Expr>),
    /// Conjunction of two or more predicates
    And(Vec<Expr>),
    /// Disjunction of two or more predicates
    Or(Vec<Expr>),
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
}

impl Expr {
    /// Unqualified column reference
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef {
            table: None,
            name: name.into(),
        })
    }

    /// Qualified column reference
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef {
            table: Some(table.into()),
            name: name.into(),
        })
    }

    /// Integer literal
    pub fn int(value: u64) -> Self {
        Expr::Literal(Literal::Int(value))
    }

    /// String literal
    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into()))
    }

    /// Binary expression
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Build a predicate from conjuncts: `None` for zero, the conjunct
    /// itself for one, `And` otherwise
    pub fn from_conjuncts(mut conjuncts: Vec<Expr>) -> Option<Expr> {
        match conjuncts.len() {
            0 => None,
            1 => conjuncts.pop(),
            _ => Some(Expr::And(conjuncts)),
        }
    }

    /// Top-level conjuncts of a predicate
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::And(children) => children.iter().collect(),
            other => vec![other],
        }
    }

    /// Number of nodes in this expression
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Direct children, in rendering order
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Column(_) | Expr::Star => Vec::new(),
            Expr::Function { args, .. } => args.iter().collect(),
            Expr::Binary { left, right, .. } => vec![&**left, &**right],
            Expr::Negate(expr) | Expr::Not(expr) | Expr::IsNull { expr, .. } => vec![&**expr],
            Expr::And(children) | Expr::Or(children) => children.iter().collect(),
            Expr::InList { expr, list, .. } => {
                let mut children = vec![&**expr];
                children.extend(list.iter());
                children
            }
        }
    }

    /// Get the descendant reached by following child indexes
    pub fn at(&self, steps: &[usize]) -> Option<&Expr> {
        let Some((first, rest)) = steps.split_first() else {
            return Some(self);
        };
        self.children().get(*first)?.at(rest)
    }

    /// Return a copy with the descendant at `steps` replaced
    pub fn replace_at(&self, steps: &[usize], replacement: Expr) -> Option<Expr> {
        let Some((first, rest)) = steps.split_first() else {
            return Some(replacement);
        };
        let child = self.children().get(*first)?.replace_at(rest, replacement)?;
        self.with_child(*first, child)
    }

    /// Return a copy with direct child `index` replaced
    pub fn with_child(&self, index: usize, child: Expr) -> Option<Expr> {
        let mut expr = self.clone();
        match &mut expr {
            Expr::Literal(_) | Expr::Column(_) | Expr::Star => return None,
            Expr::Function { args, .. } => *args.get_mut(index)? = child,
            Expr::Binary { left, right, .. } => match index {
                0 => **left = child,
                1 => **right = child,
                _ => return None,
            },
            Expr::Negate(inner) | Expr::Not(inner) | Expr::IsNull { expr: inner, .. } => {
                if index != 0 {
                    return None;
                }
                **inner = child;
            }
            Expr::And(children) | Expr::Or(children) => *children.get_mut(index)? = child,
            Expr::InList { expr: inner, list, .. } => {
                if index == 0 {
                    **inner = child;
                } else {
                    *list.get_mut(index - 1)? = child;
                }
            }
        }
        Some(expr)
    }

    /// Every column reference in this expression, in pre-order
    pub fn column_refs(&self) -> Vec<&ColumnRef> {
        let mut refs = Vec::new();
        self.collect_column_refs(&mut refs);
        refs
    }

    fn collect_column_refs<'a>(&'a self, refs: &mut Vec<&'a ColumnRef>) {
        if let Expr::Column(column) = self {
            refs.push(column);
        }
        for child in self.children() {
            child.collect_column_refs(refs);
        }
    }

    /// Check if any column in this expression is qualified by `binding`
    pub fn references_table(&self, binding: &str) -> bool {
        self.column_refs().iter().any(|column| {
            column
                .table
                .as_deref()
                .is_some_and(|table| table.eq_ignore_ascii_case(binding))
        })
    }

    /// Check if this is a call to an aggregate function
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expr::Function { name, .. } => AGGREGATE_FUNCTIONS
                .iter()
                .any(|agg| agg.eq_ignore_ascii_case(name)),
            _ => false,
        }
    }

    /// Check if this expression contains an aggregate call anywhere
    pub fn contains_aggregate(&self) -> bool {
        self.is_aggregate() || self.children().iter().any(|c| c.contains_aggregate())
    }

    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }

    /// Check if this expression evaluates to a boolean
    pub fn is_predicate(&self) -> bool {
        match self {
            Expr::Binary { op, .. } => op.is_comparison(),
            Expr::Not(_)
            | Expr::And(_)
            | Expr::Or(_)
            | Expr::IsNull { .. }
            | Expr::InList { .. }
            | Expr::Literal(Literal::Bool(_)) => true,
            _ => false,
        }
    }

    /// Get the column reference if this is a column
    pub fn as_column(&self) -> Option<&ColumnRef> {
        if let Expr::Column(column) = self {
            Some(column)
        } else {
            None
        }
    }

    /// Rendered length of this expression on its own
    pub fn text_len(&self) -> usize {
        self.to_string().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Statement {
        Statement::select(Select {
            projection: vec![
                SelectItem::Expr {
                    expr: Expr::column("a"),
                    alias: None,
                },
                SelectItem::Expr {
                    expr: Expr::column("b"),
                    alias: None,
                },
            ],
            from: vec![TableExpr::Join {
                kind: JoinKind::Inner,
                left: Box::new(TableExpr::table("t1")),
                right: Box::new(TableExpr::table("t2")),
                on: Some(Expr::binary(
                    BinaryOp::Eq,
                    Expr::qualified("t1", "id"),
                    Expr::qualified("t2", "id"),
                )),
            }],
            selection: Some(Expr::And(vec![
                Expr::binary(BinaryOp::Gt, Expr::column("a"), Expr::int(1)),
                Expr::binary(BinaryOp::Lt, Expr::column("b"), Expr::int(2)),
            ])),
            limit: Some(Limit {
                count: 10,
                offset: None,
            }),
            ..Select::default()
        })
    }

    #[test]
    fn test_node_count() {
        // statement + 2 items + join(1 + 2 tables + 3 on) + and(1 + 3 + 3) + limit
        assert_eq!(sample().node_count(), 1 + 2 + 6 + 7 + 1);
    }

    #[test]
    fn test_size_orders_nodes_first() {
        let small = Size {
            nodes: 2,
            text_len: 100,
        };
        let large = Size {
            nodes: 3,
            text_len: 1,
        };
        assert!(small < large);
    }

    #[test]
    fn test_replace_expr_leaves_original_untouched() {
        let original = sample();
        let path = ExprPath {
            query: Vec::new(),
            clause: Clause::Selection,
            steps: vec![1, 1],
        };
        let rewritten = original.replace_expr(&path, Expr::int(0)).unwrap();

        assert_eq!(original.expr_at(&path), Some(&Expr::int(2)));
        assert_eq!(rewritten.expr_at(&path), Some(&Expr::int(0)));
        assert_ne!(original, rewritten);
    }

    #[test]
    fn test_join_condition_path() {
        let statement = sample();
        let select = statement.as_select().unwrap();
        let paths = select.join_condition_paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].sides.is_empty());
        assert_eq!(select.table_paths().len(), 2);
    }

    #[test]
    fn test_references_table_is_case_insensitive() {
        let expr = Expr::qualified("T1", "id");
        assert!(expr.references_table("t1"));
        assert!(!expr.references_table("t2"));
        assert!(!Expr::column("id").references_table("t1"));
    }

    #[test]
    fn test_with_child_out_of_range() {
        let expr = Expr::binary(BinaryOp::Add, Expr::int(1), Expr::int(2));
        assert!(expr.with_child(2, Expr::int(3)).is_none());
        assert!(Expr::int(1).with_child(0, Expr::int(3)).is_none());
    }

    #[test]
    fn test_contains_aggregate() {
        let expr = Expr::binary(
            BinaryOp::Add,
            Expr::Function {
                name: "COUNT".to_string(),
                args: vec![Expr::Star],
                distinct: false,
            },
            Expr::int(1),
        );
        assert!(expr.contains_aggregate());
        assert!(!expr.is_aggregate());
    }
}
