//! `DropRelation`: remove one table from a query block.
//!
//! Removing a table that sits inside a join replaces the join with the
//! other side, so the join's own ON condition goes with it. Everything
//! else that names the table through a qualifier is scrubbed: select
//! items, conjuncts of WHERE/HAVING/other join conditions, grouping keys
//! and ordering terms. Unqualified columns are left alone; whether they
//! still resolve is for the oracle to find out.

use crate::ast::{Expr, JoinKind, QueryPath, Select, SelectItem, Side, Statement, TableExpr};

pub(super) fn drop_relation(statement: &Statement, path: &QueryPath) -> Vec<Statement> {
    let Some(select) = statement.select_at(path) else {
        return Vec::new();
    };
    let tables = select.table_paths();
    if tables.len() < 2 {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for table_path in tables {
        let Some(binding) = select
            .relation_at(&table_path)
            .and_then(TableExpr::binding)
            .map(str::to_string)
        else {
            continue;
        };

        let mut from = select.from.clone();
        if table_path.sides.is_empty() {
            from.remove(table_path.index);
        } else {
            match remove_leaf(&from[table_path.index], &table_path.sides) {
                Some(rest) => from[table_path.index] = rest,
                None => continue,
            }
        }

        let Some(reduced) = scrub(select, from, &binding) else {
            continue;
        };
        if let Some(candidate) = statement.replace_query(path, Statement::select(reduced)) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Remove the leaf at `sides`, replacing its parent join with the sibling
fn remove_leaf(relation: &TableExpr, sides: &[Side]) -> Option<TableExpr> {
    let (first, rest) = sides.split_first()?;
    let TableExpr::Join {
        kind,
        left,
        right,
        on,
    } = relation
    else {
        return None;
    };

    if rest.is_empty() {
        return Some(match first {
            Side::Left => (**right).clone(),
            Side::Right => (**left).clone(),
        });
    }

    let (left, right) = match first {
        Side::Left => (Box::new(remove_leaf(left, rest)?), right.clone()),
        Side::Right => (left.clone(), Box::new(remove_leaf(right, rest)?)),
    };
    Some(TableExpr::Join {
        kind: *kind,
        left,
        right,
        on: on.clone(),
    })
}

/// Rebuild `select` over `from`, without anything qualified by `binding`.
/// `None` when nothing would be left in the select list.
fn scrub(select: &Select, from: Vec<TableExpr>, binding: &str) -> Option<Select> {
    let projection: Vec<SelectItem> = select
        .projection
        .iter()
        .filter(|item| match item {
            SelectItem::Wildcard => true,
            SelectItem::QualifiedWildcard(table) => !table.eq_ignore_ascii_case(binding),
            SelectItem::Expr { expr, .. } => !expr.references_table(binding),
        })
        .cloned()
        .collect();
    if projection.is_empty() {
        return None;
    }

    Some(Select {
        distinct: select.distinct,
        projection,
        from: from
            .iter()
            .map(|relation| scrub_relation(relation, binding))
            .collect(),
        selection: select
            .selection
            .as_ref()
            .and_then(|predicate| scrub_predicate(predicate, binding)),
        group_by: select
            .group_by
            .iter()
            .filter(|key| !key.references_table(binding))
            .cloned()
            .collect(),
        having: select
            .having
            .as_ref()
            .and_then(|predicate| scrub_predicate(predicate, binding)),
        order_by: select
            .order_by
            .iter()
            .filter(|term| !term.expr.references_table(binding))
            .cloned()
            .collect(),
        limit: select.limit,
    })
}

/// Drop conjuncts that reference `binding`
fn scrub_predicate(predicate: &Expr, binding: &str) -> Option<Expr> {
    Expr::from_conjuncts(
        predicate
            .conjuncts()
            .into_iter()
            .filter(|conjunct| !conjunct.references_table(binding))
            .cloned()
            .collect(),
    )
}

/// Scrub every join condition; a left join left without one becomes inner
fn scrub_relation(relation: &TableExpr, binding: &str) -> TableExpr {
    match relation {
        TableExpr::Table { .. } => relation.clone(),
        TableExpr::Join {
            kind,
            left,
            right,
            on,
        } => {
            let on = on
                .as_ref()
                .and_then(|condition| scrub_predicate(condition, binding));
            let kind = if *kind == JoinKind::Left && on.is_none() {
                JoinKind::Inner
            } else {
                *kind
            };
            TableExpr::Join {
                kind,
                left: Box::new(scrub_relation(left, binding)),
                right: Box::new(scrub_relation(right, binding)),
                on,
            }
        }
    }
}
