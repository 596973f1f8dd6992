//! Clause-level removals on a query node.

use crate::ast::{Expr, JoinKind, QueryPath, Select, SetOperator, Statement, TableExpr};

/// Replace a set operation with either branch; demote `UNION ALL`
pub(super) fn collapse_set_operation(statement: &Statement, path: &QueryPath) -> Vec<Statement> {
    let Some(Statement::SetOperation { op, left, right }) = statement.query_at(path) else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    for branch in [left, right] {
        if let Some(candidate) = statement.replace_query(path, (**branch).clone()) {
            candidates.push(candidate);
        }
    }
    if *op == SetOperator::UnionAll {
        let demoted = Statement::SetOperation {
            op: SetOperator::Union,
            left: left.clone(),
            right: right.clone(),
        };
        if let Some(candidate) = statement.replace_query(path, demoted) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Apply `f` to each index in `0..len`, rewriting the query block at `path`
fn each_index<F>(statement: &Statement, path: &QueryPath, len: usize, f: F) -> Vec<Statement>
where
    F: Fn(&Select, usize) -> Option<Select>,
{
    (0..len)
        .filter_map(|i| statement.with_select(path, |select| f(select, i)))
        .collect()
}

pub(super) fn drop_select_item(statement: &Statement, path: &QueryPath) -> Vec<Statement> {
    let Some(select) = statement.select_at(path) else {
        return Vec::new();
    };
    if select.projection.len() < 2 {
        return Vec::new();
    }
    each_index(statement, path, select.projection.len(), |select, i| {
        let mut reduced = select.clone();
        reduced.projection.remove(i);
        Some(reduced)
    })
}

/// Predicates with conjunct `i` removed, for every `i`
fn without_each_conjunct(predicate: &Expr) -> Vec<Option<Expr>> {
    let conjuncts = predicate.conjuncts();
    (0..conjuncts.len())
        .map(|i| {
            Expr::from_conjuncts(
                conjuncts
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, conjunct)| (*conjunct).clone())
                    .collect(),
            )
        })
        .collect()
}

pub(super) fn drop_conjunct(statement: &Statement, path: &QueryPath) -> Vec<Statement> {
    let Some(select) = statement.select_at(path) else {
        return Vec::new();
    };
    let mut candidates = Vec::new();

    if let Some(selection) = &select.selection {
        for reduced in without_each_conjunct(selection) {
            candidates.extend(statement.with_select(path, |select| {
                Some(Select {
                    selection: reduced,
                    ..select.clone()
                })
            }));
        }
    }

    if let Some(having) = &select.having {
        for reduced in without_each_conjunct(having) {
            candidates.extend(statement.with_select(path, |select| {
                Some(Select {
                    having: reduced,
                    ..select.clone()
                })
            }));
        }
    }

    for join_path in select.join_condition_paths() {
        let Some(TableExpr::Join { on: Some(on), .. }) = select.relation_at(&join_path) else {
            continue;
        };
        for reduced in without_each_conjunct(on) {
            candidates.extend(statement.with_select(path, |select| {
                let mut rewritten = select.clone();
                let entry = rewritten.from.get(join_path.index)?;
                let relation = entry.map_relation(&join_path.sides, |join| match join {
                    TableExpr::Join {
                        kind, left, right, ..
                    } => {
                        let kind = if *kind == JoinKind::Left && reduced.is_none() {
                            JoinKind::Inner
                        } else {
                            *kind
                        };
                        Some(TableExpr::Join {
                            kind,
                            left: left.clone(),
                            right: right.clone(),
                            on: reduced,
                        })
                    }
                    TableExpr::Table { .. } => None,
                })?;
                rewritten.from[join_path.index] = relation;
                Some(rewritten)
            }));
        }
    }

    candidates
}

pub(super) fn drop_grouping_key(statement: &Statement, path: &QueryPath) -> Vec<Statement> {
    let Some(select) = statement.select_at(path) else {
        return Vec::new();
    };
    each_index(statement, path, select.group_by.len(), |select, i| {
        let mut reduced = select.clone();
        reduced.group_by.remove(i);
        Some(reduced)
    })
}

pub(super) fn drop_ordering_term(statement: &Statement, path: &QueryPath) -> Vec<Statement> {
    let Some(select) = statement.select_at(path) else {
        return Vec::new();
    };
    each_index(statement, path, select.order_by.len(), |select, i| {
        let mut reduced = select.clone();
        reduced.order_by.remove(i);
        Some(reduced)
    })
}

/// Drop LIMIT entirely, then try keeping the count without OFFSET
pub(super) fn drop_limit(statement: &Statement, path: &QueryPath) -> Vec<Statement> {
    let Some(limit) = statement.select_at(path).and_then(|select| select.limit) else {
        return Vec::new();
    };
    let mut candidates: Vec<Statement> = statement
        .with_select(path, |select| {
            Some(Select {
                limit: None,
                ..select.clone()
            })
        })
        .into_iter()
        .collect();
    if limit.offset.is_some() {
        candidates.extend(statement.with_select(path, |select| {
            let mut reduced = select.clone();
            reduced.limit = Some(crate::ast::Limit {
                count: limit.count,
                offset: None,
            });
            Some(reduced)
        }));
    }
    candidates
}

pub(super) fn drop_distinct(statement: &Statement, path: &QueryPath) -> Vec<Statement> {
    statement
        .with_select(path, |select| {
            select.distinct.then(|| Select {
                distinct: false,
                ..select.clone()
            })
        })
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_statement;

    fn rendered(
        rule: fn(&Statement, &QueryPath) -> Vec<Statement>,
        sql: &str,
        path: &QueryPath,
    ) -> Vec<String> {
        let statement = parse_statement(sql).unwrap();
        rule(&statement, path)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_collapse_union_all() {
        assert_eq!(
            rendered(
                collapse_set_operation,
                "select a from t union all select b from u",
                &Vec::new()
            ),
            vec![
                "select a from t",
                "select b from u",
                "select a from t union select b from u"
            ]
        );
    }

    #[test]
    fn test_collapse_nested_branch() {
        use crate::ast::Side;
        assert_eq!(
            rendered(
                collapse_set_operation,
                "select 1 union select 2 union select 3",
                &vec![Side::Left]
            ),
            vec!["select 1 union select 3", "select 2 union select 3"]
        );
    }

    #[test]
    fn test_drop_select_item_keeps_one() {
        assert_eq!(
            rendered(drop_select_item, "select a, b from t", &Vec::new()),
            vec!["select b from t", "select a from t"]
        );
        assert!(rendered(drop_select_item, "select a from t", &Vec::new()).is_empty());
    }

    #[test]
    fn test_drop_conjunct_in_every_clause() {
        assert_eq!(
            rendered(
                drop_conjunct,
                "select a from t1 left join t2 on t1.id = t2.id where a = 1 and b = 2 \
                 group by a having count(*) > 1",
                &Vec::new()
            ),
            vec![
                "select a from t1 left join t2 on t1.id = t2.id where b = 2 group by a having count(*) > 1",
                "select a from t1 left join t2 on t1.id = t2.id where a = 1 group by a having count(*) > 1",
                "select a from t1 left join t2 on t1.id = t2.id where a = 1 and b = 2 group by a",
                "select a from t1 join t2 where a = 1 and b = 2 group by a having count(*) > 1",
            ]
        );
    }

    #[test]
    fn test_drop_limit_then_offset() {
        assert_eq!(
            rendered(drop_limit, "select a from t limit 10 offset 5", &Vec::new()),
            vec!["select a from t", "select a from t limit 10"]
        );
        assert_eq!(
            rendered(drop_limit, "select a from t limit 10", &Vec::new()),
            vec!["select a from t"]
        );
    }

    #[test]
    fn test_drop_distinct() {
        assert_eq!(
            rendered(drop_distinct, "select distinct a from t", &Vec::new()),
            vec!["select a from t"]
        );
        assert!(rendered(drop_distinct, "select a from t", &Vec::new()).is_empty());
    }

    #[test]
    fn test_group_and_order_terms() {
        assert_eq!(
            rendered(drop_grouping_key, "select a from t group by a, b", &Vec::new()),
            vec!["select a from t group by b", "select a from t group by a"]
        );
        assert_eq!(
            rendered(drop_ordering_term, "select a from t order by a desc", &Vec::new()),
            vec!["select a from t"]
        );
    }
}
