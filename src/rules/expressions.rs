//! Expression-level rewrites at one expression location.

use crate::ast::{ColumnRef, Expr, ExprPath, Literal, Statement};

/// Check if `replacement` is strictly smaller than `original` on its own.
/// Rules that keep the node count must win on rendered length.
fn shrinks(original: &Expr, replacement: &Expr) -> bool {
    (replacement.node_count(), replacement.text_len()) < (original.node_count(), original.text_len())
}

fn replace_all(statement: &Statement, path: &ExprPath, replacements: Vec<Expr>) -> Vec<Statement> {
    replacements
        .into_iter()
        .filter_map(|replacement| statement.replace_expr(path, replacement))
        .collect()
}

/// `AND`/`OR` to a single child or to all but one child; `NOT x` to `x`
pub(super) fn collapse_connective(statement: &Statement, path: &ExprPath) -> Vec<Statement> {
    let Some(expr) = statement.expr_at(path) else {
        return Vec::new();
    };
    let replacements = match expr {
        Expr::And(children) | Expr::Or(children) => {
            let mut replacements: Vec<Expr> = children.clone();
            if children.len() > 2 {
                for i in 0..children.len() {
                    let rest: Vec<Expr> = children
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .map(|(_, child)| child.clone())
                        .collect();
                    replacements.push(match expr {
                        Expr::And(_) => Expr::And(rest),
                        _ => Expr::Or(rest),
                    });
                }
            }
            replacements
        }
        Expr::Not(inner) => vec![(**inner).clone()],
        _ => Vec::new(),
    };
    replace_all(statement, path, replacements)
}

/// Simplest literal an expression can be replaced with
fn simplest_literal(expr: &Expr) -> Expr {
    if expr.is_predicate() {
        Expr::Literal(Literal::Bool(true))
    } else {
        Expr::int(0)
    }
}

/// Operand promotion, literal replacement, and the small structural drops
/// that keep an expression's shape
pub(super) fn simplify_expression(statement: &Statement, path: &ExprPath) -> Vec<Statement> {
    let Some(expr) = statement.expr_at(path) else {
        return Vec::new();
    };
    let mut replacements = Vec::new();

    match expr {
        Expr::Literal(literal) => {
            let simpler = Expr::Literal(literal.simplest_of_same_type());
            if shrinks(expr, &simpler) {
                replacements.push(simpler);
            }
        }
        Expr::Column(ColumnRef {
            table: Some(_),
            name,
        }) => {
            replacements.push(Expr::column(name.clone()));
        }
        Expr::Column(_) | Expr::Star => {}
        Expr::And(_) | Expr::Or(_) | Expr::Not(_) => {
            // Children are handled by CollapseConnective
            replacements.push(simplest_literal(expr));
        }
        Expr::Function {
            name,
            args,
            distinct,
        } => {
            replacements.extend(args.iter().filter(|arg| **arg != Expr::Star).cloned());
            if *distinct {
                replacements.push(Expr::Function {
                    name: name.clone(),
                    args: args.clone(),
                    distinct: false,
                });
            }
            replacements.push(simplest_literal(expr));
        }
        Expr::InList {
            expr: operand,
            list,
            negated,
        } => {
            replacements.push((**operand).clone());
            if list.len() > 1 {
                for i in 0..list.len() {
                    let mut shorter = list.clone();
                    shorter.remove(i);
                    replacements.push(Expr::InList {
                        expr: operand.clone(),
                        list: shorter,
                        negated: *negated,
                    });
                }
            }
            replacements.push(simplest_literal(expr));
        }
        Expr::Binary { .. } | Expr::Negate(_) | Expr::IsNull { .. } => {
            replacements.extend(expr.children().into_iter().cloned());
            replacements.push(simplest_literal(expr));
        }
    }

    replacements.retain(|replacement| shrinks(expr, replacement));
    replace_all(statement, path, replacements)
}

/// Replace a non-literal comparison operand with the simplest literal of
/// the other operand's type (an integer when the other side says nothing)
pub(super) fn literalize_operand(statement: &Statement, path: &ExprPath) -> Vec<Statement> {
    let Some(Expr::Binary { op, left, right }) = statement.expr_at(path) else {
        return Vec::new();
    };
    if !op.is_comparison() {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for (index, operand, other) in [(0, left, right), (1, right, left)] {
        if operand.is_literal() {
            continue;
        }
        let literal = match &**other {
            Expr::Literal(literal) => Expr::Literal(literal.simplest_of_same_type()),
            _ => Expr::int(0),
        };
        if shrinks(operand, &literal) {
            candidates.extend(statement.replace_expr(&path.child(index), literal));
        }
    }
    candidates
}
