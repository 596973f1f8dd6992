//! Canonical SQL rendering.
//!
//! Keywords are lowercase, operators are spaced, and parentheses appear
//! only where operator precedence requires them. Identifiers that collide
//! with keywords (or are not plain words) are backtick-quoted. The parser
//! reads this output back into an equal tree.

use super::{
    ColumnRef, Expr, Limit, Literal, OrderTerm, Select, SelectItem, Statement, TableExpr,
};
use crate::parser::is_reserved_word;
use std::fmt;

// Binding strength, loosest first
const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_NOT: u8 = 3;
const PREC_COMPARISON: u8 = 4;
const PREC_ADDITIVE: u8 = 5;
const PREC_MULTIPLICATIVE: u8 = 6;
const PREC_UNARY: u8 = 7;
const PREC_ATOM: u8 = 8;

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Expr::Or(_) => PREC_OR,
            Expr::And(_) => PREC_AND,
            Expr::Not(_) => PREC_NOT,
            Expr::Binary { op, .. } if op.is_comparison() => PREC_COMPARISON,
            Expr::IsNull { .. } | Expr::InList { .. } => PREC_COMPARISON,
            Expr::Binary { op, .. } => match op {
                super::BinaryOp::Add | super::BinaryOp::Sub => PREC_ADDITIVE,
                _ => PREC_MULTIPLICATIVE,
            },
            Expr::Negate(_) => PREC_UNARY,
            Expr::Literal(_) | Expr::Column(_) | Expr::Star | Expr::Function { .. } => PREC_ATOM,
        }
    }
}

/// Write `expr`, parenthesized when it binds looser than `min_prec`
fn fmt_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min_prec: u8) -> fmt::Result {
    if expr.precedence() < min_prec {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn fmt_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn is_plain_word(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Write an identifier, quoting it when it would not lex back as one
pub(crate) fn fmt_ident(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_plain_word(name) && !is_reserved_word(name) {
        write!(f, "{name}")
    } else {
        write!(f, "`{}`", name.replace('`', "``"))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(true) => write!(f, "true"),
            Literal::Bool(false) => write!(f, "false"),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Decimal(text) => write!(f, "{text}"),
            Literal::String(value) => write!(f, "'{}'", value.replace('\'', "''")),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            fmt_ident(f, table)?;
            write!(f, ".")?;
        }
        fmt_ident(f, &self.name)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(literal) => write!(f, "{literal}"),
            Expr::Column(column) => write!(f, "{column}"),
            Expr::Star => write!(f, "*"),
            Expr::Function {
                name,
                args,
                distinct,
            } => {
                fmt_ident(f, name)?;
                write!(f, "(")?;
                if *distinct {
                    write!(f, "distinct ")?;
                }
                fmt_list(f, args)?;
                write!(f, ")")
            }
            Expr::Binary { op, left, right } => {
                let prec = self.precedence();
                // Comparisons do not chain; arithmetic is left-associative
                let (left_min, right_min) = if op.is_comparison() {
                    (prec + 1, prec + 1)
                } else {
                    (prec, prec + 1)
                };
                fmt_operand(f, left, left_min)?;
                write!(f, " {} ", op.as_str())?;
                fmt_operand(f, right, right_min)
            }
            Expr::Negate(inner) => {
                write!(f, "-")?;
                fmt_operand(f, inner, PREC_ATOM)
            }
            Expr::Not(inner) => {
                write!(f, "not ")?;
                fmt_operand(f, inner, PREC_NOT)
            }
            Expr::And(children) | Expr::Or(children) => {
                let (keyword, min) = if matches!(self, Expr::And(_)) {
                    ("and", PREC_NOT)
                } else {
                    ("or", PREC_AND)
                };
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {keyword} ")?;
                    }
                    fmt_operand(f, child, min)?;
                }
                Ok(())
            }
            Expr::IsNull { expr, negated } => {
                fmt_operand(f, expr, PREC_ADDITIVE)?;
                if *negated {
                    write!(f, " is not null")
                } else {
                    write!(f, " is null")
                }
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                fmt_operand(f, expr, PREC_ADDITIVE)?;
                if *negated {
                    write!(f, " not in (")?;
                } else {
                    write!(f, " in (")?;
                }
                fmt_list(f, list)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectItem::Wildcard => write!(f, "*"),
            SelectItem::QualifiedWildcard(table) => {
                fmt_ident(f, table)?;
                write!(f, ".*")
            }
            SelectItem::Expr { expr, alias } => {
                write!(f, "{expr}")?;
                if let Some(alias) = alias {
                    write!(f, " as ")?;
                    fmt_ident(f, alias)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for TableExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableExpr::Table { name, alias } => {
                fmt_ident(f, name)?;
                if let Some(alias) = alias {
                    write!(f, " as ")?;
                    fmt_ident(f, alias)?;
                }
                Ok(())
            }
            TableExpr::Join {
                kind,
                left,
                right,
                on,
            } => {
                write!(f, "{left} {} ", kind.as_str())?;
                // Joins are left-associative: a nested join on the right needs parens
                if matches!(**right, TableExpr::Join { .. }) {
                    write!(f, "({right})")?;
                } else {
                    write!(f, "{right}")?;
                }
                if let Some(on) = on {
                    write!(f, " on {on}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for OrderTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if self.descending {
            write!(f, " desc")?;
        }
        Ok(())
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "limit {}", self.count)?;
        if let Some(offset) = self.offset {
            write!(f, " offset {offset}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select ")?;
        if self.distinct {
            write!(f, "distinct ")?;
        }
        fmt_list(f, &self.projection)?;
        if !self.from.is_empty() {
            write!(f, " from ")?;
            fmt_list(f, &self.from)?;
        }
        if let Some(selection) = &self.selection {
            write!(f, " where {selection}")?;
        }
        if !self.group_by.is_empty() {
            write!(f, " group by ")?;
            fmt_list(f, &self.group_by)?;
        }
        if let Some(having) = &self.having {
            write!(f, " having {having}")?;
        }
        if !self.order_by.is_empty() {
            write!(f, " order by ")?;
            fmt_list(f, &self.order_by)?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " {limit}")?;
        }
        Ok(())
    }
}

impl Statement {
    /// Set-operation branches carrying their own ORDER BY or LIMIT must be
    /// parenthesized, or the clause would bind to the whole set operation
    fn needs_parens_as_branch(&self) -> bool {
        match self {
            Statement::Select(select) => !select.order_by.is_empty() || select.limit.is_some(),
            Statement::SetOperation { .. } => false,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select(select) => write!(f, "{select}"),
            Statement::SetOperation { op, left, right } => {
                if left.needs_parens_as_branch() {
                    write!(f, "({left})")?;
                } else {
                    write!(f, "{left}")?;
                }
                write!(f, " {} ", op.as_str())?;
                if right.is_set_operation() || right.needs_parens_as_branch() {
                    write!(f, "({right})")
                } else {
                    write!(f, "{right}")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::BinaryOp;
    use super::*;

    #[test]
    fn test_arithmetic_parens() {
        // a - (b - c)
        let expr = Expr::binary(
            BinaryOp::Sub,
            Expr::column("a"),
            Expr::binary(BinaryOp::Sub, Expr::column("b"), Expr::column("c")),
        );
        assert_eq!(expr.to_string(), "a - (b - c)");

        // (a - b) - c
        let expr = Expr::binary(
            BinaryOp::Sub,
            Expr::binary(BinaryOp::Sub, Expr::column("a"), Expr::column("b")),
            Expr::column("c"),
        );
        assert_eq!(expr.to_string(), "a - b - c");
    }

    #[test]
    fn test_nested_connectives_are_parenthesized() {
        let inner = Expr::And(vec![Expr::column("a"), Expr::column("b")]);
        let outer = Expr::And(vec![inner, Expr::column("c")]);
        assert_eq!(outer.to_string(), "(a and b) and c");

        let or = Expr::Or(vec![Expr::column("a"), Expr::column("b")]);
        let and = Expr::And(vec![or, Expr::column("c")]);
        assert_eq!(and.to_string(), "(a or b) and c");
    }

    #[test]
    fn test_double_negation() {
        let expr = Expr::Negate(Box::new(Expr::Negate(Box::new(Expr::int(5)))));
        assert_eq!(expr.to_string(), "-(-5)");
    }

    #[test]
    fn test_reserved_identifiers_are_quoted() {
        assert_eq!(Expr::qualified("order", "select").to_string(), "`order`.`select`");
        assert_eq!(Expr::column("user").to_string(), "user");
        assert_eq!(Expr::column("my col").to_string(), "`my col`");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(Expr::string("it's").to_string(), "'it''s'");
    }
}
