//! # SQL Parser
//!
//! Lexes and parses the supported SQL subset into a [`Statement`].
//! Handles single query blocks, `UNION [ALL]` chains with parenthesized
//! branches, comma and explicit joins, and the expression grammar the
//! renderer emits (so `parse_statement(&s.to_string()) == s`).
//!
//! ## Precedence (loosest first)
//!
//! `OR`, `AND`, `NOT`, comparison / `IS NULL` / `IN` / `LIKE`,
//! `+ -`, `* / %`, unary minus.

mod lexer;

use crate::ast::{
    BinaryOp, ColumnRef, Expr, JoinKind, Limit, Literal, OrderTerm, Select, SelectItem,
    SetOperator, Statement, TableExpr,
};
use lexer::{Keyword, Spanned, Token};
use thiserror::Error;

/// Error produced when SQL text cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at offset {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the source
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        ParseError {
            message: message.into(),
            offset,
        }
    }
}

/// Check if `word` is reserved and must be quoted to be used as an identifier
pub fn is_reserved_word(word: &str) -> bool {
    lexer::keyword(word).is_some()
}

/// Parse one SQL statement, optionally terminated by `;`
pub fn parse_statement(source: &str) -> Result<Statement, ParseError> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let statement = parser.parse_set_expr()?;
    parser.eat(&Token::Semicolon);
    parser.expect_end()?;
    Ok(statement)
}

/// Parse a standalone expression
pub fn parse_expr(source: &str) -> Result<Expr, ParseError> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    // ========================================================================
    // Token cursor
    // ========================================================================

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[index].token
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.eat(&Token::Keyword(keyword))
    }

    fn is_keyword(&self, keyword: Keyword) -> bool {
        *self.peek() == Token::Keyword(keyword)
    }

    fn error(&self, expected: &str) -> ParseError {
        ParseError::new(
            format!("expected {expected}, found {}", describe(self.peek())),
            self.offset(),
        )
    }

    fn expect(&mut self, token: &Token, expected: &str) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(&format!("{keyword:?}").to_lowercase()))
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if *self.peek() == Token::Eof {
            Ok(())
        } else {
            Err(self.error("end of input"))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<String, ParseError> {
        match self.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(expected)),
        }
    }

    fn expect_int(&mut self, expected: &str) -> Result<u64, ParseError> {
        match self.peek() {
            Token::Int(value) => {
                let value = *value;
                self.advance();
                Ok(value)
            }
            _ => Err(self.error(expected)),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_set_expr(&mut self) -> Result<Statement, ParseError> {
        let mut statement = self.parse_query_term()?;
        while self.eat_keyword(Keyword::Union) {
            let op = if self.eat_keyword(Keyword::All) {
                SetOperator::UnionAll
            } else {
                self.eat_keyword(Keyword::Distinct);
                SetOperator::Union
            };
            let right = self.parse_query_term()?;
            statement = Statement::SetOperation {
                op,
                left: Box::new(statement),
                right: Box::new(right),
            };
        }
        Ok(statement)
    }

    fn parse_query_term(&mut self) -> Result<Statement, ParseError> {
        if self.eat(&Token::LParen) {
            let statement = self.parse_set_expr()?;
            self.expect(&Token::RParen, "')'")?;
            return Ok(statement);
        }
        Ok(Statement::select(self.parse_select()?))
    }

    fn parse_select(&mut self) -> Result<Select, ParseError> {
        self.expect_keyword(Keyword::Select)?;
        let mut select = Select {
            distinct: self.eat_keyword(Keyword::Distinct),
            ..Select::default()
        };
        if !select.distinct {
            self.eat_keyword(Keyword::All);
        }

        select.projection = self.parse_comma_list(Self::parse_select_item)?;

        if self.eat_keyword(Keyword::From) {
            select.from = self.parse_comma_list(Self::parse_table_ref)?;
        }
        if self.eat_keyword(Keyword::Where) {
            select.selection = Some(self.parse_expr()?);
        }
        if self.eat_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            select.group_by = self.parse_comma_list(Self::parse_expr)?;
        }
        if self.eat_keyword(Keyword::Having) {
            select.having = Some(self.parse_expr()?);
        }
        if self.eat_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            select.order_by = self.parse_comma_list(Self::parse_order_term)?;
        }
        if self.eat_keyword(Keyword::Limit) {
            select.limit = Some(self.parse_limit()?);
        }
        Ok(select)
    }

    fn parse_comma_list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = vec![item(self)?];
        while self.eat(&Token::Comma) {
            items.push(item(self)?);
        }
        Ok(items)
    }

    fn parse_select_item(&mut self) -> Result<SelectItem, ParseError> {
        if self.eat(&Token::Star) {
            return Ok(SelectItem::Wildcard);
        }
        if let (Token::Ident(table), Token::Dot, Token::Star) =
            (self.peek(), self.peek_nth(1), self.peek_nth(2))
        {
            let table = table.clone();
            self.pos += 3;
            return Ok(SelectItem::QualifiedWildcard(table));
        }
        let expr = self.parse_expr()?;
        let alias = self.parse_alias()?;
        Ok(SelectItem::Expr { expr, alias })
    }

    /// `[AS] alias`; the bare form only accepts a non-keyword identifier
    fn parse_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.eat_keyword(Keyword::As) {
            return self.expect_ident("alias").map(Some);
        }
        if let Token::Ident(alias) = self.peek() {
            let alias = alias.clone();
            self.advance();
            return Ok(Some(alias));
        }
        Ok(None)
    }

    fn parse_order_term(&mut self) -> Result<OrderTerm, ParseError> {
        let expr = self.parse_expr()?;
        let descending = if self.eat_keyword(Keyword::Desc) {
            true
        } else {
            self.eat_keyword(Keyword::Asc);
            false
        };
        Ok(OrderTerm { expr, descending })
    }

    fn parse_limit(&mut self) -> Result<Limit, ParseError> {
        let first = self.expect_int("row count")?;
        if self.eat(&Token::Comma) {
            // LIMIT offset, count
            let count = self.expect_int("row count")?;
            return Ok(Limit {
                count,
                offset: Some(first),
            });
        }
        let offset = if self.eat_keyword(Keyword::Offset) {
            Some(self.expect_int("offset")?)
        } else {
            None
        };
        Ok(Limit {
            count: first,
            offset,
        })
    }

    // ========================================================================
    // Relations
    // ========================================================================

    fn parse_table_ref(&mut self) -> Result<TableExpr, ParseError> {
        let mut relation = self.parse_table_primary()?;
        loop {
            let kind = if self.eat_keyword(Keyword::Join) {
                JoinKind::Inner
            } else if self.is_keyword(Keyword::Inner) {
                self.advance();
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Inner
            } else if self.is_keyword(Keyword::Left) {
                self.advance();
                self.eat_keyword(Keyword::Outer);
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Left
            } else if self.is_keyword(Keyword::Cross) {
                self.advance();
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Cross
            } else {
                return Ok(relation);
            };

            let right = self.parse_table_primary()?;
            let on = match kind {
                JoinKind::Cross => None,
                JoinKind::Left => {
                    self.expect_keyword(Keyword::On)?;
                    Some(self.parse_expr()?)
                }
                JoinKind::Inner => {
                    if self.eat_keyword(Keyword::On) {
                        Some(self.parse_expr()?)
                    } else {
                        None
                    }
                }
            };
            relation = TableExpr::Join {
                kind,
                left: Box::new(relation),
                right: Box::new(right),
                on,
            };
        }
    }

    fn parse_table_primary(&mut self) -> Result<TableExpr, ParseError> {
        if self.eat(&Token::LParen) {
            let relation = self.parse_table_ref()?;
            self.expect(&Token::RParen, "')'")?;
            return Ok(relation);
        }
        let name = self.expect_ident("table name")?;
        let alias = self.parse_alias()?;
        Ok(TableExpr::Table { name, alias })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut children = vec![self.parse_and()?];
        while self.eat_keyword(Keyword::Or) {
            children.push(self.parse_and()?);
        }
        Ok(connective(children, Expr::Or))
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut children = vec![self.parse_not()?];
        while self.eat_keyword(Keyword::And) {
            children.push(self.parse_not()?);
        }
        Ok(connective(children, Expr::And))
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.eat_keyword(Keyword::Not) {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    /// A single, non-chaining comparison or predicate suffix
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;

        let op = match self.peek() {
            Token::Eq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::NotEq),
            Token::Lt => Some(BinaryOp::Lt),
            Token::LtEq => Some(BinaryOp::LtEq),
            Token::Gt => Some(BinaryOp::Gt),
            Token::GtEq => Some(BinaryOp::GtEq),
            Token::Keyword(Keyword::Like) => Some(BinaryOp::Like),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.parse_additive()?;
            return Ok(Expr::binary(op, left, right));
        }

        if self.eat_keyword(Keyword::Is) {
            let negated = self.eat_keyword(Keyword::Not);
            self.expect_keyword(Keyword::Null)?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        // NOT only continues a comparison when IN or LIKE follows
        let negated = self.is_keyword(Keyword::Not)
            && matches!(
                self.peek_nth(1),
                Token::Keyword(Keyword::In | Keyword::Like)
            );
        if negated {
            self.advance();
        }

        if self.eat_keyword(Keyword::In) {
            self.expect(&Token::LParen, "'('")?;
            let list = self.parse_comma_list(Self::parse_expr)?;
            self.expect(&Token::RParen, "')'")?;
            return Ok(Expr::InList {
                expr: Box::new(left),
                list,
                negated,
            });
        }
        if negated && self.eat_keyword(Keyword::Like) {
            let right = self.parse_additive()?;
            return Ok(Expr::binary(BinaryOp::NotLike, left, right));
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(expr),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            expr = Expr::binary(op, expr, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => return Ok(expr),
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = Expr::binary(op, expr, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let literal = match self.peek() {
            Token::Int(value) => Some(Literal::Int(*value)),
            Token::Decimal(text) => Some(Literal::Decimal(text.clone())),
            Token::String(value) => Some(Literal::String(value.clone())),
            Token::Keyword(Keyword::Null) => Some(Literal::Null),
            Token::Keyword(Keyword::True) => Some(Literal::Bool(true)),
            Token::Keyword(Keyword::False) => Some(Literal::Bool(false)),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Expr::Literal(literal));
        }

        if self.eat(&Token::LParen) {
            let expr = self.parse_expr()?;
            self.expect(&Token::RParen, "')'")?;
            return Ok(expr);
        }

        let name = self.expect_ident("expression")?;
        if self.eat(&Token::LParen) {
            return self.parse_function_call(name);
        }
        if self.eat(&Token::Dot) {
            let column = self.expect_ident("column name")?;
            return Ok(Expr::Column(ColumnRef {
                table: Some(name),
                name: column,
            }));
        }
        Ok(Expr::Column(ColumnRef { table: None, name }))
    }

    /// Arguments of `name(` up to and including the closing paren
    fn parse_function_call(&mut self, name: String) -> Result<Expr, ParseError> {
        if self.eat(&Token::RParen) {
            return Ok(Expr::Function {
                name,
                args: Vec::new(),
                distinct: false,
            });
        }
        let distinct = self.eat_keyword(Keyword::Distinct);
        let args = if !distinct && self.eat(&Token::Star) {
            vec![Expr::Star]
        } else {
            self.parse_comma_list(Self::parse_expr)?
        };
        self.expect(&Token::RParen, "')'")?;
        Ok(Expr::Function {
            name,
            args,
            distinct,
        })
    }
}

/// Fold parsed operands of AND/OR: a single operand stands for itself
fn connective(mut children: Vec<Expr>, build: fn(Vec<Expr>) -> Expr) -> Expr {
    if children.len() == 1 {
        if let Some(only) = children.pop() {
            return only;
        }
    }
    build(children)
}

fn describe(token: &Token) -> String {
    match token {
        Token::Keyword(kw) => format!("keyword '{}'", format!("{kw:?}").to_lowercase()),
        Token::Ident(name) => format!("identifier '{name}'"),
        Token::Int(value) => format!("number {value}"),
        Token::Decimal(text) => format!("number {text}"),
        Token::String(value) => format!("string '{value}'"),
        Token::Eof => "end of input".to_string(),
        other => format!("{other:?}"),
    }
}
