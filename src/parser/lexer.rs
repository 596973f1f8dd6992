//! SQL tokenizer.
//!
//! Produces a flat token stream with byte offsets for error reporting.
//! Keywords are matched case-insensitively on bare words only; a
//! backtick-quoted word is always an identifier.
//!
//! Comments: `-- ` and `#` run to end of line, `/* */` nests.

use super::ParseError;

/// Reserved words of the supported SQL subset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Select,
    Distinct,
    From,
    Where,
    Group,
    By,
    Having,
    Order,
    Asc,
    Desc,
    Limit,
    Offset,
    And,
    Or,
    Not,
    Null,
    True,
    False,
    Is,
    In,
    Like,
    As,
    Join,
    Inner,
    Left,
    Outer,
    Cross,
    On,
    Union,
    All,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("select", Keyword::Select),
    ("distinct", Keyword::Distinct),
    ("from", Keyword::From),
    ("where", Keyword::Where),
    ("group", Keyword::Group),
    ("by", Keyword::By),
    ("having", Keyword::Having),
    ("order", Keyword::Order),
    ("asc", Keyword::Asc),
    ("desc", Keyword::Desc),
    ("limit", Keyword::Limit),
    ("offset", Keyword::Offset),
    ("and", Keyword::And),
    ("or", Keyword::Or),
    ("not", Keyword::Not),
    ("null", Keyword::Null),
    ("true", Keyword::True),
    ("false", Keyword::False),
    ("is", Keyword::Is),
    ("in", Keyword::In),
    ("like", Keyword::Like),
    ("as", Keyword::As),
    ("join", Keyword::Join),
    ("inner", Keyword::Inner),
    ("left", Keyword::Left),
    ("outer", Keyword::Outer),
    ("cross", Keyword::Cross),
    ("on", Keyword::On),
    ("union", Keyword::Union),
    ("all", Keyword::All),
];

/// Look up a bare word as a keyword
pub fn keyword(word: &str) -> Option<Keyword> {
    KEYWORDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(word))
        .map(|(_, kw)| *kw)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Keyword(Keyword),
    /// Bare or backtick-quoted identifier
    Ident(String),
    Int(u64),
    /// Decimal or out-of-range integer, kept as written
    Decimal(String),
    String(String),
    Comma,
    Dot,
    LParen,
    RParen,
    Semicolon,
    Star,
    Plus,
    Minus,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eof,
}

/// A token and the byte offset where it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Tokenize `source`. The stream always ends with [`Token::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        // Line comments
        if c == b'#'
            || (c == b'-'
                && bytes.get(pos + 1) == Some(&b'-')
                && bytes.get(pos + 2).map_or(true, u8::is_ascii_whitespace))
        {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }

        // Block comments, nested
        if c == b'/' && bytes.get(pos + 1) == Some(&b'*') {
            pos = skip_block_comment(bytes, pos)?;
            continue;
        }

        let token = match c {
            b',' => single(&mut pos, Token::Comma),
            b'.' => single(&mut pos, Token::Dot),
            b'(' => single(&mut pos, Token::LParen),
            b')' => single(&mut pos, Token::RParen),
            b';' => single(&mut pos, Token::Semicolon),
            b'*' => single(&mut pos, Token::Star),
            b'+' => single(&mut pos, Token::Plus),
            b'-' => single(&mut pos, Token::Minus),
            b'/' => single(&mut pos, Token::Slash),
            b'%' => single(&mut pos, Token::Percent),
            b'=' => single(&mut pos, Token::Eq),
            b'!' if bytes.get(pos + 1) == Some(&b'=') => {
                pos += 2;
                Token::NotEq
            }
            b'<' => match bytes.get(pos + 1) {
                Some(b'=') => {
                    pos += 2;
                    Token::LtEq
                }
                Some(b'>') => {
                    pos += 2;
                    Token::NotEq
                }
                _ => single(&mut pos, Token::Lt),
            },
            b'>' => match bytes.get(pos + 1) {
                Some(b'=') => {
                    pos += 2;
                    Token::GtEq
                }
                _ => single(&mut pos, Token::Gt),
            },
            b'\'' | b'"' => {
                let (value, end) = read_quoted(source, pos, c)?;
                pos = end;
                Token::String(value)
            }
            b'`' => {
                let (value, end) = read_quoted(source, pos, b'`')?;
                pos = end;
                Token::Ident(value)
            }
            b'0'..=b'9' => {
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                let mut is_decimal = false;
                if bytes.get(pos) == Some(&b'.')
                    && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)
                {
                    is_decimal = true;
                    pos += 1;
                    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
                let text = &source[start..pos];
                match text.parse::<u64>() {
                    Ok(value) if !is_decimal => Token::Int(value),
                    _ => Token::Decimal(text.to_string()),
                }
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                let word = &source[start..pos];
                match keyword(word) {
                    Some(kw) => Token::Keyword(kw),
                    None => Token::Ident(word.to_string()),
                }
            }
            _ => {
                let found = source[start..].chars().next().unwrap_or('?');
                return Err(ParseError::new(
                    format!("unexpected character '{found}'"),
                    start,
                ));
            }
        };

        tokens.push(Spanned {
            token,
            offset: start,
        });
    }

    tokens.push(Spanned {
        token: Token::Eof,
        offset: source.len(),
    });
    Ok(tokens)
}

fn single(pos: &mut usize, token: Token) -> Token {
    *pos += 1;
    token
}

/// Skip a `/* */` comment starting at `start`, honoring nesting.
/// Returns the offset just past the closing delimiter.
fn skip_block_comment(bytes: &[u8], start: usize) -> Result<usize, ParseError> {
    let mut pos = start + 2;
    let mut depth = 1;
    while pos < bytes.len() {
        if bytes[pos] == b'/' && bytes.get(pos + 1) == Some(&b'*') {
            depth += 1;
            pos += 2;
        } else if bytes[pos] == b'*' && bytes.get(pos + 1) == Some(&b'/') {
            depth -= 1;
            pos += 2;
            if depth == 0 {
                return Ok(pos);
            }
        } else {
            pos += 1;
        }
    }
    Err(ParseError::new("unterminated block comment", start))
}

/// Read a quoted run starting at the opening `quote`. A doubled quote
/// inside stands for one literal quote character.
fn read_quoted(source: &str, start: usize, quote: u8) -> Result<(String, usize), ParseError> {
    let bytes = source.as_bytes();
    let mut value = String::new();
    let mut pos = start + 1;
    let mut run_start = pos;

    while pos < bytes.len() {
        if bytes[pos] == quote {
            value.push_str(&source[run_start..pos]);
            if bytes.get(pos + 1) == Some(&quote) {
                value.push(quote as char);
                pos += 2;
                run_start = pos;
                continue;
            }
            return Ok((value, pos + 1));
        }
        pos += 1;
    }

    let what = if quote == b'`' {
        "identifier"
    } else {
        "string literal"
    };
    Err(ParseError::new(format!("unterminated {what}"), start))
}
