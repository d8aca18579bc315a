use crate::error::QueryError;
use std::fmt;

/// Sentinel wrapping a prefix-grammar query on both ends.
pub const BOUNDARY: char = '%';
pub const ESCAPE: char = '\\';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    And,
    Or,
    Not,
    LeftParen,
    RightParen,
    Comma,
    Boundary,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "'{s}'"),
            Token::And => f.write_str("&"),
            Token::Or => f.write_str("|"),
            Token::Not => f.write_str("!"),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Boundary => write!(f, "{BOUNDARY}"),
        }
    }
}

/// Which front-end the token stream is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    /// `a & (b | !c)`; adjacent identifiers get an implicit `&`.
    Infix,
    /// `%&(a,|(b,!(c)))%`; commas and the boundary sentinel are symbols.
    Prefix,
}

fn symbol(c: char, mode: LexMode) -> Option<Token> {
    match c {
        '&' => Some(Token::And),
        '|' => Some(Token::Or),
        '!' => Some(Token::Not),
        '(' => Some(Token::LeftParen),
        ')' => Some(Token::RightParen),
        ',' if mode == LexMode::Prefix => Some(Token::Comma),
        BOUNDARY if mode == LexMode::Prefix => Some(Token::Boundary),
        _ => None,
    }
}

/// Tokens of one query with a rewindable cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self { Self { tokens, pos: 0 } }

    pub fn has_next(&self) -> bool { self.pos < self.tokens.len() }

    pub fn peek(&self) -> Option<&Token> { self.tokens.get(self.pos) }

    /// Rewinds to the first token.
    pub fn reset(&mut self) { self.pos = 0; }

    pub fn as_slice(&self) -> &[Token] { &self.tokens }

    pub fn len(&self) -> usize { self.tokens.len() }

    pub fn is_empty(&self) -> bool { self.tokens.is_empty() }
}

impl Iterator for TokenStream {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }
}

pub fn tokenize(text: &str, mode: LexMode) -> Result<TokenStream, QueryError> {
    if text.is_empty() {
        return Err(QueryError::Empty);
    }
    let mut tokens: Vec<Token> = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if let Some(token) = symbol(c, mode) {
            chars.next();
            tokens.push(token);
            continue;
        }

        let mut ident = String::new();
        while let Some(&c) = chars.peek() {
            if c == ESCAPE {
                chars.next();
                match chars.next() {
                    Some(escaped) => ident.push(escaped),
                    None => break,
                }
                continue;
            }
            if c.is_whitespace() || symbol(c, mode).is_some() {
                break;
            }
            ident.push(c);
            chars.next();
        }
        if ident.is_empty() {
            continue;
        }
        if mode == LexMode::Infix && matches!(tokens.last(), Some(Token::Ident(_))) {
            tokens.push(Token::And);
        }
        tokens.push(Token::Ident(ident));
    }
    Ok(TokenStream::new(tokens))
}
