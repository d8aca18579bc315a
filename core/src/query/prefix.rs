//! Functional prefix grammar, bounded by the `%` sentinel:
//!
//! ```text
//! query := % expr %
//! expr  := IDENT | !( expr ) | &( expr {, expr} ) | |( expr {, expr} )
//! ```

use super::expr::{Expr, MAX_DEPTH};
use super::lexer::{self, LexMode, Token, TokenStream, BOUNDARY};
use crate::error::QueryError;

struct Parser<'a> {
    tokens: &'a mut TokenStream,
    depth: usize,
}

impl Parser<'_> {
    fn next(&mut self) -> Result<Token, QueryError> {
        self.tokens.next().ok_or(QueryError::Incomplete)
    }

    fn open(&mut self) -> Result<(), QueryError> {
        match self.next()? {
            Token::LeftParen => Ok(()),
            _ => Err(QueryError::MissingLeftParen),
        }
    }

    fn close(&mut self) -> Result<(), QueryError> {
        match self.next()? {
            Token::RightParen => Ok(()),
            _ => Err(QueryError::MissingRightParen),
        }
    }

    fn query(&mut self) -> Result<Expr, QueryError> {
        if self.next()? != Token::Boundary {
            return Err(QueryError::MissingStartBoundary);
        }
        let expr = self.expression()?;
        if self.next()? != Token::Boundary {
            return Err(QueryError::MissingEndBoundary);
        }
        if self.tokens.has_next() {
            return Err(QueryError::TrailingInput);
        }
        Ok(expr)
    }

    fn expression(&mut self) -> Result<Expr, QueryError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(QueryError::TooDeep);
        }
        let expr = self.clause();
        self.depth -= 1;
        expr
    }

    fn clause(&mut self) -> Result<Expr, QueryError> {
        match self.next()? {
            Token::Ident(s) => Ok(Expr::Term(s)),
            Token::Not => {
                self.open()?;
                let inner = self.expression()?;
                self.close()?;
                Ok(Expr::not(inner))
            }
            op @ (Token::And | Token::Or) => {
                self.open()?;
                let operands = self.arguments()?;
                self.close()?;
                Ok(if op == Token::And { Expr::And(operands) } else { Expr::Or(operands) })
            }
            _ => Err(QueryError::InvalidClause),
        }
    }

    /// Comma-separated operands. Repeated plain terms are kept once.
    fn arguments(&mut self) -> Result<Vec<Expr>, QueryError> {
        let mut operands = vec![self.expression()?];
        while self.tokens.peek() == Some(&Token::Comma) {
            self.tokens.next();
            let operand = self.expression()?;
            if matches!(operand, Expr::Term(_)) && operands.contains(&operand) {
                continue;
            }
            operands.push(operand);
        }
        Ok(operands)
    }
}

/// Parses text that already carries the boundary sentinel on both ends.
pub fn parse_bounded(text: &str) -> Result<(Expr, TokenStream), QueryError> {
    let mut tokens = lexer::tokenize(text, LexMode::Prefix)?;
    let expr = Parser { tokens: &mut tokens, depth: 0 }.query()?;
    tokens.reset();
    Ok((expr, tokens))
}

/// Wraps `query` in the boundary sentinel and parses it.
pub fn parse(query: &str) -> Result<(Expr, TokenStream), QueryError> {
    if query.is_empty() {
        return Err(QueryError::Empty);
    }
    parse_bounded(&format!("{BOUNDARY}{query}{BOUNDARY}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(q: &str) -> Expr { parse(q).map(|(e, _)| e).unwrap() }

    #[test]
    fn accepts_well_formed_queries() {
        for q in [
            "%&(y,y)%",
            r"%&(\),y)%",
            "%&  (te15*st, |(a,bsad), hey)%",
            "%!(test*123)%",
            r"%!(test*123\,)%",
            "%&(cat, dog, |(glass, peter), !(kettle))%",
            "%|(&(a,b),&(c,d),&(d,f))%",
            "%|(|(a,b),x)%",
            "%|(a,b,x)%",
            "%|(a)%",
            "%&(hell0)%",
            "%cat%",
        ] {
            assert!(parse_bounded(q).is_ok(), "{q} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_queries() {
        assert_eq!(parse_bounded("%!(test*123%").unwrap_err(), QueryError::MissingRightParen);
        assert_eq!(parse_bounded("%!(test*123, |(cat, dog))%").unwrap_err(), QueryError::MissingRightParen);
        assert_eq!(parse_bounded("%|(&(a,b),&(c,d),&(d,f)%").unwrap_err(), QueryError::MissingRightParen);
        assert_eq!(parse_bounded("%|(&(a,b)%").unwrap_err(), QueryError::MissingRightParen);
        assert_eq!(parse_bounded("%!(hey,hello,hi)%").unwrap_err(), QueryError::MissingRightParen);
        assert_eq!(parse_bounded("&(a,b)%").unwrap_err(), QueryError::MissingStartBoundary);
        assert_eq!(parse_bounded("%&(a,b)").unwrap_err(), QueryError::Incomplete);
        assert_eq!(parse_bounded("%&(a,b) c%").unwrap_err(), QueryError::MissingEndBoundary);
        assert_eq!(parse_bounded("%a%b").unwrap_err(), QueryError::TrailingInput);
        assert_eq!(parse_bounded("%&a%").unwrap_err(), QueryError::MissingLeftParen);
        assert_eq!(parse_bounded("%,%").unwrap_err(), QueryError::InvalidClause);
        assert_eq!(parse("").unwrap_err(), QueryError::Empty);
        assert_eq!(parse("&(a,)").unwrap_err(), QueryError::InvalidClause);
    }

    #[test]
    fn builds_n_ary_nodes_and_collapses_repeated_terms() {
        assert_eq!(
            expr("&(dog,dog,cow,!(cat))"),
            Expr::And(vec![Expr::term("dog"), Expr::term("cow"), Expr::not(Expr::term("cat"))])
        );
        assert_eq!(expr("|(cat)"), Expr::Or(vec![Expr::term("cat")]));
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |n: usize| format!("{}cat{}", "!(".repeat(n), ")".repeat(n));
        assert!(parse(&nested(MAX_DEPTH - 1)).is_ok());
        assert_eq!(parse(&nested(MAX_DEPTH)).unwrap_err(), QueryError::TooDeep);
        assert_eq!(parse(&nested(10_000)).unwrap_err(), QueryError::TooDeep);
        let ands = format!("{}cat{}", "&(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(parse(&ands).unwrap_err(), QueryError::TooDeep);
    }

    #[test]
    fn display_round_trips_through_the_parser() {
        let e = expr("|(&(!(cat),cow),dog)");
        assert_eq!(expr(&e.to_string()), e);
    }
}
