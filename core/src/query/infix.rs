//! Infix grammar: `expr := term | expr & expr | expr | expr | !expr | (expr)`.
//!
//! `&` and `|` share one precedence level and associate to the left; `!`
//! binds tighter. The token stream is converted to postfix with a
//! shunting-yard pass, operand counts are checked, and the postfix sequence
//! is folded into an [`Expr`].

use super::expr::{Expr, MAX_DEPTH};
use super::lexer::{self, LexMode, Token, TokenStream};
use crate::error::QueryError;

fn priority(token: &Token) -> i32 {
    match token {
        Token::And | Token::Or => 1,
        Token::Not => 2,
        _ => -1,
    }
}

fn operator_name(token: &Token) -> &'static str {
    match token {
        Token::And => "&",
        Token::Or => "|",
        _ => "!",
    }
}

/// Shunting-yard conversion. Also rejects operators and operands in
/// positions where the other one is required.
pub fn to_postfix(tokens: &mut TokenStream) -> Result<Vec<Token>, QueryError> {
    let mut out: Vec<Token> = Vec::new();
    let mut stack: Vec<Token> = Vec::new();
    let mut expect_operand = true;

    for token in tokens.by_ref() {
        match token {
            Token::Ident(_) => {
                if !expect_operand {
                    return Err(QueryError::UnexpectedToken(token.to_string()));
                }
                out.push(token);
                expect_operand = false;
            }
            Token::Not | Token::LeftParen => {
                if !expect_operand {
                    return Err(QueryError::UnexpectedToken(token.to_string()));
                }
                stack.push(token);
            }
            Token::RightParen => {
                loop {
                    match stack.pop() {
                        Some(Token::LeftParen) => break,
                        Some(op) => out.push(op),
                        None => return Err(QueryError::MissingLeftParen),
                    }
                }
                if expect_operand {
                    return Err(QueryError::Incomplete);
                }
            }
            Token::And | Token::Or => {
                if expect_operand {
                    return Err(QueryError::TooFewOperands(operator_name(&token)));
                }
                while let Some(top) = stack.last() {
                    if priority(top) < priority(&token) {
                        break;
                    }
                    if let Some(op) = stack.pop() {
                        out.push(op);
                    }
                }
                stack.push(token);
                expect_operand = true;
            }
            Token::Comma | Token::Boundary => {
                return Err(QueryError::UnexpectedToken(token.to_string()));
            }
        }
    }
    if expect_operand {
        return Err(QueryError::Incomplete);
    }
    while let Some(op) = stack.pop() {
        if op == Token::LeftParen {
            return Err(QueryError::MissingRightParen);
        }
        out.push(op);
    }
    Ok(out)
}

/// Every identifier provides one operand, `!` needs one, `&`/`|` need two
/// and leave one. A well-formed query ends with exactly one operand.
pub fn check_operands(postfix: &[Token]) -> Result<(), QueryError> {
    let mut available = 0usize;
    for token in postfix {
        match token {
            Token::Ident(_) => available += 1,
            Token::Not => {
                if available == 0 {
                    return Err(QueryError::TooFewOperands("!"));
                }
            }
            op => {
                if available < 2 {
                    return Err(QueryError::TooFewOperands(operator_name(op)));
                }
                available -= 1;
            }
        }
    }
    match available {
        1 => Ok(()),
        0 => Err(QueryError::Incomplete),
        n => Err(QueryError::TooManyOperands(n)),
    }
}

/// Folds postfix into an expression, tracking the depth of every partial
/// tree so that over-nested input is rejected before it is evaluated.
fn build(postfix: Vec<Token>) -> Result<Expr, QueryError> {
    let mut stack: Vec<(Expr, usize)> = Vec::new();
    for token in postfix {
        let (expr, depth) = match token {
            Token::Ident(s) => (Expr::Term(s), 1),
            Token::Not => {
                let (inner, depth) = stack.pop().ok_or(QueryError::TooFewOperands("!"))?;
                (Expr::not(inner), depth + 1)
            }
            op => {
                let name = operator_name(&op);
                let (right, rd) = stack.pop().ok_or(QueryError::TooFewOperands(name))?;
                let (left, ld) = stack.pop().ok_or(QueryError::TooFewOperands(name))?;
                let is_or = op == Token::Or;
                // A left operand of the same kind is extended in place.
                let flattened = matches!((&left, is_or), (Expr::Or(_), true) | (Expr::And(_), false));
                let depth = if flattened { ld.max(rd + 1) } else { ld.max(rd) + 1 };
                (if is_or { Expr::or(left, right) } else { Expr::and(left, right) }, depth)
            }
        };
        if depth > MAX_DEPTH {
            return Err(QueryError::TooDeep);
        }
        stack.push((expr, depth));
    }
    stack.pop().map(|(expr, _)| expr).ok_or(QueryError::Incomplete)
}

/// Compiles an infix query. The returned stream is rewound to its start.
pub fn parse(query: &str) -> Result<(Expr, TokenStream), QueryError> {
    let mut tokens = lexer::tokenize(query, LexMode::Infix)?;
    let postfix = to_postfix(&mut tokens)?;
    check_operands(&postfix)?;
    let expr = build(postfix)?;
    tokens.reset();
    Ok((expr, tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(q: &str) -> Expr { parse(q).map(|(e, _)| e).unwrap() }

    #[test]
    fn accepts_well_formed_queries() {
        for q in [
            "y & y",
            r"\) & y",
            "te15*st & (a | cat) & hey",
            "!test*123",
            "!(test*123)",
            r"!(test*123\,)",
            "cat & dog & (glass | peter) & !kettle",
            "cat & dog & (glass | peter) & !(kettle)",
            "(a & b) | (c & d) | (d & f)",
            "(a | b) | x",
            "a | b | x",
            "(a) | (b) | (x)",
            "((a) | (b)) | (x)",
            "(((a)))",
            "!!a",
        ] {
            assert!(parse(q).is_ok(), "{q} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_queries() {
        assert_eq!(parse("!(test*123").unwrap_err(), QueryError::MissingRightParen);
        assert_eq!(parse("| a | b |").unwrap_err(), QueryError::TooFewOperands("|"));
        assert_eq!(parse("a | b )").unwrap_err(), QueryError::MissingLeftParen);
        assert_eq!(parse(")a(").unwrap_err(), QueryError::MissingLeftParen);
        assert_eq!(parse("15 & 14 | !").unwrap_err(), QueryError::Incomplete);
        assert_eq!(parse("| & !").unwrap_err(), QueryError::TooFewOperands("|"));
        assert_eq!(parse("").unwrap_err(), QueryError::Empty);
        assert_eq!(parse("   ").unwrap_err(), QueryError::Incomplete);
        assert_eq!(parse("()").unwrap_err(), QueryError::Incomplete);
        assert!(matches!(parse("a !b"), Err(QueryError::UnexpectedToken(_))));
    }

    #[test]
    fn operand_count_check() {
        use Token::*;
        let id = |s: &str| Ident(s.to_string());
        assert_eq!(check_operands(&[id("a"), id("b"), And]), Ok(()));
        assert_eq!(check_operands(&[id("a"), And]), Err(QueryError::TooFewOperands("&")));
        assert_eq!(check_operands(&[Not]), Err(QueryError::TooFewOperands("!")));
        assert_eq!(check_operands(&[id("a"), id("b")]), Err(QueryError::TooManyOperands(2)));
        assert_eq!(check_operands(&[]), Err(QueryError::Incomplete));
    }

    #[test]
    fn not_binds_tighter_than_and() {
        assert_eq!(expr("!a & b"), Expr::And(vec![Expr::not(Expr::term("a")), Expr::term("b")]));
    }

    #[test]
    fn and_or_associate_left() {
        assert_eq!(
            expr("a & b | c"),
            Expr::Or(vec![Expr::And(vec![Expr::term("a"), Expr::term("b")]), Expr::term("c")])
        );
        assert_eq!(
            expr("a | b & c"),
            Expr::And(vec![Expr::Or(vec![Expr::term("a"), Expr::term("b")]), Expr::term("c")])
        );
    }

    #[test]
    fn nesting_is_bounded() {
        assert!(parse(&format!("{}cat", "!".repeat(MAX_DEPTH - 1))).is_ok());
        assert_eq!(parse(&format!("{}cat", "!".repeat(MAX_DEPTH))).unwrap_err(), QueryError::TooDeep);
        assert_eq!(parse(&format!("{}cat", "!".repeat(10_000))).unwrap_err(), QueryError::TooDeep);
        let grouped = format!("{}a{}", "(b & ".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(parse(&grouped).unwrap_err(), QueryError::TooDeep);
        // Long flat chains are not nesting.
        let chain = vec!["w"; 1000].join(" | ");
        assert!(parse(&chain).is_ok());
    }

    #[test]
    fn implicit_and_between_words() {
        assert_eq!(expr("cat dog"), expr("cat & dog"));
    }

    #[test]
    fn stream_is_rewound_after_compile() {
        let (_, stream) = parse("a | b").unwrap();
        assert_eq!(stream.peek(), Some(&Token::Ident("a".into())));
    }
}
