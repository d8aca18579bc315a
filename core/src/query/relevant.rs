use super::lexer::{Token, TokenStream};
use std::collections::HashSet;

/// Identifiers of a compiled query that count for ranking.
///
/// `|` is treated like `&` and nested negations cancel pairwise: a word under
/// an even number of `!` is relevant, one under an odd number is not. Works on
/// token streams of either grammar; the stream is rewound before and after.
pub fn relevant_words(tokens: &mut TokenStream) -> HashSet<String> {
    tokens.reset();
    let mut words = HashSet::new();
    // Negation parity of each open parenthesis scope.
    let mut scopes: Vec<bool> = vec![false];
    let mut pending_not = false;

    for token in tokens.by_ref() {
        let negated = scopes.last().copied().unwrap_or(false);
        match token {
            Token::Not => pending_not = !pending_not,
            Token::LeftParen => {
                scopes.push(negated ^ pending_not);
                pending_not = false;
            }
            Token::RightParen => {
                if scopes.len() > 1 {
                    scopes.pop();
                }
            }
            Token::Ident(word) => {
                if !(negated ^ pending_not) {
                    words.insert(word);
                }
                pending_not = false;
            }
            Token::And | Token::Or | Token::Comma | Token::Boundary => {}
        }
    }
    tokens.reset();
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{infix, prefix};

    fn prefix_words(q: &str) -> HashSet<String> {
        let (_, mut tokens) = prefix::parse(q).unwrap();
        relevant_words(&mut tokens)
    }

    fn infix_words(q: &str) -> HashSet<String> {
        let (_, mut tokens) = infix::parse(q).unwrap();
        relevant_words(&mut tokens)
    }

    fn set(words: &[&str]) -> HashSet<String> { words.iter().map(|w| w.to_string()).collect() }

    #[test]
    fn prefix_negation_parity() {
        assert_eq!(prefix_words("&(cat,dog,cow)"), set(&["cat", "dog", "cow"]));
        assert_eq!(prefix_words("&(cat,!(dog),cow)"), set(&["cat", "cow"]));
        assert_eq!(prefix_words("!(|(cat,!(dog),cow))"), set(&["dog"]));
        assert_eq!(prefix_words("!(&(cat,dog,cow))"), set(&[]));
        assert_eq!(prefix_words("!(!(!(computer)))"), set(&[]));
        assert_eq!(prefix_words("!(!(computer))"), set(&["computer"]));
        assert_eq!(prefix_words("!(computer)"), set(&[]));
        assert_eq!(prefix_words("!(&(computer, |(cat, !(cow),!(dog))))"), set(&["cow", "dog"]));
        assert_eq!(prefix_words("!(|(!(A),!(B),!(C)))"), set(&["A", "B", "C"]));
    }

    #[test]
    fn infix_negation_parity() {
        assert_eq!(infix_words("cat & !dog | cow"), set(&["cat", "cow"]));
        assert_eq!(infix_words("!(cat | !dog)"), set(&["dog"]));
        assert_eq!(infix_words("!!computer"), set(&["computer"]));
        assert_eq!(infix_words("cat dog"), set(&["cat", "dog"]));
    }
}
