//! Query front-ends. Both grammars compile to an [`Expr`]; evaluation and
//! relevant-word extraction do not depend on which one was used.

pub mod expr;
pub mod infix;
pub mod lexer;
pub mod prefix;
pub mod relevant;

use crate::error::QueryError;
use crate::index::{DocumentList, Index};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub use expr::{Expr, MAX_DEPTH};
pub use lexer::{LexMode, Token, TokenStream};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grammar {
    /// `cat & (dog | !cow)`
    Infix,
    /// `&(cat,|(dog,!(cow)))`
    #[default]
    Prefix,
}

impl Grammar {
    pub fn compile(self, query: &str) -> Result<CompiledQuery, QueryError> {
        let (expr, tokens) = match self {
            Grammar::Infix => infix::parse(query)?,
            Grammar::Prefix => prefix::parse(query)?,
        };
        Ok(CompiledQuery { grammar: self, expr, tokens })
    }
}

impl FromStr for Grammar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "infix" => Ok(Grammar::Infix),
            "prefix" => Ok(Grammar::Prefix),
            other => Err(format!("unknown grammar '{other}' (expected infix or prefix)")),
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Grammar::Infix => "infix",
            Grammar::Prefix => "prefix",
        })
    }
}

/// A validated query together with its token stream.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    grammar: Grammar,
    expr: Expr,
    tokens: TokenStream,
}

impl CompiledQuery {
    pub fn grammar(&self) -> Grammar { self.grammar }

    pub fn expr(&self) -> &Expr { &self.expr }

    pub fn evaluate(&self, index: &Index) -> DocumentList { self.expr.evaluate(index) }

    /// Raw identifiers that should count for ranking.
    pub fn relevant_words(&mut self) -> HashSet<String> { relevant::relevant_words(&mut self.tokens) }
}

/// Stateful parser facade: remembers the error of the last failed call and
/// the relevant words of the last successful search.
#[derive(Debug, Clone, Default)]
pub struct QueryParser {
    grammar: Grammar,
    last_error: Option<QueryError>,
    relevant_words: HashSet<String>,
}

impl QueryParser {
    pub fn new(grammar: Grammar) -> Self {
        Self { grammar, last_error: None, relevant_words: HashSet::new() }
    }

    pub fn grammar(&self) -> Grammar { self.grammar }

    fn compile(&mut self, query: &str) -> Result<CompiledQuery, QueryError> {
        self.last_error = None;
        self.grammar.compile(query).map_err(|err| {
            tracing::debug!(grammar = %self.grammar, query, error = %err, "query rejected");
            self.last_error = Some(err.clone());
            err
        })
    }

    pub fn is_valid_query(&mut self, query: &str) -> bool { self.compile(query).is_ok() }

    pub fn search(&mut self, index: &Index, query: &str) -> Result<DocumentList, QueryError> {
        let mut compiled = self.compile(query)?;
        self.relevant_words = compiled.relevant_words();
        Ok(compiled.evaluate(index))
    }

    /// Message of the most recent failure, if the last call failed.
    pub fn error_message(&self) -> Option<String> { self.last_error.as_ref().map(ToString::to_string) }

    pub fn last_error(&self) -> Option<&QueryError> { self.last_error.as_ref() }

    pub fn relevant_words(&self) -> &HashSet<String> { &self.relevant_words }
}
