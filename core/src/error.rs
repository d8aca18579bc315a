use crate::DocId;

/// Reasons a query string cannot be compiled.
///
/// The `Display` text is meant to be shown to whoever typed the query.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query cannot be empty")]
    Empty,
    #[error("Missing (")]
    MissingLeftParen,
    #[error("Missing )")]
    MissingRightParen,
    #[error("Missing starting symbol")]
    MissingStartBoundary,
    #[error("Missing trailing symbol")]
    MissingEndBoundary,
    #[error("Query is incomplete")]
    Incomplete,
    #[error("Invalid clause")]
    InvalidClause,
    #[error("Query has not been fully parsed")]
    TrailingInput,
    #[error("Unexpected token {0}")]
    UnexpectedToken(String),
    #[error("Operator {0} is missing an operand")]
    TooFewOperands(&'static str),
    #[error("Too many operands ({0} left without an operator)")]
    TooManyOperands(usize),
    #[error("Query is nested too deeply")]
    TooDeep,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Document {0} has not been indexed yet")]
    NotFound(DocId),
}
