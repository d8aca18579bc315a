use crate::index::{DocumentList, Index};
use crate::ops;
use std::fmt;

/// Deepest operator nesting a parsed query may have. Evaluation recurses
/// once per level.
pub const MAX_DEPTH: usize = 256;

/// Parsed boolean query, independent of the grammar it was written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Term(String),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn term(s: impl Into<String>) -> Self { Expr::Term(s.into()) }

    pub fn not(inner: Expr) -> Self { Expr::Not(Box::new(inner)) }

    /// Binary AND, flattening a left operand that is already an AND.
    pub fn and(left: Expr, right: Expr) -> Self {
        match left {
            Expr::And(mut operands) => {
                operands.push(right);
                Expr::And(operands)
            }
            left => Expr::And(vec![left, right]),
        }
    }

    /// Binary OR, flattening a left operand that is already an OR.
    pub fn or(left: Expr, right: Expr) -> Self {
        match left {
            Expr::Or(mut operands) => {
                operands.push(right);
                Expr::Or(operands)
            }
            left => Expr::Or(vec![left, right]),
        }
    }

    pub fn evaluate(&self, index: &Index) -> DocumentList {
        Evaluator::new(index).eval(self)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, op: &str, operands: &[Expr]) -> fmt::Result {
            write!(f, "{op}(")?;
            for (i, e) in operands.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{e}")?;
            }
            f.write_str(")")
        }
        match self {
            Expr::Term(t) => f.write_str(t),
            Expr::And(operands) => list(f, "&", operands),
            Expr::Or(operands) => list(f, "|", operands),
            Expr::Not(inner) => write!(f, "!({inner})"),
        }
    }
}

/// Walks an expression against one index. The universe used by NOT is
/// fetched at most once per evaluation and never modified.
struct Evaluator<'a> {
    index: &'a Index,
    universe: Option<DocumentList>,
}

impl<'a> Evaluator<'a> {
    fn new(index: &'a Index) -> Self { Self { index, universe: None } }

    fn universe(&mut self) -> &DocumentList {
        let index = self.index;
        self.universe.get_or_insert_with(|| index.all_document_ids())
    }

    fn eval(&mut self, expr: &Expr) -> DocumentList {
        match expr {
            Expr::Term(t) => {
                let term = self.index.preprocessor().preprocess(t);
                self.index.documents(&term)
            }
            Expr::Not(inner) => {
                let docs = self.eval(inner);
                ops::not(&docs, self.universe())
            }
            Expr::And(operands) => {
                let mut iter = operands.iter();
                let mut acc = match iter.next() {
                    Some(first) => self.eval(first),
                    None => return DocumentList::new(),
                };
                for operand in iter {
                    if acc.is_empty() {
                        break;
                    }
                    let rhs = self.eval(operand);
                    acc = ops::and(&acc, &rhs);
                }
                acc
            }
            Expr::Or(operands) => operands.iter().fold(DocumentList::new(), |acc, operand| {
                let rhs = self.eval(operand);
                ops::or(&acc, &rhs)
            }),
        }
    }
}
