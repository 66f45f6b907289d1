//! Expression tree produced by the parser

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Ast {
    /// `@`, the current node
    Identity,
    Field(String),
    Index(i64),
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: i64,
    },
    Subexpr(Box<Ast>, Box<Ast>),
    /// Evaluates `rhs` against every element of the array produced by `lhs`
    Projection {
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    ObjectValues(Box<Ast>),
    Flatten(Box<Ast>),
    /// Filter step inside a projection
    Condition {
        predicate: Box<Ast>,
        then: Box<Ast>,
    },
    Comparison {
        op: Comparator,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    And(Box<Ast>, Box<Ast>),
    Or(Box<Ast>, Box<Ast>),
    Not(Box<Ast>),
    Literal(Value),
    MultiList(Vec<Ast>),
    MultiHash(Vec<(String, Ast)>),
    Function {
        name: String,
        args: Vec<Ast>,
    },
    Expref(Box<Ast>),
}

impl Ast {
    pub(crate) fn subexpr(lhs: Self, rhs: Self) -> Self {
        Self::Subexpr(Box::new(lhs), Box::new(rhs))
    }

    pub(crate) fn projection(lhs: Self, rhs: Self) -> Self {
        Self::Projection {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}
