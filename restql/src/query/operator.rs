//! Operator table for filter key suffixes.

use std::fmt;

use serde::Serialize;

/// Comparison operators addressable by acronym.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    /// `eq` equals (implicit when a key has no operator suffix)
    Eq,
    /// `ne` not equals
    Ne,
    /// `gt` greater than
    Gt,
    /// `lt` less than
    Lt,
}

impl CompareOp {
    /// All operators in bucket order.
    pub const ALL: [CompareOp; 4] = [CompareOp::Eq, CompareOp::Ne, CompareOp::Gt, CompareOp::Lt];

    /// Look up an operator by its acronym.
    pub fn from_acronym(acronym: &str) -> Option<Self> {
        match acronym {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "gt" => Some(CompareOp::Gt),
            "lt" => Some(CompareOp::Lt),
            _ => None,
        }
    }

    pub fn acronym(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Lt => "lt",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "="),
            CompareOp::Ne => write!(f, "<>"),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Lt => write!(f, "<"),
        }
    }
}
