use std::{fmt::Display, str::FromStr};

use crate::error::GraphError;

/// A binary operation a graph node can perform.
///
/// The set is closed: only addition and multiplication have a derivative
/// rule in the backward pass, so anything else is rejected when parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Addition,
    Multiplication,
}

impl Operation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Addition => "+",
            Self::Multiplication => "*",
        }
    }

    /// Forward value of the operation.
    pub fn f(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Addition => lhs + rhs,
            Self::Multiplication => lhs * rhs,
        }
    }

    /// Local partial derivatives with respect to `(lhs, rhs)`.
    pub fn grad(&self, lhs: f64, rhs: f64) -> (f64, f64) {
        match self {
            Self::Addition => (1., 1.),
            Self::Multiplication => (rhs, lhs),
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Operation {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" | "add" | "addition" => Ok(Self::Addition),
            "*" | "mul" | "multiplication" => Ok(Self::Multiplication),
            other => Err(GraphError::unsupported(other)),
        }
    }
}
