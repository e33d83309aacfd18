use thiserror::Error;

/// Errors raised while building a graph. All of them are detected before
/// any node is pushed, so a failed call never leaves a partial node behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Invalid operand: {reason}")]
    InvalidOperand { reason: String },

    #[error("Unsupported operation `{op}`: only `+` and `*` are differentiable")]
    UnsupportedOperation { op: String },

    #[error("Node identifiers exhausted after {limit} nodes")]
    IdentifierExhaustion { limit: u32 },
}

impl GraphError {
    pub fn invalid_operand(reason: impl Into<String>) -> Self {
        GraphError::InvalidOperand {
            reason: reason.into(),
        }
    }

    pub fn unsupported(op: impl Into<String>) -> Self {
        GraphError::UnsupportedOperation { op: op.into() }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
