use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    /// The predicate is empty or doesn't follow the grammar. `offset` is a byte offset into the
    /// predicate text.
    #[error("invalid predicate at offset {offset}: {message}")]
    InvalidPredicate { offset: usize, message: String },
    /// The predicate contains a construct outside the comparison grammar; it is never evaluated.
    #[error("unsafe predicate at offset {offset}: {construct} is not allowed")]
    UnsafePredicate { offset: usize, construct: String },
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
}

impl RuleError {
    pub(crate) fn invalid(offset: usize, message: impl Into<String>) -> Self {
        Self::InvalidPredicate {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn unsafe_construct(offset: usize, construct: impl Into<String>) -> Self {
        Self::UnsafePredicate {
            offset,
            construct: construct.into(),
        }
    }
}
