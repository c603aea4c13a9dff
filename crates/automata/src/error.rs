/// Errors raised by automaton operations. These are fatal for the current
/// evaluation and are propagated to the caller; the operands are never
/// modified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AutomatonError {
    /// A binary operation received operands of different arity, or an
    /// operator was handed a position list of the wrong length.
    #[error("arity mismatch: expected {expected}, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    /// An index passed to `expand` or `projection` does not address a column.
    #[error("position {index} out of range for arity {arity}")]
    PositionOutOfRange { index: usize, arity: usize },

    /// The operands are built over different base alphabets.
    #[error("incompatible base alphabets")]
    AlphabetMismatch,
}
