use automata::AutomatonError;

/// Errors raised while parsing or evaluating formulas and terms. All of these
/// abort the current evaluation; the relation environment and every term
/// cache remain as they were before the failed call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// A formula references a predicate that is not installed in the
    /// environment.
    #[error("unknown relation symbol `{0}`")]
    UnknownRelation(String),

    /// The formula string does not follow the surface grammar.
    #[error("parse error at offset {offset}: {message}")]
    Parse { message: String, offset: usize },

    /// A term was combined with a value outside its domain.
    #[error("{0}")]
    Domain(String),

    /// An automaton operation failed; see [`AutomatonError`].
    #[error(transparent)]
    Automaton(#[from] AutomatonError),
}
