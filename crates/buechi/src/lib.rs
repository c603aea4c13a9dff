//! Automatic presentations of countable first-order structures, and the
//! decision procedure they induce.
//!
//! A structure is *automatically presented* when its universe and all of its
//! relations are recognized by finite automata over a common alphabet. The
//! first-order theory of such a structure is decidable: a formula is compiled
//! bottom-up into a DFA over the convolved encodings of its free variables,
//! with ∧/∨/¬ mapped to the boolean automaton operations and ∃ to
//! projection. The canonical instance is Büchi arithmetic ⟨ℕ, +, |₂⟩ (and
//! its extension over ℤ), whose definable relations are exactly the regular
//! relations on least-significant-bit-first binary encodings.
//!
//! The crate is layered as follows:
//!
//! - [`formula`] / [`parser`] — the first-order syntax.
//! - [`presentation`] — the relation environment and the formula compiler.
//! - [`buildin`] — factories for Büchi arithmetic over ℕ and ℤ.
//! - [`terms`] — the user-facing term and relational algebra, which desugars
//!   arithmetic expressions into formulas and fresh relation bindings.

pub mod buildin;
pub mod encoding;
pub mod error;
pub mod formula;
pub mod parser;
pub mod presentation;
pub mod terms;

pub use buildin::{Arithmetic, buechi_arithmetic, buechi_arithmetic_z};
pub use encoding::{Encoding, lsbf_automaton};
pub use error::EvalError;
pub use formula::Formula;
pub use presentation::{AutomaticPresentation, Definition};
pub use terms::{ElementaryTerm, RelationTerm, unique_names};
