//! Deterministic finite automata over tuple alphabets.
//!
//! A relation R ⊆ Dᵏ over some countable domain D can be recognized by a
//! finite automaton once the elements of D are encoded as words: a k-tuple of
//! words is *convolved* into a single word over the product alphabet Σᵏ by
//! reading the tuple column by column, padding shorter components with a
//! distinguished padding symbol. This crate provides the [`Dfa`] type over
//! such product alphabets together with the boolean operations, partition
//! refinement minimization, the convolution operators (padding, unpadding,
//! expansion, projection, Cartesian powers) and length-lexicographic
//! enumeration of the recognized language.

pub mod alphabet;
pub mod convolution;
pub mod dfa;
pub mod enumeration;
pub mod error;
pub mod minimization;

pub use alphabet::ProductAlphabet;
pub use convolution::{convolve, one, product, word_automaton, zero};
pub use dfa::{Dfa, DfaBuilder, StateId};
pub use enumeration::LlexWords;
pub use error::AutomatonError;
