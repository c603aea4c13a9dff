//! Built-in presentations. The universe, addition and weak-divisibility
//! automata are given by explicit state tables; every further relation is
//! bootstrapped by formula on top of them, in dependency order.

use automata::Dfa;

use crate::encoding::{Encoding, PADDING, SIGMA};
use crate::error::EvalError;
use crate::presentation::AutomaticPresentation;

/// A presentation bundled with the number codec its universe expects. This is
/// what the term layer evaluates against.
#[derive(Debug, Clone)]
pub struct Arithmetic {
    presentation: AutomaticPresentation,
    encoding: Encoding,
}

impl Arithmetic {
    pub fn new(presentation: AutomaticPresentation, encoding: Encoding) -> Self {
        Self {
            presentation,
            encoding,
        }
    }

    pub fn presentation(&self) -> &AutomaticPresentation {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut AutomaticPresentation {
        &mut self.presentation
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Shorthand for [`AutomaticPresentation::evaluate`].
    pub fn evaluate(&self, phi: &str) -> Result<Dfa, EvalError> {
        self.presentation.evaluate(phi)
    }

    /// Shorthand for [`AutomaticPresentation::check`].
    pub fn check(&self, phi: &str) -> Result<bool, EvalError> {
        self.presentation.check(phi)
    }

    /// Whether the (unpadded) automaton accepts the encoding of the tuple.
    pub fn member(&self, dfa: &Dfa, tuple: &[i64]) -> Result<bool, EvalError> {
        self.encoding.member(dfa, tuple)
    }
}

/// The universe of canonical lsbf encodings: no trailing zero bit, except
/// that zero itself is the single word `0`; the padding symbol never occurs.
fn nat_universe() -> Dfa {
    Dfa::builder(SIGMA, 1)
        .with_accepting([1, 3])
        .with_edges([
            (0, "0", 1),
            (0, "1", 3),
            (0, "*", 4),
            (1, "0", 2),
            (1, "1", 3),
            (1, "*", 4),
            (2, "0", 2),
            (2, "1", 3),
            (2, "*", 4),
            (3, "0", 2),
            (3, "1", 3),
            (3, "*", 4),
        ])
        .with_default(4, 4)
        .into_dfa(0)
}

/// The graph of addition, A(x,y,z) ⇔ x + y = z, as a carry automaton:
/// state 0 carries nothing, state 1 carries one, state 2 is the sink.
/// Padded coordinates contribute the digit 0.
fn nat_addition() -> Dfa {
    Dfa::builder(SIGMA, 3)
        .with_accepting([0])
        .with_edges([
            (0, "000", 0),
            (0, "011", 0),
            (0, "0*0", 0),
            (0, "101", 0),
            (0, "110", 1),
            (0, "1*1", 0),
            (0, "*00", 0),
            (0, "*11", 0),
            (1, "001", 0),
            (1, "010", 1),
            (1, "0*1", 0),
            (1, "100", 1),
            (1, "111", 1),
            (1, "1*0", 1),
            (1, "*01", 0),
            (1, "*10", 1),
            (1, "**1", 0),
        ])
        .with_default(0, 2)
        .with_default(1, 2)
        .with_default(2, 2)
        .into_dfa(0)
}

/// Weak divisibility, B(x,y) ⇔ y is a power of two dividing x: the second
/// component must be 0ᵏ1 and the k-th bit of the first component set.
fn nat_weak_divisibility() -> Dfa {
    Dfa::builder(SIGMA, 2)
        .with_accepting([1])
        .with_edges([
            (0, "00", 0),
            (0, "01", 1),
            (0, "11", 1),
            (1, "0*", 1),
            (1, "1*", 1),
            (1, "**", 1),
        ])
        .with_default(0, 2)
        .with_default(1, 2)
        .with_default(2, 2)
        .into_dfa(0)
}

/// Büchi arithmetic over the natural numbers, ⟨ℕ, +, |₂⟩. Returns a fresh
/// presentation; the derived relations `Z`, `Eq`, `Pt` and `Lt` are compiled
/// on the spot.
pub fn buechi_arithmetic() -> Result<Arithmetic, EvalError> {
    let mut presentation = AutomaticPresentation::new(
        nat_universe(),
        [
            ("A".to_string(), nat_addition()),
            ("B".to_string(), nat_weak_divisibility()),
        ],
        PADDING,
    )?;
    presentation.install("Z", "A(x,x,x)")?;
    presentation.install("Eq", "exists z.(Z(z) and A(x,z,y))")?;
    presentation.install("Pt", "B(x,x)")?;
    presentation.install("Lt", "exists z.(not Z(z) and A(x,z,y))")?;
    Ok(Arithmetic::new(presentation, Encoding::Nat))
}

/// The ℤ universe: a sign symbol (`1` marks a negative number) followed by a
/// canonical magnitude; `-0` is not a valid encoding.
fn int_universe() -> Dfa {
    Dfa::builder(SIGMA, 1)
        .with_accepting([3, 5])
        .with_edges([
            (0, "0", 2),
            (0, "1", 1),
            (0, "*", 6),
            (1, "0", 4),
            (1, "1", 5),
            (1, "*", 6),
            (2, "0", 3),
            (2, "1", 5),
            (2, "*", 6),
            (3, "0", 4),
            (3, "1", 5),
            (3, "*", 6),
            (4, "0", 4),
            (4, "1", 5),
            (4, "*", 6),
            (5, "0", 4),
            (5, "1", 5),
            (5, "*", 6),
        ])
        .with_default(6, 6)
        .into_dfa(0)
}

/// Magnitude addition for the ℤ presentation: consumes the three sign
/// symbols unconstrained, then runs the carry automaton on the magnitudes.
fn int_magnitude_addition() -> Dfa {
    Dfa::builder(SIGMA, 3)
        .with_accepting([1])
        .with_edges([
            (0, "000", 1),
            (0, "001", 1),
            (0, "010", 1),
            (0, "011", 1),
            (0, "100", 1),
            (0, "101", 1),
            (0, "110", 1),
            (0, "111", 1),
            (1, "000", 1),
            (1, "011", 1),
            (1, "0*0", 1),
            (1, "101", 1),
            (1, "110", 2),
            (1, "1*1", 1),
            (1, "*00", 1),
            (1, "*11", 1),
            (2, "001", 1),
            (2, "010", 2),
            (2, "0*1", 1),
            (2, "100", 2),
            (2, "111", 2),
            (2, "1*0", 2),
            (2, "*01", 1),
            (2, "*10", 2),
            (2, "**1", 1),
        ])
        .with_default(0, 3)
        .with_default(1, 3)
        .with_default(2, 3)
        .with_default(3, 3)
        .into_dfa(0)
}

/// Weak divisibility on magnitudes: the sign of the divisor must be `0`.
fn int_weak_divisibility() -> Dfa {
    Dfa::builder(SIGMA, 2)
        .with_accepting([2])
        .with_edges([
            (0, "00", 1),
            (0, "10", 1),
            (0, "*0", 1),
            (1, "00", 1),
            (1, "01", 2),
            (1, "11", 2),
            (2, "0*", 2),
            (2, "1*", 2),
            (2, "**", 2),
        ])
        .with_default(0, 3)
        .with_default(1, 3)
        .with_default(2, 3)
        .with_default(3, 3)
        .into_dfa(0)
}

/// Non-negativity: the sign symbol is `0`.
fn int_nonnegative() -> Dfa {
    Dfa::builder(SIGMA, 1)
        .with_accepting([2])
        .with_edges([(0, "0", 2), (0, "1", 1), (0, "*", 1)])
        .with_default(1, 1)
        .with_default(2, 2)
        .into_dfa(0)
}

/// Büchi arithmetic over the integers. Addition is rebuilt from the
/// magnitude automaton `A0` by an eight-way case split on the signs, after
/// which `A0` is removed again.
pub fn buechi_arithmetic_z() -> Result<Arithmetic, EvalError> {
    let mut presentation = AutomaticPresentation::new(
        int_universe(),
        [
            ("A0".to_string(), int_magnitude_addition()),
            ("B".to_string(), int_weak_divisibility()),
            ("N0".to_string(), int_nonnegative()),
        ],
        PADDING,
    )?;
    presentation.install("Z", "A0(x,x,x)")?;

    let cases = [
        "(N0(x) and N0(y) and N0(z) and A0(x,y,z))",
        "(N0(x) and N0(y) and not N0(z) and exists a z0.(Z(z0) and A0(x,y,a) and A0(a,z,z0)))",
        "(N0(x) and not N0(y) and N0(z) and A0(z,y,x))",
        "(N0(x) and not N0(y) and not N0(z) and A0(z,x,y))",
        "(not N0(x) and N0(y) and N0(z) and A0(x,z,y))",
        "(not N0(x) and N0(y) and not N0(z) and A0(z,y,x))",
        "(not N0(x) and not N0(y) and N0(z) and exists a z0.(Z(z0) and A0(x,y,a) and A0(a,z,z0)))",
        "(not N0(x) and not N0(y) and not N0(z) and A0(x,y,z))",
    ];
    presentation.install("A", cases.join(" or ").as_str())?;

    presentation.install("Eq", "exists z.(Z(z) and A(x,z,y))")?;
    presentation.install("Pt", "B(x,x) and N0(x)")?;
    presentation.install("Lt", "exists z.(N0(z) and not Z(z) and A(x,z,y))")?;
    presentation.install("Neg", "exists z.(Z(z) and A(x,y,z))")?;
    presentation.remove("A0");

    Ok(Arithmetic::new(presentation, Encoding::Int))
}
