//! Number codecs. Natural numbers are encoded least-significant-bit-first
//! over {0, 1}; the canonical encoding has no trailing zero bits except that
//! zero itself is the single word `0` (the universe automaton accepts exactly
//! these words). Integers prepend a sign symbol (`1` for negative) to the
//! encoding of the magnitude; `-0` has no encoding. Tuples are convolved by
//! equalizing component lengths with the padding symbol.

use automata::{Dfa, convolve};

use crate::error::EvalError;

/// The padding symbol of the built-in presentations.
pub const PADDING: char = '*';

/// The base alphabet of the built-in presentations.
pub const SIGMA: [char; 3] = ['0', '1', PADDING];

/// How numbers are written as words; fixed per presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Canonical lsbf binary over ℕ.
    Nat,
    /// Sign symbol followed by the lsbf magnitude, over ℤ.
    Int,
}

impl Encoding {
    /// Encodes a number; fails with a domain error when a negative number is
    /// encoded over ℕ.
    pub fn encode(&self, n: i64) -> Result<String, EvalError> {
        match self {
            Encoding::Nat => {
                if n < 0 {
                    return Err(EvalError::Domain(format!(
                        "{n} has no encoding over the natural numbers"
                    )));
                }
                Ok(lsbf(n.unsigned_abs()))
            }
            Encoding::Int => {
                let sign = if n < 0 { '1' } else { '0' };
                Ok(format!("{sign}{}", lsbf(n.unsigned_abs())))
            }
        }
    }

    /// Decodes a word produced by forward (lsbf-ordered) enumeration.
    /// Padding symbols are ignored; the empty word decodes to 0.
    pub fn decode(&self, word: &str) -> i64 {
        let bits: Vec<char> = word.chars().filter(|&c| c != PADDING).collect();
        match self {
            Encoding::Nat => from_lsbf(&bits),
            Encoding::Int => match bits.split_first() {
                Some(('1', magnitude)) => -from_lsbf(magnitude),
                Some((_, magnitude)) => from_lsbf(magnitude),
                None => 0,
            },
        }
    }

    /// Decodes a word produced by backward enumeration, which yields the
    /// reverse (most-significant-bit-first) form.
    pub fn decode_reversed(&self, word: &str) -> i64 {
        let reversed: String = word.chars().rev().collect();
        self.decode(&reversed)
    }

    /// Encodes a tuple and convolves it into a word over the product
    /// alphabet.
    pub fn encode_tuple(&self, tuple: &[i64]) -> Result<Vec<String>, EvalError> {
        let parts: Vec<String> = tuple
            .iter()
            .map(|&n| self.encode(n))
            .collect::<Result<_, _>>()?;
        Ok(convolve(&parts, PADDING))
    }

    /// Whether the (unpadded) automaton accepts the encoding of the tuple.
    pub fn member(&self, dfa: &Dfa, tuple: &[i64]) -> Result<bool, EvalError> {
        if dfa.arity() != tuple.len() {
            return Err(automata::AutomatonError::ArityMismatch {
                expected: dfa.arity(),
                found: tuple.len(),
            }
            .into());
        }
        Ok(dfa.accepts(self.encode_tuple(tuple)?))
    }
}

/// A single-path automaton accepting exactly the lsbf encoding of `n`, over
/// the standard base alphabet. Padding is added later by the presentation.
pub fn lsbf_automaton(n: u64) -> Dfa {
    automata::word_automaton(SIGMA, &lsbf(n))
}

fn lsbf(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut bits = String::new();
    while n > 0 {
        bits.push(if n & 1 == 1 { '1' } else { '0' });
        n >>= 1;
    }
    bits
}

fn from_lsbf(bits: &[char]) -> i64 {
    bits.iter()
        .rev()
        .fold(0i64, |acc, &c| acc * 2 + i64::from(c == '1'))
}

#[cfg(test)]
mod tests {
    use super::Encoding;

    #[test]
    fn natural_numbers() {
        let e = Encoding::Nat;
        assert_eq!(e.encode(0).unwrap(), "0");
        assert_eq!(e.encode(1).unwrap(), "1");
        assert_eq!(e.encode(2).unwrap(), "01");
        assert_eq!(e.encode(6).unwrap(), "011");
        assert_eq!(e.decode("011"), 6);
        assert_eq!(e.decode("01*"), 2);
        assert_eq!(e.decode_reversed("110"), 6);
        assert!(e.encode(-1).is_err());
    }

    #[test]
    fn integers() {
        let e = Encoding::Int;
        assert_eq!(e.encode(5).unwrap(), "0101");
        assert_eq!(e.encode(-5).unwrap(), "1101");
        assert_eq!(e.encode(0).unwrap(), "00");
        assert_eq!(e.decode("1101"), -5);
        assert_eq!(e.decode("0101"), 5);
        assert_eq!(e.decode_reversed("1011"), -5);
    }

    #[test]
    fn tuples_are_convolved() {
        let e = Encoding::Nat;
        assert_eq!(e.encode_tuple(&[1, 2]).unwrap(), vec!["10", "*1"]);
    }

    #[test]
    fn lsbf_automaton_is_a_single_path() {
        let five = super::lsbf_automaton(5);
        assert!(five.accepts(["1", "0", "1"]));
        assert!(!five.accepts(["1", "0"]));
        assert!(!five.accepts(["1", "0", "1", "*"]));
        assert!(super::lsbf_automaton(0).accepts(["0"]));
    }
}
