//! The convolution operators. A k-ary relation over words is recognized as a
//! language over Σᵏ by reading the tuple column by column; shorter components
//! are extended to the common length with the padding symbol. The operators
//! here move automata between arities (`expand`, `projection`, `product`) and
//! between the padded and unpadded representations (`pad`, `unpad`).

use std::collections::{BTreeSet, VecDeque};
use std::time::Instant;

use bimap::BiHashMap;
use fixedbitset::FixedBitSet;
use tracing::debug;

use crate::alphabet::ProductAlphabet;
use crate::dfa::{Dfa, StateId};
use crate::error::AutomatonError;

/// Convolves a tuple of components into a word over the product alphabet:
/// one symbol per column, shorter components extended with `pad`.
pub fn convolve<S: AsRef<str>>(parts: &[S], pad: char) -> Vec<String> {
    let parts: Vec<Vec<char>> = parts.iter().map(|p| p.as_ref().chars().collect()).collect();
    let len = parts.iter().map(|p| p.len()).max().unwrap_or(0);
    (0..len)
        .map(|i| {
            parts
                .iter()
                .map(|p| p.get(i).copied().unwrap_or(pad))
                .collect()
        })
        .collect()
}

/// The arity-0 automaton accepting only the empty word, i.e. the relation
/// "true". The base alphabet is recorded so that a later [`Dfa::expand`]
/// knows which symbols to range over.
pub fn one(base: impl IntoIterator<Item = char>) -> Dfa {
    let mut accepting = FixedBitSet::with_capacity(1);
    accepting.insert(0);
    Dfa::from_parts(ProductAlphabet::new(base, 0), vec![vec![]], accepting, 0)
}

/// The arity-0 automaton accepting nothing, i.e. the relation "false".
pub fn zero(base: impl IntoIterator<Item = char>) -> Dfa {
    Dfa::from_parts(
        ProductAlphabet::new(base, 0),
        vec![vec![]],
        FixedBitSet::with_capacity(1),
        0,
    )
}

/// A single-path automaton accepting exactly `word` (1-ary). Everything else
/// falls into a dead sink. Panics if `word` uses a symbol outside `base`.
pub fn word_automaton(base: impl IntoIterator<Item = char>, word: &str) -> Dfa {
    let alphabet = ProductAlphabet::new(base, 1);
    let chars: Vec<usize> = word
        .chars()
        .map(|c| {
            alphabet
                .digit(c)
                .unwrap_or_else(|| panic!("symbol {c:?} is not in the alphabet"))
        })
        .collect();
    let n = chars.len();
    let dead = (n + 1) as StateId;
    let mut transitions = Vec::with_capacity(n + 2);
    for (i, &expected) in chars.iter().enumerate() {
        transitions.push(
            (0..alphabet.symbol_count())
                .map(|s| if s == expected { (i + 1) as StateId } else { dead })
                .collect(),
        );
    }
    transitions.push(vec![dead; alphabet.symbol_count()]);
    transitions.push(vec![dead; alphabet.symbol_count()]);
    let mut accepting = FixedBitSet::with_capacity(n + 2);
    accepting.insert(n);
    Dfa::from_parts(alphabet, transitions, accepting, 0)
}

/// The n-fold Cartesian power of a 1-ary automaton: the automaton accepting
/// {(x₀,…,xₙ₋₁) | every xᵢ ∈ L(u)}. For n = 0 this is [`one`].
pub fn product(u: &Dfa, n: usize) -> Result<Dfa, AutomatonError> {
    if u.arity() != 1 {
        return Err(AutomatonError::ArityMismatch {
            expected: 1,
            found: u.arity(),
        });
    }
    if n == 0 {
        return Ok(one(u.alphabet().base().iter().copied()));
    }
    let mut result = u.expand(n, &[0])?;
    for i in 1..n {
        result = result.intersection(&u.expand(n, &[i])?)?.minimize();
    }
    Ok(result)
}

impl Dfa {
    /// Expands a k-ary automaton to arity `n`: the result accepts a word over
    /// Σⁿ iff the projection of that word onto the columns named by `pos`
    /// (automaton column j reads tuple position `pos[j]`) is accepted by
    /// `self`. Positions may repeat, which identifies columns — this is how
    /// atoms with a repeated variable are compiled.
    pub fn expand(&self, n: usize, pos: &[usize]) -> Result<Dfa, AutomatonError> {
        if pos.len() != self.arity() {
            return Err(AutomatonError::ArityMismatch {
                expected: self.arity(),
                found: pos.len(),
            });
        }
        if let Some(&bad) = pos.iter().find(|&&p| p >= n) {
            return Err(AutomatonError::PositionOutOfRange {
                index: bad,
                arity: n,
            });
        }

        let alphabet = self.alphabet().with_arity(n);
        if self.arity() == 0 {
            // A fully projected automaton denotes a truth value; expanding it
            // yields the all-accepting or all-rejecting automaton.
            let accepts = self.is_accepting(self.initial());
            let mut accepting = FixedBitSet::with_capacity(1);
            if accepts {
                accepting.insert(0);
            }
            let transitions = vec![vec![0; alphabet.symbol_count()]];
            return Ok(Dfa::from_parts(alphabet, transitions, accepting, 0));
        }

        let remap: Vec<usize> = (0..alphabet.symbol_count())
            .map(|s| {
                let digits = alphabet.digits(s);
                let trimmed: Vec<usize> = pos.iter().map(|&p| digits[p]).collect();
                self.alphabet().index_from_digits(&trimmed)
            })
            .collect();
        let transitions = (0..self.size() as StateId)
            .map(|q| remap.iter().map(|&old| self.successor(q, old)).collect())
            .collect();
        let mut accepting = FixedBitSet::with_capacity(self.size());
        for q in 0..self.size() as StateId {
            if self.is_accepting(q) {
                accepting.insert(q as usize);
            }
        }
        Ok(Dfa::from_parts(alphabet, transitions, accepting, self.initial()).minimize())
    }

    /// Turns an unpadded automaton into a padded one recognizing
    /// L(self)·{(σ,…,σ)}*: accepting states move to a `good` sink on the
    /// all-padding symbol, everything else to a `bad` sink. Symbols created
    /// by extending the base alphabet with `pad` also fall to `bad`.
    pub fn pad(&self, pad: char) -> Dfa {
        if self.arity() == 0 {
            return self.clone();
        }
        let alphabet = self.alphabet().extended_with(pad);
        let good = self.size() as StateId;
        let bad = good + 1;
        let all_pad = alphabet
            .uniform_index(pad)
            .expect("padding symbol was just added to the base");

        let mut transitions: Vec<Vec<StateId>> = Vec::with_capacity(self.size() + 2);
        for q in 0..self.size() as StateId {
            let row = (0..alphabet.symbol_count())
                .map(|s| {
                    if s == all_pad {
                        if self.is_accepting(q) { good } else { bad }
                    } else {
                        match self.alphabet().index_of(&alphabet.symbol(s)) {
                            Some(old) => self.successor(q, old),
                            None => bad,
                        }
                    }
                })
                .collect();
            transitions.push(row);
        }
        transitions.push(
            (0..alphabet.symbol_count())
                .map(|s| if s == all_pad { good } else { bad })
                .collect(),
        );
        transitions.push(vec![bad; alphabet.symbol_count()]);

        let mut accepting = FixedBitSet::with_capacity(self.size() + 2);
        for q in 0..self.size() as StateId {
            if self.is_accepting(q) {
                accepting.insert(q as usize);
            }
        }
        accepting.insert(good as usize);
        Dfa::from_parts(alphabet, transitions, accepting, self.initial()).minimize()
    }

    /// Inverse of [`Dfa::pad`]: accepts every word from which an accepting
    /// state is reachable by a pure padding suffix. The accepting set is
    /// closed under predecessors of the all-padding symbol; afterwards the
    /// all-padding transition of every state is redirected into a fresh dead
    /// sink so that interleaved padding cannot be accepted.
    pub fn unpad(&self, pad: char) -> Dfa {
        let Some(all_pad) = self.alphabet().uniform_index(pad) else {
            return self.clone();
        };

        let mut accepting = FixedBitSet::with_capacity(self.size() + 1);
        for q in 0..self.size() as StateId {
            if self.is_accepting(q) {
                accepting.insert(q as usize);
            }
        }
        loop {
            let mut changed = false;
            for q in 0..self.size() {
                if !accepting.contains(q)
                    && accepting.contains(self.successor(q as StateId, all_pad) as usize)
                {
                    accepting.insert(q);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let sink = self.size() as StateId;
        let mut transitions: Vec<Vec<StateId>> = (0..self.size() as StateId)
            .map(|q| {
                (0..self.alphabet().symbol_count())
                    .map(|s| if s == all_pad { sink } else { self.successor(q, s) })
                    .collect()
            })
            .collect();
        transitions.push(vec![sink; self.alphabet().symbol_count()]);

        Dfa::from_parts(self.alphabet().clone(), transitions, accepting, self.initial()).minimize()
    }

    /// Existentially projects away column `i`: the result has arity k − 1 and
    /// accepts a word iff some completion of column `i` is accepted by
    /// `self`. Built by the subset construction over trimmed symbols. A 1-ary
    /// automaton collapses to [`one`] or [`zero`] by emptiness.
    pub fn projection(&self, i: usize) -> Result<Dfa, AutomatonError> {
        let k = self.arity();
        if i >= k {
            return Err(AutomatonError::PositionOutOfRange { index: i, arity: k });
        }
        let base = self.alphabet().base().iter().copied();
        if k == 1 {
            return Ok(if self.is_empty() { zero(base) } else { one(base) });
        }

        let start = Instant::now();
        let alphabet = self.alphabet().with_arity(k - 1);
        // For every trimmed symbol, the full symbols obtained by re-inserting
        // each base symbol at position i.
        let completions: Vec<Vec<usize>> = (0..alphabet.symbol_count())
            .map(|s| {
                let digits = alphabet.digits(s);
                (0..self.alphabet().base().len())
                    .map(|a| {
                        let mut full = digits.clone();
                        full.insert(i, a);
                        self.alphabet().index_from_digits(&full)
                    })
                    .collect()
            })
            .collect();

        let mut interned: BiHashMap<StateId, BTreeSet<StateId>> = BiHashMap::new();
        let start_set = BTreeSet::from([self.initial()]);
        interned.insert(0, start_set.clone());
        let mut transitions: Vec<Vec<StateId>> = vec![vec![0; alphabet.symbol_count()]];
        let mut queue = VecDeque::from([start_set]);
        while let Some(set) = queue.pop_front() {
            let id = *interned
                .get_by_right(&set)
                .expect("worklist sets are interned before queueing");
            for (s, completion) in completions.iter().enumerate() {
                let target: BTreeSet<StateId> = set
                    .iter()
                    .flat_map(|&q| completion.iter().map(move |&full| self.successor(q, full)))
                    .collect();
                let target_id = match interned.get_by_right(&target) {
                    Some(&existing) => existing,
                    None => {
                        let fresh = transitions.len() as StateId;
                        interned.insert(fresh, target.clone());
                        transitions.push(vec![0; alphabet.symbol_count()]);
                        queue.push_back(target);
                        fresh
                    }
                };
                transitions[id as usize][s] = target_id;
            }
        }

        let mut accepting = FixedBitSet::with_capacity(transitions.len());
        for (&id, set) in interned.iter() {
            if set.iter().any(|&q| self.is_accepting(q)) {
                accepting.insert(id as usize);
            }
        }
        let out = Dfa::from_parts(alphabet, transitions, accepting, 0).minimize();
        debug!(
            "projected column {i} of {} states into {} states in {} microseconds",
            self.size(),
            out.size(),
            start.elapsed().as_micros()
        );
        Ok(out)
    }
}
