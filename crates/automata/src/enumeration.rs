//! Length-lexicographic enumeration. Words are ordered first by the length of
//! their longest component, then componentwise lexicographically. The
//! enumerator is a lazy best-first search over the transition graph: the
//! underlying automaton is not rebuilt between `next` calls, and exploration
//! never follows the all-padding symbol, so padding suffixes are never
//! produced.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use fixedbitset::FixedBitSet;

use crate::dfa::{Dfa, StateId};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    word: Vec<String>,
    state: StateId,
}

impl Entry {
    fn length(&self) -> usize {
        self.word.iter().map(|c| c.len()).max().unwrap_or(0)
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.length()
            .cmp(&other.length())
            .then_with(|| self.word.cmp(&other.word))
            .then_with(|| self.state.cmp(&other.state))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Iterator over the language of a DFA in length-lexicographic order.
///
/// In forward mode the search runs from the initial state and yields the
/// accepted words themselves. In backward mode it runs from the accepting
/// states along reversed transitions toward the initial state and yields the
/// words of the *reverse* language (for lsbf-encoded numbers these are the
/// msbf words).
pub struct LlexWords {
    dfa: Dfa,
    pad: char,
    all_pad: Option<usize>,
    backward: bool,
    /// Forward: productive states; backward: states reachable from the
    /// initial state. Entries outside this set can never contribute a word.
    viable: FixedBitSet,
    /// `reverse[q][s]` lists the sources of s-transitions into q
    /// (backward mode only).
    reverse: Vec<Vec<Vec<StateId>>>,
    heap: BinaryHeap<Reverse<Entry>>,
}

impl LlexWords {
    fn new(dfa: &Dfa, pad: char, backward: bool) -> Self {
        let dfa = dfa.clone();
        let all_pad = dfa.alphabet().uniform_index(pad);
        let symbols = dfa.alphabet().symbol_count();
        let arity = dfa.arity();
        let mut heap = BinaryHeap::new();

        let (viable, reverse) = if backward {
            let viable = dfa.reachable_states();
            let mut reverse = vec![vec![vec![]; symbols]; dfa.size()];
            for q in 0..dfa.size() as StateId {
                for s in 0..symbols {
                    reverse[dfa.successor(q, s) as usize][s].push(q);
                }
            }
            for q in 0..dfa.size() as StateId {
                if dfa.is_accepting(q) && viable.contains(q as usize) {
                    heap.push(Reverse(Entry {
                        word: vec![String::new(); arity],
                        state: q,
                    }));
                }
            }
            (viable, reverse)
        } else {
            let viable = dfa.productive_states();
            if viable.contains(dfa.initial() as usize) {
                heap.push(Reverse(Entry {
                    word: vec![String::new(); arity],
                    state: dfa.initial(),
                }));
            }
            (viable, vec![])
        };

        Self {
            dfa,
            pad,
            all_pad,
            backward,
            viable,
            reverse,
            heap,
        }
    }

    /// Appends the non-padding coordinates of `symbol` to the components of
    /// `word`.
    fn extended(&self, word: &[String], symbol: usize) -> Vec<String> {
        let chars: Vec<char> = self.dfa.alphabet().symbol(symbol).chars().collect();
        word.iter()
            .zip(chars)
            .map(|(component, c)| {
                let mut component = component.clone();
                if c != self.pad {
                    component.push(c);
                }
                component
            })
            .collect()
    }
}

impl Iterator for LlexWords {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(Reverse(entry)) = self.heap.pop() {
            for s in 0..self.dfa.alphabet().symbol_count() {
                if Some(s) == self.all_pad {
                    continue;
                }
                if self.backward {
                    for i in 0..self.reverse[entry.state as usize][s].len() {
                        let source = self.reverse[entry.state as usize][s][i];
                        if self.viable.contains(source as usize) {
                            self.heap.push(Reverse(Entry {
                                word: self.extended(&entry.word, s),
                                state: source,
                            }));
                        }
                    }
                } else {
                    let target = self.dfa.successor(entry.state, s);
                    if self.viable.contains(target as usize) {
                        self.heap.push(Reverse(Entry {
                            word: self.extended(&entry.word, s),
                            state: target,
                        }));
                    }
                }
            }

            let done = if self.backward {
                entry.state == self.dfa.initial()
            } else {
                self.dfa.is_accepting(entry.state)
            };
            if done {
                return Some(entry.word);
            }
        }
        None
    }
}

impl Dfa {
    /// Streams the language in length-lexicographic order; see [`LlexWords`].
    pub fn llex_words(&self, pad: char, backward: bool) -> LlexWords {
        LlexWords::new(self, pad, backward)
    }
}
