//! The concrete automaton representation: a totally defined transition table
//! over a [`ProductAlphabet`], one dense row per state, plus an accepting-state
//! bitset and a designated initial state. Automata are immutable values; every
//! operation returns a fresh automaton.

use std::collections::{HashMap, VecDeque};

use fixedbitset::FixedBitSet;
use itertools::Itertools;

use crate::alphabet::ProductAlphabet;
use crate::error::AutomatonError;

/// Identifier of a state. State identity is opaque: no observable behavior
/// depends on the numbering, and minimization renumbers canonically.
pub type StateId = u32;

/// A deterministic finite automaton over a product alphabet.
#[derive(Clone, PartialEq, Eq)]
pub struct Dfa {
    alphabet: ProductAlphabet,
    /// `transitions[q][s]` is δ(q, s); every row covers the full symbol set.
    transitions: Vec<Vec<StateId>>,
    accepting: FixedBitSet,
    initial: StateId,
}

impl Dfa {
    /// Assembles an automaton from raw parts. The transition table must be
    /// total: one row per state, one entry per symbol of the alphabet.
    pub fn from_parts(
        alphabet: ProductAlphabet,
        transitions: Vec<Vec<StateId>>,
        accepting: FixedBitSet,
        initial: StateId,
    ) -> Self {
        debug_assert!((initial as usize) < transitions.len());
        debug_assert!(
            transitions
                .iter()
                .all(|row| row.len() == alphabet.symbol_count())
        );
        let mut accepting = accepting;
        accepting.grow(transitions.len());
        Self {
            alphabet,
            transitions,
            accepting,
            initial,
        }
    }

    /// Instantiates a new [`DfaBuilder`] over the given base alphabet and
    /// arity.
    pub fn builder(base: impl IntoIterator<Item = char>, arity: usize) -> DfaBuilder {
        DfaBuilder::new(base, arity)
    }

    /// The alphabet the automaton reads.
    pub fn alphabet(&self) -> &ProductAlphabet {
        &self.alphabet
    }

    /// The tuple length of every input symbol.
    pub fn arity(&self) -> usize {
        self.alphabet.arity()
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.transitions.len()
    }

    /// The initial state.
    pub fn initial(&self) -> StateId {
        self.initial
    }

    /// Whether the given state is accepting.
    pub fn is_accepting(&self, state: StateId) -> bool {
        self.accepting.contains(state as usize)
    }

    /// δ(state, symbol) for a symbol given by index.
    pub fn successor(&self, state: StateId, symbol: usize) -> StateId {
        self.transitions[state as usize][symbol]
    }

    pub(crate) fn transition_row(&self, state: StateId) -> &[StateId] {
        &self.transitions[state as usize]
    }

    /// Runs the automaton on a word of symbol indices.
    pub fn run(&self, word: impl IntoIterator<Item = usize>) -> StateId {
        word.into_iter()
            .fold(self.initial, |q, s| self.successor(q, s))
    }

    /// Returns whether the automaton accepts the given word. Symbols are
    /// written as one char per coordinate (`"01*"` for a 3-ary symbol); a
    /// symbol outside the declared alphabet rejects.
    pub fn accepts<S: AsRef<str>>(&self, word: impl IntoIterator<Item = S>) -> bool {
        let mut state = self.initial;
        for symbol in word {
            let Some(idx) = self.alphabet.index_of(symbol.as_ref()) else {
                return false;
            };
            state = self.successor(state, idx);
        }
        self.is_accepting(state)
    }

    /// The set of states reachable from the initial state.
    pub(crate) fn reachable_states(&self) -> FixedBitSet {
        let mut seen = FixedBitSet::with_capacity(self.size());
        let mut queue = VecDeque::from([self.initial]);
        seen.insert(self.initial as usize);
        while let Some(q) = queue.pop_front() {
            for &p in self.transition_row(q) {
                if !seen.contains(p as usize) {
                    seen.insert(p as usize);
                    queue.push_back(p);
                }
            }
        }
        seen
    }

    /// The set of states from which an accepting state is reachable.
    pub(crate) fn productive_states(&self) -> FixedBitSet {
        let mut productive = self.accepting.clone();
        productive.grow(self.size());
        loop {
            let mut changed = false;
            for q in 0..self.size() {
                if productive.contains(q) {
                    continue;
                }
                if self.transitions[q].iter().any(|&p| productive.contains(p as usize)) {
                    productive.insert(q);
                    changed = true;
                }
            }
            if !changed {
                return productive;
            }
        }
    }

    /// Tries to construct a shortest accepted word, as a sequence of symbol
    /// indices. Returns `None` iff the language is empty.
    pub fn give_word(&self) -> Option<Vec<usize>> {
        if self.is_accepting(self.initial) {
            return Some(vec![]);
        }
        let mut pred: HashMap<StateId, (StateId, usize)> = HashMap::new();
        let mut queue = VecDeque::from([self.initial]);
        while let Some(q) = queue.pop_front() {
            for (s, &p) in self.transition_row(q).iter().enumerate() {
                if p != self.initial && !pred.contains_key(&p) {
                    pred.insert(p, (q, s));
                    if self.is_accepting(p) {
                        let mut word = vec![];
                        let mut cur = p;
                        while cur != self.initial {
                            let (prev, sym) = pred[&cur];
                            word.push(sym);
                            cur = prev;
                        }
                        word.reverse();
                        return Some(word);
                    }
                    queue.push_back(p);
                }
            }
        }
        None
    }

    /// Returns true iff the accepted language is empty.
    pub fn is_empty(&self) -> bool {
        self.give_word().is_none()
    }

    /// Returns true iff the accepted language is finite. The language is
    /// infinite exactly when some state that is both reachable and productive
    /// lies on a cycle.
    pub fn is_finite(&self) -> bool {
        let reachable = self.reachable_states();
        let productive = self.productive_states();
        let live = |q: StateId| reachable.contains(q as usize) && productive.contains(q as usize);

        // Iterative three-color DFS over the live subgraph.
        let mut color = vec![0u8; self.size()];
        for root in 0..self.size() as StateId {
            if !live(root) || color[root as usize] != 0 {
                continue;
            }
            let mut stack = vec![(root, 0usize)];
            color[root as usize] = 1;
            while let Some(top) = stack.last_mut() {
                let (q, next) = *top;
                let row = self.transition_row(q);
                if next >= row.len() {
                    color[q as usize] = 2;
                    stack.pop();
                    continue;
                }
                top.1 += 1;
                let p = row[next];
                if !live(p) {
                    continue;
                }
                match color[p as usize] {
                    0 => {
                        color[p as usize] = 1;
                        stack.push((p, 0));
                    }
                    1 => return false,
                    _ => {}
                }
            }
        }
        true
    }

    /// Product construction combining acceptance with `f`, restricted to the
    /// reachable pair set.
    fn combine(&self, other: &Dfa, f: impl Fn(bool, bool) -> bool) -> Result<Dfa, AutomatonError> {
        if self.arity() != other.arity() {
            return Err(AutomatonError::ArityMismatch {
                expected: self.arity(),
                found: other.arity(),
            });
        }
        if !self.alphabet.same_base(&other.alphabet) {
            return Err(AutomatonError::AlphabetMismatch);
        }

        let symbols = self.alphabet.symbol_count();
        let mut index: HashMap<(StateId, StateId), StateId> = HashMap::new();
        let mut transitions: Vec<Vec<StateId>> = vec![];
        let mut accepting = FixedBitSet::with_capacity(0);
        let mut queue = VecDeque::from([(self.initial, other.initial)]);
        index.insert((self.initial, other.initial), 0);
        transitions.push(vec![0; symbols]);
        while let Some((a, b)) = queue.pop_front() {
            let id = index[&(a, b)];
            for s in 0..symbols {
                let pair = (self.successor(a, s), other.successor(b, s));
                let target = *index.entry(pair).or_insert_with(|| {
                    transitions.push(vec![0; symbols]);
                    queue.push_back(pair);
                    (transitions.len() - 1) as StateId
                });
                transitions[id as usize][s] = target;
            }
        }
        accepting.grow(transitions.len());
        for (&(a, b), &id) in &index {
            if f(self.is_accepting(a), other.is_accepting(b)) {
                accepting.insert(id as usize);
            }
        }
        Ok(Dfa::from_parts(self.alphabet.clone(), transitions, accepting, 0))
    }

    /// An automaton accepting L(self) ∩ L(other).
    pub fn intersection(&self, other: &Dfa) -> Result<Dfa, AutomatonError> {
        self.combine(other, |a, b| a && b)
    }

    /// An automaton accepting L(self) ∪ L(other).
    pub fn union(&self, other: &Dfa) -> Result<Dfa, AutomatonError> {
        self.combine(other, |a, b| a || b)
    }

    /// An automaton accepting the complement language. Relies on δ being
    /// total, which every constructor maintains.
    pub fn complement(&self) -> Dfa {
        let mut accepting = self.accepting.clone();
        accepting.toggle_range(..);
        Dfa::from_parts(
            self.alphabet.clone(),
            self.transitions.clone(),
            accepting,
            self.initial,
        )
    }

    /// Whether the two automata accept the same language.
    pub fn equivalent(&self, other: &Dfa) -> Result<bool, AutomatonError> {
        Ok(self.complement().intersection(other)?.is_empty()
            && other.complement().intersection(self)?.is_empty())
    }
}

impl std::fmt::Debug for Dfa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Dfa {{ arity: {}, states: {}, initial: {}, accepting: {{{}}} }}",
            self.arity(),
            self.size(),
            self.initial,
            self.accepting.ones().map(|q| q.to_string()).join(", ")
        )?;
        for (q, row) in self.transitions.iter().enumerate() {
            let edges = row
                .iter()
                .enumerate()
                .map(|(s, p)| format!("{} -> {p}", self.alphabet.symbol(s)))
                .join(", ");
            writeln!(f, "  {q}: [{edges}]")?;
        }
        Ok(())
    }
}

/// Helper for assembling automata from explicit state tables, the form in
/// which the built-in relation automata are specified. States are addressed
/// by number; the state count is inferred from the highest mentioned id.
///
/// # Example
/// ```
/// use automata::Dfa;
///
/// // Words over {a, b} with an even number of b's.
/// let dfa = Dfa::builder(['a', 'b'], 1)
///     .with_accepting([0])
///     .with_edges([(0, "a", 0), (0, "b", 1), (1, "a", 1), (1, "b", 0)])
///     .into_dfa(0);
/// assert!(dfa.accepts(["a", "b", "b"]));
/// assert!(!dfa.accepts(["b", "a"]));
/// ```
pub struct DfaBuilder {
    alphabet: ProductAlphabet,
    edges: Vec<(StateId, usize, StateId)>,
    defaults: Vec<(StateId, StateId)>,
    accepting: Vec<StateId>,
}

impl DfaBuilder {
    /// Creates an empty builder over the given base symbols and arity.
    pub fn new(base: impl IntoIterator<Item = char>, arity: usize) -> Self {
        Self {
            alphabet: ProductAlphabet::new(base, arity),
            edges: vec![],
            defaults: vec![],
            accepting: vec![],
        }
    }

    /// Adds a list of edges `(source, symbol, target)` with the symbol written
    /// as one char per coordinate. Panics if a symbol does not belong to the
    /// alphabet.
    pub fn with_edges<S: AsRef<str>>(
        mut self,
        edges: impl IntoIterator<Item = (StateId, S, StateId)>,
    ) -> Self {
        for (q, symbol, p) in edges {
            let idx = self
                .alphabet
                .index_of(symbol.as_ref())
                .unwrap_or_else(|| panic!("symbol {:?} is not in the alphabet", symbol.as_ref()));
            self.edges.push((q, idx, p));
        }
        self
    }

    /// Sends every symbol without an explicit edge from `state` to `target`.
    pub fn with_default(mut self, state: StateId, target: StateId) -> Self {
        self.defaults.push((state, target));
        self
    }

    /// Marks the given states as accepting.
    pub fn with_accepting(mut self, states: impl IntoIterator<Item = StateId>) -> Self {
        self.accepting.extend(states);
        self
    }

    /// Builds the automaton with the given initial state. Panics if some
    /// state has neither a default row nor an edge for every symbol.
    pub fn into_dfa(self, initial: StateId) -> Dfa {
        let max_id = self
            .edges
            .iter()
            .flat_map(|&(q, _, p)| [q, p])
            .chain(self.defaults.iter().flat_map(|&(q, p)| [q, p]))
            .chain(self.accepting.iter().copied())
            .chain([initial])
            .max()
            .unwrap_or(initial);
        let states = max_id as usize + 1;
        let symbols = self.alphabet.symbol_count();

        let mut transitions: Vec<Vec<Option<StateId>>> = vec![vec![None; symbols]; states];
        for (q, s, p) in &self.edges {
            transitions[*q as usize][*s] = Some(*p);
        }
        for (q, p) in &self.defaults {
            for slot in transitions[*q as usize].iter_mut() {
                slot.get_or_insert(*p);
            }
        }

        let transitions = transitions
            .into_iter()
            .enumerate()
            .map(|(q, row)| {
                row.into_iter()
                    .enumerate()
                    .map(|(s, target)| {
                        target.unwrap_or_else(|| {
                            panic!(
                                "state {q} has no transition on {:?} and no default",
                                self.alphabet.symbol(s)
                            )
                        })
                    })
                    .collect()
            })
            .collect();

        let mut accepting = FixedBitSet::with_capacity(states);
        for q in &self.accepting {
            accepting.insert(*q as usize);
        }
        Dfa::from_parts(self.alphabet, transitions, accepting, initial)
    }
}

#[cfg(test)]
mod tests {
    use super::Dfa;

    fn even_b() -> Dfa {
        Dfa::builder(['a', 'b'], 1)
            .with_accepting([0])
            .with_edges([(0, "a", 0), (0, "b", 1), (1, "a", 1), (1, "b", 0)])
            .into_dfa(0)
    }

    fn ends_in_a() -> Dfa {
        Dfa::builder(['a', 'b'], 1)
            .with_accepting([1])
            .with_edges([(0, "a", 1), (0, "b", 0), (1, "a", 1), (1, "b", 0)])
            .into_dfa(0)
    }

    #[test]
    fn boolean_operations() {
        let even = even_b();
        let enda = ends_in_a();

        let both = even.intersection(&enda).unwrap();
        assert!(both.accepts(["a"]));
        assert!(both.accepts(["b", "b", "a"]));
        assert!(!both.accepts(["b", "a"]));
        assert!(!both.accepts(["a", "b", "b"]));

        let either = even.union(&enda).unwrap();
        assert!(either.accepts(["b", "a"]));
        assert!(either.accepts(["a", "b", "b"]));
        assert!(!either.accepts(["b"]));

        let neither = even.complement().intersection(&enda.complement()).unwrap();
        assert!(neither.accepts(["b"]));
        assert!(!neither.accepts(["a"]));
        assert_eq!(neither.equivalent(&either.complement()), Ok(true));
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let one = even_b();
        let two = Dfa::builder(['a', 'b'], 2)
            .with_accepting([0])
            .with_default(0, 0)
            .into_dfa(0);
        assert!(one.intersection(&two).is_err());
    }

    #[test]
    fn emptiness_and_witness() {
        let even = even_b();
        assert!(!even.is_empty());
        assert_eq!(even.give_word(), Some(vec![]));

        let nothing = even.intersection(&even.complement()).unwrap();
        assert!(nothing.is_empty());
        assert_eq!(nothing.give_word(), None);
    }

    #[test]
    fn finiteness() {
        // Exactly the word "ab".
        let ab = Dfa::builder(['a', 'b'], 1)
            .with_accepting([2])
            .with_edges([(0, "a", 1), (1, "b", 2)])
            .with_default(0, 3)
            .with_default(1, 3)
            .with_default(2, 3)
            .with_default(3, 3)
            .into_dfa(0);
        assert!(ab.is_finite());
        assert!(!ab.is_empty());
        assert!(!even_b().is_finite());
    }

    #[test]
    fn accepts_rejects_foreign_symbols() {
        assert!(!even_b().accepts(["c"]));
    }
}
