//! Partition refinement for deterministic finite automata. Two states are
//! equivalent iff they agree on acceptance and their transitions lead to
//! equivalent states for every symbol; the refinement below computes the
//! coarsest such partition of the reachable states and collapses it into the
//! quotient automaton. The quotient is renumbered by breadth-first discovery
//! order so that equivalent inputs produce identical state counts.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Instant;

use tracing::{debug, trace};

use crate::dfa::{Dfa, StateId};

/// Computes the coarsest bisimulation partition of the reachable states,
/// seeded by the accepting/rejecting split.
fn greatest_bisimulation(dfa: &Dfa) -> Vec<BTreeSet<StateId>> {
    let reachable = dfa.reachable_states();
    let reachable: BTreeSet<StateId> = reachable.ones().map(|q| q as StateId).collect();

    let mut partition: Vec<BTreeSet<StateId>> = vec![];
    for block in [
        reachable
            .iter()
            .copied()
            .filter(|&q| dfa.is_accepting(q))
            .collect::<BTreeSet<_>>(),
        reachable
            .iter()
            .copied()
            .filter(|&q| !dfa.is_accepting(q))
            .collect::<BTreeSet<_>>(),
    ] {
        if !block.is_empty() {
            partition.push(block);
        }
    }
    let mut queue = partition.clone();

    while let Some(a) = queue.pop() {
        for sym in 0..dfa.alphabet().symbol_count() {
            let x: BTreeSet<StateId> = reachable
                .iter()
                .copied()
                .filter(|&q| a.contains(&dfa.successor(q, sym)))
                .collect();
            if x.is_empty() {
                continue;
            }

            let mut new_partition = vec![];
            for y in &partition {
                if x.intersection(y).next().is_none() || y.difference(&x).next().is_none() {
                    new_partition.push(y.clone());
                    continue;
                }
                let int: BTreeSet<StateId> = x.intersection(y).copied().collect();
                let diff: BTreeSet<StateId> = y.difference(&x).copied().collect();

                if let Some(pos) = queue.iter().position(|o| o == y) {
                    queue.remove(pos);
                    queue.extend([int.clone(), diff.clone()]);
                } else {
                    queue.push(if int.len() <= diff.len() {
                        int.clone()
                    } else {
                        diff.clone()
                    });
                }
                new_partition.extend([int, diff]);
            }
            partition = new_partition;
        }
    }

    partition
}

/// Builds the quotient automaton for the given partition of the reachable
/// states. Classes are numbered in breadth-first discovery order from the
/// class of the initial state, walking symbols in index order.
fn quotient(dfa: &Dfa, partition: Vec<BTreeSet<StateId>>) -> Dfa {
    let mut class_of: HashMap<StateId, usize> = HashMap::new();
    for (i, block) in partition.iter().enumerate() {
        for &q in block {
            class_of.insert(q, i);
        }
    }

    let symbols = dfa.alphabet().symbol_count();
    let initial_class = class_of[&dfa.initial()];
    let mut new_id: HashMap<usize, StateId> = HashMap::from([(initial_class, 0)]);
    let mut order = vec![initial_class];
    let mut queue = VecDeque::from([initial_class]);
    while let Some(class) = queue.pop_front() {
        let rep = *partition[class]
            .iter()
            .next()
            .expect("partition blocks are non-empty");
        for sym in 0..symbols {
            let target = class_of[&dfa.successor(rep, sym)];
            if !new_id.contains_key(&target) {
                new_id.insert(target, order.len() as StateId);
                order.push(target);
                queue.push_back(target);
            }
        }
    }

    let mut transitions = Vec::with_capacity(order.len());
    let mut accepting = fixedbitset::FixedBitSet::with_capacity(order.len());
    for (id, &class) in order.iter().enumerate() {
        let rep = *partition[class]
            .iter()
            .next()
            .expect("partition blocks are non-empty");
        if dfa.is_accepting(rep) {
            accepting.insert(id);
        }
        let row = (0..symbols)
            .map(|sym| new_id[&class_of[&dfa.successor(rep, sym)]])
            .collect();
        transitions.push(row);
    }

    Dfa::from_parts(dfa.alphabet().clone(), transitions, accepting, 0)
}

impl Dfa {
    /// Returns the language-equivalent automaton with the minimum number of
    /// states. The result has no unreachable states and at most one dead
    /// class (kept so that δ stays total); minimization is idempotent.
    pub fn minimize(&self) -> Dfa {
        let start = Instant::now();
        let partition = greatest_bisimulation(self);
        trace!(
            "refined {} reachable states into {} classes",
            partition.iter().map(|b| b.len()).sum::<usize>(),
            partition.len()
        );
        let out = quotient(self, partition);
        debug!(
            "minimized {} -> {} states in {} microseconds",
            self.size(),
            out.size(),
            start.elapsed().as_micros()
        );
        out
    }
}
