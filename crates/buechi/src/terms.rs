//! The user-facing algebra. Elementary terms denote numbers (constants,
//! variables, sums and negations); relational-algebra terms denote relations
//! (atoms and their boolean/projection combinators). A term does not hold
//! automata itself — it desugars into a first-order formula plus fresh
//! relation bindings for the graphs of its subterms, and delegates to the
//! formula compiler of the surrounding presentation. Every node caches its
//! compiled automaton until a substitution invalidates it.

use std::collections::{BTreeMap, BTreeSet};

use automata::{Dfa, LlexWords, word_automaton};

use crate::buildin::Arithmetic;
use crate::encoding::Encoding;
use crate::error::EvalError;
use crate::presentation::Definition;

/// Returns `n` fresh names that are disjoint from `existing` and internally
/// unique. The names extend the lexicographically maximum existing name with
/// sequence numbers, so every fresh name also sorts *after* every existing
/// name — the term layer relies on this to keep the output column of a graph
/// relation last.
pub fn unique_names(existing: &[String], n: usize) -> Vec<String> {
    let stem = existing
        .iter()
        .max()
        .cloned()
        .unwrap_or_else(|| "v".to_string());
    let width = n.saturating_sub(1).to_string().len();
    (0..n).map(|i| format!("{stem}{i:0width$}")).collect()
}

#[derive(Debug, Clone)]
enum ElementaryKind {
    Constant(i64),
    Variable(String),
    Addition(Box<ElementaryTerm>, Box<ElementaryTerm>),
    Negation(Box<ElementaryTerm>),
}

/// A term denoting a number. Its *graph* is the relation
/// {(v₁,…,vₘ, value)} over the term's sorted variables, with the value in
/// the last column.
#[derive(Debug, Clone)]
pub struct ElementaryTerm {
    kind: ElementaryKind,
    graph: Option<Dfa>,
}

impl ElementaryTerm {
    pub fn var(name: impl Into<String>) -> Self {
        Self {
            kind: ElementaryKind::Variable(name.into()),
            graph: None,
        }
    }

    pub fn constant(n: i64) -> Self {
        Self {
            kind: ElementaryKind::Constant(n),
            graph: None,
        }
    }

    pub fn add(&self, other: &ElementaryTerm) -> Self {
        Self {
            kind: ElementaryKind::Addition(Box::new(self.clone()), Box::new(other.clone())),
            graph: None,
        }
    }

    /// Negation; meaningful over presentations that install `Neg`.
    pub fn neg(&self) -> Self {
        Self {
            kind: ElementaryKind::Negation(Box::new(self.clone())),
            graph: None,
        }
    }

    pub fn sub(&self, other: &ElementaryTerm) -> Self {
        self.add(&other.neg())
    }

    /// Scales the term by a non-negative constant, desugared through a
    /// doubling chain: `t, t+t, (t+t)+(t+t), …` with the entries whose bit of
    /// `factor` is set summed up. This keeps the number of distinct auxiliary
    /// terms logarithmic in the factor.
    pub fn times(&self, factor: i64) -> Result<ElementaryTerm, EvalError> {
        if factor < 0 {
            return Err(EvalError::Domain(format!(
                "cannot scale a term by the negative constant {factor}"
            )));
        }
        if factor == 0 {
            return Ok(ElementaryTerm::constant(0));
        }
        let mut power = self.clone();
        let mut acc: Option<ElementaryTerm> = None;
        let mut remaining = factor;
        while remaining > 0 {
            if remaining & 1 == 1 {
                acc = Some(match acc {
                    None => power.clone(),
                    Some(sum) => sum.add(&power),
                });
            }
            remaining >>= 1;
            if remaining > 0 {
                power = power.add(&power);
            }
        }
        Ok(acc.expect("the factor is positive"))
    }

    pub fn eq(&self, other: &ElementaryTerm) -> RelationTerm {
        RelationTerm::atom("Eq", vec![self.clone(), other.clone()])
    }

    pub fn lt(&self, other: &ElementaryTerm) -> RelationTerm {
        RelationTerm::atom("Lt", vec![self.clone(), other.clone()])
    }

    pub fn gt(&self, other: &ElementaryTerm) -> RelationTerm {
        RelationTerm::atom("Lt", vec![other.clone(), self.clone()])
    }

    /// The weak-divisibility atom: `other` is a power of two dividing `self`.
    pub fn weakly_divisible_by(&self, other: &ElementaryTerm) -> RelationTerm {
        RelationTerm::atom("B", vec![self.clone(), other.clone()])
    }

    fn as_variable(&self) -> Option<&str> {
        match &self.kind {
            ElementaryKind::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// The free variables in sorted order, without duplicates.
    pub fn variables(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names.into_iter().collect()
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match &self.kind {
            ElementaryKind::Constant(_) => {}
            ElementaryKind::Variable(name) => {
                out.insert(name.clone());
            }
            ElementaryKind::Addition(l, r) => {
                l.collect_variables(out);
                r.collect_variables(out);
            }
            ElementaryKind::Negation(t) => t.collect_variables(out),
        }
    }

    /// Renames variables throughout the term, invalidating cached automata.
    pub fn substitute(&mut self, renaming: &BTreeMap<String, String>) {
        match &mut self.kind {
            ElementaryKind::Constant(_) => return,
            ElementaryKind::Variable(name) => {
                if let Some(new) = renaming.get(name) {
                    *name = new.clone();
                }
            }
            ElementaryKind::Addition(l, r) => {
                l.substitute(renaming);
                r.substitute(renaming);
            }
            ElementaryKind::Negation(t) => t.substitute(renaming),
        }
        self.graph = None;
    }

    /// Compiles (and caches) the graph relation of the term.
    pub fn graph(&mut self, arith: &Arithmetic) -> Result<Dfa, EvalError> {
        if let Some(g) = &self.graph {
            return Ok(g.clone());
        }
        let vars = self.variables();
        let g = match &mut self.kind {
            ElementaryKind::Constant(n) => word_automaton(
                arith.presentation().base().iter().copied(),
                &arith.encoding().encode(*n)?,
            ),
            ElementaryKind::Variable(_) => arith.presentation().universe().clone(),
            ElementaryKind::Addition(l, r) => {
                operation_graph(arith, "A", &vars, &mut [l.as_mut(), r.as_mut()])?
            }
            ElementaryKind::Negation(t) => operation_graph(arith, "Neg", &vars, &mut [t.as_mut()])?,
        };
        self.graph = Some(g.clone());
        Ok(g)
    }
}

impl From<i64> for ElementaryTerm {
    fn from(n: i64) -> Self {
        ElementaryTerm::constant(n)
    }
}

impl std::ops::Add for &ElementaryTerm {
    type Output = ElementaryTerm;

    fn add(self, rhs: &ElementaryTerm) -> ElementaryTerm {
        ElementaryTerm::add(self, rhs)
    }
}

impl std::ops::Neg for &ElementaryTerm {
    type Output = ElementaryTerm;

    fn neg(self) -> ElementaryTerm {
        ElementaryTerm::neg(self)
    }
}

/// Builds the graph of `relation(child₁,…,childₙ, out)` where each
/// non-variable child is bound by an existential guard to its own graph
/// under a fresh relation symbol.
fn operation_graph(
    arith: &Arithmetic,
    relation: &str,
    vars: &[String],
    children: &mut [&mut ElementaryTerm],
) -> Result<Dfa, EvalError> {
    let fresh_vars = unique_names(vars, children.len() + 1);
    let out = fresh_vars
        .last()
        .expect("one name was requested per child plus the output")
        .clone();
    let fresh_rels = unique_names(&arith.presentation().relation_symbols(), children.len());

    let mut args: Vec<String> = vec![];
    let mut wrappers: Vec<(String, String)> = vec![];
    let mut overrides: Vec<(String, Definition)> = vec![];
    for ((child, fresh_var), fresh_rel) in children.iter_mut().zip(&fresh_vars).zip(&fresh_rels) {
        if let Some(name) = child.as_variable() {
            args.push(name.to_string());
        } else {
            let mut guard_args = child.variables();
            guard_args.push(fresh_var.clone());
            wrappers.push((
                fresh_var.clone(),
                format!("{fresh_rel}({})", guard_args.join(",")),
            ));
            overrides.push((fresh_rel.clone(), Definition::Automaton(child.graph(arith)?)));
            args.push(fresh_var.clone());
        }
    }
    args.push(out);

    let mut phi = format!("{relation}({})", args.join(","));
    for (fresh_var, guard) in wrappers {
        phi = format!("exists {fresh_var}.({guard} and {phi})");
    }
    arith.presentation().evaluate_with(&phi, overrides)
}

#[derive(Debug, Clone)]
enum RelationKind {
    Atom {
        relation: String,
        terms: Vec<ElementaryTerm>,
    },
    Intersection(Box<RelationTerm>, Box<RelationTerm>),
    Union(Box<RelationTerm>, Box<RelationTerm>),
    Complement(Box<RelationTerm>),
    Drop(Box<RelationTerm>, Vec<String>),
}

/// A term denoting a relation over the presented structure. Combinators are
/// available through `&`, `|` and `!` as well; [`RelationTerm::drop_vars`]
/// existentially projects variables away.
#[derive(Debug, Clone)]
pub struct RelationTerm {
    kind: RelationKind,
    cache: Option<Dfa>,
}

impl RelationTerm {
    /// Applies a relation symbol of the presentation to elementary terms.
    pub fn atom(relation: impl Into<String>, terms: Vec<ElementaryTerm>) -> Self {
        Self {
            kind: RelationKind::Atom {
                relation: relation.into(),
                terms,
            },
            cache: None,
        }
    }

    /// Existentially quantifies the given variables away.
    pub fn drop_vars(self, variables: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            kind: RelationKind::Drop(
                Box::new(self),
                variables.into_iter().map(Into::into).collect(),
            ),
            cache: None,
        }
    }

    /// The free variables in sorted order, without duplicates.
    pub fn variables(&self) -> Vec<String> {
        match &self.kind {
            RelationKind::Atom { terms, .. } => {
                let mut names = BTreeSet::new();
                for term in terms {
                    term.collect_variables(&mut names);
                }
                names.into_iter().collect()
            }
            RelationKind::Intersection(l, r) | RelationKind::Union(l, r) => {
                let mut names: BTreeSet<String> = l.variables().into_iter().collect();
                names.extend(r.variables());
                names.into_iter().collect()
            }
            RelationKind::Complement(t) => t.variables(),
            RelationKind::Drop(inner, dropped) => inner
                .variables()
                .into_iter()
                .filter(|v| !dropped.contains(v))
                .collect(),
        }
    }

    /// Renames free variables. For a projection node, a renaming whose target
    /// collides with a bound variable first moves the bound variable to a
    /// fresh name; `allow_collision` skips that check and is then the
    /// caller's responsibility.
    pub fn substitute(&mut self, renaming: &BTreeMap<String, String>, allow_collision: bool) {
        match &mut self.kind {
            RelationKind::Atom { terms, .. } => {
                for term in terms {
                    term.substitute(renaming);
                }
            }
            RelationKind::Intersection(l, r) | RelationKind::Union(l, r) => {
                l.substitute(renaming, allow_collision);
                r.substitute(renaming, allow_collision);
            }
            RelationKind::Complement(t) => t.substitute(renaming, allow_collision),
            RelationKind::Drop(inner, dropped) => {
                let mut trimmed = renaming.clone();
                for bound in dropped.iter() {
                    trimmed.remove(bound);
                }
                if !allow_collision {
                    for i in 0..dropped.len() {
                        let bound = dropped[i].clone();
                        if renaming.values().any(|target| *target == bound) {
                            let fresh = unique_names(&inner.variables(), 1)
                                .pop()
                                .expect("one name was requested");
                            inner.substitute(&BTreeMap::from([(bound, fresh.clone())]), true);
                            dropped[i] = fresh;
                        }
                    }
                }
                inner.substitute(&trimmed, allow_collision);
            }
        }
        self.cache = None;
    }

    /// Compiles (and caches) the automaton presenting the relation. The
    /// result is unpadded, with columns ordered by variable name.
    pub fn evaluate(&mut self, arith: &Arithmetic) -> Result<Dfa, EvalError> {
        if let Some(dfa) = &self.cache {
            return Ok(dfa.clone());
        }
        let vars = self.variables();
        let dfa = match &mut self.kind {
            RelationKind::Atom { relation, terms } => {
                let fresh_vars = unique_names(&vars, terms.len());
                let fresh_rels =
                    unique_names(&arith.presentation().relation_symbols(), terms.len());
                let mut args: Vec<String> = vec![];
                let mut wrappers: Vec<(String, String)> = vec![];
                let mut overrides: Vec<(String, Definition)> = vec![];
                for ((term, fresh_var), fresh_rel) in
                    terms.iter_mut().zip(&fresh_vars).zip(&fresh_rels)
                {
                    if let Some(name) = term.as_variable() {
                        args.push(name.to_string());
                    } else {
                        let mut guard_args = term.variables();
                        guard_args.push(fresh_var.clone());
                        wrappers.push((
                            fresh_var.clone(),
                            format!("{fresh_rel}({})", guard_args.join(",")),
                        ));
                        overrides
                            .push((fresh_rel.clone(), Definition::Automaton(term.graph(arith)?)));
                        args.push(fresh_var.clone());
                    }
                }
                let mut phi = format!("{relation}({})", args.join(","));
                for (fresh_var, guard) in wrappers {
                    phi = format!("exists {fresh_var}.({guard} and {phi})");
                }
                arith.presentation().evaluate_with(&phi, overrides)?
            }
            RelationKind::Intersection(l, r) => combine(arith, l, r, "and")?,
            RelationKind::Union(l, r) => combine(arith, l, r, "or")?,
            RelationKind::Complement(inner) => {
                let fresh_rel = unique_names(&arith.presentation().relation_symbols(), 1)
                    .pop()
                    .expect("one name was requested");
                let phi = format!("not ({fresh_rel}({}))", inner.variables().join(","));
                let bound = inner.evaluate(arith)?;
                arith
                    .presentation()
                    .evaluate_with(&phi, vec![(fresh_rel, Definition::Automaton(bound))])?
            }
            RelationKind::Drop(inner, dropped) => {
                let fresh_rel = unique_names(&arith.presentation().relation_symbols(), 1)
                    .pop()
                    .expect("one name was requested");
                let phi = format!(
                    "exists {}.({fresh_rel}({}))",
                    dropped.join(" "),
                    inner.variables().join(",")
                );
                let bound = inner.evaluate(arith)?;
                arith
                    .presentation()
                    .evaluate_with(&phi, vec![(fresh_rel, Definition::Automaton(bound))])?
            }
        };
        self.cache = Some(dfa.clone());
        Ok(dfa)
    }

    pub fn is_empty(&mut self, arith: &Arithmetic) -> Result<bool, EvalError> {
        Ok(self.evaluate(arith)?.is_empty())
    }

    pub fn is_finite(&mut self, arith: &Arithmetic) -> Result<bool, EvalError> {
        Ok(self.evaluate(arith)?.is_finite())
    }

    /// Membership of a concrete tuple; components follow the sorted variable
    /// order.
    pub fn contains(&mut self, arith: &Arithmetic, tuple: &[i64]) -> Result<bool, EvalError> {
        let dfa = self.evaluate(arith)?;
        arith.member(&dfa, tuple)
    }

    /// Streams the solution tuples in length-lexicographic order.
    pub fn solutions(&mut self, arith: &Arithmetic) -> Result<Solutions, EvalError> {
        let dfa = self.evaluate(arith)?;
        Ok(Solutions::new(&dfa, arith, false))
    }

    /// Streams the solution tuples by walking the automaton backwards; the
    /// enumeration order is length-lexicographic on the reversed words.
    pub fn solutions_rev(&mut self, arith: &Arithmetic) -> Result<Solutions, EvalError> {
        let dfa = self.evaluate(arith)?;
        Ok(Solutions::new(&dfa, arith, true))
    }
}

fn combine(
    arith: &Arithmetic,
    l: &mut RelationTerm,
    r: &mut RelationTerm,
    connective: &str,
) -> Result<Dfa, EvalError> {
    let fresh = unique_names(&arith.presentation().relation_symbols(), 2);
    let phi = format!(
        "(({}({}) {connective} {}({})))",
        fresh[0],
        l.variables().join(","),
        fresh[1],
        r.variables().join(",")
    );
    let left = l.evaluate(arith)?;
    let right = r.evaluate(arith)?;
    arith.presentation().evaluate_with(
        &phi,
        vec![
            (fresh[0].clone(), Definition::Automaton(left)),
            (fresh[1].clone(), Definition::Automaton(right)),
        ],
    )
}

impl std::ops::BitAnd for RelationTerm {
    type Output = RelationTerm;

    fn bitand(self, rhs: RelationTerm) -> RelationTerm {
        RelationTerm {
            kind: RelationKind::Intersection(Box::new(self), Box::new(rhs)),
            cache: None,
        }
    }
}

impl std::ops::BitOr for RelationTerm {
    type Output = RelationTerm;

    fn bitor(self, rhs: RelationTerm) -> RelationTerm {
        RelationTerm {
            kind: RelationKind::Union(Box::new(self), Box::new(rhs)),
            cache: None,
        }
    }
}

impl std::ops::Not for RelationTerm {
    type Output = RelationTerm;

    fn not(self) -> RelationTerm {
        RelationTerm {
            kind: RelationKind::Complement(Box::new(self)),
            cache: None,
        }
    }
}

/// Lazy stream of decoded solution tuples; see [`RelationTerm::solutions`].
pub struct Solutions {
    words: LlexWords,
    encoding: Encoding,
    backward: bool,
}

impl Solutions {
    fn new(dfa: &Dfa, arith: &Arithmetic, backward: bool) -> Self {
        Self {
            words: dfa.llex_words(arith.presentation().padding(), backward),
            encoding: arith.encoding(),
            backward,
        }
    }
}

impl Iterator for Solutions {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        let word = self.words.next()?;
        Some(
            word.iter()
                .map(|component| {
                    if self.backward {
                        self.encoding.decode_reversed(component)
                    } else {
                        self.encoding.decode(component)
                    }
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{ElementaryTerm, RelationTerm, unique_names};

    #[test]
    fn unique_names_extend_the_maximum() {
        let existing = vec!["x".to_string(), "y".to_string(), "y0".to_string()];
        let fresh = unique_names(&existing, 3);
        assert_eq!(fresh.len(), 3);
        for name in &fresh {
            assert!(!existing.contains(name));
            assert!(existing.iter().all(|old| old < name));
        }
        assert_eq!(
            fresh.iter().collect::<std::collections::BTreeSet<_>>().len(),
            3
        );
        // With nothing to extend, a seed stem is used.
        assert_eq!(unique_names(&[], 1), vec!["v0".to_string()]);
    }

    #[test]
    fn scaling_desugars_to_doubling() {
        let x = ElementaryTerm::var("x");
        assert_eq!(x.times(3).unwrap().variables(), vec!["x".to_string()]);
        assert!(x.times(-2).is_err());
        // Scaling by zero collapses to the constant 0.
        assert!(x.times(0).unwrap().variables().is_empty());
    }

    #[test]
    fn variables_are_sorted_and_deduplicated() {
        let x = ElementaryTerm::var("x");
        let y = ElementaryTerm::var("y");
        let sum = x.add(&y).add(&x);
        assert_eq!(sum.variables(), vec!["x".to_string(), "y".to_string()]);

        let rel = sum.eq(&ElementaryTerm::constant(4));
        assert_eq!(rel.variables(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn substitution_renames_free_variables() {
        let mut term = ElementaryTerm::var("x").add(&ElementaryTerm::var("y"));
        term.substitute(&BTreeMap::from([("x".to_string(), "u".to_string())]));
        assert_eq!(term.variables(), vec!["u".to_string(), "y".to_string()]);
    }

    #[test]
    fn projection_substitution_avoids_capture() {
        let inner = || {
            RelationTerm::atom(
                "Lt",
                vec![ElementaryTerm::var("a"), ElementaryTerm::var("b")],
            )
        };

        // Renaming a → b must not let the free a fall under the binder for b.
        let mut guarded = inner().drop_vars(["b"]);
        guarded.substitute(
            &BTreeMap::from([("a".to_string(), "b".to_string())]),
            false,
        );
        assert_eq!(guarded.variables(), vec!["b".to_string()]);

        // With the check disabled, the variable is captured.
        let mut captured = inner().drop_vars(["b"]);
        captured.substitute(
            &BTreeMap::from([("a".to_string(), "b".to_string())]),
            true,
        );
        assert!(captured.variables().is_empty());
    }

    #[test]
    fn bound_variables_shadow_the_renaming() {
        let mut term = RelationTerm::atom(
            "Lt",
            vec![ElementaryTerm::var("a"), ElementaryTerm::var("b")],
        )
        .drop_vars(["b"]);
        term.substitute(&BTreeMap::from([("b".to_string(), "c".to_string())]), false);
        assert_eq!(term.variables(), vec!["a".to_string()]);
    }
}
