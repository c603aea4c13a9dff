//! The relation environment and the formula compiler. An
//! [`AutomaticPresentation`] maps relation symbols to padded automata over a
//! common product alphabet, with the reserved symbol `U` naming the universe
//! of valid encodings. First-order formulas over the installed symbols are
//! compiled bottom-up into automata: conjunction and disjunction become
//! intersection and union, negation becomes complementation relative to the
//! universe, and existential quantification becomes projection.

use std::collections::BTreeMap;

use automata::{Dfa, one, product, zero};
use tracing::debug;

use crate::error::EvalError;
use crate::formula::Formula;
use crate::parser;

/// The reserved relation symbol naming the universe.
pub const UNIVERSE: &str = "U";

/// How a relation is supplied to [`AutomaticPresentation::install`]: either
/// an explicit (unpadded) automaton, or a formula over the already installed
/// symbols.
#[derive(Debug, Clone)]
pub enum Definition {
    Automaton(Dfa),
    Formula(String),
}

impl From<Dfa> for Definition {
    fn from(dfa: Dfa) -> Self {
        Definition::Automaton(dfa)
    }
}

impl From<&str> for Definition {
    fn from(formula: &str) -> Self {
        Definition::Formula(formula.to_string())
    }
}

/// A presentation of a possibly infinite structure by finite automata.
///
/// Every installed relation automaton is padded and intersected with the
/// corresponding Cartesian power of the universe, so its language contains
/// only tuples of valid encodings. The environment is the single mutable
/// object of the crate; a failed [`install`](Self::install) leaves it
/// untouched.
#[derive(Debug, Clone)]
pub struct AutomaticPresentation {
    automata: BTreeMap<String, Dfa>,
    padding: char,
    base: Vec<char>,
}

impl AutomaticPresentation {
    /// Creates a presentation from the universe automaton (1-ary, unpadded)
    /// and a set of named relation automata over its encodings.
    pub fn new(
        universe: Dfa,
        relations: impl IntoIterator<Item = (String, Dfa)>,
        padding: char,
    ) -> Result<Self, EvalError> {
        if universe.arity() != 1 {
            return Err(automata::AutomatonError::ArityMismatch {
                expected: 1,
                found: universe.arity(),
            }
            .into());
        }
        let padded = universe.pad(padding);
        let base = padded.alphabet().base().to_vec();
        let mut presentation = Self {
            automata: BTreeMap::from([(UNIVERSE.to_string(), padded)]),
            padding,
            base,
        };
        for (name, dfa) in relations {
            let prepared = presentation.prepare(dfa)?;
            presentation.automata.insert(name, prepared);
        }
        Ok(presentation)
    }

    /// The padding symbol.
    pub fn padding(&self) -> char {
        self.padding
    }

    /// The base alphabet, including the padding symbol.
    pub fn base(&self) -> &[char] {
        &self.base
    }

    /// The padded universe automaton.
    pub fn universe(&self) -> &Dfa {
        self.automata
            .get(UNIVERSE)
            .expect("the universe is installed on construction")
    }

    /// The stored (padded) automaton for a relation symbol.
    pub fn relation(&self, name: &str) -> Option<&Dfa> {
        self.automata.get(name)
    }

    /// All currently installed relation symbols. Callers allocating fresh
    /// names must avoid these.
    pub fn relation_symbols(&self) -> Vec<String> {
        self.automata.keys().cloned().collect()
    }

    /// Restricts a relation automaton to valid encodings and pads it.
    fn prepare(&self, dfa: Dfa) -> Result<Dfa, EvalError> {
        let arity = dfa.arity();
        let padded = dfa.pad(self.padding);
        let domain = product(self.universe(), arity)?;
        Ok(padded.intersection(&domain)?.minimize())
    }

    fn resolve(&self, definition: Definition) -> Result<Dfa, EvalError> {
        match definition {
            Definition::Automaton(dfa) => Ok(dfa),
            Definition::Formula(source) => {
                let phi = parser::parse(&source)?;
                self.build(&phi, &self.automata)
            }
        }
    }

    /// Installs a derived relation, either from an explicit automaton or by
    /// compiling a formula over the already installed symbols. The
    /// environment is only modified once compilation and preparation have
    /// succeeded.
    pub fn install(&mut self, name: &str, definition: impl Into<Definition>) -> Result<(), EvalError> {
        assert!(name != UNIVERSE, "the universe cannot be reinstalled");
        let resolved = self.resolve(definition.into())?;
        let prepared = self.prepare(resolved)?;
        self.automata.insert(name.to_string(), prepared);
        Ok(())
    }

    /// Removes a derived relation, returning its automaton.
    pub fn remove(&mut self, name: &str) -> Option<Dfa> {
        assert!(name != UNIVERSE, "the universe cannot be removed");
        self.automata.remove(name)
    }

    /// Evaluates a formula: returns the automaton recognizing the set of
    /// satisfying assignments, with columns ordered by variable name. The
    /// result is unpadded when the formula has free variables; a sentence
    /// yields an arity-0 automaton accepting either {ε} or nothing.
    pub fn evaluate(&self, phi: &str) -> Result<Dfa, EvalError> {
        self.evaluate_with(phi, vec![])
    }

    /// Evaluates an already parsed formula tree.
    pub fn evaluate_formula(&self, phi: &Formula) -> Result<Dfa, EvalError> {
        let compiled = self.build(phi, &self.automata)?;
        if phi.free_vars().is_empty() {
            Ok(compiled)
        } else {
            Ok(compiled.unpad(self.padding))
        }
    }

    /// Like [`evaluate`](Self::evaluate), with transient relation bindings
    /// overlaid on the environment for the duration of the call. The stored
    /// environment is never modified; the overrides are prepared against it
    /// and cannot reference each other.
    pub fn evaluate_with(
        &self,
        phi: &str,
        overrides: Vec<(String, Definition)>,
    ) -> Result<Dfa, EvalError> {
        let phi = parser::parse(phi)?;
        let mut env = self.automata.clone();
        for (name, definition) in overrides {
            let prepared = self.prepare(self.resolve(definition)?)?;
            env.insert(name, prepared);
        }
        let compiled = self.build(&phi, &env)?;
        if phi.free_vars().is_empty() {
            Ok(compiled)
        } else {
            Ok(compiled.unpad(self.padding))
        }
    }

    /// Whether the formula holds in the presented structure; free variables
    /// are implicitly existentially quantified.
    pub fn check(&self, phi: &str) -> Result<bool, EvalError> {
        let phi = parser::parse(phi)?;
        Ok(!self.build(&phi, &self.automata)?.is_empty())
    }

    /// Recursively compiles a formula into a padded automaton whose arity is
    /// the number of free variables, columns in alphabetical variable order.
    fn build(&self, phi: &Formula, env: &BTreeMap<String, Dfa>) -> Result<Dfa, EvalError> {
        let result = match phi {
            Formula::Apply { relation, args } => {
                let dfa = env
                    .get(relation)
                    .ok_or_else(|| EvalError::UnknownRelation(relation.clone()))?;
                let vars = phi.free_vars();
                let pos: Vec<usize> = args
                    .iter()
                    .map(|a| {
                        vars.binary_search(a)
                            .expect("every argument is a free variable of the application")
                    })
                    .collect();
                dfa.expand(vars.len(), &pos)?
            }
            Formula::And(l, r) | Formula::Or(l, r) => {
                let vars = phi.free_vars();
                let dl = self
                    .build(l, env)?
                    .expand(vars.len(), &positions(&l.free_vars(), &vars))?;
                let dr = self
                    .build(r, env)?
                    .expand(vars.len(), &positions(&r.free_vars(), &vars))?;
                let combined = match phi {
                    Formula::And(..) => dl.intersection(&dr)?,
                    _ => dl.union(&dr)?,
                };
                combined.minimize()
            }
            Formula::Not(p) => {
                // Double negation needs no automaton work at all.
                if let Formula::Not(inner) = p.as_ref() {
                    return self.build(inner, env);
                }
                let vars = phi.free_vars();
                let domain = product(self.env_universe(env)?, vars.len())?;
                self.build(p, env)?
                    .complement()
                    .intersection(&domain)?
                    .minimize()
            }
            Formula::Exists(var, body) => {
                let body_vars = body.free_vars();
                let rec = self.build(body, env)?;
                let projected = match body_vars.binary_search(var) {
                    Ok(_) if body_vars.len() == 1 => {
                        return Ok(self.truth(!rec.is_empty()));
                    }
                    Ok(pos) => rec.projection(pos)?,
                    Err(_) => rec,
                };
                // Projection can leave padding in the middle of a word;
                // unpad/pad restores the padded-suffix form.
                projected.unpad(self.padding).pad(self.padding)
            }
            Formula::ForAll(var, body) => {
                let body_vars = body.free_vars();
                let Ok(pos) = body_vars.binary_search(var) else {
                    return self.build(body, env);
                };
                let negated = body.as_ref().clone().negated();
                let rec = self.build(&negated, env)?;
                if body_vars.len() > 1 {
                    let domain = product(self.env_universe(env)?, body_vars.len() - 1)?;
                    rec.projection(pos)?
                        .complement()
                        .intersection(&domain)?
                        .minimize()
                } else {
                    self.truth(rec.is_empty())
                }
            }
        };
        debug!("compiled `{phi}` into {} states", result.size());
        Ok(result)
    }

    fn env_universe<'a>(&self, env: &'a BTreeMap<String, Dfa>) -> Result<&'a Dfa, EvalError> {
        env.get(UNIVERSE)
            .ok_or_else(|| EvalError::UnknownRelation(UNIVERSE.to_string()))
    }

    /// The arity-0 automaton denoting a truth value.
    fn truth(&self, value: bool) -> Dfa {
        if value {
            one(self.base.iter().copied())
        } else {
            zero(self.base.iter().copied())
        }
    }
}

/// Maps each variable of the sorted sublist to its column in the sorted
/// superlist.
fn positions(sub: &[String], all: &[String]) -> Vec<usize> {
    sub.iter()
        .map(|v| {
            all.binary_search(v)
                .expect("subformula variables appear in the combined variable list")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{AutomaticPresentation, Definition};
    use automata::Dfa;

    /// A toy presentation of ⟨ℕ, succ⟩ in unary: the universe is I*, and
    /// Succ relates each word to the word one letter longer.
    fn unary_presentation() -> AutomaticPresentation {
        let universe = Dfa::builder(['I', '*'], 1)
            .with_accepting([0])
            .with_edges([(0, "I", 0), (0, "*", 1)])
            .with_default(1, 1)
            .into_dfa(0);
        let succ = Dfa::builder(['I', '*'], 2)
            .with_accepting([1])
            .with_edges([(0, "II", 0), (0, "*I", 1)])
            .with_default(0, 2)
            .with_default(1, 2)
            .with_default(2, 2)
            .into_dfa(0);
        AutomaticPresentation::new(universe, [("Succ".to_string(), succ)], '*').unwrap()
    }

    #[test]
    fn atomic_evaluation() {
        let p = unary_presentation();
        let succ = p.evaluate("Succ(x,y)").unwrap();
        assert!(succ.accepts(["*I"]));
        assert!(succ.accepts(["II", "*I"]));
        assert!(!succ.accepts(["II"]));
        assert!(p.check("Succ(x,y)").unwrap());
    }

    #[test]
    fn negation_restricts_to_the_universe() {
        let p = unary_presentation();
        // Words without a predecessor: exactly the empty word.
        let zero_only = p.evaluate("not (exists y.(Succ(y,x)))").unwrap();
        assert!(zero_only.accepts(Vec::<&str>::new()));
        assert!(!zero_only.accepts(["I"]));
        assert!(!zero_only.accepts(["II"]));
    }

    #[test]
    fn quantifiers_collapse_sentences() {
        let p = unary_presentation();
        assert!(p.check("exists x y.(Succ(x,y))").unwrap());
        assert!(p.check("forall x.(exists y.(Succ(x,y)))").unwrap());
        assert!(!p.check("forall x.(exists y.(Succ(x,y) and Succ(y,x)))").unwrap());
        let sentence = p.evaluate("exists x y.(Succ(x,y))").unwrap();
        assert_eq!(sentence.arity(), 0);
        assert!(!sentence.is_empty());
    }

    #[test]
    fn install_by_formula_and_atomicity() {
        let mut p = unary_presentation();
        p.install("HasSucc", "exists y.(Succ(x,y))").unwrap();
        assert!(p.relation_symbols().contains(&"HasSucc".to_string()));
        assert!(p.check("HasSucc(x)").unwrap());

        // A failing install must leave the environment unchanged.
        let before = p.relation_symbols();
        assert!(p.install("Broken", "Missing(x)").is_err());
        assert_eq!(p.relation_symbols(), before);
    }

    #[test]
    fn overrides_do_not_leak() {
        let p = unary_presentation();
        let two = Dfa::builder(['I', '*'], 1)
            .with_accepting([2])
            .with_edges([(0, "I", 1), (1, "I", 2)])
            .with_default(0, 3)
            .with_default(1, 3)
            .with_default(2, 3)
            .with_default(3, 3)
            .into_dfa(0);
        let result = p
            .evaluate_with(
                "exists y.(Two(y) and Succ(y,x))",
                vec![("Two".to_string(), Definition::Automaton(two))],
            )
            .unwrap();
        assert!(result.accepts(["I", "I", "I"]));
        assert!(!result.accepts(["I", "I"]));
        assert!(p.evaluate("Two(x)").is_err());
        assert!(!p.relation_symbols().contains(&"Two".to_string()));
    }

    #[test]
    fn formula_trees_evaluate_directly() {
        let p = unary_presentation();
        let phi = crate::parser::parse("Succ(x,y)").unwrap();
        let dfa = p.evaluate_formula(&phi).unwrap();
        assert!(dfa.accepts(["*I"]));
        assert_eq!(
            dfa.equivalent(&p.evaluate("Succ(x,y)").unwrap()),
            Ok(true)
        );
    }

    #[test]
    fn unknown_relations_are_fatal() {
        let p = unary_presentation();
        assert!(matches!(
            p.evaluate("Nope(x)"),
            Err(crate::EvalError::UnknownRelation(name)) if name == "Nope"
        ));
    }
}
