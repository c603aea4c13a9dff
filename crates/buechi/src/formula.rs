//! First-order formulas over a relational signature. The syntax tree is a
//! closed sum type; variables are named strings and predicate names refer to
//! entries of the surrounding [`crate::AutomaticPresentation`].

use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;

/// A first-order formula. Atomic formulas apply a relation symbol to
/// variables; composite formulas are built with the boolean connectives and
/// the two quantifiers. The tree owns its children — formulas never form
/// cycles and never share subtrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    /// Application of a relation symbol to variables, `R(x,…,z)`. The same
    /// variable may appear more than once.
    Apply { relation: String, args: Vec<String> },
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Not(Box<Formula>),
    Exists(String, Box<Formula>),
    ForAll(String, Box<Formula>),
}

impl Formula {
    pub fn apply(relation: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Formula::Apply {
            relation: relation.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(self, other: Formula) -> Self {
        Formula::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Formula) -> Self {
        Formula::Or(Box::new(self), Box::new(other))
    }

    pub fn negated(self) -> Self {
        Formula::Not(Box::new(self))
    }

    pub fn exists(var: impl Into<String>, body: Formula) -> Self {
        Formula::Exists(var.into(), Box::new(body))
    }

    pub fn forall(var: impl Into<String>, body: Formula) -> Self {
        Formula::ForAll(var.into(), Box::new(body))
    }

    /// The free variables in alphabetical order, without duplicates. This
    /// ordering fixes the column order of every automaton compiled from the
    /// formula.
    pub fn free_vars(&self) -> Vec<String> {
        let mut free = BTreeSet::new();
        self.collect_free(&mut BTreeSet::new(), &mut free);
        free.into_iter().collect()
    }

    fn collect_free(&self, bound: &mut BTreeSet<String>, free: &mut BTreeSet<String>) {
        match self {
            Formula::Apply { args, .. } => {
                for arg in args {
                    if !bound.contains(arg) {
                        free.insert(arg.clone());
                    }
                }
            }
            Formula::And(l, r) | Formula::Or(l, r) => {
                l.collect_free(bound, free);
                r.collect_free(bound, free);
            }
            Formula::Not(p) => p.collect_free(bound, free),
            Formula::Exists(var, body) | Formula::ForAll(var, body) => {
                let fresh = bound.insert(var.clone());
                body.collect_free(bound, free);
                if fresh {
                    bound.remove(var);
                }
            }
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Apply { relation, args } => {
                write!(f, "{relation}({})", args.iter().join(","))
            }
            Formula::And(l, r) => write!(f, "({l} and {r})"),
            Formula::Or(l, r) => write!(f, "({l} or {r})"),
            Formula::Not(p) => write!(f, "not ({p})"),
            Formula::Exists(var, body) => write!(f, "exists {var}.({body})"),
            Formula::ForAll(var, body) => write!(f, "forall {var}.({body})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Formula;

    #[test]
    fn free_vars_are_sorted_and_deduplicated() {
        let phi = Formula::apply("A", ["y", "x", "y"]);
        assert_eq!(phi.free_vars(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn quantifiers_bind() {
        let phi = Formula::exists("z", Formula::apply("A", ["x", "z", "y"]));
        assert_eq!(phi.free_vars(), vec!["x".to_string(), "y".to_string()]);

        // A shadowed binder does not unbind the outer occurrence.
        let nested = Formula::exists(
            "x",
            Formula::apply("U", ["x"]).and(Formula::exists("x", Formula::apply("U", ["x"]))),
        );
        assert!(nested.free_vars().is_empty());
    }

    #[test]
    fn display_round_trips_through_the_parser() {
        let phi = Formula::exists(
            "z",
            Formula::apply("Z", ["z"]).and(Formula::apply("A", ["x", "z", "y"])),
        );
        let printed = phi.to_string();
        assert_eq!(crate::parser::parse(&printed).unwrap(), phi);
    }
}
