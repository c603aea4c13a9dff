//! End-to-end behavior of Büchi arithmetic over the natural numbers.

use std::collections::BTreeSet;

use buechi::{ElementaryTerm, buechi_arithmetic};

#[test_log::test]
fn addition_graph() {
    let ba = buechi_arithmetic().unwrap();
    let sum = ba.evaluate("A(x,y,z)").unwrap();
    assert!(!sum.is_empty());
    assert!(!sum.is_finite());
    assert!(ba.member(&sum, &[1, 1, 2]).unwrap());
    assert!(ba.member(&sum, &[2, 3, 5]).unwrap());
    assert!(ba.member(&sum, &[0, 0, 0]).unwrap());
    assert!(!ba.member(&sum, &[1, 1, 3]).unwrap());
}

#[test_log::test]
fn addition_agrees_with_arithmetic_on_small_tuples() {
    let ba = buechi_arithmetic().unwrap();
    let sum = ba.evaluate("A(x,y,z)").unwrap();
    for x in 0..7 {
        for y in 0..7 {
            for z in 0..14 {
                assert_eq!(
                    ba.member(&sum, &[x, y, z]).unwrap(),
                    x + y == z,
                    "A({x},{y},{z})"
                );
            }
        }
    }
}

#[test_log::test]
fn doubling_enumerates_in_order() {
    let ba = buechi_arithmetic().unwrap();
    let x = ElementaryTerm::var("x");
    let y = ElementaryTerm::var("y");
    let mut doubled = x.times(2).unwrap().eq(&y);

    assert!(!doubled.is_empty(&ba).unwrap());
    assert!(!doubled.is_finite(&ba).unwrap());

    let first: Vec<Vec<i64>> = doubled.solutions(&ba).unwrap().take(4).collect();
    assert_eq!(
        first,
        vec![vec![0, 0], vec![1, 2], vec![2, 4], vec![3, 6]]
    );
}

#[test_log::test]
fn bounded_less_than_is_finite() {
    let ba = buechi_arithmetic().unwrap();
    let x = ElementaryTerm::var("x");
    let mut below = x.lt(&ElementaryTerm::constant(10));

    assert!(below.is_finite(&ba).unwrap());
    let values: BTreeSet<i64> = below.solutions(&ba).unwrap().map(|t| t[0]).collect();
    assert_eq!(values, (0..10).collect::<BTreeSet<i64>>());

    let mut above = !below;
    assert!(!above.is_finite(&ba).unwrap());
    assert!(above.contains(&ba, &[10]).unwrap());
    assert!(above.contains(&ba, &[1000]).unwrap());
    assert!(!above.contains(&ba, &[9]).unwrap());
}

#[test_log::test]
fn powers_of_two_via_divisibility() {
    let ba = buechi_arithmetic().unwrap();
    let powers = ba.evaluate("B(x,x)").unwrap();
    let first: Vec<i64> = powers
        .llex_words('*', false)
        .take(5)
        .map(|word| {
            word[0]
                .chars()
                .rev()
                .fold(0, |acc, c| acc * 2 + i64::from(c == '1'))
        })
        .collect();
    assert_eq!(first, vec![1, 2, 4, 8, 16]);
    assert!(ba.member(&powers, &[64]).unwrap());
    assert!(!ba.member(&powers, &[6]).unwrap());
    assert!(!ba.member(&powers, &[0]).unwrap());
}

#[test_log::test]
fn projection_and_complement_of_a_bounded_sum() {
    let ba = buechi_arithmetic().unwrap();
    let x = ElementaryTerm::var("x");
    let y = ElementaryTerm::var("y");
    let z = ElementaryTerm::var("z");
    let zero = ElementaryTerm::constant(0);
    let three = ElementaryTerm::constant(3);

    let bounded = x.add(&y).eq(&z) & z.gt(&zero) & z.lt(&three);
    let mut small_sums = bounded.drop_vars(["z"]);

    for pair in [[0, 1], [1, 0], [0, 2], [1, 1], [2, 0]] {
        assert!(small_sums.contains(&ba, &pair).unwrap(), "{pair:?}");
    }
    assert!(!small_sums.contains(&ba, &[0, 0]).unwrap());
    assert!(!small_sums.contains(&ba, &[2, 2]).unwrap());
    assert!(!small_sums.is_empty(&ba).unwrap());
    assert!(!small_sums.is_finite(&ba).unwrap());

    let mut rest = !small_sums;
    for pair in [[0, 0], [3, 4], [10, 10]] {
        assert!(rest.contains(&ba, &pair).unwrap(), "{pair:?}");
    }
    assert!(!rest.contains(&ba, &[1, 1]).unwrap());
    assert!(!rest.is_empty(&ba).unwrap());
    assert!(!rest.is_finite(&ba).unwrap());
}

#[test_log::test]
fn quantifiers_decide_sentences() {
    let ba = buechi_arithmetic().unwrap();
    assert!(ba.check("exists x y z.(A(x,y,z))").unwrap());
    assert!(ba.check("forall x.(exists y.(Lt(x,y)))").unwrap());
    assert!(!ba.check("forall x.(Lt(x,x))").unwrap());
    assert!(!ba.check("exists x.(Lt(x,x))").unwrap());
    assert!(ba.check("forall x y.(A(x,y,y) or not Z(x))").unwrap());
    assert!(!ba.check("forall x y.(A(x,y,y))").unwrap());
}

#[test_log::test]
fn universal_quantifier_with_free_variables() {
    let ba = buechi_arithmetic().unwrap();
    // The only x below or equal to everything is 0.
    let minimum = ba.evaluate("forall y.(not Lt(y,x))").unwrap();
    assert!(ba.member(&minimum, &[0]).unwrap());
    assert!(!ba.member(&minimum, &[1]).unwrap());
    assert!(!ba.member(&minimum, &[5]).unwrap());
}

#[test_log::test]
fn derived_equality_and_order() {
    let ba = buechi_arithmetic().unwrap();
    let eq = ba.evaluate("Eq(x,y)").unwrap();
    assert!(ba.member(&eq, &[7, 7]).unwrap());
    assert!(!ba.member(&eq, &[7, 8]).unwrap());

    let lt = ba.evaluate("Lt(x,y)").unwrap();
    for (x, y) in [(0, 1), (3, 5), (12, 13)] {
        assert!(ba.member(&lt, &[x, y]).unwrap());
        assert!(!ba.member(&lt, &[y, x]).unwrap());
    }
    assert!(!ba.member(&lt, &[4, 4]).unwrap());
}

#[test_log::test]
fn backward_solutions_cover_the_same_set() {
    let ba = buechi_arithmetic().unwrap();
    let x = ElementaryTerm::var("x");
    let mut below = x.lt(&ElementaryTerm::constant(5));
    let forward: BTreeSet<i64> = below.solutions(&ba).unwrap().map(|t| t[0]).collect();
    let backward: BTreeSet<i64> = below.solutions_rev(&ba).unwrap().map(|t| t[0]).collect();
    assert_eq!(forward, backward);
    assert_eq!(forward, (0..5).collect::<BTreeSet<i64>>());
}

#[test_log::test]
fn substitution_invalidates_cached_presentations() {
    let ba = buechi_arithmetic().unwrap();
    let x = ElementaryTerm::var("x");
    let y = ElementaryTerm::var("y");
    let mut rel = x.add(&x).eq(&y);
    assert!(rel.contains(&ba, &[2, 4]).unwrap());

    // Renaming x to z flips the column order; the relation must be
    // recompiled, not served from the stale cache.
    rel.substitute(
        &std::collections::BTreeMap::from([("x".to_string(), "z".to_string())]),
        false,
    );
    assert_eq!(rel.variables(), vec!["y".to_string(), "z".to_string()]);
    // Columns are now (y, z) with y = 2z, so the pair is flipped.
    assert!(rel.contains(&ba, &[4, 2]).unwrap());
    assert!(!rel.contains(&ba, &[2, 4]).unwrap());
}
