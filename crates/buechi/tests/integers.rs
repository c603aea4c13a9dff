//! End-to-end behavior of the integer variant.

use buechi::{ElementaryTerm, buechi_arithmetic_z};

#[test_log::test]
fn negation_relation() {
    let ba = buechi_arithmetic_z().unwrap();
    let neg = ba.evaluate("Neg(x,y)").unwrap();
    assert!(ba.member(&neg, &[-5, 5]).unwrap());
    assert!(ba.member(&neg, &[5, -5]).unwrap());
    assert!(ba.member(&neg, &[0, 0]).unwrap());
    assert!(!ba.member(&neg, &[5, 5]).unwrap());

    let x = ElementaryTerm::var("x");
    let y = ElementaryTerm::var("y");
    let mut mirrored = x.neg().eq(&y) & y.eq(&ElementaryTerm::constant(5));
    assert!(mirrored.contains(&ba, &[-5, 5]).unwrap());
    assert!(!mirrored.contains(&ba, &[5, 5]).unwrap());
    assert!(!mirrored.contains(&ba, &[-5, -5]).unwrap());
}

#[test_log::test]
fn signed_addition_cases() {
    let ba = buechi_arithmetic_z().unwrap();
    let sum = ba.evaluate("A(x,y,z)").unwrap();
    for (x, y) in [(2, 3), (2, -3), (-2, 3), (-2, -3), (0, -4), (5, -5)] {
        for z in -8..=8 {
            assert_eq!(
                ba.member(&sum, &[x, y, z]).unwrap(),
                x + y == z,
                "A({x},{y},{z})"
            );
        }
    }
}

#[test_log::test]
fn subtraction_through_negation() {
    let ba = buechi_arithmetic_z().unwrap();
    let x = ElementaryTerm::var("x");
    let y = ElementaryTerm::var("y");
    let z = ElementaryTerm::var("z");
    let mut difference = x.sub(&y).eq(&z);
    assert!(difference.contains(&ba, &[3, 5, -2]).unwrap());
    assert!(difference.contains(&ba, &[5, 3, 2]).unwrap());
    assert!(difference.contains(&ba, &[-1, -1, 0]).unwrap());
    assert!(!difference.contains(&ba, &[3, 5, 2]).unwrap());
    assert!(!difference.is_empty(&ba).unwrap());
    assert!(!difference.is_finite(&ba).unwrap());
}

#[test_log::test]
fn order_spans_the_negatives() {
    let ba = buechi_arithmetic_z().unwrap();
    let lt = ba.evaluate("Lt(x,y)").unwrap();
    for (x, y) in [(-1, 0), (-5, -4), (-3, 2), (0, 1)] {
        assert!(ba.member(&lt, &[x, y]).unwrap(), "Lt({x},{y})");
        assert!(!ba.member(&lt, &[y, x]).unwrap(), "Lt({y},{x})");
    }
    assert!(!ba.member(&lt, &[-2, -2]).unwrap());

    // Nonnegativity singles out one sign.
    let n0 = ba.evaluate("N0(x)").unwrap();
    assert!(ba.member(&n0, &[0]).unwrap());
    assert!(ba.member(&n0, &[7]).unwrap());
    assert!(!ba.member(&n0, &[-7]).unwrap());
}

#[test_log::test]
fn bootstrap_helper_is_removed() {
    let ba = buechi_arithmetic_z().unwrap();
    assert!(!ba.presentation().relation_symbols().contains(&"A0".to_string()));
    assert!(ba.evaluate("A0(x,y,z)").is_err());
}
