//! Tests for value arithmetic, comparison and group-key semantics.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tally::model::{GroupKey, NumericKind, Value};

#[test]
fn test_integer_arithmetic_stays_integer() {
    assert_eq!(Value::Int(7).add(&Value::Int(3)), Value::Int(10));
    assert_eq!(Value::Int(7).div(&Value::Int(2)), Value::Int(3));
    assert_eq!(Value::Int(7).rem(&Value::Int(2)), Value::Int(1));
    assert_eq!(Value::Int(-5).abs(), Value::Int(5));
}

#[test]
fn test_numeric_promotion() {
    assert_eq!(Value::Int(2).add(&Value::Float(0.5)), Value::Float(2.5));
    assert_eq!(Value::Float(1.5).mul(&Value::Int(2)), Value::Float(3.0));
    assert_eq!(
        Value::Int(2).mul(&Value::Decimal(Decimal::new(25, 1))),
        Value::Decimal(Decimal::from(5))
    );
    assert_eq!(
        Value::Decimal(Decimal::from(3)).add(&Value::Int(4)),
        Value::Decimal(Decimal::from(7))
    );
}

#[test]
fn test_division_by_zero_is_null() {
    assert_eq!(Value::Int(5).div(&Value::Int(0)), Value::Null);
    assert_eq!(Value::Int(5).rem(&Value::Int(0)), Value::Null);
    assert_eq!(Value::Float(5.0).div(&Value::Float(0.0)), Value::Null);
    assert_eq!(
        Value::Decimal(Decimal::from(5)).div(&Value::Decimal(Decimal::ZERO)),
        Value::Null
    );
}

#[test]
fn test_null_propagates_through_arithmetic() {
    assert_eq!(Value::Null.add(&Value::Int(1)), Value::Null);
    assert_eq!(Value::Int(1).sub(&Value::Null), Value::Null);
    assert_eq!(Value::Null.abs(), Value::Null);
    assert_eq!(Value::String("x".into()).add(&Value::Int(1)), Value::Null);
}

#[test]
fn test_compare_within_and_across_kinds() {
    use std::cmp::Ordering::*;
    assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Some(Less));
    assert_eq!(
        Value::Int(3).compare(&Value::Decimal(Decimal::from(3))),
        Some(Equal)
    );
    assert_eq!(
        Value::String("apple".into()).compare(&Value::String("banana".into())),
        Some(Less)
    );
    // Null and incomparable kinds never order.
    assert_eq!(Value::Null.compare(&Value::Int(1)), None);
    assert_eq!(Value::Boolean(true).compare(&Value::Int(1)), None);
}

#[test]
fn test_same_treats_null_as_equal_to_null() {
    assert!(Value::Null.same(&Value::Null));
    assert!(!Value::Null.same(&Value::Int(0)));
    assert!(Value::Int(1).same(&Value::Float(1.0)));
    assert!(!Value::Int(1).same(&Value::Int(2)));
}

#[test]
fn test_group_key_equality_and_hashing() {
    let mut groups: HashMap<GroupKey, u32> = HashMap::new();
    let key = GroupKey(vec![Value::Int(1), Value::String("east".into())]);
    groups.insert(key.clone(), 7);
    assert_eq!(
        groups.get(&GroupKey(vec![Value::Int(1), Value::String("east".into())])),
        Some(&7)
    );
    assert!(groups
        .get(&GroupKey(vec![Value::Int(2), Value::String("east".into())]))
        .is_none());
}

#[test]
fn test_group_key_floats_keyed_by_bits() {
    let nan = GroupKey(vec![Value::Float(f64::NAN)]);
    assert_eq!(nan, nan.clone());
    assert_eq!(
        GroupKey(vec![Value::Float(1.0)]),
        GroupKey(vec![Value::Float(1.0)])
    );
    assert_ne!(
        GroupKey(vec![Value::Float(1.0)]),
        GroupKey(vec![Value::Float(2.0)])
    );
}

#[test]
fn test_zero_per_numeric_kind() {
    assert_eq!(Value::zero(NumericKind::Int), Value::Int(0));
    assert_eq!(Value::zero(NumericKind::Float), Value::Float(0.0));
    assert_eq!(Value::zero(NumericKind::Decimal), Value::Decimal(Decimal::ZERO));
}
