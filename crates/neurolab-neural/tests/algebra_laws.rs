// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Identity laws and indexed-slot behaviour across every representation

use neurolab_neural::{IndexedValue, NeuronValue};
use proptest::prelude::*;

fn finite() -> impl Strategy<Value = f64> {
    -1.0e6..1.0e6
}

fn scalar() -> impl Strategy<Value = NeuronValue> {
    finite().prop_map(NeuronValue::Scalar)
}

fn vector() -> impl Strategy<Value = NeuronValue> {
    prop::collection::vec(finite(), 1..8).prop_map(NeuronValue::Vector)
}

fn plain() -> impl Strategy<Value = NeuronValue> {
    prop_oneof![scalar(), vector()]
}

/// Indexed value whose slots share one base shape, with a random selection
fn indexed() -> impl Strategy<Value = NeuronValue> {
    (1usize..6, 1usize..5)
        .prop_flat_map(|(size, len)| {
            let slot = if len == 1 {
                scalar().boxed()
            } else {
                prop::collection::vec(finite(), len).prop_map(NeuronValue::Vector).boxed()
            };
            (prop::collection::vec(slot, size), 0..size)
        })
        .prop_map(|(slots, index)| {
            let mut value = IndexedValue::new(slots).unwrap();
            value.select(index).unwrap();
            NeuronValue::Indexed(value)
        })
}

fn any_value() -> impl Strategy<Value = NeuronValue> {
    prop_oneof![scalar(), vector(), indexed()]
}

proptest! {
    #[test]
    fn add_zero_is_identity(v in any_value()) {
        prop_assert_eq!(v.add(&v.zero()), Some(v.clone()));
    }

    #[test]
    fn multiply_unit_is_identity(v in any_value()) {
        prop_assert_eq!(v.multiply(&v.unit()), Some(v.clone()));
    }

    #[test]
    fn indexed_set_then_get(v in indexed(), x in finite()) {
        let mut iv = v.as_indexed().unwrap().clone();
        let replacement = iv.current().map(|_| x);
        for i in 0..iv.size() {
            iv.set(i, replacement.clone()).unwrap();
            prop_assert_eq!(iv.get(i).unwrap(), &replacement);
        }
        prop_assert!(iv.get(iv.size()).is_err());
    }

    #[test]
    fn renew_touches_only_selected_slot(v in indexed(), x in finite()) {
        let iv = v.as_indexed().unwrap();
        let renewed = iv.renew(iv.current().map(|_| x));
        prop_assert_eq!(renewed.index(), iv.index());
        for i in 0..iv.size() {
            if i == iv.index() {
                prop_assert_eq!(renewed.get(i).unwrap(), &iv.current().map(|_| x));
            } else {
                prop_assert_eq!(renewed.get(i).unwrap(), iv.get(i).unwrap());
            }
        }
    }

    #[test]
    fn indexed_arithmetic_is_copy_on_write(v in indexed(), w in finite()) {
        let iv = v.as_indexed().unwrap();
        let other = NeuronValue::Indexed(IndexedValue::broadcast(&iv.current().map(|_| w), iv.size()).unwrap())
            .selected(iv.index());
        let sum = v.add(&other).unwrap();
        let sum = sum.as_indexed().unwrap();
        for i in (0..iv.size()).filter(|&i| i != iv.index()) {
            prop_assert_eq!(sum.get(i).unwrap(), iv.get(i).unwrap());
        }
        // The source is never mutated
        prop_assert_eq!(v.as_indexed().unwrap(), iv);
    }

    #[test]
    fn mixed_representations_yield_none(p in plain(), i in indexed()) {
        prop_assert!(p.add(&i).is_none());
        prop_assert!(i.multiply(&p).is_none());
    }
}
