// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neuron Value Algebra
//!
//! Every activation, bias and edge weight in a network is a [`NeuronValue`]:
//!
//! ```text
//! Scalar(x)            single magnitude
//! Vector([x0..xn])     fixed-size element-wise vector
//! Indexed{slots, i}    K sub-values with a selected slot i
//! ```
//!
//! Binary operations return `None` when the two representations cannot be
//! combined (indexed with non-indexed, vectors of different length). Callers
//! treat `None` as "no result for this case".
//!
//! Arithmetic between two indexed values works on the currently selected slot
//! of each operand and returns a copy of the left operand with only that slot
//! replaced. This is how one neuron carries the four LSTM gate signals while
//! the backpropagation code stays unaware of the gate count.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NeuralError, NeuralResult};

/// Algebraic element carried by neurons and edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NeuronValue {
    Scalar(f64),
    Vector(Vec<f64>),
    Indexed(IndexedValue),
}

/// Fixed array of sub-values with a mutable current slot
///
/// Slots are never indexed themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedValue {
    slots: Vec<NeuronValue>,
    index: usize,
}

impl IndexedValue {
    /// Create an indexed value selecting slot 0
    ///
    /// Nested indexed slots are flattened to their current slot.
    pub fn new(slots: Vec<NeuronValue>) -> NeuralResult<Self> {
        if slots.is_empty() {
            return Err(NeuralError::IndexOutOfBounds { index: 0, size: 0 });
        }
        let slots = slots
            .into_iter()
            .map(|slot| match slot {
                NeuronValue::Indexed(inner) => inner.current().clone(),
                other => other,
            })
            .collect();
        Ok(Self { slots, index: 0 })
    }

    /// Copy `value` into `size` slots
    pub fn broadcast(value: &NeuronValue, size: usize) -> NeuralResult<Self> {
        Self::new(vec![value.clone(); size])
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn slots(&self) -> &[NeuronValue] {
        &self.slots
    }

    /// Change the currently selected slot
    pub fn select(&mut self, index: usize) -> NeuralResult<()> {
        if index >= self.slots.len() {
            return Err(NeuralError::IndexOutOfBounds {
                index,
                size: self.slots.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    pub fn get(&self, index: usize) -> NeuralResult<&NeuronValue> {
        self.slots.get(index).ok_or(NeuralError::IndexOutOfBounds {
            index,
            size: self.slots.len(),
        })
    }

    pub fn set(&mut self, index: usize, value: NeuronValue) -> NeuralResult<()> {
        let size = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(NeuralError::IndexOutOfBounds { index, size })?;
        *slot = match value {
            NeuronValue::Indexed(inner) => inner.current().clone(),
            other => other,
        };
        Ok(())
    }

    pub fn current(&self) -> &NeuronValue {
        &self.slots[self.index]
    }

    /// Clone the container, replacing only the currently selected slot
    pub fn renew(&self, value: NeuronValue) -> IndexedValue {
        let mut renewed = self.clone();
        renewed.slots[self.index] = match value {
            NeuronValue::Indexed(inner) => inner.current().clone(),
            other => other,
        };
        renewed
    }
}

impl NeuronValue {
    /// Short name of the representation, used in error messages
    pub fn representation(&self) -> &'static str {
        match self {
            NeuronValue::Scalar(_) => "scalar",
            NeuronValue::Vector(_) => "vector",
            NeuronValue::Indexed(_) => "indexed",
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, NeuronValue::Indexed(_))
    }

    /// Zero of the same shape (indexed values keep their selected slot)
    pub fn zero(&self) -> NeuronValue {
        self.filled_like(0.0)
    }

    /// Multiplicative unit of the same shape
    pub fn unit(&self) -> NeuronValue {
        self.filled_like(1.0)
    }

    fn filled_like(&self, x: f64) -> NeuronValue {
        match self {
            NeuronValue::Scalar(_) => NeuronValue::Scalar(x),
            NeuronValue::Vector(v) => NeuronValue::Vector(vec![x; v.len()]),
            NeuronValue::Indexed(iv) => NeuronValue::Indexed(IndexedValue {
                slots: iv.slots.iter().map(|s| s.filled_like(x)).collect(),
                index: iv.index,
            }),
        }
    }

    fn combine<F>(&self, other: &NeuronValue, op: F) -> Option<NeuronValue>
    where
        F: Fn(f64, f64) -> f64 + Copy,
    {
        match (self, other) {
            (NeuronValue::Scalar(a), NeuronValue::Scalar(b)) => Some(NeuronValue::Scalar(op(*a, *b))),
            (NeuronValue::Vector(a), NeuronValue::Vector(b)) => {
                if a.len() != b.len() {
                    return None;
                }
                Some(NeuronValue::Vector(
                    a.iter().zip(b.iter()).map(|(x, y)| op(*x, *y)).collect(),
                ))
            }
            (NeuronValue::Scalar(a), NeuronValue::Vector(b)) => {
                Some(NeuronValue::Vector(b.iter().map(|y| op(*a, *y)).collect()))
            }
            (NeuronValue::Vector(a), NeuronValue::Scalar(b)) => {
                Some(NeuronValue::Vector(a.iter().map(|x| op(*x, *b)).collect()))
            }
            (NeuronValue::Indexed(a), NeuronValue::Indexed(b)) => {
                let result = a.current().combine(b.current(), op)?;
                Some(NeuronValue::Indexed(a.renew(result)))
            }
            _ => None,
        }
    }

    pub fn add(&self, other: &NeuronValue) -> Option<NeuronValue> {
        self.combine(other, |a, b| a + b)
    }

    pub fn subtract(&self, other: &NeuronValue) -> Option<NeuronValue> {
        self.combine(other, |a, b| a - b)
    }

    pub fn multiply(&self, other: &NeuronValue) -> Option<NeuronValue> {
        self.combine(other, |a, b| a * b)
    }

    pub fn divide(&self, other: &NeuronValue) -> Option<NeuronValue> {
        self.combine(other, |a, b| a / b)
    }

    /// Multiply by a precomputed activation derivative (element-wise)
    pub fn multiply_derivative(&self, derivative: &NeuronValue) -> Option<NeuronValue> {
        self.combine(derivative, |a, b| a * b)
    }

    pub fn multiply_weight(&self, weight: &Weight) -> Option<NeuronValue> {
        self.multiply(weight.value())
    }

    /// Apply `f` element-wise; indexed values only touch the selected slot
    pub fn map<F>(&self, f: F) -> NeuronValue
    where
        F: Fn(f64) -> f64 + Copy,
    {
        match self {
            NeuronValue::Scalar(x) => NeuronValue::Scalar(f(*x)),
            NeuronValue::Vector(v) => NeuronValue::Vector(v.iter().map(|x| f(*x)).collect()),
            NeuronValue::Indexed(iv) => NeuronValue::Indexed(iv.renew(iv.current().map(f))),
        }
    }

    /// Like [`map`](Self::map) but fails when `f` fails on any element
    pub fn try_map<F>(&self, f: F) -> Option<NeuronValue>
    where
        F: Fn(f64) -> Option<f64> + Copy,
    {
        match self {
            NeuronValue::Scalar(x) => f(*x).map(NeuronValue::Scalar),
            NeuronValue::Vector(v) => v
                .iter()
                .map(|x| f(*x))
                .collect::<Option<Vec<f64>>>()
                .map(NeuronValue::Vector),
            NeuronValue::Indexed(iv) => iv
                .current()
                .try_map(f)
                .map(|slot| NeuronValue::Indexed(iv.renew(slot))),
        }
    }

    pub fn negate(&self) -> NeuronValue {
        self.map(|x| -x)
    }

    pub fn scale(&self, factor: f64) -> NeuronValue {
        self.map(|x| x * factor)
    }

    pub fn power(&self, exponent: f64) -> NeuronValue {
        self.map(|x| x.powf(exponent))
    }

    /// |x| for scalars, Euclidean norm for vectors, selected slot for indexed
    pub fn magnitude(&self) -> f64 {
        match self {
            NeuronValue::Scalar(x) => x.abs(),
            NeuronValue::Vector(v) => v.iter().map(|x| x * x).sum::<f64>().sqrt(),
            NeuronValue::Indexed(iv) => iv.current().magnitude(),
        }
    }

    /// Scalar content, looking through the selected slot of indexed values
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            NeuronValue::Scalar(x) => Some(*x),
            NeuronValue::Vector(_) => None,
            NeuronValue::Indexed(iv) => iv.current().as_scalar(),
        }
    }

    /// Clone with the given slot selected; non-indexed values are returned as-is
    ///
    /// Out-of-range indices leave the selection unchanged.
    pub fn selected(&self, index: usize) -> NeuronValue {
        let mut value = self.clone();
        if let NeuronValue::Indexed(iv) = &mut value {
            let _ = iv.select(index);
        }
        value
    }

    /// The selected slot for indexed values, the value itself otherwise
    pub fn current(&self) -> &NeuronValue {
        match self {
            NeuronValue::Indexed(iv) => iv.current(),
            other => other,
        }
    }

    pub fn as_indexed(&self) -> Option<&IndexedValue> {
        match self {
            NeuronValue::Indexed(iv) => Some(iv),
            _ => None,
        }
    }

    pub fn as_indexed_mut(&mut self) -> Option<&mut IndexedValue> {
        match self {
            NeuronValue::Indexed(iv) => Some(iv),
            _ => None,
        }
    }

    /// Clone of the indexed container with the selected slot replaced
    pub fn renew(&self, value: NeuronValue) -> Option<NeuronValue> {
        match self {
            NeuronValue::Indexed(iv) => Some(NeuronValue::Indexed(iv.renew(value))),
            _ => None,
        }
    }

    pub fn determinant(&self) -> NeuralResult<f64> {
        match self {
            NeuronValue::Scalar(x) => Ok(*x),
            other => Err(NeuralError::NotImplemented {
                operation: "determinant",
                representation: other.representation(),
            }),
        }
    }

    pub fn inverse(&self) -> NeuralResult<NeuronValue> {
        match self {
            NeuronValue::Scalar(x) => Ok(NeuronValue::Scalar(1.0 / x)),
            other => Err(NeuralError::NotImplemented {
                operation: "inverse",
                representation: other.representation(),
            }),
        }
    }

    pub fn sqrt(&self) -> NeuralResult<NeuronValue> {
        match self {
            NeuronValue::Scalar(x) => Ok(NeuronValue::Scalar(x.sqrt())),
            NeuronValue::Vector(v) => Ok(NeuronValue::Vector(v.iter().map(|x| x.sqrt()).collect())),
            other => Err(NeuralError::NotImplemented {
                operation: "sqrt",
                representation: other.representation(),
            }),
        }
    }

    pub fn flatten(&self) -> NeuralResult<Vec<f64>> {
        match self {
            NeuronValue::Scalar(x) => Ok(vec![*x]),
            NeuronValue::Vector(v) => Ok(v.clone()),
            other => Err(NeuralError::NotImplemented {
                operation: "flatten",
                representation: other.representation(),
            }),
        }
    }

    /// Mean of a batch; `None` for an empty batch or mixed representations
    pub fn mean(values: &[NeuronValue]) -> Option<NeuronValue> {
        let (first, rest) = values.split_first()?;
        let mut sum = first.clone();
        for value in rest {
            sum = sum.add(value)?;
        }
        Some(sum.scale(1.0 / values.len() as f64))
    }

    pub fn to_weight(&self) -> Weight {
        Weight::new(self.clone())
    }
}

impl From<f64> for NeuronValue {
    fn from(x: f64) -> Self {
        NeuronValue::Scalar(x)
    }
}

impl From<Vec<f64>> for NeuronValue {
    fn from(v: Vec<f64>) -> Self {
        NeuronValue::Vector(v)
    }
}

/// Mutable numeric state owned by exactly one edge or bias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    value: NeuronValue,
}

impl Weight {
    pub fn new(value: NeuronValue) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &NeuronValue {
        &self.value
    }

    pub fn set(&mut self, value: NeuronValue) {
        self.value = value;
    }

    /// Add `delta` in place
    ///
    /// Returns `false` (weight unchanged) when `delta` has an incompatible
    /// representation.
    pub fn accumulate(&mut self, delta: &NeuronValue) -> bool {
        match self.value.add(delta) {
            Some(updated) => {
                self.value = updated;
                true
            }
            None => false,
        }
    }

    /// Select a slot when the weight is indexed
    pub fn select(&mut self, index: usize) {
        if let NeuronValue::Indexed(iv) = &mut self.value {
            let _ = iv.select(index);
        }
    }

    pub fn to_value(&self) -> NeuronValue {
        self.value.clone()
    }
}

impl From<NeuronValue> for Weight {
    fn from(value: NeuronValue) -> Self {
        Weight::new(value)
    }
}

impl From<Weight> for NeuronValue {
    fn from(weight: Weight) -> Self {
        weight.value
    }
}

/// Shape of the values used throughout one network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueKind {
    Scalar,
    Vector { len: usize },
    Indexed { size: usize, base: Box<ValueKind> },
}

impl Default for ValueKind {
    fn default() -> Self {
        ValueKind::Scalar
    }
}

impl ValueKind {
    /// Indexed kind of `size` slots of `base` (nested indexing collapses)
    pub fn indexed(size: usize, base: ValueKind) -> Self {
        let base = match base {
            ValueKind::Indexed { base, .. } => *base,
            other => other,
        };
        ValueKind::Indexed {
            size,
            base: Box::new(base),
        }
    }

    /// Number of gate slots this kind carries (1 for non-indexed kinds)
    pub fn slot_count(&self) -> usize {
        match self {
            ValueKind::Indexed { size, .. } => *size,
            _ => 1,
        }
    }

    pub fn filled(&self, x: f64) -> NeuronValue {
        match self {
            ValueKind::Scalar => NeuronValue::Scalar(x),
            ValueKind::Vector { len } => NeuronValue::Vector(vec![x; *len]),
            ValueKind::Indexed { size, base } => NeuronValue::Indexed(IndexedValue {
                slots: vec![base.filled(x); (*size).max(1)],
                index: 0,
            }),
        }
    }

    pub fn zero(&self) -> NeuronValue {
        self.filled(0.0)
    }

    pub fn unit(&self) -> NeuronValue {
        self.filled(1.0)
    }

    /// Every element drawn independently from `[low, high)`
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R, low: f64, high: f64) -> NeuronValue {
        match self {
            ValueKind::Scalar => NeuronValue::Scalar(draw(rng, low, high)),
            ValueKind::Vector { len } => {
                NeuronValue::Vector((0..*len).map(|_| draw(rng, low, high)).collect())
            }
            ValueKind::Indexed { size, base } => {
                let slots = (0..(*size).max(1))
                    .map(|_| base.random(rng, low, high))
                    .collect();
                NeuronValue::Indexed(IndexedValue { slots, index: 0 })
            }
        }
    }

    /// Whether `value` already has this shape
    pub fn matches(&self, value: &NeuronValue) -> bool {
        match (self, value) {
            (ValueKind::Scalar, NeuronValue::Scalar(_)) => true,
            (ValueKind::Vector { len }, NeuronValue::Vector(v)) => v.len() == *len,
            (ValueKind::Indexed { size, base }, NeuronValue::Indexed(iv)) => {
                iv.size() == *size && iv.slots().iter().all(|s| base.matches(s))
            }
            _ => false,
        }
    }

    /// Bring a record value into this shape
    ///
    /// Scalars fill vectors; non-indexed values are broadcast into every slot
    /// of an indexed kind. Anything else that does not already match is `None`.
    pub fn conform(&self, value: &NeuronValue) -> Option<NeuronValue> {
        if self.matches(value) {
            return Some(value.clone());
        }
        match (self, value) {
            (ValueKind::Vector { len }, NeuronValue::Scalar(x)) => {
                Some(NeuronValue::Vector(vec![*x; *len]))
            }
            (ValueKind::Indexed { size, base }, v) if !v.is_indexed() => {
                let slot = base.conform(v)?;
                IndexedValue::broadcast(&slot, *size)
                    .ok()
                    .map(NeuronValue::Indexed)
            }
            _ => None,
        }
    }
}

fn draw<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gates(values: [f64; 4]) -> NeuronValue {
        NeuronValue::Indexed(
            IndexedValue::new(values.iter().map(|x| NeuronValue::Scalar(*x)).collect()).unwrap(),
        )
    }

    #[test]
    fn test_scalar_arithmetic() {
        let a = NeuronValue::Scalar(3.0);
        let b = NeuronValue::Scalar(2.0);
        assert_eq!(a.add(&b), Some(NeuronValue::Scalar(5.0)));
        assert_eq!(a.subtract(&b), Some(NeuronValue::Scalar(1.0)));
        assert_eq!(a.multiply(&b), Some(NeuronValue::Scalar(6.0)));
        assert_eq!(a.divide(&b), Some(NeuronValue::Scalar(1.5)));
        assert_eq!(a.power(2.0), NeuronValue::Scalar(9.0));
    }

    #[test]
    fn test_vector_length_mismatch_yields_none() {
        let a = NeuronValue::Vector(vec![1.0, 2.0]);
        let b = NeuronValue::Vector(vec![1.0, 2.0, 3.0]);
        assert_eq!(a.add(&b), None);
    }

    #[test]
    fn test_scalar_broadcasts_over_vector() {
        let a = NeuronValue::Scalar(2.0);
        let b = NeuronValue::Vector(vec![1.0, 3.0]);
        assert_eq!(a.multiply(&b), Some(NeuronValue::Vector(vec![2.0, 6.0])));
    }

    #[test]
    fn test_indexed_with_plain_is_mismatch() {
        let indexed = gates([1.0, 2.0, 3.0, 4.0]);
        let plain = NeuronValue::Scalar(1.0);
        assert_eq!(indexed.add(&plain), None);
        assert_eq!(plain.multiply(&indexed), None);
    }

    #[test]
    fn test_indexed_arithmetic_is_copy_on_write() {
        let mut a = gates([1.0, 2.0, 3.0, 4.0]);
        let mut b = gates([10.0, 20.0, 30.0, 40.0]);
        a.as_indexed_mut().unwrap().select(2).unwrap();
        b.as_indexed_mut().unwrap().select(1).unwrap();

        let sum = a.add(&b).unwrap();
        let sum = sum.as_indexed().unwrap();
        assert_eq!(sum.index(), 2);
        assert_eq!(sum.get(2).unwrap(), &NeuronValue::Scalar(23.0));
        assert_eq!(sum.get(0).unwrap(), &NeuronValue::Scalar(1.0));
        assert_eq!(sum.get(3).unwrap(), &NeuronValue::Scalar(4.0));

        // Source operand untouched
        assert_eq!(a.as_indexed().unwrap().get(2).unwrap(), &NeuronValue::Scalar(3.0));
    }

    #[test]
    fn test_indexed_get_set_bounds() {
        let mut iv = IndexedValue::broadcast(&NeuronValue::Scalar(0.0), 4).unwrap();
        assert!(iv.set(3, NeuronValue::Scalar(7.0)).is_ok());
        assert_eq!(iv.get(3).unwrap(), &NeuronValue::Scalar(7.0));
        assert_eq!(
            iv.set(4, NeuronValue::Scalar(1.0)),
            Err(NeuralError::IndexOutOfBounds { index: 4, size: 4 })
        );
        assert!(iv.select(9).is_err());
    }

    #[test]
    fn test_matrix_operations_not_implemented() {
        let v = NeuronValue::Vector(vec![4.0, 9.0]);
        assert!(matches!(v.determinant(), Err(NeuralError::NotImplemented { .. })));
        assert!(matches!(v.inverse(), Err(NeuralError::NotImplemented { .. })));
        assert_eq!(v.sqrt().unwrap(), NeuronValue::Vector(vec![2.0, 3.0]));

        let g = gates([1.0, 1.0, 1.0, 1.0]);
        assert!(matches!(g.flatten(), Err(NeuralError::NotImplemented { .. })));
        assert!(matches!(g.sqrt(), Err(NeuralError::NotImplemented { .. })));

        let s = NeuronValue::Scalar(4.0);
        assert_eq!(s.determinant().unwrap(), 4.0);
        assert_eq!(s.inverse().unwrap(), NeuronValue::Scalar(0.25));
    }

    #[test]
    fn test_mean() {
        let values = vec![NeuronValue::Scalar(1.0), NeuronValue::Scalar(3.0)];
        assert_eq!(NeuronValue::mean(&values), Some(NeuronValue::Scalar(2.0)));
        assert_eq!(NeuronValue::mean(&[]), None);
    }

    #[test]
    fn test_weight_accumulate() {
        let mut w = Weight::new(NeuronValue::Scalar(1.0));
        assert!(w.accumulate(&NeuronValue::Scalar(0.5)));
        assert_eq!(w.value(), &NeuronValue::Scalar(1.5));
        assert!(!w.accumulate(&gates([1.0, 1.0, 1.0, 1.0])));
        assert_eq!(w.value(), &NeuronValue::Scalar(1.5));
    }

    #[test]
    fn test_value_kind_conform() {
        let kind = ValueKind::indexed(4, ValueKind::Scalar);
        let conformed = kind.conform(&NeuronValue::Scalar(2.5)).unwrap();
        let iv = conformed.as_indexed().unwrap();
        assert_eq!(iv.size(), 4);
        assert!(iv.slots().iter().all(|s| s == &NeuronValue::Scalar(2.5)));

        let vector = ValueKind::Vector { len: 3 };
        assert_eq!(
            vector.conform(&NeuronValue::Scalar(1.0)),
            Some(NeuronValue::Vector(vec![1.0, 1.0, 1.0]))
        );
        assert_eq!(vector.conform(&NeuronValue::Vector(vec![1.0])), None);
    }
}
