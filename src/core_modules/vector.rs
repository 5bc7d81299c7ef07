// THEORY:
// `VectorN` is the small numeric vector every color comparison in the engine is
// built on. A color is 4 numbers (hx, hy, s, l); a group signature may carry one
// more (lightness entropy). Nothing in the engine ever needs more than a handful
// of dimensions, so the vector is a fixed-capacity array plus a length rather
// than a growable heap allocation. It is `Copy`, which keeps the hot labelling
// loop free of allocations.
//
// Key principles:
// 1.  **Mixed-length arithmetic**: `+` and `-` between vectors of different
//     lengths pad with the longer vector's tail (negated for the right-hand side
//     of `-`); `dot` and elementwise `*` only use the shared prefix.
// 2.  **Bounded growth**: `append`/`insert` fail with `VectorCapacity` instead of
//     growing past `MAX_DIMENSIONS`.
// 3.  **Cosine similarity is the only metric**: it fails on zero-magnitude inputs
//     instead of returning NaN.

use crate::error::{Result, VisionError};
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, Sub};

/// The largest number of elements a `VectorN` can hold.
pub const MAX_DIMENSIONS: usize = 8;

#[derive(Clone, Copy)]
pub struct VectorN {
    elements: [f64; MAX_DIMENSIONS],
    len: usize,
}

impl VectorN {
    /// Builds a vector from a slice. Fails if the slice is longer than `MAX_DIMENSIONS`.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() > MAX_DIMENSIONS {
            return Err(VisionError::VectorCapacity {
                requested: values.len(),
                capacity: MAX_DIMENSIONS,
            });
        }
        let mut elements = [0.0; MAX_DIMENSIONS];
        elements[..values.len()].copy_from_slice(values);
        Ok(Self {
            elements,
            len: values.len(),
        })
    }

    /// A four-element vector, the shape of every HxHySL color.
    pub fn new4(a: f64, b: f64, c: f64, d: f64) -> Self {
        let mut elements = [0.0; MAX_DIMENSIONS];
        elements[..4].copy_from_slice(&[a, b, c, d]);
        Self { elements, len: 4 }
    }

    /// A zero vector of `len` elements (clamped to `MAX_DIMENSIONS`).
    pub fn zeros(len: usize) -> Self {
        Self {
            elements: [0.0; MAX_DIMENSIONS],
            len: len.min(MAX_DIMENSIONS),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.elements[..self.len]
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.as_slice().get(index).copied()
    }

    pub fn append(&self, values: &[f64]) -> Result<Self> {
        self.insert(self.len, values)
    }

    /// Returns a copy with `values` spliced in before `index`.
    pub fn insert(&self, index: usize, values: &[f64]) -> Result<Self> {
        if index > self.len {
            return Err(VisionError::VectorIndex {
                index,
                len: self.len,
            });
        }
        let new_len = self.len + values.len();
        if new_len > MAX_DIMENSIONS {
            return Err(VisionError::VectorCapacity {
                requested: new_len,
                capacity: MAX_DIMENSIONS,
            });
        }

        let mut elements = [0.0; MAX_DIMENSIONS];
        elements[..index].copy_from_slice(&self.elements[..index]);
        elements[index..index + values.len()].copy_from_slice(values);
        elements[index + values.len()..new_len].copy_from_slice(&self.elements[index..self.len]);
        Ok(Self {
            elements,
            len: new_len,
        })
    }

    /// Returns a copy without the element at `index`.
    pub fn remove(&self, index: usize) -> Result<Self> {
        if index >= self.len {
            return Err(VisionError::VectorIndex {
                index,
                len: self.len,
            });
        }
        let mut elements = [0.0; MAX_DIMENSIONS];
        elements[..index].copy_from_slice(&self.elements[..index]);
        elements[index..self.len - 1].copy_from_slice(&self.elements[index + 1..self.len]);
        Ok(Self {
            elements,
            len: self.len - 1,
        })
    }

    pub fn remove_first(&self) -> Result<Self> {
        self.remove(0)
    }

    pub fn remove_last(&self) -> Result<Self> {
        self.remove(self.len.saturating_sub(1))
    }

    /// Dot product over the shared prefix of both vectors.
    pub fn dot(&self, other: &VectorN) -> f64 {
        self.as_slice()
            .iter()
            .zip(other.as_slice())
            .map(|(a, b)| a * b)
            .sum()
    }

    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Cosine similarity: 1.0 for identical direction.
    ///
    /// Named after the source terminology, this is a similarity, not a distance.
    pub fn cosine_similarity(&self, other: &VectorN) -> Result<f64> {
        let denominator = self.magnitude() * other.magnitude();
        if denominator == 0.0 {
            return Err(VisionError::ZeroVector);
        }
        Ok(self.dot(other) / denominator)
    }

    /// Elementwise product; elements past the shorter length are zero.
    pub fn hadamard(&self, other: &VectorN) -> VectorN {
        let mut out = VectorN::zeros(self.len.max(other.len));
        for i in 0..self.len.min(other.len) {
            out.elements[i] = self.elements[i] * other.elements[i];
        }
        out
    }

    pub fn scale(&self, factor: f64) -> VectorN {
        let mut out = *self;
        for value in &mut out.elements[..out.len] {
            *value *= factor;
        }
        out
    }
}

impl Default for VectorN {
    fn default() -> Self {
        VectorN::zeros(0)
    }
}

impl PartialEq for VectorN {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl fmt::Debug for VectorN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl fmt::Display for VectorN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.as_slice().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")
    }
}

impl Index<usize> for VectorN {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.as_slice()[index]
    }
}

impl IndexMut<usize> for VectorN {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        let len = self.len;
        &mut self.elements[..len][index]
    }
}

impl Add for VectorN {
    type Output = VectorN;

    fn add(self, other: VectorN) -> VectorN {
        let longer = if self.len >= other.len { self } else { other };
        let mut out = longer;
        for i in 0..self.len.min(other.len) {
            out.elements[i] = self.elements[i] + other.elements[i];
        }
        out
    }
}

impl AddAssign for VectorN {
    fn add_assign(&mut self, other: VectorN) {
        *self = *self + other;
    }
}

impl Sub for VectorN {
    type Output = VectorN;

    fn sub(self, other: VectorN) -> VectorN {
        // The tail of a longer right-hand side is negated: a - b == a + (-b).
        let mut out = if self.len >= other.len {
            self
        } else {
            other.scale(-1.0)
        };
        for i in 0..self.len.min(other.len) {
            out.elements[i] = self.elements[i] - other.elements[i];
        }
        out
    }
}

impl Mul<f64> for VectorN {
    type Output = VectorN;

    fn mul(self, factor: f64) -> VectorN {
        self.scale(factor)
    }
}

impl Div<f64> for VectorN {
    type Output = VectorN;

    fn div(self, divisor: f64) -> VectorN {
        self.scale(1.0 / divisor)
    }
}

impl DivAssign<f64> for VectorN {
    fn div_assign(&mut self, divisor: f64) {
        *self = *self / divisor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(values: &[f64]) -> VectorN {
        VectorN::from_slice(values).unwrap()
    }

    #[test]
    fn append_grows_the_tail() {
        let grown = v(&[0.0, 1.0, 2.0, 3.0]).append(&[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(grown, v(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    }

    #[test]
    fn remove_drops_one_element() {
        assert_eq!(v(&[0.0, 1.0, 2.0, 3.0]).remove(1).unwrap(), v(&[0.0, 2.0, 3.0]));
        assert_eq!(v(&[0.0, 1.0]).remove_last().unwrap(), v(&[0.0]));
        assert!(v(&[0.0]).remove(3).is_err());
    }

    #[test]
    fn insert_splices_in_the_middle() {
        let initial = v(&[0.0, 1.0, 4.0, 5.0, 6.0]);
        assert_eq!(
            initial.insert(2, &[2.0, 3.0]).unwrap(),
            v(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
        );
    }

    #[test]
    fn growth_past_capacity_fails() {
        let full = VectorN::zeros(MAX_DIMENSIONS);
        assert!(matches!(
            full.append(&[1.0]),
            Err(VisionError::VectorCapacity { .. })
        ));
    }

    #[test]
    fn mixed_length_arithmetic_pads_with_the_longer_tail() {
        let a = v(&[1.0, 2.0]);
        let b = v(&[1.0, 1.0, 5.0]);
        assert_eq!(a + b, v(&[2.0, 3.0, 5.0]));
        assert_eq!(a - b, v(&[0.0, 1.0, -5.0]));
        assert_eq!(b - a, v(&[0.0, -1.0, 5.0]));
        assert_eq!(a.dot(&b), 3.0);
    }

    #[test]
    fn cosine_similarity_of_parallel_vectors_is_one() {
        let a = v(&[1.0, 2.0, 3.0]);
        let similarity = a.cosine_similarity(&(a * 4.0)).unwrap();
        assert!((similarity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_similarity_rejects_zero_vectors() {
        let a = v(&[1.0, 2.0]);
        assert!(matches!(
            a.cosine_similarity(&VectorN::zeros(2)),
            Err(VisionError::ZeroVector)
        ));
    }

    #[test]
    fn scaling_and_division() {
        let mut a = v(&[2.0, 4.0]);
        a /= 2.0;
        assert_eq!(a, v(&[1.0, 2.0]));
        assert_eq!(a.magnitude(), 5.0_f64.sqrt());
        assert_eq!(a.hadamard(&v(&[3.0])), v(&[3.0, 0.0]));
    }
}
