// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Symmetric group `S_n` of permutations of `{0, .., n-1}`.
//!
//! A permutation is stored as its image array. The group law is composition
//! `(p ∘ q)[i] = p[q[i]]`. In the secret-sharing domain every cell is a secure
//! integer, so composing reads `p` at the secret positions `q[i]` with an
//! oblivious gather.

use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::identities::{One, Zero};
use num_traits::ToPrimitive;
use rand::Rng;

use crate::errors::{Error, Result};
use crate::group::{Group, SecureGroupOps};
use crate::oblivious::gather;
use crate::runtime::{Runtime, SecretValue, SecureType};
use crate::util::Util;

/// A permutation given by its image array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    pub fn new(images: Vec<usize>) -> Self {
        Permutation(images)
    }

    pub fn images(&self) -> &[usize] {
        &self.0
    }

    pub fn degree(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<usize>> for Permutation {
    fn from(images: Vec<usize>) -> Self {
        Permutation(images)
    }
}

/// The symmetric group on `degree` points.
#[derive(Debug, Clone)]
pub struct SymmetricGroup {
    degree: usize,
    order: BigUint,
    component: Arc<SecureType>,
}

impl SymmetricGroup {
    /// `S_degree`. Cells are secure integers wide enough for `degree!`, which
    /// the embedding needs.
    pub fn new(degree: usize) -> Result<Arc<Self>> {
        if degree == 0 {
            return Err(Error::InvalidConfig(
                "symmetric group needs at least one point".into(),
            ));
        }
        let order = Util::factorial(degree);
        let component = SecureType::integer(order.bits() + 2)?;
        Ok(Arc::new(SymmetricGroup {
            degree,
            order,
            component,
        }))
    }

    pub fn degree(&self) -> usize {
        self.degree
    }
}

impl Group for SymmetricGroup {
    type Element = Permutation;

    fn order(&self) -> Option<&BigUint> {
        Some(&self.order)
    }

    /// The `n`-cycle `i -> i + 1 mod n`.
    fn generator(&self) -> Permutation {
        Permutation((0..self.degree).map(|i| (i + 1) % self.degree).collect())
    }

    fn identity(&self) -> Permutation {
        Permutation((0..self.degree).collect())
    }

    fn operation(&self, a: &Permutation, b: &Permutation) -> Permutation {
        Permutation(b.0.iter().map(|&j| a.0[j]).collect())
    }

    fn inverse(&self, a: &Permutation) -> Permutation {
        let mut inv = vec![0; a.0.len()];
        for (i, &j) in a.0.iter().enumerate() {
            inv[j] = i;
        }
        Permutation(inv)
    }

    fn is_valid(&self, a: &Permutation) -> bool {
        if a.0.len() != self.degree {
            return false;
        }
        let mut seen = vec![false; self.degree];
        for &j in &a.0 {
            if j >= self.degree || seen[j] {
                return false;
            }
            seen[j] = true;
        }
        true
    }

    fn random_element<R: Rng + ?Sized>(&self, rng: &mut R) -> Permutation {
        let mut images: Vec<usize> = (0..self.degree).collect();
        for i in (1..self.degree).rev() {
            let j = rng.gen_range(0, i + 1);
            images.swap(i, j);
        }
        Permutation(images)
    }

    /// Lehmer code: digit `i` of `m` in the factorial number system picks the
    /// image of `i` among the points not used yet.
    fn embed(&self, message: &BigUint) -> Result<Permutation> {
        if message >= &self.order {
            return Err(Error::Embedding(format!(
                "{} is outside [0, {}!)",
                message, self.degree
            )));
        }
        let mut rest = message.clone();
        let mut unused: Vec<usize> = (0..self.degree).collect();
        let mut images = Vec::with_capacity(self.degree);
        for i in 0..self.degree {
            let radix = Util::factorial(self.degree - 1 - i);
            let (digit, r) = rest.div_rem(&radix);
            rest = r;
            let digit = digit.to_usize().unwrap_or(0);
            images.push(unused.remove(digit));
        }
        Ok(Permutation(images))
    }

    fn unembed(&self, element: &Permutation) -> Result<BigUint> {
        if !self.is_valid(element) {
            return Err(Error::Embedding("not a permutation of this degree".into()));
        }
        let p = &element.0;
        let mut message = BigUint::zero();
        for i in 0..self.degree {
            let smaller = p[i + 1..].iter().filter(|&&x| x < p[i]).count();
            message += Util::factorial(self.degree - 1 - i) * BigUint::from(smaller);
        }
        Ok(message)
    }
}

impl SecureGroupOps for SymmetricGroup {
    fn component_type(&self) -> &Arc<SecureType> {
        &self.component
    }

    fn arity(&self) -> usize {
        self.degree
    }

    fn to_components(&self, a: &Permutation) -> Vec<BigInt> {
        a.0.iter().map(|&x| BigInt::from(x)).collect()
    }

    fn from_components(&self, components: &[BigInt]) -> Result<Permutation> {
        let images = components
            .iter()
            .map(|c| c.to_usize())
            .collect::<Option<Vec<usize>>>()
            .map(Permutation)
            .ok_or_else(|| Error::GroupValidity(format!("{:?} is not a permutation", components)))?;
        if !self.is_valid(&images) {
            return Err(Error::GroupValidity(format!(
                "{:?} is not a permutation",
                images.0
            )));
        }
        Ok(images)
    }

    /// `O(n^2)` secure equalities: one gather over `a` per cell of `b`.
    fn secure_operation<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
        b: &[SecretValue],
    ) -> Result<Vec<SecretValue>> {
        b.iter().map(|j| gather(rt, a, j)).collect()
    }

    /// `inv[j] = sum_i [a[i] == j] * i`.
    fn secure_inverse<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
    ) -> Result<Vec<SecretValue>> {
        let ty = &self.component;
        let mut inverse = Vec::with_capacity(a.len());
        for j in 0..a.len() {
            let target = rt.constant(ty, &BigInt::from(j))?;
            let mut acc = rt.constant(ty, &BigInt::zero())?;
            for (i, cell) in a.iter().enumerate() {
                let hit = rt.eq(cell, &target)?;
                acc = rt.add(&acc, &rt.scale(&hit, &BigInt::from(i)))?;
            }
            inverse.push(acc);
        }
        Ok(inverse)
    }

    fn secure_unembed<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
    ) -> Result<(SecretValue, SecretValue)> {
        let ty = &self.component;
        let mut message = rt.constant(ty, &BigInt::zero())?;
        for i in 0..a.len() {
            let mut smaller = rt.constant(ty, &BigInt::zero())?;
            for later in &a[i + 1..] {
                smaller = rt.add(&smaller, &rt.lt(later, &a[i])?)?;
            }
            let radix = Util::to_bigint(&Util::factorial(a.len() - 1 - i));
            message = rt.add(&message, &rt.scale(&smaller, &radix))?;
        }
        // every permutation encodes some message
        let valid = rt.constant(ty, &BigInt::one())?;
        Ok((message, valid))
    }
}
