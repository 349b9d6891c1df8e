// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Finite group abstraction for secure computation.
//!
//! [`Group`] is the plaintext capability set every algebraic backend exposes:
//! identity, the group law, inverse, equality, a generator, the order (when
//! known), a membership predicate and an integer embedding. It covers
//! multiplicative groups (residues modulo a prime), additive groups (elliptic
//! curve points) and non-abelian groups (permutations) alike; "operation" is
//! the group law in whichever notation the backend uses.
//!
//! [`SecureGroupOps`] lifts the same law into the secret-sharing domain. A
//! secure element is the list of its representation's components, each one a
//! [`SecretValue`] of the backend's [`component_type`](SecureGroupOps::component_type).

use std::fmt::Debug;
use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::identities::Zero;
use rand::Rng;

use crate::errors::Result;
use crate::runtime::{Runtime, SecretValue, SecureType};

/// Plaintext group law of a backend.
pub trait Group: Send + Sync {
    /// Group element type (permutation, residue, curve point, form)
    type Element: Clone + PartialEq + Debug + Send + Sync;

    /// Group order, or `None` if the backend cannot compute it.
    fn order(&self) -> Option<&BigUint>;

    /// Designated generator.
    fn generator(&self) -> Self::Element;

    /// Identity element (1 for residues, the neutral point for curves).
    fn identity(&self) -> Self::Element;

    /// Group law: `a * b` (multiplicative) or `a + b` (additive).
    fn operation(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;

    fn inverse(&self, a: &Self::Element) -> Self::Element;

    /// Group equality. Backends with redundant representations (projective
    /// coordinates) compare classes, not representations.
    fn equals(&self, a: &Self::Element, b: &Self::Element) -> bool {
        a == b
    }

    /// Membership predicate for externally constructed elements.
    fn is_valid(&self, a: &Self::Element) -> bool;

    /// Random element, used to mask embedded messages.
    fn random_element<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element;

    /// Embeds an integer message into the group.
    fn embed(&self, message: &BigUint) -> Result<Self::Element>;

    /// Inverse of [`Group::embed`].
    fn unembed(&self, element: &Self::Element) -> Result<BigUint>;

    /// Plaintext square-and-multiply; negative exponents invert the base.
    fn exp(&self, base: &Self::Element, exponent: &BigInt) -> Self::Element {
        let (base, e) = if exponent < &BigInt::zero() {
            (self.inverse(base), -exponent)
        } else {
            (base.clone(), exponent.clone())
        };
        let mut acc = self.identity();
        let bits = e.bits();
        for i in (0..bits).rev() {
            acc = self.operation(&acc, &acc);
            if (&e >> i).is_odd() {
                acc = self.operation(&acc, &base);
            }
        }
        acc
    }
}

/// The group law lifted into the secret-sharing domain.
///
/// Every method works on the component lists produced by
/// [`to_components`](SecureGroupOps::to_components), never branching on
/// secret data.
pub trait SecureGroupOps: Group {
    /// Secure type of every component.
    fn component_type(&self) -> &Arc<SecureType>;

    /// Number of components of an element.
    fn arity(&self) -> usize;

    /// Public representation as component values.
    fn to_components(&self, a: &Self::Element) -> Vec<BigInt>;

    /// Rebuilds an element from revealed components.
    fn from_components(&self, components: &[BigInt]) -> Result<Self::Element>;

    fn secure_operation<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
        b: &[SecretValue],
    ) -> Result<Vec<SecretValue>>;

    fn secure_inverse<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
    ) -> Result<Vec<SecretValue>>;

    /// Secret bit `a == b` under group equality.
    fn secure_equals<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
        b: &[SecretValue],
    ) -> Result<SecretValue> {
        let mut acc: Option<SecretValue> = None;
        for (x, y) in a.iter().zip(b.iter()) {
            let e = rt.eq(x, y)?;
            acc = Some(match acc {
                Some(prev) => rt.and(&prev, &e)?,
                None => e,
            });
        }
        match acc {
            Some(bit) => Ok(bit),
            None => rt.constant(self.component_type(), &BigInt::from(1)),
        }
    }

    /// Secure inverse of [`Group::embed`] on an unmasked element.
    ///
    /// Returns the message and a secret bit that is 1 iff the element lies in
    /// the image of the embedding.
    fn secure_unembed<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
    ) -> Result<(SecretValue, SecretValue)>;
}
