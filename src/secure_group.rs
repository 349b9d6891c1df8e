// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Secure group engine.
//!
//! [`SecureGroup`] pairs a backend with a runtime and exposes the group law on
//! secret-shared elements. Its centerpiece is [`SecureGroup::repeat`], a
//! square-and-multiply whose schedule depends only on the bit length of the
//! exponent's secure type: every bit costs one doubling, one combination and
//! one oblivious select, whatever the bit is.

use std::marker::PhantomData;
use std::sync::Arc;

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::identities::Zero;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::group::{Group, SecureGroupOps};
use crate::runtime::{Kind, Runtime, SecretValue};
use crate::util::Util;

/// A group element lifted into the secret-sharing domain, one secret value per
/// component of the backend representation.
pub struct SecureElement<G: Group> {
    components: Vec<SecretValue>,
    _group: PhantomData<fn() -> G>,
}

impl<G: Group> SecureElement<G> {
    fn new(components: Vec<SecretValue>) -> Self {
        SecureElement {
            components,
            _group: PhantomData,
        }
    }

    pub fn components(&self) -> &[SecretValue] {
        &self.components
    }
}

impl<G: Group> Clone for SecureElement<G> {
    fn clone(&self) -> Self {
        SecureElement::new(self.components.clone())
    }
}

impl<G: Group> std::fmt::Debug for SecureElement<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecureElement").field(&self.components).finish()
    }
}

/// Base of an exponentiation.
pub enum Base<'a, G: Group> {
    Public(&'a G::Element),
    Secret(&'a SecureElement<G>),
}

/// A group backend bound to a runtime.
pub struct SecureGroup<G, R: ?Sized> {
    group: Arc<G>,
    rt: Arc<R>,
}

impl<G, R: ?Sized> Clone for SecureGroup<G, R> {
    fn clone(&self) -> Self {
        SecureGroup {
            group: self.group.clone(),
            rt: self.rt.clone(),
        }
    }
}

impl<G, R> SecureGroup<G, R>
where
    G: SecureGroupOps,
    R: Runtime + ?Sized,
{
    pub fn new(group: Arc<G>, rt: Arc<R>) -> Self {
        SecureGroup { group, rt }
    }

    pub fn group(&self) -> &Arc<G> {
        &self.group
    }

    pub fn runtime(&self) -> &Arc<R> {
        &self.rt
    }

    /// Runs interactive work, escalating any failure to a protocol abort.
    pub(crate) fn guarded<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        f().map_err(|e| self.rt.abort(e))
    }

    fn validate(&self, element: &G::Element) -> Result<()> {
        if self.group.is_valid(element) {
            Ok(())
        } else {
            Err(Error::GroupValidity(format!("{:?}", element)))
        }
    }

    /// Constant sharing of a public element.
    pub fn lift(&self, element: &G::Element) -> Result<SecureElement<G>> {
        self.validate(element)?;
        let ty = self.group.component_type();
        let components = self.rt.constants(ty, &self.group.to_components(element))?;
        Ok(SecureElement::new(components))
    }

    /// Random sharing of an element known to the caller.
    pub fn share(&self, element: &G::Element) -> Result<SecureElement<G>> {
        self.validate(element)?;
        let ty = self.group.component_type();
        let values = self.group.to_components(element);
        self.guarded(|| {
            let components = values
                .iter()
                .map(|v| self.rt.input(ty, v))
                .collect::<Result<Vec<_>>>()?;
            Ok(SecureElement::new(components))
        })
    }

    pub fn identity(&self) -> Result<SecureElement<G>> {
        self.lift(&self.group.identity())
    }

    pub fn generator(&self) -> Result<SecureElement<G>> {
        self.lift(&self.group.generator())
    }

    /// The group law `a ⊕ b`.
    pub fn combine(&self, a: &SecureElement<G>, b: &SecureElement<G>) -> Result<SecureElement<G>> {
        self.guarded(|| {
            self.group
                .secure_operation(&*self.rt, &a.components, &b.components)
                .map(SecureElement::new)
        })
    }

    pub fn invert(&self, a: &SecureElement<G>) -> Result<SecureElement<G>> {
        self.guarded(|| {
            self.group
                .secure_inverse(&*self.rt, &a.components)
                .map(SecureElement::new)
        })
    }

    /// Secret bit `a == b`.
    pub fn equals(&self, a: &SecureElement<G>, b: &SecureElement<G>) -> Result<SecretValue> {
        self.guarded(|| {
            self.group
                .secure_equals(&*self.rt, &a.components, &b.components)
        })
    }

    /// Oblivious `cond ? a : b`, component by component.
    pub fn if_else(
        &self,
        cond: &SecretValue,
        a: &SecureElement<G>,
        b: &SecureElement<G>,
    ) -> Result<SecureElement<G>> {
        self.guarded(|| {
            let cond = self.to_component_type(cond)?;
            self.rt
                .select_all(&cond, &a.components, &b.components)
                .map(SecureElement::new)
        })
    }

    /// Opens `a` to every party.
    pub fn reveal(&self, a: &SecureElement<G>) -> Result<G::Element> {
        self.guarded(|| {
            let values = self.rt.reveal_all(&a.components)?;
            self.group.from_components(&values)
        })
    }

    fn to_component_type(&self, value: &SecretValue) -> Result<SecretValue> {
        let ty = self.group.component_type();
        if value.secure_type() == ty {
            Ok(value.clone())
        } else {
            self.rt.convert(value, ty)
        }
    }

    fn base(&self, base: Base<'_, G>) -> Result<SecureElement<G>> {
        match base {
            Base::Public(element) => self.lift(element),
            Base::Secret(element) => Ok(element.clone()),
        }
    }

    /// A field exponent is only meaningful modulo the group order, so its
    /// modulus has to be a multiple of that order. Integer exponents are
    /// always accepted.
    pub fn check_exponent(&self, exponent: &SecretValue) -> Result<()> {
        let ty = exponent.secure_type();
        if ty.kind() != Kind::Field {
            return Ok(());
        }
        match self.group.order() {
            Some(order) if !order.is_zero() && (ty.modulus() % order).is_zero() => Ok(()),
            order => Err(Error::IncompatibleExponentField {
                modulus: ty.modulus().clone(),
                order: order
                    .map(|o| o.to_string())
                    .unwrap_or_else(|| "unknown".into()),
            }),
        }
    }

    /// `base` combined with itself `exponent` times, for a secret exponent.
    ///
    /// Exponent zero yields the identity. Negative integer exponents invert the
    /// base obliviously.
    pub fn repeat(&self, base: Base<'_, G>, exponent: &SecretValue) -> Result<SecureElement<G>> {
        self.check_exponent(exponent)?;
        let base = self.base(base)?;
        let identity = self.identity()?;
        let ty = exponent.secure_type().clone();
        debug!(exponent_type = %ty, "secure repeat");

        self.guarded(|| {
            let (base, bits) = match ty.kind() {
                Kind::Field => (base, self.rt.to_bits(exponent, ty.modulus().bits())?),
                Kind::Integer { bit_length } => {
                    let zero = self.rt.constant(&ty, &BigInt::zero())?;
                    let negative = self.rt.lt(exponent, &zero)?;
                    let magnitude = self.rt.select(&negative, &self.rt.neg(exponent), exponent)?;
                    let inverse = self.invert(&base)?;
                    let base = self.if_else(&negative, &inverse, &base)?;
                    (base, self.rt.to_bits(&magnitude, bit_length)?)
                }
            };
            let mut acc = identity;
            for bit in &bits {
                let bit = self.to_component_type(bit)?;
                acc = self.combine(&acc, &acc)?;
                let with_base = self.combine(&acc, &base)?;
                acc = self.if_else(&bit, &with_base, &acc)?;
            }
            debug!(bits = bits.len(), "secure repeat done");
            Ok(acc)
        })
    }

    /// [`repeat`](SecureGroup::repeat) for a public exponent; the bits drive
    /// plain conditionals.
    pub fn repeat_public(
        &self,
        base: Base<'_, G>,
        exponent: &BigInt,
    ) -> Result<SecureElement<G>> {
        let base = self.base(base)?;
        let mut acc = self.identity()?;
        let base = if exponent.sign() == Sign::Minus {
            self.invert(&base)?
        } else {
            base
        };
        let e = Util::magnitude(exponent);
        for i in (0..e.bits()).rev() {
            acc = self.combine(&acc, &acc)?;
            if (&e >> i).is_odd() {
                acc = self.combine(&acc, &base)?;
            }
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::{QuadraticResidues, SymmetricGroup};
    use crate::runtime::{SecureType, Session, SessionConfig};
    use num_bigint::BigUint;

    fn qr_engine(seed: u64) -> SecureGroup<QuadraticResidues, Session> {
        let rt = Session::start(SessionConfig::default().with_seed(seed)).unwrap();
        let group = QuadraticResidues::with_modulus(BigUint::from(1019u32)).unwrap();
        SecureGroup::new(group, rt)
    }

    #[test]
    fn test_repeat_matches_plaintext() {
        let engine = qr_engine(61);
        let group = engine.group().clone();
        let g = group.generator();
        let ty = SecureType::integer(12).unwrap();
        for &e in &[0i64, 1, 2, 5, 509, -3, -1] {
            let x = engine.runtime().input(&ty, &BigInt::from(e)).unwrap();
            let r = engine.repeat(Base::Public(&g), &x).unwrap();
            assert_eq!(
                engine.reveal(&r).unwrap(),
                group.exp(&g, &BigInt::from(e)),
                "exponent {}",
                e
            );
        }
    }

    #[test]
    fn test_field_exponent_of_group_order() {
        let engine = qr_engine(62);
        let group = engine.group().clone();
        let field = SecureType::field(group.order().unwrap().clone()).unwrap();
        let sg = engine.generator().unwrap();
        let x = engine.runtime().input(&field, &BigInt::from(300)).unwrap();
        let r = engine.repeat(Base::Secret(&sg), &x).unwrap();
        assert_eq!(
            engine.reveal(&r).unwrap(),
            group.exp(&group.generator(), &BigInt::from(300))
        );

        let wrong = SecureType::field(BigUint::from(101u32)).unwrap();
        let x = engine.runtime().constant(&wrong, &BigInt::from(3)).unwrap();
        assert!(matches!(
            engine.repeat(Base::Secret(&sg), &x),
            Err(Error::IncompatibleExponentField { .. })
        ));
        assert!(engine.runtime().is_running());
    }

    #[test]
    fn test_overflowing_integer_exponent_is_refused() {
        let engine = qr_engine(66);
        let g = engine.group().generator();
        let rt = engine.runtime();
        let ty = SecureType::integer(8).unwrap();
        let a = rt.input(&ty, &BigInt::from(100)).unwrap();
        let e = rt.add(&rt.add(&a, &a).unwrap(), &a).unwrap();
        assert_eq!(rt.reveal(&e).unwrap(), BigInt::from(300));
        let err = engine.repeat(Base::Public(&g), &e).unwrap_err();
        assert!(err.is_abort());
    }

    #[test]
    fn test_repeat_public_agrees_with_repeat() {
        let rt = Session::start(SessionConfig::default().with_seed(63)).unwrap();
        let group = SymmetricGroup::new(5).unwrap();
        let engine = SecureGroup::new(group.clone(), rt.clone());
        let a = crate::groups::Permutation::new(vec![3, 4, 2, 1, 0]);
        let sa = engine.share(&a).unwrap();
        let ty = SecureType::integer(6).unwrap();
        for &e in &[0i64, 3, -2] {
            let secret = rt.input(&ty, &BigInt::from(e)).unwrap();
            let x = engine.repeat(Base::Secret(&sa), &secret).unwrap();
            let y = engine.repeat_public(Base::Secret(&sa), &BigInt::from(e)).unwrap();
            assert_eq!(engine.reveal(&x).unwrap(), engine.reveal(&y).unwrap());
        }
    }

    #[test]
    fn test_if_else_and_equals() {
        let engine = qr_engine(64);
        let group = engine.group().clone();
        let g = engine.generator().unwrap();
        let g2 = engine.combine(&g, &g).unwrap();
        let rt = engine.runtime();
        let bits = SecureType::integer(4).unwrap();
        let zero = rt.input(&bits, &BigInt::from(0)).unwrap();
        let picked = engine.if_else(&zero, &g, &g2).unwrap();
        assert_eq!(engine.reveal(&picked).unwrap(), BigUint::from(16u32));
        let same = engine.equals(&picked, &g2).unwrap();
        assert_eq!(rt.reveal(&same).unwrap(), BigInt::from(1));
        let inv = engine.invert(&g).unwrap();
        let one = engine.combine(&inv, &g).unwrap();
        assert_eq!(engine.reveal(&one).unwrap(), group.identity());
    }

    #[test]
    fn test_lift_rejects_non_members() {
        let engine = qr_engine(65);
        assert!(matches!(
            engine.lift(&BigUint::from(1018u32)),
            Err(Error::GroupValidity(_))
        ));
        assert!(matches!(
            engine.share(&BigUint::from(0u32)),
            Err(Error::GroupValidity(_))
        ));
        assert_eq!(engine.runtime().stats().rounds, 0);
    }
}
