// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Prime-field arithmetic the curve formulas are written against, so one
//! addition law serves plaintext and secret-shared coordinates.

use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_traits::identities::{One, Zero};

use crate::errors::{Error, Result};
use crate::oblivious::recombine_bits;
use crate::runtime::{Runtime, SecretValue, SecureType};
use crate::util::Util;

pub(crate) trait FieldOps {
    type Value: Clone;

    fn add(&self, a: &Self::Value, b: &Self::Value) -> Result<Self::Value>;
    fn sub(&self, a: &Self::Value, b: &Self::Value) -> Result<Self::Value>;
    fn mul(&self, a: &Self::Value, b: &Self::Value) -> Result<Self::Value>;
    fn neg(&self, a: &Self::Value) -> Self::Value;
    fn scale(&self, a: &Self::Value, c: &BigUint) -> Self::Value;
    fn add_constant(&self, a: &Self::Value, c: &BigUint) -> Self::Value;
    fn reciprocal(&self, a: &Self::Value) -> Result<Self::Value>;
}

pub(crate) struct Plain<'a> {
    pub p: &'a BigUint,
}

impl<'a> FieldOps for Plain<'a> {
    type Value = BigUint;

    fn add(&self, a: &BigUint, b: &BigUint) -> Result<BigUint> {
        Ok((a + b) % self.p)
    }

    fn sub(&self, a: &BigUint, b: &BigUint) -> Result<BigUint> {
        Ok((a + self.p - b) % self.p)
    }

    fn mul(&self, a: &BigUint, b: &BigUint) -> Result<BigUint> {
        Ok((a * b) % self.p)
    }

    fn neg(&self, a: &BigUint) -> BigUint {
        (self.p - a) % self.p
    }

    fn scale(&self, a: &BigUint, c: &BigUint) -> BigUint {
        (a * c) % self.p
    }

    fn add_constant(&self, a: &BigUint, c: &BigUint) -> BigUint {
        (a + c) % self.p
    }

    fn reciprocal(&self, a: &BigUint) -> Result<BigUint> {
        Util::mod_inverse_uint(a, self.p)
            .ok_or_else(|| Error::Arithmetic("reciprocal of zero".into()))
    }
}

pub(crate) struct Shared<'a, R: Runtime + ?Sized> {
    pub rt: &'a R,
}

impl<'a, R: Runtime + ?Sized> FieldOps for Shared<'a, R> {
    type Value = SecretValue;

    fn add(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        self.rt.add(a, b)
    }

    fn sub(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        self.rt.sub(a, b)
    }

    fn mul(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        self.rt.mul(a, b)
    }

    fn neg(&self, a: &SecretValue) -> SecretValue {
        self.rt.neg(a)
    }

    fn scale(&self, a: &SecretValue, c: &BigUint) -> SecretValue {
        self.rt.scale(a, &Util::to_bigint(c))
    }

    fn add_constant(&self, a: &SecretValue, c: &BigUint) -> SecretValue {
        self.rt.add_constant(a, &Util::to_bigint(c))
    }

    fn reciprocal(&self, a: &SecretValue) -> Result<SecretValue> {
        self.rt.reciprocal(a)
    }
}

/// Point equality across affine (`len == 2`) and projective style
/// representations, where `(X : Y : Z)` and `(λX : λY : λZ)` coincide.
pub(crate) fn same_point(a: &[BigUint], b: &[BigUint], p: &BigUint) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a.len() == 2 {
        return a == b;
    }
    (&a[0] * &b[2]) % p == (&b[0] * &a[2]) % p && (&a[1] * &b[2]) % p == (&b[1] * &a[2]) % p
}

/// Secret version of [`same_point`].
pub(crate) fn secure_same_point<R: Runtime + ?Sized>(
    rt: &R,
    a: &[SecretValue],
    b: &[SecretValue],
) -> Result<SecretValue> {
    if a.len() == 2 {
        let x = rt.eq(&a[0], &b[0])?;
        let y = rt.eq(&a[1], &b[1])?;
        return rt.and(&x, &y);
    }
    let x = rt.eq(&rt.mul(&a[0], &b[2])?, &rt.mul(&b[0], &a[2])?)?;
    let y = rt.eq(&rt.mul(&a[1], &b[2])?, &rt.mul(&b[1], &a[2])?)?;
    rt.and(&x, &y)
}

/// Reads a message from the bits of `coordinate` above `shift`, and a
/// validity bit that is 1 iff `parity` is even.
pub(crate) fn secure_unembed_coordinates<R: Runtime + ?Sized>(
    rt: &R,
    ty: &Arc<SecureType>,
    coordinate: &SecretValue,
    parity: &SecretValue,
    shift: usize,
) -> Result<(SecretValue, SecretValue)> {
    let width = ty.modulus().bits();
    let parity_bits = rt.to_bits(parity, width)?;
    let even = match parity_bits.last() {
        Some(lsb) => rt.not(lsb),
        None => rt.constant(ty, &BigInt::one())?,
    };
    let bits = rt.to_bits(coordinate, width)?;
    let message = match recombine_bits(rt, &bits, shift)? {
        Some(m) => m,
        None => rt.constant(ty, &BigInt::zero())?,
    };
    Ok((message, even))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_arithmetic() {
        let p = BigUint::from(13u32);
        let f = Plain { p: &p };
        let a = BigUint::from(9u32);
        let b = BigUint::from(7u32);
        assert_eq!(f.add(&a, &b).unwrap(), BigUint::from(3u32));
        assert_eq!(f.sub(&b, &a).unwrap(), BigUint::from(11u32));
        assert_eq!(f.neg(&BigUint::zero()), BigUint::zero());
        let inv = f.reciprocal(&a).unwrap();
        assert_eq!(f.mul(&a, &inv).unwrap(), BigUint::one());
        assert!(f.reciprocal(&BigUint::zero()).is_err());
    }

    #[test]
    fn test_same_point_ignores_scaling() {
        let p = BigUint::from(13u32);
        let a: Vec<BigUint> = [2u32, 5, 1].iter().map(|&v| BigUint::from(v)).collect();
        let b: Vec<BigUint> = [6u32, 2, 3].iter().map(|&v| BigUint::from(v)).collect();
        assert!(same_point(&a, &b, &p));
        let c: Vec<BigUint> = [6u32, 3, 3].iter().map(|&v| BigUint::from(v)).collect();
        assert!(!same_point(&a, &c, &p));
        assert!(!same_point(&a[..2], &a, &p));
    }
}
