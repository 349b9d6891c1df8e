// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Data-independent building blocks on top of [`Runtime`] primitives.
//!
//! Nothing here branches on a secret: loop bounds depend only on public
//! lengths and bit widths.

use num_bigint::{BigInt, BigUint};
use num_traits::identities::{One, Zero};

use crate::errors::Result;
use crate::runtime::{Runtime, SecretValue};
use crate::util::Util;

/// Reads `sequence[index]` for a secret `index` by a full linear scan.
///
/// Every position costs one secure equality test and one oblivious select,
/// so a gather over `n` values costs `n` equalities whatever the index is.
/// An index outside `[0, n)` gathers `0`.
pub fn gather<R: Runtime + ?Sized>(
    rt: &R,
    sequence: &[SecretValue],
    index: &SecretValue,
) -> Result<SecretValue> {
    let index_ty = index.secure_type();
    let value_ty = match sequence.first() {
        Some(v) => v.secure_type().clone(),
        None => index_ty.clone(),
    };
    let mut acc = rt.constant(&value_ty, &BigInt::zero())?;
    for (position, item) in sequence.iter().enumerate() {
        let position = rt.constant(index_ty, &BigInt::from(position))?;
        let mut hit = rt.eq(&position, index)?;
        if hit.secure_type() != item.secure_type() {
            hit = rt.convert(&hit, item.secure_type())?;
        }
        acc = rt.select(&hit, item, &acc)?;
    }
    Ok(acc)
}

/// `floor(a / 2)` for a secure integer `a` with `|a| < 2^(len - 1)`.
pub fn halve<R: Runtime + ?Sized>(rt: &R, a: &SecretValue, len: usize) -> Result<SecretValue> {
    let bits = rt.to_bits(a, len)?;
    let even = match bits.last() {
        Some(lsb) => rt.sub(a, lsb)?,
        None => a.clone(),
    };
    // exact division of an even value: multiply by 2^-1
    let p = a.secure_type().modulus();
    let half: BigUint = (p + BigUint::one()) >> 1;
    Ok(rt.scale(&even, &Util::to_bigint(&half)))
}

/// Recombines most-significant-first `bits` into an integer, dropping the
/// `drop_low` least significant bits.
pub fn recombine_bits<R: Runtime + ?Sized>(
    rt: &R,
    bits: &[SecretValue],
    drop_low: usize,
) -> Result<Option<SecretValue>> {
    let kept = bits.len().saturating_sub(drop_low);
    let mut acc: Option<SecretValue> = None;
    for b in &bits[..kept] {
        acc = Some(match acc {
            Some(prev) => rt.add(&rt.scale(&prev, &BigInt::from(2)), b)?,
            None => b.clone(),
        });
    }
    Ok(acc)
}

/// Oblivious floor division of a signed secure integer `n` by a positive
/// secure integer `d`.
///
/// Returns `(q, r)` with `n = q·d + r` and `0 <= r < d`. The quotient's
/// magnitude must stay below `2^quotient_bits`; the schedule runs exactly
/// `quotient_bits` comparison steps.
pub fn divide_floor<R: Runtime + ?Sized>(
    rt: &R,
    n: &SecretValue,
    d: &SecretValue,
    quotient_bits: usize,
) -> Result<(SecretValue, SecretValue)> {
    let ty = n.secure_type();
    let zero = rt.constant(ty, &BigInt::zero())?;
    let negative = rt.lt(n, &zero)?;
    let magnitude = rt.select(&negative, &rt.neg(n), n)?;

    let mut quotient = zero.clone();
    let mut remainder = magnitude;
    for k in (0..quotient_bits).rev() {
        let step = BigInt::one() << k;
        let shifted = rt.scale(d, &step);
        let fits = rt.not(&rt.lt(&remainder, &shifted)?);
        remainder = rt.sub(&remainder, &rt.mul(&fits, &shifted)?)?;
        quotient = rt.add(&quotient, &rt.scale(&fits, &step))?;
    }

    // -m = -(q·d + r) = (-q - 1)·d + (d - r) when r > 0
    let exact = rt.is_zero(&remainder)?;
    let inexact = rt.not(&exact);
    let neg_quotient = rt.sub(&rt.neg(&quotient), &inexact)?;
    let neg_remainder = rt.mul(&inexact, &rt.sub(d, &remainder)?)?;
    let quotient = rt.select(&negative, &neg_quotient, &quotient)?;
    let remainder = rt.select(&negative, &neg_remainder, &remainder)?;
    Ok((quotient, remainder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{SecureType, Session, SessionConfig};

    fn int(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn test_gather_reads_secret_index() {
        let rt = Session::start(SessionConfig::default().with_seed(3)).unwrap();
        let ty = SecureType::integer(16).unwrap();
        let values: Vec<SecretValue> = [10, 20, 30, 40]
            .iter()
            .map(|&v| rt.input(&ty, &int(v)).unwrap())
            .collect();
        for i in 0..4 {
            let index = rt.input(&ty, &int(i)).unwrap();
            let got = gather(&*rt, &values, &index).unwrap();
            assert_eq!(rt.reveal(&got).unwrap(), int(10 * (i + 1)));
        }
        let outside = rt.input(&ty, &int(-1)).unwrap();
        let got = gather(&*rt, &values, &outside).unwrap();
        assert_eq!(rt.reveal(&got).unwrap(), int(0));
        // one equality per position
        assert_eq!(rt.stats().equalities, 5 * 4);
    }

    #[test]
    fn test_halve_floors() {
        let rt = Session::start(SessionConfig::default().with_seed(4)).unwrap();
        let ty = SecureType::integer(16).unwrap();
        for &(v, h) in &[(7, 3), (6, 3), (0, 0), (-1, -1), (-4, -2), (-5, -3)] {
            let a = rt.input(&ty, &int(v)).unwrap();
            assert_eq!(rt.reveal(&halve(&*rt, &a, 16).unwrap()).unwrap(), int(h));
        }
    }

    #[test]
    fn test_divide_floor() {
        let rt = Session::start(SessionConfig::default().with_seed(5)).unwrap();
        let ty = SecureType::integer(24).unwrap();
        for &(n, d) in &[(17, 5), (-17, 5), (15, 5), (-15, 5), (0, 3), (4, 9), (-4, 9)] {
            let sn = rt.input(&ty, &int(n)).unwrap();
            let sd = rt.input(&ty, &int(d)).unwrap();
            let (q, r) = divide_floor(&*rt, &sn, &sd, 8).unwrap();
            let q = rt.reveal(&q).unwrap();
            let r = rt.reveal(&r).unwrap();
            assert_eq!(&q * int(d) + &r, int(n));
            assert!(r >= int(0) && r < int(d), "{} mod {} gave {}", n, d, r);
        }
    }

    #[test]
    fn test_recombine_bits() {
        let rt = Session::start(SessionConfig::default().with_seed(6)).unwrap();
        let ty = SecureType::integer(16).unwrap();
        let a = rt.input(&ty, &int(0b1011_0110)).unwrap();
        let bits = rt.to_bits(&a, 8).unwrap();
        let all = recombine_bits(&*rt, &bits, 0).unwrap().unwrap();
        assert_eq!(rt.reveal(&all).unwrap(), int(0b1011_0110));
        let high = recombine_bits(&*rt, &bits, 4).unwrap().unwrap();
        assert_eq!(rt.reveal(&high).unwrap(), int(0b1011));
        assert!(recombine_bits(&*rt, &bits, 8).unwrap().is_none());
    }
}
