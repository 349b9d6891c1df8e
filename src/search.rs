// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Oblivious binary search over a sorted sequence of secure integers.
//!
//! The search runs exactly `floor(log2 n) + 1` rounds whatever the data is.
//! After the first comparison the bounds are secret, so the midpoint is a
//! secret index and reading the sequence at it is an oblivious gather over
//! all `n` positions. The whole search therefore costs `O(n log n)` secure
//! equality tests, and its communication pattern depends only on `n`.

use num_bigint::{BigInt, BigUint};
use num_traits::identities::One;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::oblivious::{gather, halve};
use crate::runtime::{Runtime, SecretValue};

/// Number of rounds for a sequence of length `n >= 1`.
pub fn rounds(n: usize) -> usize {
    (usize::BITS - n.leading_zeros()) as usize
}

/// Secret index of `target` in `sequence`, or `-1` if absent.
///
/// `sequence` must be sorted ascending and its length a power of two. With
/// duplicates, any matching index may be returned.
pub fn search<R: Runtime + ?Sized>(
    rt: &R,
    sequence: &[SecretValue],
    target: &SecretValue,
) -> Result<SecretValue> {
    let n = sequence.len();
    if n == 0 || !n.is_power_of_two() {
        return Err(Error::InvalidLength { length: n });
    }
    run(rt, sequence, target)
}

/// [`search`] without the power-of-two requirement.
///
/// `floor(log2 n) + 1` comparisons are the worst case of a binary search for any
/// `n`, so the same fixed schedule is exact for every non-zero length.
pub fn search_any_length<R: Runtime + ?Sized>(
    rt: &R,
    sequence: &[SecretValue],
    target: &SecretValue,
) -> Result<SecretValue> {
    if sequence.is_empty() {
        return Err(Error::InvalidLength { length: 0 });
    }
    run(rt, sequence, target)
}

/// [`search`] for a public target.
pub fn search_public<R: Runtime + ?Sized>(
    rt: &R,
    sequence: &[SecretValue],
    target: &BigInt,
) -> Result<SecretValue> {
    let ty = match sequence.first() {
        Some(v) => v.secure_type().clone(),
        None => return Err(Error::InvalidLength { length: 0 }),
    };
    let target = rt.constant(&ty, target)?;
    search(rt, sequence, &target)
}

enum Bounds {
    Public { low: usize, high: usize },
    Secret { low: SecretValue, high: SecretValue },
}

fn check_types(sequence: &[SecretValue], target: &SecretValue) -> Result<usize> {
    let ty = target.secure_type();
    if !ty.is_integer() {
        return Err(Error::TypeMismatch(format!(
            "search needs secure integers, got {}",
            ty
        )));
    }
    if let Some(other) = sequence.iter().find(|v| v.secure_type() != ty) {
        return Err(Error::TypeMismatch(format!(
            "sequence holds {} but target is {}",
            other.secure_type(),
            ty
        )));
    }
    // low + high ranges over [-1, 2n]
    let width = BigUint::from(sequence.len()).bits() + 2;
    if width > ty.bit_length() {
        return Err(Error::TypeMismatch(format!(
            "indices of a length-{} sequence do not fit {}",
            sequence.len(),
            ty
        )));
    }
    Ok(width)
}

fn run<R: Runtime + ?Sized>(
    rt: &R,
    sequence: &[SecretValue],
    target: &SecretValue,
) -> Result<SecretValue> {
    let width = check_types(sequence, target)?;
    let n = sequence.len();
    let total = rounds(n);
    debug!(n, rounds = total, "oblivious search");

    let body = || -> Result<SecretValue> {
        let ty = target.secure_type();
        let one = BigInt::one();
        let mut bounds = Bounds::Public { low: 0, high: n - 1 };
        let mut step: Option<(SecretValue, SecretValue)> = None;
        for round in 0..total {
            let (mid, elem, low, high) = match bounds {
                Bounds::Public { low, high } => {
                    let mid = (low + high) / 2;
                    (
                        rt.constant(ty, &BigInt::from(mid))?,
                        sequence[mid].clone(),
                        rt.constant(ty, &BigInt::from(low))?,
                        rt.constant(ty, &BigInt::from(high))?,
                    )
                }
                Bounds::Secret { low, high } => {
                    let mid = halve(rt, &rt.add(&low, &high)?, width)?;
                    let elem = gather(rt, sequence, &mid)?;
                    (mid, elem, low, high)
                }
            };
            let above = rt.gt(&elem, target)?;
            let below = rt.lt(&elem, target)?;
            let high = rt.select(&above, &rt.add_constant(&mid, &-&one), &high)?;
            let low = rt.select(&below, &rt.add_constant(&mid, &one), &low)?;
            debug!(round, "search round done");
            bounds = Bounds::Secret { low, high };
            step = Some((mid, elem));
        }
        let (mid, elem) = match step {
            Some(last) => last,
            None => return Err(Error::InvalidLength { length: n }),
        };
        let missing = rt.ne(&elem, target)?;
        let sentinel = rt.constant(ty, &-one)?;
        rt.select(&missing, &sentinel, &mid)
    };
    body().map_err(|e| rt.abort(e))
}
