// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Masked embedding of integer messages into group elements.
//!
//! `encode` embeds `m` as `E` and hides it under a random mask `Z`, handing out
//! `(E ⊕ Z, Z)`. `decode` removes the mask inside the secret-sharing domain and
//! extracts `m` without ever opening `E`.

use num_bigint::BigUint;
use num_traits::identities::Zero;
use rand::Rng;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::group::{Group, SecureGroupOps};
use crate::runtime::{Runtime, SecretValue};
use crate::secure_group::{SecureElement, SecureGroup};

/// Embeds `message` and masks it: returns `(E ⊕ Z, Z)` for a random `Z`.
pub fn encode<G, R>(group: &G, rng: &mut R, message: &BigUint) -> Result<(G::Element, G::Element)>
where
    G: Group,
    R: Rng + ?Sized,
{
    let embedded = group.embed(message)?;
    let mask = group.random_element(rng);
    Ok((group.operation(&embedded, &mask), mask))
}

/// Secret message encoded by the pair `(masked, mask)`.
///
/// Only the membership bit of the unmasked element is opened. A pair that is
/// not an encoding fails with [`Error::Embedding`].
pub fn decode<G, R>(
    engine: &SecureGroup<G, R>,
    masked: &SecureElement<G>,
    mask: &SecureElement<G>,
) -> Result<SecretValue>
where
    G: SecureGroupOps,
    R: Runtime + ?Sized,
{
    let rt = engine.runtime();
    let (message, valid) = engine.guarded(|| {
        let unmask = engine.invert(mask)?;
        let embedded = engine.combine(masked, &unmask)?;
        engine
            .group()
            .secure_unembed(&**rt, embedded.components())
    })?;
    let valid = engine.guarded(|| rt.reveal(&valid))?;
    debug!(valid = %valid, "decoded");
    if valid.is_zero() {
        return Err(Error::Embedding("decoded element is not an encoding".into()));
    }
    Ok(message)
}

/// Plaintext inverse of [`encode`].
pub fn decode_plain<G: Group>(group: &G, masked: &G::Element, mask: &G::Element) -> Result<BigUint> {
    let embedded = group.operation(masked, &group.inverse(mask));
    group.unembed(&embedded)
}
