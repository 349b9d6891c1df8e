// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Secret-sharing runtime abstraction.
//!
//! The oblivious algorithms in this crate consume the runtime only through the
//! [`Runtime`] trait: linear operations, multiplication, secure comparison and
//! equality, oblivious selection, bit decomposition, type conversion and
//! reveal. [`Session`] is an in-process implementation running all parties of
//! a Shamir sharing inside one process.

pub mod session;

pub use session::{Session, SessionConfig, Stats};

use std::fmt;
use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_traits::identities::{One, Zero};

use crate::errors::{Error, Result};
use crate::util::Util;

/// Statistical security margin (in bits) between the largest secure integer
/// and the modulus it is embedded in.
pub const SECURITY_MARGIN: usize = 30;

/// How plaintext values of a secure type are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Elements of GF(p), canonical representatives in `[0, p)`.
    Field,
    /// Signed integers in `[-2^(l-1), 2^(l-1))`.
    Integer { bit_length: usize },
}

/// Domain a [`SecretValue`] lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureType {
    modulus: BigUint,
    kind: Kind,
}

impl SecureType {
    /// Secure field elements modulo the prime `modulus`.
    pub fn field(modulus: BigUint) -> Result<Arc<Self>> {
        if !Util::is_prime(&modulus) {
            return Err(Error::InvalidConfig(format!(
                "field modulus {} is not prime",
                modulus
            )));
        }
        Ok(Arc::new(SecureType {
            modulus,
            kind: Kind::Field,
        }))
    }

    /// Secure signed integers of `bit_length` bits, embedded in the smallest
    /// prime field above `2^(bit_length + SECURITY_MARGIN + 1)`.
    pub fn integer(bit_length: usize) -> Result<Arc<Self>> {
        if bit_length < 2 {
            return Err(Error::InvalidConfig(format!(
                "secure integers need at least 2 bits, got {}",
                bit_length
            )));
        }
        let mut candidate: BigUint =
            (BigUint::one() << (bit_length + SECURITY_MARGIN + 1)) + BigUint::one();
        while !Util::is_prime(&candidate) {
            candidate += 2u32;
        }
        Ok(Arc::new(SecureType {
            modulus: candidate,
            kind: Kind::Integer { bit_length },
        }))
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, Kind::Integer { .. })
    }

    /// Bit length of the plaintext domain.
    pub fn bit_length(&self) -> usize {
        match self.kind {
            Kind::Field => self.modulus.bits(),
            Kind::Integer { bit_length } => bit_length,
        }
    }

    /// Maps a plaintext value to its residue. Integers outside the signed
    /// range are rejected rather than wrapped.
    pub fn encode(&self, value: &BigInt) -> Result<BigUint> {
        if let Kind::Integer { bit_length } = self.kind {
            let bound = Util::to_bigint(&(BigUint::one() << (bit_length - 1)));
            if value >= &bound || value < &-bound {
                return Err(Error::Arithmetic(format!(
                    "{} does not fit a {}-bit secure integer",
                    value, bit_length
                )));
            }
        }
        Ok(Util::to_residue(value, &self.modulus))
    }

    /// Maps a residue back to its plaintext value.
    pub fn decode(&self, residue: &BigUint) -> BigInt {
        match self.kind {
            Kind::Field => Util::to_bigint(residue),
            Kind::Integer { .. } => Util::to_signed(residue, &self.modulus),
        }
    }
}

impl fmt::Display for SecureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Field => write!(f, "GF({})", self.modulus),
            Kind::Integer { bit_length } => write!(f, "Int{}", bit_length),
        }
    }
}

/// An opaque secret-shared scalar.
///
/// Holds one share per party simulated by the runtime that produced it. The
/// plaintext is only available through [`Runtime::reveal`].
#[derive(Clone)]
pub struct SecretValue {
    ty: Arc<SecureType>,
    shares: Vec<BigUint>,
}

impl SecretValue {
    pub(crate) fn from_shares(ty: Arc<SecureType>, shares: Vec<BigUint>) -> Self {
        SecretValue { ty, shares }
    }

    pub(crate) fn shares(&self) -> &[BigUint] {
        &self.shares
    }

    pub fn secure_type(&self) -> &Arc<SecureType> {
        &self.ty
    }
}

// shares stay out of logs
impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue<{}>", self.ty)
    }
}

/// Returns the common type of `a` and `b`.
pub fn same_type<'a>(a: &'a SecretValue, b: &SecretValue) -> Result<&'a Arc<SecureType>> {
    if a.ty == b.ty {
        Ok(&a.ty)
    } else {
        Err(Error::TypeMismatch(format!("{} vs {}", a.ty, b.ty)))
    }
}

/// Narrow primitive interface of a secret-sharing runtime.
///
/// Linear operations are local. Every other primitive is an interactive round
/// trip among all parties and blocks until it completes.
pub trait Runtime: Send + Sync {
    /// Number of parties holding shares.
    fn parties(&self) -> usize;

    /// Random sharing of a plaintext input.
    fn input(&self, ty: &Arc<SecureType>, value: &BigInt) -> Result<SecretValue>;

    /// Trivial sharing of a public constant.
    fn constant(&self, ty: &Arc<SecureType>, value: &BigInt) -> Result<SecretValue>;

    fn add(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue>;

    fn sub(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue>;

    fn neg(&self, a: &SecretValue) -> SecretValue;

    /// Multiplication by a public constant.
    fn scale(&self, a: &SecretValue, c: &BigInt) -> SecretValue;

    fn add_constant(&self, a: &SecretValue, c: &BigInt) -> SecretValue;

    fn mul(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue>;

    /// Multiplicative inverse in the value's field. Fails on zero.
    fn reciprocal(&self, a: &SecretValue) -> Result<SecretValue>;

    /// Secret bit `a < b`.
    fn lt(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue>;

    /// Secret bit `a == b`.
    fn eq(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue>;

    /// The `len` low bits of `a`, most significant first. Secure integers are
    /// decomposed in two's complement.
    fn to_bits(&self, a: &SecretValue, len: usize) -> Result<Vec<SecretValue>>;

    /// Re-shares the plaintext value of `a` under another secure type.
    fn convert(&self, a: &SecretValue, ty: &Arc<SecureType>) -> Result<SecretValue>;

    /// Reconstructs the plaintext among all parties.
    fn reveal(&self, a: &SecretValue) -> Result<BigInt>;

    /// Escalates `cause` to a protocol abort. The runtime refuses further
    /// interactive work afterwards.
    fn abort(&self, cause: Error) -> Error;

    fn gt(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        self.lt(b, a)
    }

    fn ne(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        let e = self.eq(a, b)?;
        Ok(self.not(&e))
    }

    /// `1 - a` for a secret bit.
    fn not(&self, a: &SecretValue) -> SecretValue {
        self.add_constant(&self.neg(a), &BigInt::one())
    }

    fn and(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        self.mul(a, b)
    }

    fn or(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        let ab = self.mul(a, b)?;
        self.sub(&self.add(a, b)?, &ab)
    }

    fn is_zero(&self, a: &SecretValue) -> Result<SecretValue> {
        let zero = self.constant(a.secure_type(), &BigInt::zero())?;
        self.eq(a, &zero)
    }

    /// Oblivious `cond ? a : b` for a secret bit `cond`.
    fn select(&self, cond: &SecretValue, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        let diff = self.sub(a, b)?;
        let picked = self.mul(cond, &diff)?;
        self.add(b, &picked)
    }

    /// Element-wise oblivious select over composite values.
    fn select_all(
        &self,
        cond: &SecretValue,
        a: &[SecretValue],
        b: &[SecretValue],
    ) -> Result<Vec<SecretValue>> {
        if a.len() != b.len() {
            return Err(Error::TypeMismatch(format!(
                "cannot select between {} and {} components",
                a.len(),
                b.len()
            )));
        }
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| self.select(cond, x, y))
            .collect()
    }

    /// Shares of the public values `values`.
    fn constants(&self, ty: &Arc<SecureType>, values: &[BigInt]) -> Result<Vec<SecretValue>> {
        values.iter().map(|v| self.constant(ty, v)).collect()
    }

    fn reveal_all(&self, values: &[SecretValue]) -> Result<Vec<BigInt>> {
        values.iter().map(|v| self.reveal(v)).collect()
    }
}
