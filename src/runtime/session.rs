// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! In-process secret-sharing session.
//!
//! All parties of a degree-`t` Shamir sharing are simulated inside one
//! process. Linear operations are local to every share, multiplication uses
//! the degree-reduction protocol (every party re-shares its local product and
//! the sub-shares are recombined with Lagrange coefficients), and the
//! reciprocal uses a masked opening. Secure comparison, equality, bit
//! decomposition and type conversion are delegated to an in-process helper
//! which reconstructs internally and deals a fresh sharing of the result,
//! playing the role a trusted dealer plays in preprocessing-based protocols.
//!
//! The session keeps operation counters and a digest of the public
//! communication pattern, so callers can check that an algorithm's shape does
//! not depend on secret data.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::identities::{One, Zero};
use rand::rngs::StdRng;
use rand::{FromEntropy, SeedableRng};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::{debug, info, trace, warn};

use crate::errors::{Error, Result};
use crate::polynomial::Polynomial;
use crate::runtime::{same_type, Kind, Runtime, SecretValue, SecureType};
use crate::util::Util;

/// Parameters of a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Number of simulated parties `n`.
    pub parties: usize,
    /// Degree `t` of the sharing polynomials; `t + 1` parties reconstruct.
    pub threshold: usize,
    /// Seed for the session randomness, entropy if `None`.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            parties: 3,
            threshold: 1,
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn new(parties: usize, threshold: usize) -> Self {
        SessionConfig {
            parties,
            threshold,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Multiplication by degree reduction needs `n >= 2t + 1`.
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(Error::InvalidConfig("threshold must be at least 1".into()));
        }
        if self.parties < 2 * self.threshold + 1 {
            return Err(Error::InvalidConfig(format!(
                "{} parties cannot support threshold {}: need at least {}",
                self.parties,
                self.threshold,
                2 * self.threshold + 1
            )));
        }
        Ok(())
    }
}

/// Counters of the interactive primitives executed by a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub inputs: u64,
    pub multiplications: u64,
    pub reciprocals: u64,
    pub comparisons: u64,
    pub equalities: u64,
    pub bit_decompositions: u64,
    pub conversions: u64,
    pub reveals: u64,
    /// Total number of interactive round trips.
    pub rounds: u64,
}

#[derive(Default)]
struct Counters {
    inputs: AtomicU64,
    multiplications: AtomicU64,
    reciprocals: AtomicU64,
    comparisons: AtomicU64,
    equalities: AtomicU64,
    bit_decompositions: AtomicU64,
    conversions: AtomicU64,
    reveals: AtomicU64,
    rounds: AtomicU64,
}

const RUNNING: u8 = 0;
const CLOSED: u8 = 1;
const ABORTED: u8 = 2;

/// An explicit secret-sharing context with a start/shutdown lifecycle.
pub struct Session {
    config: SessionConfig,
    points: Vec<u64>,
    rng: Mutex<StdRng>,
    state: AtomicU8,
    counters: Counters,
    transcript: Mutex<Sha256>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Session {
    /// Validates `config` and starts a running session.
    pub fn start(config: SessionConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => {
                let mut bytes = [0u8; 32];
                bytes[..8].copy_from_slice(&seed.to_le_bytes());
                StdRng::from_seed(bytes)
            }
            None => StdRng::from_entropy(),
        };
        info!(
            parties = config.parties,
            threshold = config.threshold,
            "session started"
        );
        Ok(Arc::new(Session {
            points: (1..=config.parties as u64).collect(),
            config,
            rng: Mutex::new(rng),
            state: AtomicU8::new(RUNNING),
            counters: Counters::default(),
            transcript: Mutex::new(Sha256::new()),
        }))
    }

    /// Closes the session; further interactive calls fail.
    pub fn shutdown(&self) {
        if self.state.swap(CLOSED, Ordering::SeqCst) == RUNNING {
            let stats = self.stats();
            info!(rounds = stats.rounds, reveals = stats.reveals, "session shut down");
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == RUNNING
    }

    pub fn is_aborted(&self) -> bool {
        self.state.load(Ordering::SeqCst) == ABORTED
    }

    pub fn stats(&self) -> Stats {
        let c = &self.counters;
        Stats {
            inputs: c.inputs.load(Ordering::SeqCst),
            multiplications: c.multiplications.load(Ordering::SeqCst),
            reciprocals: c.reciprocals.load(Ordering::SeqCst),
            comparisons: c.comparisons.load(Ordering::SeqCst),
            equalities: c.equalities.load(Ordering::SeqCst),
            bit_decompositions: c.bit_decompositions.load(Ordering::SeqCst),
            conversions: c.conversions.load(Ordering::SeqCst),
            reveals: c.reveals.load(Ordering::SeqCst),
            rounds: c.rounds.load(Ordering::SeqCst),
        }
    }

    /// Sha256 over the sequence of public operation tags seen so far.
    pub fn transcript_digest(&self) -> Vec<u8> {
        lock(&self.transcript).clone().finalize().to_vec()
    }

    fn record(&self, counter: &AtomicU64, tag: &str, ty: &SecureType) -> Result<()> {
        match self.state.load(Ordering::SeqCst) {
            RUNNING => {}
            CLOSED => return Err(Error::SessionClosed),
            _ => {
                return Err(Error::ProtocolAbort(Box::new(Error::Arithmetic(
                    "session was aborted".into(),
                ))))
            }
        }
        counter.fetch_add(1, Ordering::SeqCst);
        self.counters.rounds.fetch_add(1, Ordering::SeqCst);
        let mut transcript = lock(&self.transcript);
        transcript.update(tag.as_bytes());
        transcript.update(ty.modulus().to_bytes_be());
        trace!(op = tag, "round");
        Ok(())
    }

    /// Fresh degree-t sharing of `residue`.
    fn deal(&self, ty: &SecureType, residue: &BigUint) -> Vec<BigUint> {
        let p = ty.modulus();
        let polynomial = {
            let mut rng = lock(&self.rng);
            Polynomial::random(&mut *rng, residue, self.config.threshold, p)
        };
        self.points
            .par_iter()
            .map(|&x| polynomial.get_value(&BigUint::from(x), p))
            .collect()
    }

    /// Reconstructs a residue from all shares, checking that every share lies
    /// on the degree-t polynomial fixed by the first t + 1.
    fn open(&self, ty: &SecureType, shares: &[BigUint]) -> Result<BigUint> {
        let p = ty.modulus();
        if shares.len() != self.points.len() {
            return Err(Error::Arithmetic(format!(
                "expected {} shares, got {}",
                self.points.len(),
                shares.len()
            )));
        }
        let k = self.config.threshold + 1;
        let (base, rest) = self.points.split_at(k);
        let interpolate = |at: u64| -> BigUint {
            Polynomial::lagrange_coefficients_at(base, at, p)
                .iter()
                .zip(shares.iter())
                .fold(BigUint::zero(), |acc, (l, s)| (acc + l * s) % p)
        };
        for (j, &x) in rest.iter().enumerate() {
            if interpolate(x) != shares[k + j] {
                return Err(Error::Arithmetic(format!(
                    "share of party {} is inconsistent",
                    x
                )));
            }
        }
        Ok(interpolate(0))
    }

    fn helper_value(&self, a: &SecretValue) -> Result<BigInt> {
        let ty = a.secure_type();
        Ok(ty.decode(&self.open(ty, a.shares())?))
    }

    fn helper_deal(&self, ty: &Arc<SecureType>, value: &BigInt) -> Result<SecretValue> {
        let residue = ty.encode(value)?;
        Ok(SecretValue::from_shares(ty.clone(), self.deal(ty, &residue)))
    }

    fn bit(&self, ty: &Arc<SecureType>, b: bool) -> Result<SecretValue> {
        self.helper_deal(ty, &if b { BigInt::one() } else { BigInt::zero() })
    }

    fn map_shares<F>(&self, a: &SecretValue, f: F) -> SecretValue
    where
        F: Fn(&BigUint) -> BigUint,
    {
        SecretValue::from_shares(a.secure_type().clone(), a.shares().iter().map(f).collect())
    }

    fn zip_shares<F>(&self, a: &SecretValue, b: &SecretValue, f: F) -> Result<SecretValue>
    where
        F: Fn(&BigUint, &BigUint) -> BigUint,
    {
        let ty = same_type(a, b)?;
        Ok(SecretValue::from_shares(
            ty.clone(),
            a.shares()
                .iter()
                .zip(b.shares().iter())
                .map(|(x, y)| f(x, y))
                .collect(),
        ))
    }
}

impl Runtime for Session {
    fn parties(&self) -> usize {
        self.config.parties
    }

    fn input(&self, ty: &Arc<SecureType>, value: &BigInt) -> Result<SecretValue> {
        let residue = ty.encode(value)?;
        self.record(&self.counters.inputs, "input", ty)?;
        Ok(SecretValue::from_shares(ty.clone(), self.deal(ty, &residue)))
    }

    fn constant(&self, ty: &Arc<SecureType>, value: &BigInt) -> Result<SecretValue> {
        let residue = ty.encode(value)?;
        Ok(SecretValue::from_shares(
            ty.clone(),
            vec![residue; self.points.len()],
        ))
    }

    fn add(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        let p = a.secure_type().modulus().clone();
        self.zip_shares(a, b, |x, y| (x + y) % &p)
    }

    fn sub(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        let p = a.secure_type().modulus().clone();
        self.zip_shares(a, b, |x, y| (x + &p - y) % &p)
    }

    fn neg(&self, a: &SecretValue) -> SecretValue {
        let p = a.secure_type().modulus();
        self.map_shares(a, |x| (p - x) % p)
    }

    fn scale(&self, a: &SecretValue, c: &BigInt) -> SecretValue {
        let p = a.secure_type().modulus();
        let c = Util::to_residue(c, p);
        self.map_shares(a, |x| (x * &c) % p)
    }

    fn add_constant(&self, a: &SecretValue, c: &BigInt) -> SecretValue {
        let p = a.secure_type().modulus();
        let c = Util::to_residue(c, p);
        self.map_shares(a, |x| (x + &c) % p)
    }

    fn mul(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        let ty = same_type(a, b)?.clone();
        self.record(&self.counters.multiplications, "mul", &ty)?;
        let p = ty.modulus();
        // local products lie on a degree-2t polynomial
        let products: Vec<BigUint> = a
            .shares()
            .par_iter()
            .zip(b.shares().par_iter())
            .map(|(x, y)| (x * y) % p)
            .collect();
        let resharings: Vec<Vec<BigUint>> =
            products.iter().map(|h| self.deal(&ty, h)).collect();
        let lambdas = Polynomial::lagrange_coefficients(&self.points, p);
        let shares = (0..self.points.len())
            .into_par_iter()
            .map(|j| {
                resharings
                    .iter()
                    .zip(lambdas.iter())
                    .fold(BigUint::zero(), |acc, (sub, l)| (acc + l * &sub[j]) % p)
            })
            .collect();
        Ok(SecretValue::from_shares(ty, shares))
    }

    fn reciprocal(&self, a: &SecretValue) -> Result<SecretValue> {
        let ty = a.secure_type().clone();
        self.record(&self.counters.reciprocals, "reciprocal", &ty)?;
        let p = ty.modulus();
        let r = lock(&self.rng).gen_biguint_range(&BigUint::one(), p);
        let mask = SecretValue::from_shares(ty.clone(), self.deal(&ty, &r));
        let masked = self.mul(a, &mask)?;
        let opened = self.open(&ty, masked.shares())?;
        if opened.is_zero() {
            return Err(Error::Arithmetic("reciprocal of zero".into()));
        }
        let inverse = Util::mod_inverse_uint(&opened, p)
            .ok_or_else(|| Error::Arithmetic("modulus is not prime".into()))?;
        Ok(self.scale(&mask, &Util::to_bigint(&inverse)))
    }

    fn lt(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        let ty = same_type(a, b)?.clone();
        self.record(&self.counters.comparisons, "lt", &ty)?;
        let less = self.helper_value(a)? < self.helper_value(b)?;
        self.bit(&ty, less)
    }

    fn eq(&self, a: &SecretValue, b: &SecretValue) -> Result<SecretValue> {
        let ty = same_type(a, b)?.clone();
        self.record(&self.counters.equalities, "eq", &ty)?;
        let equal = self.helper_value(a)? == self.helper_value(b)?;
        self.bit(&ty, equal)
    }

    fn to_bits(&self, a: &SecretValue, len: usize) -> Result<Vec<SecretValue>> {
        let ty = a.secure_type().clone();
        self.record(
            &self.counters.bit_decompositions,
            &format!("bits:{}", len),
            &ty,
        )?;
        let value = self.helper_value(a)?;
        let modulus = BigInt::one() << len;
        let unsigned = match ty.kind() {
            Kind::Integer { .. } if value < modulus && value >= -&modulus => {
                value.mod_floor(&modulus)
            }
            Kind::Integer { .. } => {
                return Err(Error::Arithmetic(format!(
                    "secure integer does not fit {} bits",
                    len
                )))
            }
            Kind::Field if value < modulus => value,
            Kind::Field => {
                return Err(Error::Arithmetic(format!(
                    "field element does not fit {} bits",
                    len
                )))
            }
        };
        let bits = Util::magnitude(&unsigned);
        (0..len)
            .rev()
            .map(|i| self.bit(&ty, !((&bits >> i) & BigUint::one()).is_zero()))
            .collect()
    }

    fn convert(&self, a: &SecretValue, ty: &Arc<SecureType>) -> Result<SecretValue> {
        self.record(&self.counters.conversions, "convert", ty)?;
        let value = self.helper_value(a)?;
        let value = match ty.kind() {
            Kind::Field => value.mod_floor(&Util::to_bigint(ty.modulus())),
            Kind::Integer { .. } => value,
        };
        self.helper_deal(ty, &value)
    }

    fn reveal(&self, a: &SecretValue) -> Result<BigInt> {
        let ty = a.secure_type();
        self.record(&self.counters.reveals, "reveal", ty)?;
        let value = ty.decode(&self.open(ty, a.shares())?);
        debug!(ty = %ty, "value revealed");
        Ok(value)
    }

    fn abort(&self, cause: Error) -> Error {
        if cause.is_abort() {
            return cause;
        }
        // a closed session stays closed
        let _ = self
            .state
            .compare_exchange(RUNNING, ABORTED, Ordering::SeqCst, Ordering::SeqCst);
        warn!(error = %cause, "protocol aborted");
        Error::ProtocolAbort(Box::new(cause))
    }
}
