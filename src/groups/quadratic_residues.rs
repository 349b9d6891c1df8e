// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Group of quadratic residues modulo a safe prime.
//!
//! For a safe prime `p = 2q + 1` the squares in `Z_p^*` form a cyclic group
//! of prime order `q`. Secret elements are single GF(p) values.

use std::sync::Arc;

use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_integer::Integer;
use num_primes::Generator;
use num_traits::identities::{One, Zero};
use rand::Rng;

use crate::errors::{Error, Result};
use crate::group::{Group, SecureGroupOps};
use crate::runtime::{Runtime, SecretValue, SecureType};
use crate::util::Util;

/// Quadratic residues modulo a safe prime
///
/// # Group Parameters
/// - `p`: safe prime modulus
/// - `q`: Sophie Germain prime `(p - 1) / 2`, the group order
/// - `g`: generator `4 = 2^2`
#[derive(Debug, Clone)]
pub struct QuadraticResidues {
    p: BigUint,
    q: BigUint,
    g: BigUint,
    component: Arc<SecureType>,
}

impl QuadraticResidues {
    /// Quadratic residues modulo the RFC 3526 2048-bit MODP prime (group 14).
    pub fn new() -> Result<Arc<Self>> {
        // 2^2048 - 2^1984 - 1 + 2^64 * { [2^1918 pi] + 124476 }
        let p = BigUint::parse_bytes(
            b"ffffffffffffffffc90fdaa22168c234c4c6628b80dc1cd129024e088a67cc74\
              020bbea63b139b22514a08798e3404ddef9519b3cd3a431b302b0a6df25f14374fe1\
              356d6d51c245e485b576625e7ec6f44c42e9a637ed6b0bff5cb6f406b7edee386bfb\
              5a899fa5ae9f24117c4b1fe649286651ece45b3dc2007cb8a163bf0598da48361c55d\
              39a69163fa8fd24cf5f83655d23dca3ad961c62f356208552bb9ed529077096966d67\
              0c354e4abc9804f1746c08ca18217c32905e462e36ce3be39e772c180e86039b2783a\
              2ec07a28fb5c55df06f4c52c9de2bcbf6955817183995497cea956ae515d2261898fa0\
              51015728e5a8aacaa68ffffffffffffffff",
            16,
        )
        .ok_or_else(|| Error::InvalidConfig("malformed MODP prime".into()))?;
        QuadraticResidues::with_modulus(p)
    }

    /// Quadratic residues modulo a freshly generated safe prime of `length` bits.
    pub fn init(length: u32) -> Result<Arc<Self>> {
        let p: BigUint = Generator::safe_prime(length as usize);
        QuadraticResidues::with_modulus(p)
    }

    /// Quadratic residues modulo the given safe prime.
    pub fn with_modulus(p: BigUint) -> Result<Arc<Self>> {
        let q: BigUint = (&p - BigUint::one()) >> 1;
        if p < BigUint::from(7u32) || !Util::is_prime(&q) {
            return Err(Error::InvalidConfig(format!("{} is not a safe prime", p)));
        }
        let component = SecureType::field(p.clone())?;
        Ok(Arc::new(QuadraticResidues {
            p,
            q,
            g: BigUint::from(4u32),
            component,
        }))
    }

    pub fn modulus(&self) -> &BigUint {
        &self.p
    }
}

impl Group for QuadraticResidues {
    type Element = BigUint;

    fn order(&self) -> Option<&BigUint> {
        Some(&self.q)
    }

    fn generator(&self) -> BigUint {
        self.g.clone()
    }

    fn identity(&self) -> BigUint {
        BigUint::one()
    }

    fn operation(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.p
    }

    fn inverse(&self, a: &BigUint) -> BigUint {
        Util::mod_inverse_uint(a, &self.p).unwrap_or_else(BigUint::zero)
    }

    fn is_valid(&self, a: &BigUint) -> bool {
        !a.is_zero() && a < &self.p && a.modpow(&self.q, &self.p).is_one()
    }

    fn exp(&self, base: &BigUint, exponent: &BigInt) -> BigUint {
        let e = exponent.mod_floor(&Util::to_bigint(&self.q));
        base.modpow(&Util::magnitude(&e), &self.p)
    }

    fn random_element<R: Rng + ?Sized>(&self, rng: &mut R) -> BigUint {
        let r = rng.gen_biguint_range(&BigUint::one(), &self.p);
        (&r * &r) % &self.p
    }

    /// `x = m + 1` if it is a square, otherwise `p - x` (exactly one of the two
    /// is, since `-1` is a non-residue modulo a safe prime).
    fn embed(&self, message: &BigUint) -> Result<BigUint> {
        if message >= &self.q {
            return Err(Error::Embedding(format!(
                "{} is outside [0, {})",
                message, self.q
            )));
        }
        let x = message + BigUint::one();
        if Util::is_quadratic_residue(&x, &self.p) {
            Ok(x)
        } else {
            Ok(&self.p - x)
        }
    }

    fn unembed(&self, element: &BigUint) -> Result<BigUint> {
        if !self.is_valid(element) {
            return Err(Error::Embedding(format!("{} is not a residue", element)));
        }
        let x = if element > &self.q {
            &self.p - element
        } else {
            element.clone()
        };
        Ok(x - BigUint::one())
    }
}

impl SecureGroupOps for QuadraticResidues {
    fn component_type(&self) -> &Arc<SecureType> {
        &self.component
    }

    fn arity(&self) -> usize {
        1
    }

    fn to_components(&self, a: &BigUint) -> Vec<BigInt> {
        vec![Util::to_bigint(a)]
    }

    fn from_components(&self, components: &[BigInt]) -> Result<BigUint> {
        match components {
            [x] if x.sign() != Sign::Minus && self.is_valid(&Util::magnitude(x)) => {
                Ok(Util::magnitude(x))
            }
            _ => Err(Error::GroupValidity(format!(
                "{:?} is not a quadratic residue modulo p",
                components
            ))),
        }
    }

    fn secure_operation<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
        b: &[SecretValue],
    ) -> Result<Vec<SecretValue>> {
        Ok(vec![rt.mul(&a[0], &b[0])?])
    }

    fn secure_inverse<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
    ) -> Result<Vec<SecretValue>> {
        Ok(vec![rt.reciprocal(&a[0])?])
    }

    fn secure_unembed<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
    ) -> Result<(SecretValue, SecretValue)> {
        let y = &a[0];
        let q = rt.constant(&self.component, &Util::to_bigint(&self.q))?;
        let upper = rt.lt(&q, y)?;
        let flipped = rt.add_constant(&rt.neg(y), &Util::to_bigint(&self.p));
        let x = rt.select(&upper, &flipped, y)?;
        let message = rt.add_constant(&x, &-BigInt::one());
        let valid = rt.not(&rt.is_zero(y)?);
        Ok((message, valid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{Session, SessionConfig};
    use num_primes::Verification;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rfc3526_group() {
        let group = QuadraticResidues::new().unwrap();
        assert!(Verification::is_safe_prime(group.modulus()));
        assert_eq!(group.modulus().bits(), 2048);
        let g = group.generator();
        assert!(group.is_valid(&g));
        assert_eq!(g.modpow(group.order().unwrap(), group.modulus()), BigUint::one());
    }

    #[test]
    fn test_init_generates_safe_prime() {
        let group = QuadraticResidues::init(64).unwrap();
        assert!(Verification::is_prime(group.modulus()));
        let q = group.order().unwrap();
        assert!(Verification::is_prime(q));
        assert_eq!(&((group.modulus() - BigUint::one()) >> 1), q);
        assert!(QuadraticResidues::with_modulus(BigUint::from(13u32)).is_err());
    }

    #[test]
    fn test_group_law() {
        let group = QuadraticResidues::with_modulus(BigUint::from(1019u32)).unwrap();
        let g = group.generator();
        let g2 = group.operation(&g, &g);
        assert_eq!(g2, BigUint::from(16u32));
        assert_eq!(group.operation(&group.identity(), &g), g);
        assert_eq!(group.operation(&g, &group.inverse(&g)), BigUint::one());
        assert_eq!(group.exp(&g, &BigInt::from(-1)), group.inverse(&g));
        assert!(!group.is_valid(&BigUint::from(1018u32)));
        assert!(!group.is_valid(&BigUint::zero()));
    }

    #[test]
    fn test_embedding() {
        let group = QuadraticResidues::with_modulus(BigUint::from(1019u32)).unwrap();
        for m in 0u32..509 {
            let e = group.embed(&BigUint::from(m)).unwrap();
            assert!(group.is_valid(&e));
            assert_eq!(group.unembed(&e).unwrap(), BigUint::from(m));
        }
        assert!(matches!(
            group.embed(&BigUint::from(509u32)),
            Err(Error::Embedding(_))
        ));
        let mut rng = StdRng::from_seed([1u8; 32]);
        assert!(group.is_valid(&group.random_element(&mut rng)));
    }

    #[test]
    fn test_secure_operations() {
        let rt = Session::start(SessionConfig::default().with_seed(31)).unwrap();
        let group = QuadraticResidues::with_modulus(BigUint::from(1019u32)).unwrap();
        let ty = group.component_type().clone();
        let g = group.generator();
        let h = group.embed(&BigUint::from(400u32)).unwrap();
        let sg = vec![rt.input(&ty, &Util::to_bigint(&g)).unwrap()];
        let sh = vec![rt.input(&ty, &Util::to_bigint(&h)).unwrap()];
        let prod = group.secure_operation(&*rt, &sg, &sh).unwrap();
        assert_eq!(
            group.from_components(&rt.reveal_all(&prod).unwrap()).unwrap(),
            group.operation(&g, &h)
        );
        let inv = group.secure_inverse(&*rt, &sh).unwrap();
        assert_eq!(
            group.from_components(&rt.reveal_all(&inv).unwrap()).unwrap(),
            group.inverse(&h)
        );
        let (m, ok) = group.secure_unembed(&*rt, &sh).unwrap();
        assert_eq!(rt.reveal(&ok).unwrap(), BigInt::one());
        assert_eq!(rt.reveal(&m).unwrap(), BigInt::from(400));
    }
}
