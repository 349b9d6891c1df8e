// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_traits::identities::{One, Zero};
use rand::Rng;
use std::vec::Vec;

use crate::util::Util;

/// Secret Shares on Polynomial, (t+1, n) threshold scheme over GF(p)
/// P(x) = a_0*x^0 + a_1*x^1 + a_2*x^2 + ... + a_t*x^t
/// degree is t
/// s = P(0) = a_0
/// s_i = P(i)
#[derive(Debug, Clone, Default)]
pub struct Polynomial {
    pub coefficients: Vec<BigUint>,
}

impl Polynomial {
    /// Random polynomial of `degree` with P(0) = `secret`, coefficients below `p`.
    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        secret: &BigUint,
        degree: usize,
        p: &BigUint,
    ) -> Self {
        let mut coefficients = Vec::with_capacity(degree + 1);
        coefficients.push(secret % p);
        // [1,degree] not [1,degree)
        for _ in 1..=degree {
            coefficients.push(rng.gen_biguint_below(p));
        }
        Polynomial { coefficients }
    }

    /// Get P(x) mod p by Horner's rule
    pub fn get_value(&self, x: &BigUint, p: &BigUint) -> BigUint {
        self.coefficients
            .iter()
            .rev()
            .fold(BigUint::zero(), |acc, a| (acc * x + a) % p)
    }

    /// Lagrange coefficients λ_i for interpolating P(0) from the points
    /// `xs`, so that P(0) = Σ λ_i P(x_i) mod p.
    pub fn lagrange_coefficients(xs: &[u64], p: &BigUint) -> Vec<BigUint> {
        Polynomial::lagrange_coefficients_at(xs, 0, p)
    }

    /// Lagrange coefficients for evaluating P(`at`) from the points `xs`.
    pub fn lagrange_coefficients_at(xs: &[u64], at: u64, p: &BigUint) -> Vec<BigUint> {
        let modulus = Util::to_bigint(p);
        let at = BigInt::from(at);
        xs.iter()
            .map(|&xi| {
                let mut num = BigInt::one();
                let mut den = BigInt::one();
                for &xj in xs.iter().filter(|&&xj| xj != xi) {
                    num *= &at - BigInt::from(xj);
                    den *= BigInt::from(xi) - BigInt::from(xj);
                }
                // distinct points below p always have an inverse denominator
                let inv = Util::mod_inverse(&den, &modulus).unwrap_or_else(BigInt::zero);
                Util::to_residue(&(num * inv), p)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horner_evaluation() {
        let polynomial = Polynomial {
            coefficients: vec![
                BigUint::from(3u32),
                BigUint::from(2u32),
                BigUint::from(1u32),
            ],
        };
        // 3 + 2*4 + 16 = 27 = 5 mod 11
        let p = BigUint::from(11u32);
        assert_eq!(
            polynomial.get_value(&BigUint::from(4u32), &p),
            BigUint::from(5u32)
        );
    }

    #[test]
    fn test_random_polynomial_interpolates_secret() {
        let p = BigUint::from(1_000_003u32);
        let secret = BigUint::from(424_242u32);
        let mut rng = rand::thread_rng();
        let degree = 2;
        let polynomial = Polynomial::random(&mut rng, &secret, degree, &p);
        assert_eq!(polynomial.coefficients.len(), degree + 1);

        let xs = [1u64, 2, 3];
        let lambdas = Polynomial::lagrange_coefficients(&xs, &p);
        let recovered = xs
            .iter()
            .zip(lambdas.iter())
            .fold(BigUint::zero(), |acc, (&x, l)| {
                (acc + polynomial.get_value(&BigUint::from(x), &p) * l) % &p
            });
        assert_eq!(recovered, secret);
    }
}
