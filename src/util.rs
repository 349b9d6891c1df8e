// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Number theory helpers shared by the runtime and the group backends.

use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::identities::{One, Zero};
use num_traits::ToPrimitive;

/// Fixed Miller-Rabin witnesses. Together they are exact below 3.3 * 10^24.
const WITNESSES: [u32; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
/// Extra random witnesses for larger candidates.
const RANDOM_WITNESSES: usize = 20;

pub struct Util {}

impl Util {
    /// Finds the greatest common denominator of two integers *a* and *b*, and two
    /// integers *x* and *y* such that *ax* + *by* is the greatest common
    /// denominator of *a* and *b* (Bézout coefficients).
    ///
    /// This function is an implementation of the [extended Euclidean
    /// algorithm](https://en.wikipedia.org/wiki/Extended_Euclidean_algorithm).
    pub fn extend_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
        let (mut old_r, mut r) = (a.clone(), b.clone());
        let (mut old_x, mut x) = (BigInt::one(), BigInt::zero());
        let (mut old_y, mut y) = (BigInt::zero(), BigInt::one());
        while !r.is_zero() {
            let q = old_r.div_floor(&r);
            let next_r = &old_r - &q * &r;
            old_r = std::mem::replace(&mut r, next_r);
            let next_x = &old_x - &q * &x;
            old_x = std::mem::replace(&mut x, next_x);
            let next_y = &old_y - &q * &y;
            old_y = std::mem::replace(&mut y, next_y);
        }
        if old_r < BigInt::zero() {
            (-old_r, -old_x, -old_y)
        } else {
            (old_r, old_x, old_y)
        }
    }

    /// Calculates the [modular multiplicative
    /// inverse](https://en.wikipedia.org/wiki/Modular_multiplicative_inverse) *x*
    /// of an integer *a* such that *ax* ≡ 1 (mod *m*).
    ///
    /// Such an integer may not exist. If so, this function will return `None`.
    pub fn mod_inverse(a: &BigInt, modular: &BigInt) -> Option<BigInt> {
        let (g, x, _) = Util::extend_gcd(&a.mod_floor(modular), modular);
        if g != BigInt::one() {
            None
        } else {
            Some(x.mod_floor(modular))
        }
    }

    /// Unsigned variant of [`Util::mod_inverse`].
    pub fn mod_inverse_uint(a: &BigUint, modular: &BigUint) -> Option<BigUint> {
        Util::mod_inverse(&Util::to_bigint(a), &Util::to_bigint(modular))
            .map(|x| Util::magnitude(&x))
    }

    pub fn to_bigint(x: &BigUint) -> BigInt {
        BigInt::from_biguint(Sign::Plus, x.clone())
    }

    /// Absolute value of `x` as an unsigned integer.
    pub fn magnitude(x: &BigInt) -> BigUint {
        BigUint::from_bytes_be(&x.to_bytes_be().1)
    }

    /// Maps a signed integer to its representative in `[0, p)`.
    pub fn to_residue(x: &BigInt, p: &BigUint) -> BigUint {
        Util::magnitude(&x.mod_floor(&Util::to_bigint(p)))
    }

    /// Maps a residue in `[0, p)` to the signed integer in `(-p/2, p/2]`.
    pub fn to_signed(x: &BigUint, p: &BigUint) -> BigInt {
        let half: BigUint = p >> 1;
        if x > &half {
            Util::to_bigint(x) - Util::to_bigint(p)
        } else {
            Util::to_bigint(x)
        }
    }

    /// Euler's criterion for odd prime `p`. Zero counts as a residue.
    pub fn is_quadratic_residue(a: &BigUint, p: &BigUint) -> bool {
        let a = a % p;
        if a.is_zero() {
            return true;
        }
        let e: BigUint = (p - BigUint::one()) >> 1;
        a.modpow(&e, p).is_one()
    }

    /// Square root modulo an odd prime `p` (Tonelli–Shanks).
    ///
    /// Returns `None` if `a` is a non-residue.
    pub fn sqrt_mod(a: &BigUint, p: &BigUint) -> Option<BigUint> {
        let a = a % p;
        if a.is_zero() {
            return Some(a);
        }
        if !Util::is_quadratic_residue(&a, p) {
            return None;
        }
        let one = BigUint::one();
        let mut q: BigUint = p - &one;
        let mut s = 0usize;
        while q.is_even() {
            q >>= 1;
            s += 1;
        }
        let mut z = BigUint::from(2u32);
        while Util::is_quadratic_residue(&z, p) {
            z += 1u32;
        }
        let mut m = s;
        let mut c = z.modpow(&q, p);
        let mut t = a.modpow(&q, p);
        let mut r = a.modpow(&((&q + &one) >> 1), p);
        while !t.is_one() {
            let mut i = 0usize;
            let mut tt = t.clone();
            while !tt.is_one() {
                tt = (&tt * &tt) % p;
                i += 1;
            }
            let b = c.modpow(&(BigUint::one() << (m - i - 1)), p);
            r = (r * &b) % p;
            c = (&b * &b) % p;
            t = (t * &c) % p;
            m = i;
        }
        Some(r)
    }

    /// Trial division, meant for the small primes used by form embeddings.
    pub fn is_small_prime(n: u64) -> bool {
        if n < 2 {
            return false;
        }
        if n % 2 == 0 {
            return n == 2;
        }
        let mut d = 3u64;
        while d * d <= n {
            if n % d == 0 {
                return false;
            }
            d += 2;
        }
        true
    }

    /// Primality test. Trial division below `2^32`, Miller-Rabin above.
    pub fn is_prime(n: &BigUint) -> bool {
        if let Some(small) = n.to_u32() {
            return Util::is_small_prime(u64::from(small));
        }
        if WITNESSES.iter().any(|&w| (n % w).is_zero()) {
            return false;
        }
        let n_minus_one = n - BigUint::one();
        let mut d = n_minus_one.clone();
        let mut s = 0usize;
        while d.is_even() {
            d >>= 1;
            s += 1;
        }
        let mut rng = rand::thread_rng();
        let low = BigUint::from(2u32);
        let random: Vec<BigUint> = (0..RANDOM_WITNESSES)
            .map(|_| rng.gen_biguint_range(&low, &n_minus_one))
            .collect();
        WITNESSES
            .iter()
            .map(|&w| BigUint::from(w))
            .chain(random)
            .all(|a| Util::miller_rabin_round(n, &n_minus_one, &d, s, &a))
    }

    /// One Miller-Rabin round for odd `n` with `n - 1 = d * 2^s`. False means
    /// `a` witnesses that `n` is composite.
    fn miller_rabin_round(
        n: &BigUint,
        n_minus_one: &BigUint,
        d: &BigUint,
        s: usize,
        a: &BigUint,
    ) -> bool {
        let mut x = a.modpow(d, n);
        if x.is_one() || &x == n_minus_one {
            return true;
        }
        for _ in 1..s {
            x = (&x * &x) % n;
            if &x == n_minus_one {
                return true;
            }
        }
        false
    }

    pub fn factorial(n: usize) -> BigUint {
        (1..=n).fold(BigUint::one(), |acc, k| acc * BigUint::from(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_gcd() {
        let a = BigInt::from(26);
        let b = BigInt::from(3);
        let (g, x, y) = Util::extend_gcd(&a, &b);

        assert_eq!(g, BigInt::one());
        assert_eq!((a * x) + (b * y), g);
    }

    #[test]
    fn test_extend_gcd_negative_and_zero() {
        let (g, x, y) = Util::extend_gcd(&BigInt::from(-12), &BigInt::from(18));
        assert_eq!(g, BigInt::from(6));
        assert_eq!(BigInt::from(-12) * x + BigInt::from(18) * y, g);

        let (g, x, _) = Util::extend_gcd(&BigInt::from(7), &BigInt::zero());
        assert_eq!(g, BigInt::from(7));
        assert_eq!(x, BigInt::one());
    }

    #[test]
    fn test_mod_inverse() {
        // 3*inverse = 1 mod 26
        let does_exist = Util::mod_inverse(&BigInt::from(3), &BigInt::from(26));
        // 4*inverse = 1 mod 32
        let does_not_exist = Util::mod_inverse(&BigInt::from(4), &BigInt::from(32));

        assert_eq!(does_exist, Some(BigInt::from(9)));
        assert_eq!(does_not_exist, None);
        assert_eq!(
            Util::mod_inverse(&BigInt::from(-3), &BigInt::from(26)),
            Some(BigInt::from(17))
        );
    }

    #[test]
    fn test_signed_residues() {
        let p = BigUint::from(101u32);
        let minus_one = Util::to_residue(&BigInt::from(-1), &p);
        assert_eq!(minus_one, BigUint::from(100u32));
        assert_eq!(Util::to_signed(&minus_one, &p), BigInt::from(-1));
        assert_eq!(Util::to_signed(&BigUint::from(50u32), &p), BigInt::from(50));
    }

    #[test]
    fn test_sqrt_mod() {
        // p = 1 mod 8 exercises the Tonelli-Shanks loop
        let p = BigUint::from(113u32);
        for a in 1u32..113 {
            let a = BigUint::from(a);
            match Util::sqrt_mod(&a, &p) {
                Some(r) => assert_eq!((&r * &r) % &p, a),
                None => assert!(!Util::is_quadratic_residue(&a, &p)),
            }
        }
        let p25519 = (BigUint::one() << 255) - BigUint::from(19u32);
        let r = Util::sqrt_mod(&BigUint::from(4u32), &p25519).unwrap();
        assert_eq!((&r * &r) % &p25519, BigUint::from(4u32));
    }

    #[test]
    fn test_small_primes() {
        let primes: Vec<u64> = (0..30).filter(|&n| Util::is_small_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert_eq!(Util::factorial(5), BigUint::from(120u32));
        let m61: BigUint = (BigUint::one() << 61) - BigUint::one();
        assert!(Util::is_prime(&m61));
        assert!(!Util::is_prime(&(m61 + BigUint::from(2u32))));
        assert!(Util::is_prime(&BigUint::from(4_294_967_291u64)));
    }

    #[test]
    fn test_large_primes() {
        let p25519 = (BigUint::one() << 255) - BigUint::from(19u32);
        assert!(Util::is_prime(&p25519));
        let l25519 = (BigUint::one() << 252)
            + BigUint::parse_bytes(b"27742317777372353535851937790883648493", 10).unwrap();
        assert!(Util::is_prime(&l25519));
        let p448 = (BigUint::one() << 448) - (BigUint::one() << 224) - BigUint::one();
        assert!(Util::is_prime(&p448));
        assert!(!Util::is_prime(&((BigUint::one() << 255) - BigUint::from(21u32))));
        // strong pseudoprime to every base up to 31
        assert!(!Util::is_prime(&BigUint::from(3_825_123_056_546_413_051u64)));
        assert!(!Util::is_prime(&(&p25519 * &p25519)));
    }
}
