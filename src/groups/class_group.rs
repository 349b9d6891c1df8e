// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Ideal class group of an imaginary quadratic order, as reduced primitive
//! binary quadratic forms `(a, b, c)` with `b^2 - 4ac = Δ < 0`.
//!
//! Composition is Dirichlet composition followed by reduction. The secure
//! version runs the same steps on secret integers with a schedule fixed by
//! the bit length of `|Δ|`: the extended gcd, the floor divisions and the
//! reduction loop all run their worst-case number of iterations and select
//! between "advance" and "stay" obliviously.

use std::sync::Arc;

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::identities::{One, Zero};
use num_traits::ToPrimitive;
use rand::Rng;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::group::{Group, SecureGroupOps};
use crate::oblivious::{divide_floor, recombine_bits};
use crate::runtime::{Runtime, SecretValue, SecureType};
use crate::util::Util;

/// Messages occupy `a` in `[2^8 m, 2^8 (m + 1))`.
const EMBEDDING_SHIFT: usize = 8;
/// Class numbers are counted for `|Δ|` up to this many bits.
const ORDER_LIMIT_BITS: usize = 20;

/// A binary quadratic form `a x^2 + b xy + c y^2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Form {
    pub a: BigInt,
    pub b: BigInt,
    pub c: BigInt,
}

impl Form {
    pub fn new(a: BigInt, b: BigInt, c: BigInt) -> Self {
        Form { a, b, c }
    }

    pub fn discriminant(&self) -> BigInt {
        &self.b * &self.b - BigInt::from(4) * &self.a * &self.c
    }
}

impl From<(i64, i64, i64)> for Form {
    fn from((a, b, c): (i64, i64, i64)) -> Self {
        Form::new(BigInt::from(a), BigInt::from(b), BigInt::from(c))
    }
}

/// Iteration counts of the secure schedule.
#[derive(Debug, Clone, Copy)]
struct Schedule {
    xgcd_rounds: usize,
    xgcd_quotient_bits: usize,
    compose_quotient_bits: usize,
    reduce_rounds: usize,
    reduce_quotient_bits: usize,
}

impl Schedule {
    fn for_discriminant_bits(bits: usize) -> Self {
        // coefficients of reduced forms stay below sqrt(|Δ|/3)
        let coefficient_bits = bits / 2 + 1;
        Schedule {
            xgcd_rounds: 2 * coefficient_bits + 2,
            xgcd_quotient_bits: coefficient_bits + 1,
            compose_quotient_bits: 2 * bits + 4,
            reduce_rounds: bits / 2 + 4,
            reduce_quotient_bits: bits + 2,
        }
    }
}

/// The class group `Cl(Δ)` for a negative discriminant `Δ ≡ 0, 1 (mod 4)`.
#[derive(Debug, Clone)]
pub struct ClassGroup {
    discriminant: BigInt,
    order: Option<BigUint>,
    generator: Form,
    schedule: Schedule,
    component: Arc<SecureType>,
}

impl ClassGroup {
    pub fn new(discriminant: BigInt) -> Result<Arc<Self>> {
        if discriminant >= BigInt::zero() {
            return Err(Error::InvalidConfig(format!(
                "discriminant {} is not negative",
                discriminant
            )));
        }
        let residue = discriminant.mod_floor(&BigInt::from(4));
        if residue > BigInt::one() {
            return Err(Error::InvalidConfig(format!(
                "discriminant {} is not 0 or 1 mod 4",
                discriminant
            )));
        }
        let bits = discriminant.bits();
        let component = SecureType::integer(3 * bits + 16)?;
        let order = if bits <= ORDER_LIMIT_BITS {
            discriminant.to_i64().map(class_number)
        } else {
            None
        };
        let mut group = ClassGroup {
            generator: Form::from((0, 0, 0)),
            discriminant,
            order,
            schedule: Schedule::for_discriminant_bits(bits),
            component,
        };
        group.generator = group.first_prime_form();
        debug!(
            discriminant = %group.discriminant,
            order = ?group.order,
            "class group ready"
        );
        Ok(Arc::new(group))
    }

    pub fn discriminant(&self) -> &BigInt {
        &self.discriminant
    }

    /// Reduced form with leading coefficient the prime `a`, if `Δ` is a square
    /// modulo `4a`.
    fn prime_form(&self, a: &BigUint) -> Option<Form> {
        let a_int = Util::to_bigint(a);
        let parity = self.discriminant.mod_floor(&BigInt::from(2));
        let b = if a == &BigUint::from(2u32) {
            (-1..=2)
                .rev()
                .map(BigInt::from)
                .find(|b| self.completes(&a_int, b))?
        } else {
            let residue = Util::to_residue(&self.discriminant, a);
            let root = Util::to_bigint(&Util::sqrt_mod(&residue, a)?);
            let other = &a_int - &root;
            if root.mod_floor(&BigInt::from(2)) == parity {
                root
            } else {
                other
            }
        };
        if !self.completes(&a_int, &b) {
            return None;
        }
        let c = (&b * &b - &self.discriminant) / (BigInt::from(4) * &a_int);
        Some(self.reduce(Form::new(a_int, b, c)))
    }

    fn completes(&self, a: &BigInt, b: &BigInt) -> bool {
        (b * b - &self.discriminant)
            .mod_floor(&(BigInt::from(4) * a))
            .is_zero()
    }

    fn first_prime_form(&self) -> Form {
        let limit = Util::magnitude(&self.discriminant);
        let mut a = BigUint::from(2u32);
        while a <= limit {
            if Util::is_prime(&a) {
                if let Some(form) = self.prime_form(&a) {
                    return form;
                }
            }
            a += 1u32;
        }
        self.identity()
    }

    fn normalize(&self, f: Form) -> Form {
        let two_a = BigInt::from(2) * &f.a;
        let k = (&f.a - &f.b).div_floor(&two_a);
        let ka = &k * &f.a;
        let b = &f.b + BigInt::from(2) * &ka;
        let c = &f.c + &k * (&f.b + &ka);
        Form::new(f.a, b, c)
    }

    fn reduce(&self, form: Form) -> Form {
        let mut f = self.normalize(form);
        while f.a > f.c {
            f = self.normalize(Form::new(f.c, -f.b, f.a));
        }
        if f.a == f.c && f.b < BigInt::zero() {
            f.b = -f.b;
        }
        f
    }

    fn is_reduced(&self, f: &Form) -> bool {
        let a = &f.a;
        f.b > -a && &f.b <= a && a <= &f.c && !(a == &f.c && f.b < BigInt::zero())
    }

    fn half(&self) -> BigInt {
        Util::to_bigint(&((self.component.modulus() + BigUint::one()) >> 1))
    }

    fn secure_xgcd<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        x: &SecretValue,
        y: &SecretValue,
    ) -> Result<(SecretValue, SecretValue, SecretValue)> {
        let ty = &self.component;
        let zero = rt.constant(ty, &BigInt::zero())?;
        let one = rt.constant(ty, &BigInt::one())?;
        // (r0, r1, s0, s1, t0, t1)
        let mut state = vec![x.clone(), y.clone(), one.clone(), zero.clone(), zero, one.clone()];
        for _ in 0..self.schedule.xgcd_rounds {
            let done = rt.is_zero(&state[1])?;
            let divisor = rt.select(&done, &one, &state[1])?;
            let (q, r) = divide_floor(rt, &state[0], &divisor, self.schedule.xgcd_quotient_bits)?;
            let next = vec![
                state[1].clone(),
                r,
                state[3].clone(),
                rt.sub(&state[2], &rt.mul(&q, &state[3])?)?,
                state[5].clone(),
                rt.sub(&state[4], &rt.mul(&q, &state[5])?)?,
            ];
            state = rt.select_all(&done, &state, &next)?;
        }
        Ok((state[0].clone(), state[2].clone(), state[4].clone()))
    }

    fn secure_normalize<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        f: &[SecretValue],
        quotient_bits: usize,
    ) -> Result<Vec<SecretValue>> {
        let (a, b, c) = (&f[0], &f[1], &f[2]);
        let two_a = rt.scale(a, &BigInt::from(2));
        let (k, _) = divide_floor(rt, &rt.sub(a, b)?, &two_a, quotient_bits)?;
        let ka = rt.mul(&k, a)?;
        let b2 = rt.add(b, &rt.scale(&ka, &BigInt::from(2)))?;
        let c2 = rt.add(c, &rt.mul(&k, &rt.add(b, &ka)?)?)?;
        Ok(vec![a.clone(), b2, c2])
    }

    fn secure_reduce<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        form: Vec<SecretValue>,
    ) -> Result<Vec<SecretValue>> {
        let bits = self.schedule.reduce_quotient_bits;
        let mut f = form;
        for _ in 0..self.schedule.reduce_rounds {
            f = self.secure_normalize(rt, &f, bits)?;
            let swap = rt.lt(&f[2], &f[0])?;
            let swapped = vec![f[2].clone(), rt.neg(&f[1]), f[0].clone()];
            f = rt.select_all(&swap, &swapped, &f)?;
        }
        f = self.secure_normalize(rt, &f, bits)?;
        let zero = rt.constant(&self.component, &BigInt::zero())?;
        let flip = rt.and(&rt.eq(&f[0], &f[2])?, &rt.lt(&f[1], &zero)?)?;
        f[1] = rt.select(&flip, &rt.neg(&f[1]), &f[1])?;
        Ok(f)
    }
}

/// Number of reduced primitive forms of discriminant `d`.
fn class_number(d: i64) -> BigUint {
    let mut count = 0u64;
    let mut a = 1i64;
    while 3 * a * a <= -d {
        for b in (1 - a)..=a {
            if (b * b - d) % (4 * a) != 0 {
                continue;
            }
            let c = (b * b - d) / (4 * a);
            if c < a || (a == c && b < 0) {
                continue;
            }
            if a.gcd(&b).gcd(&c) == 1 {
                count += 1;
            }
        }
        a += 1;
    }
    BigUint::from(count)
}

impl Group for ClassGroup {
    type Element = Form;

    /// The class number, when `|Δ|` is small enough to count forms.
    fn order(&self) -> Option<&BigUint> {
        self.order.as_ref()
    }

    /// The reduced prime form of smallest leading coefficient.
    fn generator(&self) -> Form {
        self.generator.clone()
    }

    fn identity(&self) -> Form {
        let k = self.discriminant.mod_floor(&BigInt::from(2));
        let c = (&k - &self.discriminant) / BigInt::from(4);
        Form::new(BigInt::one(), k, c)
    }

    fn operation(&self, f1: &Form, f2: &Form) -> Form {
        let beta = (&f1.b + &f2.b) / BigInt::from(2);
        let (g12, u1, v1) = Util::extend_gcd(&f1.a, &f2.a);
        let (g, x, w) = Util::extend_gcd(&g12, &beta);
        let (u, v) = (&x * u1, &x * v1);
        let a3 = (&f1.a * &f2.a) / (&g * &g);
        let half = (&f1.b * &f2.b + &self.discriminant) / BigInt::from(2);
        let n = &u * &f1.a * &f2.b + &v * &f2.a * &f1.b + &w * half;
        let b3 = n / &g;
        let two_a = BigInt::from(2) * &a3;
        let b3 = &b3 + &two_a * (&a3 - &b3).div_floor(&two_a);
        let c3 = (&b3 * &b3 - &self.discriminant) / (BigInt::from(4) * &a3);
        self.reduce(Form::new(a3, b3, c3))
    }

    fn inverse(&self, f: &Form) -> Form {
        if f.a == f.b || f.a == f.c {
            f.clone()
        } else {
            Form::new(f.a.clone(), -&f.b, f.c.clone())
        }
    }

    fn is_valid(&self, f: &Form) -> bool {
        f.a > BigInt::zero()
            && f.discriminant() == self.discriminant
            && self.is_reduced(f)
            && f.a.gcd(&f.b).gcd(&f.c).is_one()
    }

    fn random_element<R: Rng + ?Sized>(&self, rng: &mut R) -> Form {
        let bound = match &self.order {
            Some(order) => order.clone(),
            None => BigUint::one() << self.discriminant.bits(),
        };
        let r = rng.gen_biguint_below(&bound);
        self.exp(&self.generator, &Util::to_bigint(&r))
    }

    /// Smallest prime `a` in `[2^8 m, 2^8 (m + 1))` admitting a form of
    /// discriminant `Δ`, with `4a^2 <= |Δ|` so that the form is reduced.
    fn embed(&self, message: &BigUint) -> Result<Form> {
        let start: BigUint = message << EMBEDDING_SHIFT;
        let end: BigUint = (message + BigUint::one()) << EMBEDDING_SHIFT;
        let limit = Util::magnitude(&self.discriminant);
        let mut a = start;
        while a < end && BigUint::from(4u32) * &a * &a <= limit {
            if Util::is_prime(&a) {
                if let Some(form) = self.prime_form(&a) {
                    if Util::magnitude(&form.a) == a {
                        return Ok(form);
                    }
                }
            }
            a += 1u32;
        }
        Err(Error::Embedding(format!(
            "no prime form encodes {} for discriminant {}",
            message, self.discriminant
        )))
    }

    fn unembed(&self, f: &Form) -> Result<BigUint> {
        if !self.is_valid(f) || f.a <= BigInt::one() {
            return Err(Error::Embedding(format!("{:?} is not an encoding", f)));
        }
        Ok(Util::magnitude(&f.a) >> EMBEDDING_SHIFT)
    }
}

impl SecureGroupOps for ClassGroup {
    fn component_type(&self) -> &Arc<SecureType> {
        &self.component
    }

    fn arity(&self) -> usize {
        3
    }

    fn to_components(&self, f: &Form) -> Vec<BigInt> {
        vec![f.a.clone(), f.b.clone(), f.c.clone()]
    }

    fn from_components(&self, components: &[BigInt]) -> Result<Form> {
        match components {
            [a, b, c] => {
                let form = Form::new(a.clone(), b.clone(), c.clone());
                if self.is_valid(&form) {
                    Ok(form)
                } else {
                    Err(Error::GroupValidity(format!(
                        "{:?} is not a reduced form of discriminant {}",
                        form, self.discriminant
                    )))
                }
            }
            _ => Err(Error::GroupValidity(format!(
                "a form has 3 coefficients, got {}",
                components.len()
            ))),
        }
    }

    fn secure_operation<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        f1: &[SecretValue],
        f2: &[SecretValue],
    ) -> Result<Vec<SecretValue>> {
        let (a1, b1) = (&f1[0], &f1[1]);
        let (a2, b2) = (&f2[0], &f2[1]);
        let half = self.half();
        let delta = &self.discriminant;

        let beta = rt.scale(&rt.add(b1, b2)?, &half);
        let (g12, u1, v1) = self.secure_xgcd(rt, a1, a2)?;
        let zero = rt.constant(&self.component, &BigInt::zero())?;
        let negative = rt.lt(&beta, &zero)?;
        let magnitude = rt.select(&negative, &rt.neg(&beta), &beta)?;
        let (g, x, w) = self.secure_xgcd(rt, &g12, &magnitude)?;
        let w = rt.select(&negative, &rt.neg(&w), &w)?;
        let u = rt.mul(&x, &u1)?;
        let v = rt.mul(&x, &v1)?;

        // exact divisions by g and g^2
        let g_inv = rt.reciprocal(&g)?;
        let a3 = rt.mul(&rt.mul(a1, a2)?, &rt.mul(&g_inv, &g_inv)?)?;
        let t1 = rt.mul(&rt.mul(&u, a1)?, b2)?;
        let t2 = rt.mul(&rt.mul(&v, a2)?, b1)?;
        let t3 = rt.scale(&rt.add_constant(&rt.mul(b1, b2)?, delta), &half);
        let n = rt.add(&rt.add(&t1, &t2)?, &rt.mul(&w, &t3)?)?;
        let b3 = rt.mul(&n, &g_inv)?;

        // b3 mod 2a3 into (-a3, a3]
        let two_a3 = rt.scale(&a3, &BigInt::from(2));
        let (k, _) = divide_floor(
            rt,
            &rt.sub(&a3, &b3)?,
            &two_a3,
            self.schedule.compose_quotient_bits,
        )?;
        let b3 = rt.add(&b3, &rt.mul(&k, &two_a3)?)?;
        let four_a3 = rt.scale(&a3, &BigInt::from(4));
        let c3 = rt.mul(
            &rt.add_constant(&rt.mul(&b3, &b3)?, &-delta),
            &rt.reciprocal(&four_a3)?,
        )?;
        self.secure_reduce(rt, vec![a3, b3, c3])
    }

    fn secure_inverse<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        f: &[SecretValue],
    ) -> Result<Vec<SecretValue>> {
        let (a, b, c) = (&f[0], &f[1], &f[2]);
        let ambiguous = rt.or(&rt.eq(a, b)?, &rt.eq(a, c)?)?;
        let b = rt.select(&ambiguous, b, &rt.neg(b))?;
        Ok(vec![a.clone(), b, c.clone()])
    }

    fn secure_unembed<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        f: &[SecretValue],
    ) -> Result<(SecretValue, SecretValue)> {
        let a = &f[0];
        let width = self.schedule.xgcd_quotient_bits + 1;
        let bits = rt.to_bits(a, width)?;
        let message = match recombine_bits(rt, &bits, EMBEDDING_SHIFT)? {
            Some(m) => m,
            None => rt.constant(&self.component, &BigInt::zero())?,
        };
        let one = rt.constant(&self.component, &BigInt::one())?;
        let valid = rt.lt(&one, a)?;
        Ok((message, valid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{Session, SessionConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn group(d: i64) -> Arc<ClassGroup> {
        ClassGroup::new(BigInt::from(d)).unwrap()
    }

    fn form(a: i64, b: i64, c: i64) -> Form {
        Form::from((a, b, c))
    }

    #[test]
    fn test_parameters() {
        assert!(ClassGroup::new(BigInt::from(23)).is_err());
        assert!(ClassGroup::new(BigInt::from(-21)).is_err());
        let cl = group(-23);
        assert_eq!(cl.identity(), form(1, 1, 6));
        assert_eq!(cl.generator(), form(2, 1, 3));
        assert_eq!(cl.order(), Some(&BigUint::from(3u32)));
        assert_eq!(group(-227).order(), Some(&BigUint::from(5u32)));
        assert_eq!(group(-20).identity(), form(1, 0, 5));
        assert_eq!(group(-1123).generator(), form(7, 5, 41));
        assert_eq!(group(-1123).identity(), form(1, 1, 281));
        assert!(group(-134_217_779).order().is_none());
    }

    #[test]
    fn test_composition() {
        let cl = group(-23);
        let g = cl.generator();
        assert_eq!(cl.operation(&g, &g), form(2, -1, 3));
        assert_eq!(cl.exp(&g, &BigInt::from(3)), cl.identity());
        assert_eq!(cl.operation(&g, &cl.inverse(&g)), cl.identity());

        let cl = group(-227);
        let g = form(3, 1, 19);
        assert!(cl.is_valid(&g));
        assert_eq!(cl.exp(&g, &BigInt::from(5)), cl.identity());

        let cl = group(-1123);
        let g = form(7, 5, 41);
        assert_eq!(cl.exp(&g, &BigInt::from(5)), cl.identity());
        assert_eq!(cl.exp(&g, &BigInt::from(3)), form(17, 13, 19));
    }

    #[test]
    fn test_validity() {
        let cl = group(-23);
        assert!(cl.is_valid(&form(2, 1, 3)));
        // not reduced
        assert!(!cl.is_valid(&form(3, 1, 2)));
        // wrong discriminant
        assert!(!cl.is_valid(&form(2, 1, 4)));
        assert!(matches!(
            cl.from_components(&[BigInt::from(2), BigInt::from(-1)]),
            Err(Error::GroupValidity(_))
        ));
        // order-2 elements are their own inverse
        let cl = group(-20);
        let f = form(2, 2, 3);
        assert!(cl.is_valid(&f));
        assert_eq!(cl.inverse(&f), f);
        assert_eq!(cl.operation(&f, &f), cl.identity());
    }

    #[test]
    fn test_embedding() {
        let cl = group(-134_217_779);
        let e = cl.embed(&BigUint::from(5u32)).unwrap();
        assert_eq!(e.a, BigInt::from(1289));
        assert!(cl.is_valid(&e));
        for m in 0u32..20 {
            let e = cl.embed(&BigUint::from(m)).unwrap();
            assert_eq!(cl.unembed(&e).unwrap(), BigUint::from(m));
        }
        assert!(matches!(
            cl.embed(&BigUint::from(23u32)),
            Err(Error::Embedding(_))
        ));
        assert!(matches!(
            cl.unembed(&cl.identity()),
            Err(Error::Embedding(_))
        ));
        let mut rng = StdRng::from_seed([3u8; 32]);
        assert!(cl.is_valid(&cl.random_element(&mut rng)));
    }

    #[test]
    fn test_secure_operations_match_plaintext() {
        let rt = Session::start(SessionConfig::default().with_seed(51)).unwrap();
        let cl = group(-1123);
        let ty = cl.component_type().clone();
        let share = |f: &Form| -> Vec<SecretValue> {
            cl.to_components(f)
                .iter()
                .map(|c| rt.input(&ty, c).unwrap())
                .collect()
        };
        let open = |v: &[SecretValue]| -> Form {
            cl.from_components(&rt.reveal_all(v).unwrap()).unwrap()
        };
        let g = cl.generator();
        let g2 = cl.operation(&g, &g);
        let g3 = cl.operation(&g2, &g);
        let id = cl.identity();
        let g3_inv = cl.inverse(&g3);
        for &(x, y) in [(&g, &g), (&g2, &g3), (&g, &id), (&g3, &g3_inv)].iter() {
            let sum = cl.secure_operation(&*rt, &share(x), &share(y)).unwrap();
            assert_eq!(open(&sum), cl.operation(x, y));
        }
        let inv = cl.secure_inverse(&*rt, &share(&g2)).unwrap();
        assert_eq!(open(&inv), cl.inverse(&g2));
    }

    #[test]
    fn test_secure_unembed() {
        let rt = Session::start(SessionConfig::default().with_seed(52)).unwrap();
        let cl = group(-134_217_779);
        let ty = cl.component_type().clone();
        let e = cl.embed(&BigUint::from(7u32)).unwrap();
        let shared = rt.constants(&ty, &cl.to_components(&e)).unwrap();
        let (m, ok) = cl.secure_unembed(&*rt, &shared).unwrap();
        assert_eq!(rt.reveal(&ok).unwrap(), BigInt::one());
        assert_eq!(rt.reveal(&m).unwrap(), BigInt::from(7));
        let id = rt.constants(&ty, &cl.to_components(&cl.identity())).unwrap();
        let (_, ok) = cl.secure_unembed(&*rt, &id).unwrap();
        assert_eq!(rt.reveal(&ok).unwrap(), BigInt::zero());
    }
}
