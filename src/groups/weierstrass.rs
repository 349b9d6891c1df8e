// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Prime-order short Weierstrass curves `y^2 = x^3 + b` in projective
//! coordinates `(X : Y : Z)`, with the complete addition law of Renes,
//! Costello and Batina for `a = 0`. The identity is `(0 : 1 : 0)`.
//!
//! BN256 (the curve `y^2 = x^3 + 3` over the 254-bit BN prime) is the one
//! instance provided.

use std::sync::Arc;

use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::identities::{One, Zero};
use rand::Rng;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::group::{Group, SecureGroupOps};
use crate::groups::field::{
    same_point, secure_same_point, secure_unembed_coordinates, FieldOps, Plain, Shared,
};
use crate::runtime::{Runtime, SecretValue, SecureType};
use crate::util::Util;

const EMBEDDING_SLOTS: u32 = 256;
const EMBEDDING_SHIFT: usize = 8;

/// A curve point `(X : Y : Z)`.
#[derive(Debug, Clone)]
pub struct WeierstrassPoint {
    coords: Vec<BigUint>,
    modulus: Arc<BigUint>,
}

impl WeierstrassPoint {
    pub fn coords(&self) -> &[BigUint] {
        &self.coords
    }
}

impl PartialEq for WeierstrassPoint {
    fn eq(&self, other: &Self) -> bool {
        same_point(&self.coords, &other.coords, &self.modulus)
    }
}

#[derive(Debug, Clone)]
pub struct WeierstrassCurve {
    p: Arc<BigUint>,
    b: BigUint,
    b3: BigUint,
    order: BigUint,
    base: WeierstrassPoint,
    component: Arc<SecureType>,
}

impl WeierstrassCurve {
    /// BN256 with base point `(1, 2)`.
    pub fn bn256() -> Result<Arc<Self>> {
        let malformed = || Error::InvalidConfig("malformed BN256 constant".into());
        let p = BigUint::parse_bytes(
            b"21888242871839275222246405745257275088696311157297823662689037894645226208583",
            10,
        )
        .ok_or_else(malformed)?;
        let order = BigUint::parse_bytes(
            b"21888242871839275222246405745257275088548364400416034343698204186575808495617",
            10,
        )
        .ok_or_else(malformed)?;
        WeierstrassCurve::new(p, BigUint::from(3u32), order, (1u32.into(), 2u32.into()))
    }

    /// `y^2 = x^3 + b` over GF(`p`), of prime order `order`, generated by the
    /// affine point `base`.
    pub fn new(
        p: BigUint,
        b: BigUint,
        order: BigUint,
        base: (BigUint, BigUint),
    ) -> Result<Arc<Self>> {
        if !Util::is_prime(&order) {
            return Err(Error::InvalidConfig(format!(
                "curve order {} is not prime",
                order
            )));
        }
        let component = SecureType::field(p.clone())?;
        let p = Arc::new(p);
        let b3 = (&b * 3u32) % &*p;
        let base = WeierstrassPoint {
            coords: vec![base.0, base.1, BigUint::one()],
            modulus: p.clone(),
        };
        let curve = WeierstrassCurve {
            p,
            b,
            b3,
            order,
            base,
            component,
        };
        if !curve.is_valid(&curve.base) || curve.base == curve.identity() {
            return Err(Error::InvalidConfig("base point is not on the curve".into()));
        }
        debug!(modulus = %curve.p, "weierstrass curve ready");
        Ok(Arc::new(curve))
    }

    /// Builds a point from affine coordinates, validating it.
    pub fn point(&self, x: BigUint, y: BigUint) -> Result<WeierstrassPoint> {
        let point = self.wrap(vec![x, y, BigUint::one()]);
        if !self.is_valid(&point) {
            return Err(Error::GroupValidity("point is not on the curve".into()));
        }
        Ok(point)
    }

    /// Affine coordinates, or `None` for the identity.
    pub fn to_affine(&self, point: &WeierstrassPoint) -> Option<(BigUint, BigUint)> {
        let p = &*self.p;
        let c = &point.coords;
        let z = Util::mod_inverse_uint(&c[2], p)?;
        Some(((&c[0] * &z) % p, (&c[1] * &z) % p))
    }

    fn wrap(&self, coords: Vec<BigUint>) -> WeierstrassPoint {
        WeierstrassPoint {
            coords,
            modulus: self.p.clone(),
        }
    }

    /// The even `y` with `(x, y)` on the curve, if any.
    fn recover_y(&self, x: &BigUint) -> Option<BigUint> {
        let p = &*self.p;
        let rhs = (x * x * x + &self.b) % p;
        let y = Util::sqrt_mod(&rhs, p)?;
        if y.is_odd() {
            Some(p - y)
        } else {
            Some(y)
        }
    }

    /// Algorithm 7 of Renes-Costello-Batina 2016, complete for `a = 0`.
    fn add_points<F: FieldOps>(
        &self,
        f: &F,
        a: &[F::Value],
        b: &[F::Value],
    ) -> Result<Vec<F::Value>> {
        let (x1, y1, z1) = (&a[0], &a[1], &a[2]);
        let (x2, y2, z2) = (&b[0], &b[1], &b[2]);
        let t0 = f.mul(x1, x2)?;
        let t1 = f.mul(y1, y2)?;
        let t2 = f.mul(z1, z2)?;
        let t3 = f.mul(&f.add(x1, y1)?, &f.add(x2, y2)?)?;
        let t3 = f.sub(&t3, &f.add(&t0, &t1)?)?;
        let t4 = f.mul(&f.add(y1, z1)?, &f.add(y2, z2)?)?;
        let t4 = f.sub(&t4, &f.add(&t1, &t2)?)?;
        let y3 = f.mul(&f.add(x1, z1)?, &f.add(x2, z2)?)?;
        let y3 = f.sub(&y3, &f.add(&t0, &t2)?)?;
        let t0 = f.scale(&t0, &BigUint::from(3u32));
        let t2 = f.scale(&t2, &self.b3);
        let z3 = f.add(&t1, &t2)?;
        let t1 = f.sub(&t1, &t2)?;
        let y3 = f.scale(&y3, &self.b3);
        let x3 = f.sub(&f.mul(&t3, &t1)?, &f.mul(&t4, &y3)?)?;
        let y3 = f.add(&f.mul(&t1, &z3)?, &f.mul(&y3, &t0)?)?;
        let z3 = f.add(&f.mul(&z3, &t4)?, &f.mul(&t0, &t3)?)?;
        Ok(vec![x3, y3, z3])
    }
}

impl Group for WeierstrassCurve {
    type Element = WeierstrassPoint;

    fn order(&self) -> Option<&BigUint> {
        Some(&self.order)
    }

    fn generator(&self) -> WeierstrassPoint {
        self.base.clone()
    }

    fn identity(&self) -> WeierstrassPoint {
        self.wrap(vec![BigUint::zero(), BigUint::one(), BigUint::zero()])
    }

    fn operation(&self, a: &WeierstrassPoint, b: &WeierstrassPoint) -> WeierstrassPoint {
        let f = Plain { p: &self.p };
        match self.add_points(&f, &a.coords, &b.coords) {
            Ok(coords) => self.wrap(coords),
            Err(_) => self.identity(),
        }
    }

    fn inverse(&self, a: &WeierstrassPoint) -> WeierstrassPoint {
        let f = Plain { p: &self.p };
        let mut coords = a.coords.clone();
        coords[1] = f.neg(&a.coords[1]);
        self.wrap(coords)
    }

    /// `Y^2 Z = X^3 + b Z^3` with `(X, Y, Z) != 0`. The group has prime order,
    /// so every curve point is a member.
    fn is_valid(&self, a: &WeierstrassPoint) -> bool {
        let p = &*self.p;
        let c = &a.coords;
        if c.len() != 3 || c.iter().any(|v| v >= p) || c.iter().all(|v| v.is_zero()) {
            return false;
        }
        let (x, y, z) = (&c[0], &c[1], &c[2]);
        let zz = (z * z) % p;
        let lhs = (y * y * z) % p;
        let rhs = (x * x * x + &self.b * zz * z) % p;
        lhs == rhs
    }

    fn random_element<R: Rng + ?Sized>(&self, rng: &mut R) -> WeierstrassPoint {
        let r = rng.gen_biguint_below(&self.order);
        self.exp(&self.base, &Util::to_bigint(&r))
    }

    /// `x = 256 m + i` for the first `i` on the curve, with `y` taken even.
    fn embed(&self, message: &BigUint) -> Result<WeierstrassPoint> {
        let start = message << EMBEDDING_SHIFT;
        if &start + BigUint::from(EMBEDDING_SLOTS - 1) >= *self.p {
            return Err(Error::Embedding(format!(
                "{} is too large for the curve",
                message
            )));
        }
        for i in 0..EMBEDDING_SLOTS {
            let x = &start + BigUint::from(i);
            if let Some(y) = self.recover_y(&x) {
                return Ok(self.wrap(vec![x, y, BigUint::one()]));
            }
        }
        Err(Error::Embedding(format!("no curve point encodes {}", message)))
    }

    fn unembed(&self, element: &WeierstrassPoint) -> Result<BigUint> {
        if !self.is_valid(element) {
            return Err(Error::Embedding("point is not on the curve".into()));
        }
        let (x, y) = self
            .to_affine(element)
            .ok_or_else(|| Error::Embedding("the identity encodes no message".into()))?;
        if y.is_odd() {
            return Err(Error::Embedding("point has odd y".into()));
        }
        Ok(x >> EMBEDDING_SHIFT)
    }
}

impl SecureGroupOps for WeierstrassCurve {
    fn component_type(&self) -> &Arc<SecureType> {
        &self.component
    }

    fn arity(&self) -> usize {
        3
    }

    fn to_components(&self, a: &WeierstrassPoint) -> Vec<BigInt> {
        a.coords.iter().map(Util::to_bigint).collect()
    }

    fn from_components(&self, components: &[BigInt]) -> Result<WeierstrassPoint> {
        if components.iter().any(|c| c.sign() == Sign::Minus) {
            return Err(Error::GroupValidity("negative coordinate".into()));
        }
        let point = self.wrap(components.iter().map(Util::magnitude).collect());
        if !self.is_valid(&point) {
            return Err(Error::GroupValidity("point is not on the curve".into()));
        }
        Ok(point)
    }

    fn secure_operation<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
        b: &[SecretValue],
    ) -> Result<Vec<SecretValue>> {
        self.add_points(&Shared { rt }, a, b)
    }

    fn secure_inverse<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
    ) -> Result<Vec<SecretValue>> {
        Ok(vec![a[0].clone(), rt.neg(&a[1]), a[2].clone()])
    }

    fn secure_equals<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
        b: &[SecretValue],
    ) -> Result<SecretValue> {
        secure_same_point(rt, a, b)
    }

    /// The identity has no affine form: its `Z` is swapped for 1 before the
    /// division and the validity bit is cleared.
    fn secure_unembed<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
    ) -> Result<(SecretValue, SecretValue)> {
        let at_infinity = rt.is_zero(&a[2])?;
        let z = rt.add(&a[2], &at_infinity)?;
        let z = rt.reciprocal(&z)?;
        let x = rt.mul(&a[0], &z)?;
        let y = rt.mul(&a[1], &z)?;
        let (message, even) =
            secure_unembed_coordinates(rt, &self.component, &x, &y, EMBEDDING_SHIFT)?;
        let valid = rt.and(&even, &rt.not(&at_infinity))?;
        Ok((message, valid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{Session, SessionConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn parse(digits: &[u8]) -> BigUint {
        BigUint::parse_bytes(digits, 10).unwrap()
    }

    #[test]
    fn test_doubling_the_base_point() {
        let curve = WeierstrassCurve::bn256().unwrap();
        let g = curve.generator();
        let g2 = curve.operation(&g, &g);
        let expected = (
            parse(b"1368015179489954701390400359078579693043519447331113978918064868415326638035"),
            parse(b"9918110051302171585080402603319702774565515993150576347155970296011118125764"),
        );
        assert_eq!(curve.to_affine(&g2), Some(expected.clone()));
        assert_eq!(curve.point(expected.0, expected.1).unwrap(), g2);
    }

    #[test]
    fn test_complete_addition() {
        let curve = WeierstrassCurve::bn256().unwrap();
        let g = curve.generator();
        let o = curve.identity();
        assert!(curve.is_valid(&o));
        assert_eq!(curve.operation(&o, &o), o);
        assert_eq!(curve.operation(&g, &o), g);
        assert_eq!(curve.operation(&g, &curve.inverse(&g)), o);
        let g3 = curve.operation(&curve.operation(&g, &g), &g);
        assert_eq!(g3, curve.exp(&g, &BigInt::from(3)));
        let order = Util::to_bigint(curve.order().unwrap());
        assert_eq!(curve.exp(&g, &order), o);
        assert_eq!(curve.exp(&g, &(order - 1)), curve.inverse(&g));
        assert!(curve.to_affine(&o).is_none());
    }

    #[test]
    fn test_validity() {
        let curve = WeierstrassCurve::bn256().unwrap();
        assert!(curve.point(BigUint::from(1u32), BigUint::from(3u32)).is_err());
        assert!(matches!(
            curve.from_components(&[BigInt::from(0), BigInt::from(0), BigInt::from(0)]),
            Err(Error::GroupValidity(_))
        ));
        assert!(matches!(
            curve.from_components(&[BigInt::from(1), BigInt::from(-2), BigInt::from(1)]),
            Err(Error::GroupValidity(_))
        ));
    }

    #[test]
    fn test_embedding() {
        let curve = WeierstrassCurve::bn256().unwrap();
        // x = 1 is the first abscissa of message 0
        assert_eq!(curve.embed(&BigUint::zero()).unwrap(), curve.generator());
        for &m in &[1u32, 42, 65_535] {
            let e = curve.embed(&BigUint::from(m)).unwrap();
            assert_eq!(curve.unembed(&e).unwrap(), BigUint::from(m));
        }
        assert!(matches!(
            curve.unembed(&curve.identity()),
            Err(Error::Embedding(_))
        ));
        assert!(matches!(
            curve.embed(&(BigUint::one() << 250)),
            Err(Error::Embedding(_))
        ));
        let mut rng = StdRng::from_seed([3u8; 32]);
        assert!(curve.is_valid(&curve.random_element(&mut rng)));
    }

    #[test]
    fn test_secure_formulas_match_plaintext() {
        let rt = Session::start(SessionConfig::default().with_seed(43)).unwrap();
        let curve = WeierstrassCurve::bn256().unwrap();
        let ty = curve.component_type().clone();
        let share = |pt: &WeierstrassPoint| -> Vec<SecretValue> {
            curve
                .to_components(pt)
                .iter()
                .map(|c| rt.input(&ty, c).unwrap())
                .collect()
        };
        let g = curve.generator();
        let h = curve.embed(&BigUint::from(42u32)).unwrap();
        let (sg, sh) = (share(&g), share(&h));
        let sum = curve.secure_operation(&*rt, &sg, &sh).unwrap();
        let sum = curve.from_components(&rt.reveal_all(&sum).unwrap()).unwrap();
        assert_eq!(sum, curve.operation(&g, &h));

        let neg = curve.secure_inverse(&*rt, &sg).unwrap();
        let zero = curve.secure_operation(&*rt, &sg, &neg).unwrap();
        let o = rt.constants(&ty, &curve.to_components(&curve.identity())).unwrap();
        let eq = curve.secure_equals(&*rt, &zero, &o).unwrap();
        assert_eq!(rt.reveal(&eq).unwrap(), BigInt::one());

        let (m, ok) = curve.secure_unembed(&*rt, &sh).unwrap();
        assert_eq!(rt.reveal(&ok).unwrap(), BigInt::one());
        assert_eq!(rt.reveal(&m).unwrap(), BigInt::from(42));
        let (_, ok) = curve.secure_unembed(&*rt, &zero).unwrap();
        assert_eq!(rt.reveal(&ok).unwrap(), BigInt::zero());
    }
}
