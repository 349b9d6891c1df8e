// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Twisted Edwards curves `a x^2 + y^2 = 1 + d x^2 y^2` in affine, projective
//! or extended coordinates: Ed25519 (`a = -1`) and Ed448 (`a = 1`).
//!
//! For both curves `a` is a square and `d` is not, so the addition laws used
//! here are complete: no input needs a special case, which is what lets the
//! same formula run unchanged on secret-shared coordinates.
//!
//! The full curve group has order `h ℓ` with a small cofactor `h`. Elements of
//! [`EdwardsCurve`] are the points of the prime-order subgroup, so
//! [`Group::order`] is `ℓ` and [`Group::is_valid`] rejects points outside it.

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

/// Number of `y` candidates tried per message.
const EMBEDDING_SLOTS: u32 = 256;
const EMBEDDING_SHIFT: usize = 8;

/// Coordinate system of curve points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinates {
    /// `(x, y)`
    Affine,
    /// `(X : Y : Z)` with `x = X/Z`, `y = Y/Z`
    Projective,
    /// `(X : Y : Z : T)` with additionally `T = XY/Z`
    Extended,
}

impl Coordinates {
    pub fn arity(self) -> usize {
        match self {
            Coordinates::Affine => 2,
            Coordinates::Projective => 3,
            Coordinates::Extended => 4,
        }
    }
}

/// Supported curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdwardsModel {
    /// edwards25519 over GF(2^255 - 19), cofactor 8
    Ed25519,
    /// edwards448 over GF(2^448 - 2^224 - 1), cofactor 4
    Ed448,
}

/// A point of the prime-order subgroup, in the coordinates of the curve it
/// was made on.
///
/// Equality compares the points, not the representations: `(X : Y : Z)` and
/// `(λX : λY : λZ)` are equal.
#[derive(Debug, Clone)]
pub struct EdwardsPoint {
    coords: Vec<BigUint>,
    modulus: Arc<BigUint>,
}

impl EdwardsPoint {
    pub fn coords(&self) -> &[BigUint] {
        &self.coords
    }
}

impl PartialEq for EdwardsPoint {
    fn eq(&self, other: &Self) -> bool {
        same_point(&self.coords, &other.coords, &self.modulus)
    }
}

/// An Edwards curve in a fixed coordinate system.
#[derive(Debug, Clone)]
pub struct EdwardsCurve {
    model: EdwardsModel,
    coordinates: Coordinates,
    p: Arc<BigUint>,
    a: BigUint,
    d: BigUint,
    order: BigUint,
    base: EdwardsPoint,
    component: Arc<SecureType>,
}

impl EdwardsCurve {
    /// Ed25519 in affine coordinates.
    pub fn ed25519() -> Result<Arc<Self>> {
        EdwardsCurve::with_coordinates(Coordinates::Affine)
    }

    /// Ed25519 in `coordinates`.
    pub fn with_coordinates(coordinates: Coordinates) -> Result<Arc<Self>> {
        EdwardsCurve::new(EdwardsModel::Ed25519, coordinates)
    }

    /// Ed448 in projective coordinates.
    pub fn ed448() -> Result<Arc<Self>> {
        EdwardsCurve::new(EdwardsModel::Ed448, Coordinates::Projective)
    }

    pub fn new(model: EdwardsModel, coordinates: Coordinates) -> Result<Arc<Self>> {
        let malformed = || Error::InvalidConfig(format!("malformed {:?} constant", model));
        let (p, a, d, order, base_y) = match model {
            EdwardsModel::Ed25519 => {
                let p = (BigUint::one() << 255) - BigUint::from(19u32);
                let inv = Util::mod_inverse_uint(&BigUint::from(121_666u32), &p)
                    .ok_or_else(malformed)?;
                let d = ((&p - BigUint::from(121_665u32)) * inv) % &p;
                let order = (BigUint::one() << 252)
                    + BigUint::parse_bytes(b"27742317777372353535851937790883648493", 10)
                        .ok_or_else(malformed)?;
                // y = 4/5
                let five =
                    Util::mod_inverse_uint(&BigUint::from(5u32), &p).ok_or_else(malformed)?;
                let base_y = (BigUint::from(4u32) * five) % &p;
                (p.clone(), &p - BigUint::one(), d, order, base_y)
            }
            EdwardsModel::Ed448 => {
                let p = (BigUint::one() << 448) - (BigUint::one() << 224) - BigUint::one();
                let d = &p - BigUint::from(39_081u32);
                let order = (BigUint::one() << 446)
                    - BigUint::parse_bytes(
                        b"8335dc163bb124b65129c96fde933d8d723a70aadc873d6d54a7bb0d",
                        16,
                    )
                    .ok_or_else(malformed)?;
                let base_y = BigUint::parse_bytes(
                    b"298819210078481492676017930443930673437544040154080242095928241372331506189835876003536878655418784733982303233503462500531545062832660",
                    10,
                )
                .ok_or_else(malformed)?;
                (p, BigUint::one(), d, order, base_y)
            }
        };
        let component = SecureType::field(p.clone())?;
        let p = Arc::new(p);
        let mut curve = EdwardsCurve {
            model,
            coordinates,
            base: EdwardsPoint {
                coords: vec![],
                modulus: p.clone(),
            },
            p,
            a,
            d,
            order,
            component,
        };
        // the base point has even x
        let x = curve
            .recover_x(&base_y)
            .ok_or_else(|| Error::InvalidConfig("base point is not on the curve".into()))?;
        curve.base = curve.lift_affine(x, base_y);
        debug!(model = ?model, coordinates = ?coordinates, "edwards curve ready");
        Ok(Arc::new(curve))
    }

    pub fn model(&self) -> EdwardsModel {
        self.model
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    /// Builds a point from affine coordinates, validating it.
    pub fn point(&self, x: BigUint, y: BigUint) -> Result<EdwardsPoint> {
        let point = self.lift_affine(x, y);
        if !self.is_valid(&point) {
            return Err(Error::GroupValidity(format!(
                "point is not in the prime-order subgroup of {:?}",
                self.model
            )));
        }
        Ok(point)
    }

    /// Affine coordinates of a point.
    pub fn to_affine(&self, point: &EdwardsPoint) -> (BigUint, BigUint) {
        let c = &point.coords;
        if self.coordinates == Coordinates::Affine {
            return (c[0].clone(), c[1].clone());
        }
        let p = &*self.p;
        let z = Util::mod_inverse_uint(&c[2], p).unwrap_or_else(BigUint::zero);
        ((&c[0] * &z) % p, (&c[1] * &z) % p)
    }

    fn wrap(&self, coords: Vec<BigUint>) -> EdwardsPoint {
        EdwardsPoint {
            coords,
            modulus: self.p.clone(),
        }
    }

    fn lift_affine(&self, x: BigUint, y: BigUint) -> EdwardsPoint {
        let coords = match self.coordinates {
            Coordinates::Affine => vec![x, y],
            Coordinates::Projective => vec![x, y, BigUint::one()],
            Coordinates::Extended => {
                let t = (&x * &y) % &*self.p;
                vec![x, y, BigUint::one(), t]
            }
        };
        self.wrap(coords)
    }

    /// The even `x` with `(x, y)` on the curve, if any.
    fn recover_x(&self, y: &BigUint) -> Option<BigUint> {
        let p = &*self.p;
        let yy = (y * y) % p;
        let num = (&yy + p - BigUint::one()) % p;
        let den = (&self.d * &yy + p - &self.a) % p;
        let xx = (num * Util::mod_inverse_uint(&den, p)?) % p;
        let x = Util::sqrt_mod(&xx, p)?;
        if x.is_odd() {
            Some(p - x)
        } else {
            Some(x)
        }
    }

    /// `(Y^2 + a X^2) Z^2 = Z^4 + d X^2 Y^2`
    fn on_curve(&self, c: &[BigUint]) -> bool {
        let p = &*self.p;
        let (x, y, z) = match self.coordinates {
            Coordinates::Affine => (&c[0], &c[1], BigUint::one()),
            _ => (&c[0], &c[1], c[2].clone()),
        };
        if z.is_zero() {
            return false;
        }
        if self.coordinates == Coordinates::Extended && (x * y) % p != (&c[3] * &z) % p {
            return false;
        }
        let xx = (x * x) % p;
        let yy = (y * y) % p;
        let zz = (&z * &z) % p;
        let lhs = ((&yy + &self.a * &xx) * &zz) % p;
        let rhs = (&zz * &zz + &self.d * xx * yy) % p;
        lhs == rhs
    }

    /// `ℓ P = O`, computed in extended coordinates whatever the curve's own.
    fn in_prime_subgroup(&self, c: &[BigUint]) -> bool {
        let p = &*self.p;
        let point = match self.coordinates {
            Coordinates::Affine => vec![
                c[0].clone(),
                c[1].clone(),
                BigUint::one(),
                (&c[0] * &c[1]) % p,
            ],
            Coordinates::Projective => vec![
                (&c[0] * &c[2]) % p,
                (&c[1] * &c[2]) % p,
                (&c[2] * &c[2]) % p,
                (&c[0] * &c[1]) % p,
            ],
            Coordinates::Extended => c.to_vec(),
        };
        let f = Plain { p };
        let mut acc = vec![BigUint::zero(), BigUint::one(), BigUint::one(), BigUint::zero()];
        for i in (0..self.order.bits()).rev() {
            acc = match self.add_extended(&f, &acc, &acc) {
                Ok(next) => next,
                Err(_) => return false,
            };
            if (&self.order >> i).is_odd() {
                acc = match self.add_extended(&f, &acc, &point) {
                    Ok(next) => next,
                    Err(_) => return false,
                };
            }
        }
        acc[0].is_zero() && acc[1] == acc[2]
    }

    fn add_points<F: FieldOps>(
        &self,
        f: &F,
        a: &[F::Value],
        b: &[F::Value],
    ) -> Result<Vec<F::Value>> {
        match self.coordinates {
            Coordinates::Affine => self.add_affine(f, a, b),
            Coordinates::Projective => self.add_projective(f, a, b),
            Coordinates::Extended => self.add_extended(f, a, b),
        }
    }

    fn add_affine<F: FieldOps>(
        &self,
        f: &F,
        a: &[F::Value],
        b: &[F::Value],
    ) -> Result<Vec<F::Value>> {
        let one = BigUint::one();
        let (x1, y1, x2, y2) = (&a[0], &a[1], &b[0], &b[1]);
        let x1y2 = f.mul(x1, y2)?;
        let y1x2 = f.mul(y1, x2)?;
        let x1x2 = f.mul(x1, x2)?;
        let y1y2 = f.mul(y1, y2)?;
        let t = f.scale(&f.mul(&x1x2, &y1y2)?, &self.d);
        let x3 = f.mul(&f.add(&x1y2, &y1x2)?, &f.reciprocal(&f.add_constant(&t, &one))?)?;
        let y3 = f.mul(
            &f.sub(&y1y2, &f.scale(&x1x2, &self.a))?,
            &f.reciprocal(&f.add_constant(&f.neg(&t), &one))?,
        )?;
        Ok(vec![x3, y3])
    }

    /// `add-2008-bbjlp`
    fn add_projective<F: FieldOps>(
        &self,
        f: &F,
        a: &[F::Value],
        b: &[F::Value],
    ) -> Result<Vec<F::Value>> {
        let (x1, y1, z1) = (&a[0], &a[1], &a[2]);
        let (x2, y2, z2) = (&b[0], &b[1], &b[2]);
        let aa = f.mul(z1, z2)?;
        let bb = f.mul(&aa, &aa)?;
        let c = f.mul(x1, x2)?;
        let d = f.mul(y1, y2)?;
        let e = f.scale(&f.mul(&c, &d)?, &self.d);
        let ff = f.sub(&bb, &e)?;
        let g = f.add(&bb, &e)?;
        let cross = f.mul(&f.add(x1, y1)?, &f.add(x2, y2)?)?;
        let cross = f.sub(&f.sub(&cross, &c)?, &d)?;
        let x3 = f.mul(&f.mul(&aa, &ff)?, &cross)?;
        let y3 = f.mul(&f.mul(&aa, &g)?, &f.sub(&d, &f.scale(&c, &self.a))?)?;
        let z3 = f.mul(&ff, &g)?;
        Ok(vec![x3, y3, z3])
    }

    /// `add-2008-hwcd`
    fn add_extended<F: FieldOps>(
        &self,
        f: &F,
        a: &[F::Value],
        b: &[F::Value],
    ) -> Result<Vec<F::Value>> {
        let (x1, y1, z1, t1) = (&a[0], &a[1], &a[2], &a[3]);
        let (x2, y2, z2, t2) = (&b[0], &b[1], &b[2], &b[3]);
        let aa = f.mul(x1, x2)?;
        let bb = f.mul(y1, y2)?;
        let c = f.scale(&f.mul(t1, t2)?, &self.d);
        let d = f.mul(z1, z2)?;
        let e = f.mul(&f.add(x1, y1)?, &f.add(x2, y2)?)?;
        let e = f.sub(&f.sub(&e, &aa)?, &bb)?;
        let ff = f.sub(&d, &c)?;
        let g = f.add(&d, &c)?;
        let h = f.sub(&bb, &f.scale(&aa, &self.a))?;
        Ok(vec![
            f.mul(&e, &ff)?,
            f.mul(&g, &h)?,
            f.mul(&ff, &g)?,
            f.mul(&e, &h)?,
        ])
    }

    fn negate<F: FieldOps>(&self, f: &F, a: &[F::Value]) -> Vec<F::Value> {
        let mut out = a.to_vec();
        out[0] = f.neg(&a[0]);
        if self.coordinates == Coordinates::Extended {
            out[3] = f.neg(&a[3]);
        }
        out
    }
}

impl Group for EdwardsCurve {
    type Element = EdwardsPoint;

    fn order(&self) -> Option<&BigUint> {
        Some(&self.order)
    }

    fn generator(&self) -> EdwardsPoint {
        self.base.clone()
    }

    fn identity(&self) -> EdwardsPoint {
        self.lift_affine(BigUint::zero(), BigUint::one())
    }

    fn operation(&self, a: &EdwardsPoint, b: &EdwardsPoint) -> EdwardsPoint {
        let f = Plain { p: &self.p };
        match self.add_points(&f, &a.coords, &b.coords) {
            Ok(coords) => self.wrap(coords),
            // unreachable for points on the curve
            Err(_) => self.identity(),
        }
    }

    fn inverse(&self, a: &EdwardsPoint) -> EdwardsPoint {
        let f = Plain { p: &self.p };
        self.wrap(self.negate(&f, &a.coords))
    }

    fn is_valid(&self, a: &EdwardsPoint) -> bool {
        let c = &a.coords;
        if c.len() != self.coordinates.arity() || c.iter().any(|v| v >= &*self.p) {
            return false;
        }
        self.on_curve(c) && self.in_prime_subgroup(c)
    }

    fn random_element<R: Rng + ?Sized>(&self, rng: &mut R) -> EdwardsPoint {
        let r = rng.gen_biguint_below(&self.order);
        self.exp(&self.base, &Util::to_bigint(&r))
    }

    /// `y = 256 m + i` for the first `i` giving a subgroup point, with `x`
    /// taken even.
    fn embed(&self, message: &BigUint) -> Result<EdwardsPoint> {
        let start = message << EMBEDDING_SHIFT;
        if &start + BigUint::from(EMBEDDING_SLOTS - 1) >= *self.p {
            return Err(Error::Embedding(format!(
                "{} is too large for {:?}",
                message, self.model
            )));
        }
        for i in 0..EMBEDDING_SLOTS {
            let y = &start + BigUint::from(i);
            if let Some(x) = self.recover_x(&y) {
                let candidate = self.lift_affine(x, y);
                if self.in_prime_subgroup(&candidate.coords) {
                    return Ok(candidate);
                }
            }
        }
        Err(Error::Embedding(format!("no subgroup point encodes {}", message)))
    }

    fn unembed(&self, element: &EdwardsPoint) -> Result<BigUint> {
        if !self.is_valid(element) {
            return Err(Error::Embedding("point is not in the subgroup".into()));
        }
        let (x, y) = self.to_affine(element);
        if x.is_odd() {
            return Err(Error::Embedding("point has odd x".into()));
        }
        Ok(y >> EMBEDDING_SHIFT)
    }
}

impl SecureGroupOps for EdwardsCurve {
    fn component_type(&self) -> &Arc<SecureType> {
        &self.component
    }

    fn arity(&self) -> usize {
        self.coordinates.arity()
    }

    fn to_components(&self, a: &EdwardsPoint) -> Vec<BigInt> {
        a.coords.iter().map(Util::to_bigint).collect()
    }

    fn from_components(&self, components: &[BigInt]) -> Result<EdwardsPoint> {
        if components.iter().any(|c| c.sign() == Sign::Minus) {
            return Err(Error::GroupValidity("negative coordinate".into()));
        }
        let point = self.wrap(components.iter().map(Util::magnitude).collect());
        if !self.is_valid(&point) {
            return Err(Error::GroupValidity(format!(
                "point is not in the prime-order subgroup of {:?}",
                self.model
            )));
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
        Ok(self.negate(&Shared { rt }, a))
    }

    fn secure_equals<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
        b: &[SecretValue],
    ) -> Result<SecretValue> {
        secure_same_point(rt, a, b)
    }

    fn secure_unembed<R: Runtime + ?Sized>(
        &self,
        rt: &R,
        a: &[SecretValue],
    ) -> Result<(SecretValue, SecretValue)> {
        let (x, y) = match self.coordinates {
            Coordinates::Affine => (a[0].clone(), a[1].clone()),
            _ => {
                let z = rt.reciprocal(&a[2])?;
                (rt.mul(&a[0], &z)?, rt.mul(&a[1], &z)?)
            }
        };
        secure_unembed_coordinates(rt, &self.component, &y, &x, EMBEDDING_SHIFT)
    }
}
