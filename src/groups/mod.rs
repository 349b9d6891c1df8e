// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Group backends.
//!
//! Every backend implements both [`Group`](crate::group::Group) and
//! [`SecureGroupOps`](crate::group::SecureGroupOps):
//! - `symmetric`: permutations of `{0, .., n-1}` under composition
//! - `quadratic_residues`: squares modulo a safe prime
//! - `edwards`: Ed25519 and Ed448 subgroup points in affine, projective or
//!   extended coordinates
//! - `weierstrass`: BN256 points in projective coordinates
//! - `class_group`: reduced binary quadratic forms of negative discriminant

pub mod class_group;
pub mod edwards;
mod field;
pub mod quadratic_residues;
pub mod symmetric;
pub mod weierstrass;

pub use class_group::{ClassGroup, Form};
pub use edwards::{Coordinates, EdwardsCurve, EdwardsModel, EdwardsPoint};
pub use quadratic_residues::QuadraticResidues;
pub use symmetric::{Permutation, SymmetricGroup};
pub use weierstrass::{WeierstrassCurve, WeierstrassPoint};
