// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Error types for the crate.
//!
//! Shape and validation errors are raised synchronously before any
//! interactive primitive runs. Anything that goes wrong after a protocol has
//! started interacting is wrapped in [`Error::ProtocolAbort`]: a partially
//! executed oblivious protocol has no usable output.

use num_bigint::BigUint;
use thiserror::Error;

/// Errors returned by the runtime, the group backends and the oblivious
/// algorithms built on top of them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid sequence length {length}: must be a non-zero power of two")]
    InvalidLength { length: usize },
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("exponent field modulus {modulus} is incompatible with group order {order}")]
    IncompatibleExponentField { modulus: BigUint, order: String },
    #[error("group element fails membership check: {0}")]
    GroupValidity(String),
    #[error("secure type mismatch: {0}")]
    TypeMismatch(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
    #[error("session is not running")]
    SessionClosed,
    #[error("protocol aborted: {0}")]
    ProtocolAbort(#[source] Box<Error>),
}

impl Error {
    /// True if the error was raised after interaction began.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::ProtocolAbort(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
