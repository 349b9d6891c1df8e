// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

//! Oblivious algorithms over secret-shared values: exponentiation in secure
//! finite groups, masked message encoding and oblivious binary search.

pub mod encoding;
pub mod errors;
pub mod group;
pub mod groups;
pub mod oblivious;
pub mod polynomial;
pub mod runtime;
pub mod search;
pub mod secure_group;
pub mod util;

pub use encoding::{decode, decode_plain, encode};
pub use errors::{Error, Result};
pub use group::{Group, SecureGroupOps};
pub use runtime::{Runtime, SecretValue, SecureType, Session, SessionConfig};
pub use search::{search, search_any_length, search_public};
pub use secure_group::{Base, SecureElement, SecureGroup};
