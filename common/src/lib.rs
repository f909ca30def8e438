//! SaveVault Common Types
//!
//! This crate contains shared types used across SaveVault, including
//! account identities, the native value unit and the error taxonomy.

pub mod identifiers;
pub mod monetary;
pub mod operation;
pub mod error;

pub use identifiers::*;
pub use monetary::*;
pub use operation::*;
pub use error::*;
