//! Common types, protocol definitions, and errors shared across `user-fields` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
