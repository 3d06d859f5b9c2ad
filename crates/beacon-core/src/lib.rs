//! # beacon-core
//!
//! Core crate for Beacon. Contains the unified error system, configuration
//! schemas, typed identifiers, the store value codec, and the contracts
//! consumed from external collaborators (expiring key-value storage and
//! identity lookup).
//!
//! This crate has **no** internal dependencies on other Beacon crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
