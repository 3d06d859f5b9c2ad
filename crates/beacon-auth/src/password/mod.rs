//! Password hashing for username/password logins.

pub mod hasher;

pub use hasher::PasswordHasher;
