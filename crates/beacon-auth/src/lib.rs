//! # beacon-auth
//!
//! Credential lifecycle for Beacon: issuing paired access/refresh tokens,
//! validating them against the expiring store, revocation, refresh
//! rotation, and password or machine-client login.
//!
//! ## Modules
//!
//! - `jwt`: token signing, verification, and claims
//! - `session`: the [`SessionAuthority`], the [`LoginService`], and the
//!   credential records they hand out
//! - `password`: Argon2id hashing for password logins
//! - `identity`: a configuration-seeded [`StaticIdentityDirectory`]

pub mod identity;
pub mod jwt;
pub mod password;
pub mod session;

pub use identity::StaticIdentityDirectory;
pub use jwt::{Claims, JwtDecoder, JwtEncoder, TokenType};
pub use password::PasswordHasher;
pub use session::{
    AuthenticatedToken, CredentialPair, IssuedCredentials, LoginOutcome, LoginService,
    SessionAuthority,
};
