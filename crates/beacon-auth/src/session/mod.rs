//! Credential issuance, validation, revocation, refresh rotation and login.

pub mod authority;
pub mod credentials;
pub mod login;

pub use authority::SessionAuthority;
pub use credentials::{AuthenticatedToken, CredentialPair, IssuedCredentials};
pub use login::{LoginOutcome, LoginService};
