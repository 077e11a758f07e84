//! # Auth Module
//!
//! Identity and authentication:
//! - local username/password accounts
//! - Google authorization-code login
//! - email and mobile one-time passcodes
//! - identity linking, so every login method resolves to one user
//! - JWT issuance and the `AuthedUser` extractor for protected routes

pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod linker;
pub mod local;
pub mod models;
pub mod oauth;
pub mod otp;
pub mod password;
pub mod providers;
pub mod routes;
pub mod session;
pub mod sqlite_store;
pub mod store;
pub mod token;
pub mod validators;

#[cfg(test)]
mod memory_store;
#[cfg(test)]
mod test_support;

pub use errors::AuthError;
pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
