// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXXXXXXXX (e.g., U_K7NP3XY2M9QA for users)
//!
//! - No ambiguous characters (excludes I, L, O, U)
//! - Case-insensitive
//! - 32^12 combinations per entity type

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Random characters after the prefix
const ID_LENGTH: usize = 12;

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User account (U_)
    User,
    /// Authentication provider catalog entry (AP_)
    AuthProvider,
    /// User to provider link (UA_)
    UserAuth,
    /// Role (RL_)
    Role,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::AuthProvider => "AP",
            EntityPrefix::UserAuth => "UA",
            EntityPrefix::Role => "RL",
        }
    }
}

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(ID_LENGTH))
}

/// Generate a User ID (U_XXXXXXXXXXXX)
pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

/// Generate an AuthProvider ID (AP_XXXXXXXXXXXX)
pub fn generate_provider_id() -> String {
    generate_id(EntityPrefix::AuthProvider)
}

/// Generate a UserAuth ID (UA_XXXXXXXXXXXX)
pub fn generate_user_auth_id() -> String {
    generate_id(EntityPrefix::UserAuth)
}

/// Generate a Role ID (RL_XXXXXXXXXXXX)
pub fn generate_role_id() -> String {
    generate_id(EntityPrefix::Role)
}
