//! Password hashing with bcrypt

use tokio::task;

use super::errors::AuthError;

/// Work factor for new hashes
pub const DEFAULT_COST: u32 = 12;

/// bcrypt's lowest accepted cost, keeps hashing fast in tests
#[cfg(test)]
pub const TEST_COST: u32 = 4;

#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl CredentialHasher {
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Salted bcrypt digest; two calls with the same input differ
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::hash(plaintext, self.cost).map_err(|_| AuthError::HashingFailed)
    }

    /// A malformed digest counts as a mismatch
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        bcrypt::verify(plaintext, digest).unwrap_or(false)
    }

    /// `hash` on the blocking pool, bcrypt is CPU-bound
    pub async fn hash_blocking(self, plaintext: String) -> Result<String, AuthError> {
        task::spawn_blocking(move || self.hash(&plaintext))
            .await
            .map_err(|_| AuthError::HashingFailed)?
    }

    pub async fn verify_blocking(self, plaintext: String, digest: String) -> bool {
        task::spawn_blocking(move || self.verify(&plaintext, &digest))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::with_cost(TEST_COST)
    }

    #[test]
    fn test_hash_verifies_and_rejects_wrong_password() {
        let h = hasher();
        let digest = h.hash("hunter22").unwrap();

        assert!(h.verify("hunter22", &digest));
        assert!(!h.verify("hunter23", &digest));
    }

    #[test]
    fn test_hash_is_salted() {
        let h = hasher();
        let a = h.hash("same-password").unwrap();
        let b = h.hash("same-password").unwrap();

        assert_ne!(a, b);
        assert!(h.verify("same-password", &a));
        assert!(h.verify("same-password", &b));
    }

    #[test]
    fn test_printable_ascii_passwords_verify() {
        let h = hasher();
        let printable: String = (0x20u8..0x7f).map(char::from).collect();
        let samples = [
            &printable[..8],
            &printable[8..40],
            &printable[23..95],
            "   leading and trailing   ",
            "~!@#$%^&*()_+`-={}|[]\\:\";'<>?,./",
        ];

        for sample in samples {
            let digest = h.hash(sample).unwrap();
            assert!(h.verify(sample, &digest), "failed for {:?}", sample);
        }
    }

    #[test]
    fn test_malformed_digest_is_mismatch() {
        let h = hasher();
        assert!(!h.verify("anything", "not-a-bcrypt-digest"));
        assert!(!h.verify("anything", ""));
    }

    #[tokio::test]
    async fn test_blocking_helpers() {
        let h = hasher();
        let digest = h.hash_blocking("blocking-pass".to_string()).await.unwrap();

        assert!(h.verify_blocking("blocking-pass".to_string(), digest.clone()).await);
        assert!(!h.verify_blocking("other".to_string(), digest).await);
    }

    #[test]
    fn test_default_cost() {
        assert_eq!(CredentialHasher::default().cost(), 12);
    }
}
