//! Password hashing with bcrypt.
//!
//! Hashes are self-contained `$2b$` strings that embed the cost and salt, so
//! nothing but the string itself needs to be stored. Verification fails
//! closed: a malformed stored hash simply does not match.

use tracing::warn;

use crate::error::PasswordError;

/// Salted, adaptive password hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Lowest cost bcrypt accepts. Only suitable for tests.
    pub const MIN_COST: u32 = 4;
    /// Highest cost bcrypt accepts.
    pub const MAX_COST: u32 = 31;

    /// Create a hasher with the given bcrypt work factor.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::InvalidCost`] if `cost` is outside
    /// [`MIN_COST`](Self::MIN_COST)..=[`MAX_COST`](Self::MAX_COST).
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        if !(Self::MIN_COST..=Self::MAX_COST).contains(&cost) {
            return Err(PasswordError::InvalidCost {
                cost,
                min: Self::MIN_COST,
                max: Self::MAX_COST,
            });
        }
        Ok(Self { cost })
    }

    /// The configured work factor.
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash `plaintext` with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::Hashing`] if bcrypt rejects the input.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| PasswordError::Hashing {
            reason: e.to_string(),
        })
    }

    /// Check `candidate` against a stored hash.
    ///
    /// Any hash that cannot be parsed yields `false`.
    #[must_use]
    pub fn verify(&self, hash: &str, candidate: &str) -> bool {
        match bcrypt::verify(candidate, hash) {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}
