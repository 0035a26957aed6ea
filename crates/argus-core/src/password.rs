//! Password credential mixin for human and machine principals.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::{ModelError, ModelResult};

/// Shared credential behavior of `User` and `Component`.
///
/// Hashes are Argon2id in PHC string format: salted, deliberately slow,
/// and carrying their own algorithm version and parameters, so stored
/// hashes survive a parameter upgrade and can be re-hashed on login.
pub trait PasswordAuth {
    /// The stored PHC-format hash, if any.
    fn password_hash(&self) -> Option<&str>;

    /// Hash a password, or return `None` for an empty one — machine
    /// accounts need not have a usable password.
    fn hash_or_none(password: &str) -> ModelResult<Option<String>> {
        if password.is_empty() {
            return Ok(None);
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ModelError::Credential(format!("hashing failed: {e}")))?;
        Ok(Some(hash.to_string()))
    }

    /// `Some(true)` on match, `Some(false)` on mismatch, `None` when no
    /// hash is stored. The `None` case means "verification not
    /// applicable" and must not be treated as an authentication failure.
    fn verify_password(&self, password: &str) -> ModelResult<Option<bool>> {
        let Some(stored) = self.password_hash() else {
            return Ok(None);
        };
        let parsed = argon2::PasswordHash::new(stored)
            .map_err(|e| ModelError::Credential(format!("invalid hash format: {e}")))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(Some(true)),
            Err(argon2::password_hash::Error::Password) => Ok(Some(false)),
            Err(e) => Err(ModelError::Credential(format!("verify error: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Principal {
        password: Option<String>,
    }

    impl PasswordAuth for Principal {
        fn password_hash(&self) -> Option<&str> {
            self.password.as_deref()
        }
    }

    #[test]
    fn empty_password_hashes_to_none() {
        assert_eq!(Principal::hash_or_none("").unwrap(), None);
    }

    #[test]
    fn correct_password_matches() {
        let hash = Principal::hash_or_none("hunter2").unwrap();
        assert!(hash.as_deref().unwrap().starts_with("$argon2id$"));
        let principal = Principal { password: hash };
        assert_eq!(principal.verify_password("hunter2").unwrap(), Some(true));
        assert_eq!(principal.verify_password("wrong").unwrap(), Some(false));
    }

    #[test]
    fn missing_hash_is_indeterminate() {
        let principal = Principal { password: None };
        assert_eq!(principal.verify_password("anything").unwrap(), None);
    }
}
