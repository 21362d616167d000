//! One-way credential storage. Only the argon2 PHC string ever leaves this module;
//! it embeds algorithm, default cost parameters and a per-hash random salt.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("hashing failed: {0}")]
    Hash(password_hash::Error),
    /// The stored value is not a PHC string argon2 can read.
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(password_hash::Error),
    #[error("verification failed: {0}")]
    Verify(password_hash::Error),
}

pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(PasswordError::Hash)
}

/// A wrong password is `Ok(false)`; errors are reserved for unusable stored hashes.
pub fn verify_password(plain: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(PasswordError::MalformedHash)?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verify(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_password_verifies_and_others_do_not() {
        let stored = hash_password("password1").unwrap();
        assert!(verify_password("password1", &stored).unwrap());
        for other in ["password2", "Password1", "password1 ", ""] {
            assert!(!verify_password(other, &stored).unwrap(), "{other:?} must not verify");
        }
    }

    #[test]
    fn identical_passwords_get_distinct_salts() {
        let first = hash_password("password1").unwrap();
        let second = hash_password("password1").unwrap();
        assert_ne!(first, second);
        let salt = |phc: &str| PasswordHash::new(phc).unwrap().salt.unwrap().as_str().to_owned();
        assert_ne!(salt(&first), salt(&second));
    }

    #[test]
    fn stored_value_is_an_argon2_phc_string_without_the_plaintext() {
        let stored = hash_password("hunter2hunter2").unwrap();
        assert_eq!(PasswordHash::new(&stored).unwrap().algorithm.as_str(), "argon2id");
        assert!(!stored.contains("hunter2"));
    }

    #[test]
    fn empty_password_still_round_trips() {
        let stored = hash_password("").unwrap();
        assert!(verify_password("", &stored).unwrap());
        assert!(!verify_password("x", &stored).unwrap());
    }

    #[test]
    fn unreadable_stored_hash_is_an_error_not_a_mismatch() {
        assert!(matches!(
            verify_password("password1", "plaintext-in-the-db"),
            Err(PasswordError::MalformedHash(_))
        ));
    }
}
