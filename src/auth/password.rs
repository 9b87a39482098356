//! Password hashing with Argon2id
//!
//! Produces and verifies PHC-format hashes. Parameters follow the OWASP
//! recommendation: 64 MiB memory, 3 iterations, 1 lane.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};

use super::AuthError;

fn argon2_instance() -> Argon2<'static> {
    let params = Params::new(
        64 * 1024, // m_cost: 64 MiB
        3,         // t_cost: 3 iterations
        1,         // p_cost: 1 lane
        None,      // output_len: default 32 bytes
    )
    .expect("Argon2 parameters are valid");

    Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash a password with Argon2id and a random salt
///
/// Returns the PHC string carrying algorithm, parameters and salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = argon2_instance();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored PHC hash
///
/// Returns `true` when the password matches.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AuthError::PasswordHash(format!("invalid hash format: {e}")))?;

    match argon2_instance().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswordHash(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "correct horse battery staple";
        let hash = hash_password(password).expect("hashing failed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(password, &hash).expect("verification failed"));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let hash = hash_password("right password").expect("hashing failed");
        let ok = verify_password("wrong password", &hash).expect("verification failed");
        assert!(!ok);
    }

    #[test]
    fn test_same_password_different_hashes() {
        let hash1 = hash_password("same").expect("hashing failed");
        let hash2 = hash_password("same").expect("hashing failed");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_invalid_hash_format_is_error() {
        let result = verify_password("password", "not a phc hash");
        assert!(result.is_err());
    }
}
