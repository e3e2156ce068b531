use anyhow::anyhow;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("All fields are required")]
    MissingFields,
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Email not found")]
    EmailNotFound,
    #[error("Incorrect password")]
    WrongPassword,
}

/// Salted Argon2 hash in PHC string form.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

pub fn verify_password(password: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(stored).map_err(|err| anyhow!("stored password hash is invalid: {err}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_and_verify() {
        let first = hash_password("s3cret").expect("hash");
        let second = hash_password("s3cret").expect("hash");
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2"));

        assert!(verify_password("s3cret", &first).expect("verify"));
        assert!(!verify_password("wrong", &first).expect("verify"));
        assert!(verify_password("s3cret", "plain-text").is_err());
    }
}
