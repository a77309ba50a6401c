// src/utils/hash.rs

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .to_string();

    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// The single admin account, taken from configuration.
///
/// Only the hash of the password is kept in memory.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    username: String,
    password_hash: String,
}

impl AdminCredentials {
    pub fn new(username: &str, password: &str) -> Result<Self, AppError> {
        Ok(Self {
            username: username.to_string(),
            password_hash: hash_password(password)?,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn verify(&self, username: &str, password: &str) -> Result<bool, AppError> {
        if username != self.username {
            return Ok(false);
        }
        verify_password(password, &self.password_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_configured_pair() {
        let admin = AdminCredentials::new("admin", "s3cret").unwrap();
        assert!(admin.verify("admin", "s3cret").unwrap());
        assert!(!admin.verify("admin", "wrong").unwrap());
        assert!(!admin.verify("root", "s3cret").unwrap());
    }
}
