//! Authentication service.
//!
//! Registers users and checks their credentials on top of a [`UserStore`].
//! Passwords are hashed with argon2; the store only ever sees the PHC string.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use snippetbox_core::{Email, UserId};

use crate::db::{RepositoryError, UserStore};

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    /// Returns `AuthError::PasswordHash` if the password cannot be hashed.
    pub async fn register(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<UserId, AuthError> {
        let password_hash = hash_password(password)?;

        self.users
            .insert(name, email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Check an email and password, returning the user's ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong. The two cases are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &Email, password: &str) -> Result<UserId, AuthError> {
        let credentials = self
            .users
            .credentials(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &credentials.password_hash)?;

        Ok(credentials.id)
    }

    /// Whether the user still exists.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store cannot be queried.
    pub async fn exists(&self, id: UserId) -> Result<bool, AuthError> {
        Ok(self.users.exists(id).await?)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryUserStore;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("pa$$word").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("pa$$word", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("pa$$word", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);

        let id = auth
            .register("Alice", &email("alice@example.com"), "pa$$word")
            .await
            .unwrap();

        let authenticated = auth
            .authenticate(&email("alice@example.com"), "pa$$word")
            .await
            .unwrap();
        assert_eq!(authenticated, id);
        assert!(auth.exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);
        auth.register("Alice", &email("dupe@example.com"), "pa$$word")
            .await
            .unwrap();

        let result = auth
            .register("Bob", &email("dupe@example.com"), "validPa$$word")
            .await;
        assert!(matches!(result, Err(AuthError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_indistinguishable() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);
        auth.register("Alice", &email("alice@example.com"), "pa$$word")
            .await
            .unwrap();

        let wrong_password = auth
            .authenticate(&email("alice@example.com"), "nope-nope")
            .await;
        let unknown_email = auth
            .authenticate(&email("nobody@example.com"), "pa$$word")
            .await;

        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
    }
}
