use std::collections::HashMap;
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::clients::UserClient;
use crate::domain::Session;
use crate::error::UserError;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("Invalid email address.")]
    InvalidEmail,
    #[error("Password must be at least 6 characters.")]
    WeakPassword,
    #[error("This email is already in use.")]
    EmailInUse,
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    User(#[from] UserError),
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(e: argon2::password_hash::Error) -> Self {
        AuthError::Hashing(e.to_string())
    }
}

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    password_hash: String,
}

/// Email/password identity provider. Accounts live in memory; profiles
/// (and with them roles) live in the `users` collection.
#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    users: UserClient,
    hasher: Argon2<'static>,
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthService {
    pub fn new(users: UserClient) -> Self {
        Self::with_hasher(users, Argon2::default())
    }

    pub fn with_hasher(users: UserClient, hasher: Argon2<'static>) -> Self {
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            users,
            hasher,
        }
    }

    /// Register a new account and create its customer profile.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize(email);
        if !email.validate_email() {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        if self.accounts.lock().await.contains_key(&email) {
            return Err(AuthError::EmailInUse);
        }
        let password_hash = self.hash_password(password).await?;

        // Re-checked: another sign-up may have claimed the email while hashing.
        let account = {
            let mut accounts = self.accounts.lock().await;
            if accounts.contains_key(&email) {
                return Err(AuthError::EmailInUse);
            }
            let account = Account {
                uid: Uuid::new_v4().simple().to_string(),
                email: email.clone(),
                password_hash,
            };
            accounts.insert(email, account.clone());
            account
        };

        let profile = self.users.ensure_profile(&account.uid, &account.email).await?;
        info!(uid = %account.uid, "Account created");
        Ok(Session::from(&profile))
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize(email);
        let account = self
            .accounts
            .lock()
            .await
            .get(&email)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(password, &account.password_hash).await? {
            warn!("Sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let profile = self.users.ensure_profile(&account.uid, &account.email).await?;
        info!(uid = %account.uid, role = %profile.role, "Signed in");
        Ok(Session::from(&profile))
    }

    /// Argon2 is CPU-bound, so hashing runs on the blocking pool.
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut rand::thread_rng());
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(AuthError::from)
    }

    async fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored_hash)?;
            Ok::<_, AuthError>(hasher.verify_password(password.as_bytes(), &parsed).is_ok())
        })
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    /// Re-read the caller's role, e.g. after an admin changed it.
    #[instrument(skip(self, session), fields(uid = %session.uid))]
    pub async fn refresh_session(&self, session: &Session) -> Result<Session, AuthError> {
        let profile = self.users.ensure_profile(&session.uid, &session.email).await?;
        debug!(role = %profile.role, "Session refreshed");
        Ok(Session::from(&profile))
    }

    /// Always succeeds so callers cannot learn which emails have accounts.
    #[instrument(skip(self))]
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let known = self.accounts.lock().await.contains_key(&normalize(email));
        if known {
            debug!("Password reset issued");
        }
        info!("Password reset requested");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> Argon2<'static> {
    let params = argon2::Params::new(1024, 1, 1, None).expect("valid argon2 params");
    Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::store::StoreActor;

    fn spawn_auth() -> AuthService {
        let (actor, store) = StoreActor::new(16);
        tokio::spawn(actor.run());
        AuthService::with_hasher(UserClient::new(store), fast_hasher())
    }

    #[tokio::test]
    async fn sign_up_creates_customer_profile() {
        let auth = spawn_auth();

        let session = auth.sign_up("Ruwan@Example.com", "secret1").await.unwrap();

        assert_eq!(session.role, Role::Customer);
        assert_eq!(session.email, "ruwan@example.com");
        assert_eq!(
            auth.sign_up("ruwan@example.com", "another1").await,
            Err(AuthError::EmailInUse)
        );
    }

    #[tokio::test]
    async fn sign_up_validates_input() {
        let auth = spawn_auth();

        assert_eq!(auth.sign_up("nope", "secret1").await, Err(AuthError::InvalidEmail));
        assert_eq!(
            auth.sign_up("a@example.com", "12345").await,
            Err(AuthError::WeakPassword)
        );
    }

    #[tokio::test]
    async fn sign_in_checks_password() {
        let auth = spawn_auth();
        let created = auth.sign_up("a@example.com", "secret1").await.unwrap();

        let session = auth.sign_in("a@example.com", "secret1").await.unwrap();
        assert_eq!(session.uid, created.uid);

        assert_eq!(
            auth.sign_in("a@example.com", "wrong-pass").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            auth.sign_in("b@example.com", "secret1").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn password_reset_does_not_reveal_accounts() {
        let auth = spawn_auth();
        auth.sign_up("a@example.com", "secret1").await.unwrap();

        assert_eq!(auth.request_password_reset("a@example.com").await, Ok(()));
        assert_eq!(auth.request_password_reset("ghost@example.com").await, Ok(()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sign_ups_claim_an_email_once() {
        let auth = spawn_auth();

        let attempts: Vec<_> = (0..6)
            .map(|_| {
                let auth = auth.clone();
                tokio::spawn(async move { auth.sign_up("same@example.com", "secret1").await })
            })
            .collect();
        let others: Vec<_> = (0..3)
            .map(|i| {
                let auth = auth.clone();
                tokio::spawn(async move { auth.sign_up(&format!("user{i}@example.com"), "secret1").await })
            })
            .collect();

        let mut claimed = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => claimed += 1,
                Err(e) => assert_eq!(e, AuthError::EmailInUse),
            }
        }
        assert_eq!(claimed, 1);
        for other in others {
            assert!(other.await.unwrap().is_ok());
        }
        assert!(auth.sign_in("same@example.com", "secret1").await.is_ok());
    }
}
