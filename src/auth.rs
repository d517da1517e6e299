//! Local accounts and the single session slot.
//!
//! Passwords are stored as Argon2id PHC strings. Session changes are broadcast to
//! subscribers over `mpsc` channels; a subscriber unsubscribes by dropping its receiver.

use chrono::{Duration, Utc};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;
use uuid::Uuid;

use crate::database::{Database, DatabaseError};
use crate::models::User;

pub const MIN_PASSWORD_LEN: usize = 6;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,
    #[error("An account with email {0} already exists")]
    EmailTaken(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Invalid password reset token")]
    InvalidResetToken,
    #[error("Password reset token has expired")]
    ResetTokenExpired,
    #[error("Failed to hash password: {0}")]
    HashError(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(User),
    SignedOut,
    PasswordRecovery(User),
    UserUpdated(User),
}

#[derive(Default)]
pub struct Auth {
    subscribers: Vec<Sender<AuthEvent>>,
}

impl Auth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every session change from now on
    pub fn subscribe(&mut self) -> Receiver<AuthEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn broadcast(&mut self, event: AuthEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Create an account and sign it in
    pub fn sign_up(&mut self, db: &Database, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email)?;
        check_password(password)?;

        if db.find_user_by_email(&email)?.is_some() {
            return Err(AuthError::EmailTaken(email));
        }

        let salt = new_token();
        let id = db.insert_user(&email, &hash_password(&salt, password)?, &salt)?;
        let user = db.get_user(id)?;
        tracing::info!(user_id = id, "account created");

        self.start_session(db, user)
    }

    pub fn sign_in(&mut self, db: &Database, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let creds = db.find_credentials(&email)?.ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&creds.password_hash, password) {
            tracing::warn!(user_id = creds.user.id, "sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }

        self.start_session(db, creds.user)
    }

    fn start_session(&mut self, db: &Database, user: User) -> Result<User, AuthError> {
        db.set_session(user.id, &new_token())?;
        tracing::info!(user_id = user.id, "signed in");
        self.broadcast(AuthEvent::SignedIn(user.clone()));
        Ok(user)
    }

    pub fn sign_out(&mut self, db: &Database) -> Result<(), AuthError> {
        db.clear_session()?;
        tracing::info!("signed out");
        self.broadcast(AuthEvent::SignedOut);
        Ok(())
    }

    /// The user of the stored session, if any
    pub fn current_user(&self, db: &Database) -> Result<Option<User>, AuthError> {
        let Some(user_id) = db.session_user_id()? else {
            return Ok(None);
        };
        match db.get_user(user_id) {
            Ok(user) => Ok(Some(user)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Issue a one-hour reset token. Unknown addresses yield `None` without an error.
    pub fn reset_password(&mut self, db: &Database, email: &str) -> Result<Option<String>, AuthError> {
        let email = normalize_email(email)?;
        let Some(user) = db.find_user_by_email(&email)? else {
            tracing::info!("password reset requested for unknown address");
            return Ok(None);
        };

        let token = new_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        db.insert_password_reset(&token, user.id, expires_at)?;
        tracing::info!(user_id = user.id, "password reset token issued");
        Ok(Some(token))
    }

    pub fn complete_password_reset(
        &mut self,
        db: &Database,
        token: &str,
        new_password: &str,
    ) -> Result<User, AuthError> {
        check_password(new_password)?;
        let (user_id, expires_at) = db
            .take_password_reset(token.trim())?
            .ok_or(AuthError::InvalidResetToken)?;
        if expires_at < Utc::now() {
            return Err(AuthError::ResetTokenExpired);
        }

        let user = db.get_user(user_id)?;
        self.broadcast(AuthEvent::PasswordRecovery(user.clone()));

        let salt = new_token();
        db.update_password(user_id, &hash_password(&salt, new_password)?, &salt)?;
        tracing::info!(user_id, "password changed");
        self.broadcast(AuthEvent::UserUpdated(user.clone()));
        Ok(user)
    }

    /// Update the signed-in user's display name and avatar path.
    /// `None` keeps a field, a blank value clears it.
    pub fn update_profile(
        &mut self,
        db: &Database,
        display_name: Option<&str>,
        avatar_path: Option<&str>,
    ) -> Result<User, AuthError> {
        let user = self.current_user(db)?.ok_or(AuthError::NotSignedIn)?;
        let merge = |new: Option<&str>, old: Option<String>| match new {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
            None => old,
        };
        let display_name = merge(display_name, user.display_name);
        let avatar_path = merge(avatar_path, user.avatar_path);
        let user = db.update_profile(user.id, display_name.as_deref(), avatar_path.as_deref())?;
        self.broadcast(AuthEvent::UserUpdated(user.clone()));
        Ok(user)
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if valid { Ok(email) } else { Err(AuthError::InvalidEmail(email)) }
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

#[cfg(not(test))]
fn hasher() -> Argon2<'static> {
    Argon2::default()
}

/// Cheap parameters keep the test suite fast
#[cfg(test)]
fn hasher() -> Argon2<'static> {
    argon2::Params::new(1024, 1, 1, None)
        .map(|params| Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params))
        .unwrap_or_default()
}

fn hash_password(salt: &str, password: &str) -> Result<String, AuthError> {
    let salt = SaltString::encode_b64(salt.as_bytes()).map_err(|e| AuthError::HashError(e.to_string()))?;
    let hash = hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashError(e.to_string()))?;
    Ok(hash.to_string())
}

/// Parameters are read from the stored PHC string
fn verify_password(stored: &str, password: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| hasher().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, Auth) {
        (Database::open_in_memory().unwrap(), Auth::new())
    }

    #[test]
    fn passwords_are_stored_as_argon2_hashes() {
        let (db, mut auth) = setup();
        auth.sign_up(&db, "ana@example.com", "secret1").unwrap();

        let creds = db.find_credentials("ana@example.com").unwrap().unwrap();
        assert!(creds.password_hash.starts_with("$argon2id$"));
        assert!(!creds.password_hash.contains("secret1"));
        assert!(verify_password(&creds.password_hash, "secret1"));
        assert!(!verify_password(&creds.password_hash, "secret2"));
        assert!(!verify_password("not-a-phc-string", "secret1"));
    }

    #[test]
    fn sign_up_signs_in_and_broadcasts() {
        let (db, mut auth) = setup();
        let events = auth.subscribe();

        let user = auth.sign_up(&db, " Ana@Example.com ", "secret1").unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(auth.current_user(&db).unwrap(), Some(user.clone()));
        assert_eq!(events.try_recv().unwrap(), AuthEvent::SignedIn(user));
    }

    #[test]
    fn rejects_bad_sign_up_input() {
        let (db, mut auth) = setup();
        assert!(matches!(auth.sign_up(&db, "nope", "secret1"), Err(AuthError::InvalidEmail(_))));
        assert!(matches!(auth.sign_up(&db, "a@b", "secret1"), Err(AuthError::InvalidEmail(_))));
        assert!(matches!(auth.sign_up(&db, "a@b.com", "123"), Err(AuthError::WeakPassword)));

        auth.sign_up(&db, "a@b.com", "secret1").unwrap();
        assert!(matches!(auth.sign_up(&db, "A@B.com", "secret2"), Err(AuthError::EmailTaken(_))));
    }

    #[test]
    fn sign_in_checks_password() {
        let (db, mut auth) = setup();
        auth.sign_up(&db, "a@b.com", "secret1").unwrap();
        auth.sign_out(&db).unwrap();
        assert_eq!(auth.current_user(&db).unwrap(), None);

        assert!(matches!(auth.sign_in(&db, "a@b.com", "wrong!!"), Err(AuthError::InvalidCredentials)));
        assert!(matches!(auth.sign_in(&db, "x@b.com", "secret1"), Err(AuthError::InvalidCredentials)));
        let user = auth.sign_in(&db, "a@b.com", "secret1").unwrap();
        assert_eq!(auth.current_user(&db).unwrap().map(|u| u.id), Some(user.id));
    }

    #[test]
    fn dropped_receiver_unsubscribes() {
        let (db, mut auth) = setup();
        let events = auth.subscribe();
        drop(events);
        auth.sign_up(&db, "a@b.com", "secret1").unwrap();
        assert!(auth.subscribers.is_empty());
    }

    #[test]
    fn password_reset_flow() {
        let (db, mut auth) = setup();
        auth.sign_up(&db, "a@b.com", "secret1").unwrap();
        auth.sign_out(&db).unwrap();
        let events = auth.subscribe();

        assert_eq!(auth.reset_password(&db, "ghost@b.com").unwrap(), None);
        let token = auth.reset_password(&db, "a@b.com").unwrap().unwrap();

        assert!(matches!(
            auth.complete_password_reset(&db, &token, "short"),
            Err(AuthError::WeakPassword)
        ));
        auth.complete_password_reset(&db, &token, "newsecret").unwrap();
        assert!(matches!(events.try_recv().unwrap(), AuthEvent::PasswordRecovery(_)));
        assert!(matches!(events.try_recv().unwrap(), AuthEvent::UserUpdated(_)));

        assert!(matches!(
            auth.complete_password_reset(&db, &token, "another1"),
            Err(AuthError::InvalidResetToken)
        ));
        assert!(auth.sign_in(&db, "a@b.com", "secret1").is_err());
        assert!(auth.sign_in(&db, "a@b.com", "newsecret").is_ok());
    }

    #[test]
    fn expired_reset_token_is_refused() {
        let (db, mut auth) = setup();
        let user = auth.sign_up(&db, "a@b.com", "secret1").unwrap();
        db.insert_password_reset("old", user.id, Utc::now() - Duration::minutes(1)).unwrap();
        assert!(matches!(
            auth.complete_password_reset(&db, "old", "newsecret"),
            Err(AuthError::ResetTokenExpired)
        ));
    }

    #[test]
    fn profile_update_requires_session() {
        let (db, mut auth) = setup();
        assert!(matches!(auth.update_profile(&db, Some("Ana"), None), Err(AuthError::NotSignedIn)));

        auth.sign_up(&db, "a@b.com", "secret1").unwrap();
        let user = auth.update_profile(&db, Some(" Ana "), Some("~/me.png")).unwrap();
        assert_eq!(user.display_label(), "Ana");
        assert_eq!(user.avatar_path.as_deref(), Some("~/me.png"));

        let user = auth.update_profile(&db, Some(""), None).unwrap();
        assert_eq!(user.display_label(), "a@b.com");
        assert_eq!(user.avatar_path.as_deref(), Some("~/me.png"));
    }
}
