//! Identity collaborator: accounts, sign-in state and password reset.
//!
//! # Responsibility
//! - Register accounts and verify credentials.
//! - Track the single signed-in account of this installation.
//! - Record password reset requests.
//!
//! # Invariants
//! - Emails are stored normalized (trimmed, lower-cased) and are unique.
//! - Passwords are stored only as Argon2id PHC strings.
//! - An account row and its session row are written in one transaction.
//! - At most one session row exists at any time.
//! - Log events carry account ids, never emails or passwords.

use crate::db::{from_epoch_ms, to_epoch_ms, DbError};
use crate::model::user::{ProfileFields, UserId, UserIdentity, UserProfile};
use chrono::Utc;
use log::{info, warn};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Minimum accepted password length in characters.
pub const MIN_PASSWORD_CHARS: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

pub type AuthResult<T> = Result<T, AuthError>;

/// Sign-up / sign-in / reset failures.
#[derive(Debug)]
pub enum AuthError {
    EmailAlreadyInUse,
    WeakPassword,
    InvalidEmail(String),
    NotFound,
    InvalidCredentials,
    Storage(DbError),
    InvalidData(String),
    /// Password hashing backend failure.
    Hashing(String),
}

impl AuthError {
    /// Message suitable for direct display to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmailAlreadyInUse => {
                "Email already registered. Please use a different email or try logging in."
            }
            Self::WeakPassword => "Password is too weak. Please use a stronger password.",
            Self::InvalidEmail(_) => "Invalid email format. Please check your email.",
            Self::NotFound => "User not found. Please check your email or create an account.",
            Self::InvalidCredentials => "Incorrect password. Please try again.",
            Self::Storage(_) | Self::InvalidData(_) | Self::Hashing(_) => {
                "Authentication service unavailable. Please try again."
            }
        }
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailAlreadyInUse => write!(f, "email already in use"),
            Self::WeakPassword => write!(
                f,
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            ),
            Self::InvalidEmail(value) => write!(f, "invalid email `{value}`"),
            Self::NotFound => write!(f, "account not found"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted account: {message}"),
            Self::Hashing(message) => write!(f, "password hashing failed: {message}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for AuthError {
    fn from(value: DbError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(value))
    }
}

/// Authentication and session provider contract.
pub trait IdentityProvider {
    fn current_user(&self) -> AuthResult<Option<UserIdentity>>;
    /// Creates an account and signs it in.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &ProfileFields,
    ) -> AuthResult<UserIdentity>;
    fn sign_in(&self, email: &str, password: &str) -> AuthResult<UserIdentity>;
    /// Clears the session. Signing out while signed out is a no-op.
    fn sign_out(&self) -> AuthResult<()>;
    fn send_password_reset(&self, email: &str) -> AuthResult<()>;
    fn profile(&self, uid: UserId) -> AuthResult<Option<UserProfile>>;
}

/// Local SQLite-backed identity provider.
pub struct SqliteIdentityProvider<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIdentityProvider<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn find_account(&self, email: &str) -> AuthResult<Option<StoredAccount>> {
        let account = self
            .conn
            .query_row(
                "SELECT uid, email, display_name, password_hash
                 FROM users
                 WHERE email = ?1;",
                [email],
                |row| {
                    Ok(StoredAccount {
                        uid: row.get(0)?,
                        email: row.get(1)?,
                        display_name: row.get(2)?,
                        password_hash: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

}

struct StoredAccount {
    uid: String,
    email: String,
    display_name: String,
    password_hash: String,
}

impl StoredAccount {
    fn into_identity(self) -> AuthResult<UserIdentity> {
        Ok(UserIdentity {
            uid: parse_uid(&self.uid)?,
            email: self.email,
            display_name: self.display_name,
        })
    }
}

impl IdentityProvider for SqliteIdentityProvider<'_> {
    fn current_user(&self) -> AuthResult<Option<UserIdentity>> {
        let row = self
            .conn
            .query_row(
                "SELECT users.uid, users.email, users.display_name
                 FROM user_session
                 JOIN users ON users.uid = user_session.uid
                 WHERE user_session.slot = 1;",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(uid, email, display_name)| {
            Ok(UserIdentity {
                uid: parse_uid(&uid)?,
                email,
                display_name,
            })
        })
        .transpose()
    }

    fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &ProfileFields,
    ) -> AuthResult<UserIdentity> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::WeakPassword);
        }
        if self.find_account(&email)?.is_some() {
            return Err(AuthError::EmailAlreadyInUse);
        }

        let uid = Uuid::new_v4();
        let password_hash = hash_password(password)?;
        let display_name = match profile.full_name.trim() {
            "" => email.clone(),
            name => name.to_string(),
        };

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users (
                uid,
                email,
                display_name,
                full_name,
                nickname,
                role_model,
                password_hash,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                uid.to_string(),
                email,
                display_name,
                profile.full_name.trim(),
                profile.nickname.trim(),
                profile.role_model.trim(),
                password_hash,
                to_epoch_ms(Utc::now()),
            ],
        )
        .map_err(|err| {
            if is_email_conflict(&err) {
                AuthError::EmailAlreadyInUse
            } else {
                AuthError::from(err)
            }
        })?;
        open_session(&tx, uid)?;
        tx.commit()?;

        info!("event=auth_sign_up module=identity status=ok uid={uid}");
        Ok(UserIdentity {
            uid,
            email,
            display_name,
        })
    }

    fn sign_in(&self, email: &str, password: &str) -> AuthResult<UserIdentity> {
        let email = normalize_email(email)?;
        let Some(account) = self.find_account(&email)? else {
            warn!("event=auth_sign_in module=identity status=error error_code=not_found");
            return Err(AuthError::NotFound);
        };

        if !verify_password(&account.password_hash, password)? {
            warn!(
                "event=auth_sign_in module=identity status=error error_code=invalid_credentials uid={}",
                account.uid
            );
            return Err(AuthError::InvalidCredentials);
        }

        let identity = account.into_identity()?;
        open_session(self.conn, identity.uid)?;
        info!(
            "event=auth_sign_in module=identity status=ok uid={}",
            identity.uid
        );
        Ok(identity)
    }

    fn sign_out(&self) -> AuthResult<()> {
        let removed = self
            .conn
            .execute("DELETE FROM user_session WHERE slot = 1;", [])?;
        info!(
            "event=auth_sign_out module=identity status=ok had_session={}",
            removed > 0
        );
        Ok(())
    }

    fn send_password_reset(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email)?;
        let Some(account) = self.find_account(&email)? else {
            return Err(AuthError::NotFound);
        };

        self.conn.execute(
            "INSERT INTO password_resets (uid, requested_at) VALUES (?1, ?2);",
            params![account.uid, to_epoch_ms(Utc::now())],
        )?;
        info!(
            "event=auth_password_reset module=identity status=ok uid={}",
            account.uid
        );
        Ok(())
    }

    fn profile(&self, uid: UserId) -> AuthResult<Option<UserProfile>> {
        let row = self
            .conn
            .query_row(
                "SELECT email, full_name, nickname, role_model, created_at
                 FROM users
                 WHERE uid = ?1;",
                [uid.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        ProfileFields {
                            full_name: row.get(1)?,
                            nickname: row.get(2)?,
                            role_model: row.get(3)?,
                        },
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((email, fields, created_at_ms)) = row else {
            return Ok(None);
        };
        let created_at = from_epoch_ms(created_at_ms).ok_or_else(|| {
            AuthError::InvalidData(format!("invalid timestamp `{created_at_ms}` in users.created_at"))
        })?;
        Ok(Some(UserProfile {
            uid,
            email,
            fields,
            created_at,
        }))
    }
}

/// Trims and lower-cases `email`, rejecting malformed addresses.
pub fn normalize_email(email: &str) -> AuthResult<String> {
    let normalized = email.trim().to_ascii_lowercase();
    if !EMAIL_RE.is_match(&normalized) {
        return Err(AuthError::InvalidEmail(normalized));
    }
    Ok(normalized)
}

/// Upserts the single session row for `uid`.
fn open_session(conn: &Connection, uid: UserId) -> AuthResult<()> {
    conn.execute(
        "INSERT INTO user_session (slot, uid, signed_in_at) VALUES (1, ?1, ?2)
         ON CONFLICT(slot) DO UPDATE SET
            uid = excluded.uid,
            signed_in_at = excluded.signed_in_at;",
        params![uid.to_string(), to_epoch_ms(Utc::now())],
    )?;
    Ok(())
}

fn is_email_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == ErrorCode::ConstraintViolation && message.contains("users.email")
    )
}

/// Argon2id PHC string with a fresh random salt.
fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hashing(err.to_string()))
}

/// Constant-time check of `password` against a stored PHC string.
fn verify_password(stored: &str, password: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(stored).map_err(|_| {
        AuthError::InvalidData("malformed hash in users.password_hash".to_string())
    })?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AuthError::Hashing(err.to_string())),
    }
}

fn parse_uid(value: &str) -> AuthResult<UserId> {
    Uuid::parse_str(value)
        .map_err(|_| AuthError::InvalidData(format!("invalid uid `{value}` in users.uid")))
}

#[cfg(test)]
mod tests {
    use super::{hash_password, is_email_conflict, normalize_email, verify_password, AuthError};
    use crate::db::open_db_in_memory;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(
            normalize_email("  Ada@Example.COM ").unwrap(),
            "ada@example.com"
        );
    }

    #[test]
    fn normalize_email_rejects_malformed_values() {
        for value in ["", "ada", "ada@", "@example.com", "ada@example", "a da@example.com"] {
            assert!(
                matches!(normalize_email(value), Err(AuthError::InvalidEmail(_))),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn password_hash_is_salted_argon2id_and_verifies() {
        let first = hash_password("secret1").unwrap();
        let second = hash_password("secret1").unwrap();
        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);

        assert!(verify_password(&first, "secret1").unwrap());
        assert!(!verify_password(&first, "secret2").unwrap());
        assert!(matches!(
            verify_password("not-a-phc-string", "secret1"),
            Err(AuthError::InvalidData(_))
        ));
    }

    #[test]
    fn duplicate_email_insert_is_recognized_as_conflict() {
        let conn = open_db_in_memory().unwrap();
        let insert = |uid: &str| {
            conn.execute(
                "INSERT INTO users (
                    uid, email, display_name, password_hash, created_at
                ) VALUES (?1, 'ada@example.com', 'Ada', 'h', 0);",
                [uid],
            )
        };
        insert("u1").unwrap();

        let err = insert("u2").unwrap_err();
        assert!(is_email_conflict(&err));
    }
}
