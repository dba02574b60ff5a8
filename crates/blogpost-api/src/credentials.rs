use std::sync::OnceLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::SaltString,
};
use rand::RngCore;
use tracing::info;

use blogpost_db::{AccountRow, Database};

use crate::error::ApiError;

const MAX_USERNAME_LEN: usize = 64;
const SALT_LEN: usize = 16;

/// Create an account. Username is checked for duplicates before email.
pub fn register(
    db: &Database,
    username: &str,
    email: &str,
    password: &str,
) -> Result<AccountRow, ApiError> {
    let username = username.trim();
    let email = email.trim();

    if username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("A valid email is required"));
    }
    if password.trim().is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    if db.get_account_by_username(username)?.is_some() {
        return Err(ApiError::DuplicateUsername);
    }
    if db.get_account_by_email(email)?.is_some() {
        return Err(ApiError::DuplicateEmail);
    }

    let password_hash = hash_password(password)?;

    // A concurrent registration can still win the race; the UNIQUE constraint
    // turns that into the same Duplicate* error via From<DbError>.
    let account = db.create_account(username, email, &password_hash)?;
    info!("Registered account {} ({})", account.id, account.username);
    Ok(account)
}

/// Check a username/password pair. Unknown user and wrong password produce
/// the same error.
pub fn verify(db: &Database, username: &str, password: &str) -> Result<AccountRow, ApiError> {
    let Some(account) = db.get_account_by_username(username.trim())? else {
        // Spend the same hashing work so timing does not reveal unknown usernames.
        let _ = check_password(dummy_hash(), password);
        return Err(ApiError::InvalidCredentials);
    };

    if !check_password(&account.password_hash, password)? {
        return Err(ApiError::InvalidCredentials);
    }
    Ok(account)
}

/// Argon2id with a random per-password salt, PHC string format.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let mut bytes = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut bytes);
    let salt = SaltString::encode_b64(&bytes)
        .map_err(|e| ApiError::Internal(format!("salt encoding failed: {}", e)))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

fn check_password(stored_hash: &str, password: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(format!("corrupt password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("blogpost-dummy-password").unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_stores_hash_not_plaintext() {
        let db = Database::open_in_memory().unwrap();
        let account = register(&db, "alice", "a@x.com", "pw1").unwrap();

        assert_ne!(account.password_hash, "pw1");
        assert!(account.password_hash.starts_with("$argon2id$"));
    }

    #[test]
    fn hashing_salts_each_password() {
        let first = hash_password("pw1").unwrap();
        let second = hash_password("pw1").unwrap();

        assert_ne!(first, second);
        assert!(check_password(&first, "pw1").unwrap());
        assert!(check_password(&second, "pw1").unwrap());
        assert!(!check_password(&first, "pw2").unwrap());
    }

    #[test]
    fn register_rejects_duplicates() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "alice", "a@x.com", "pw1").unwrap();

        let err = register(&db, "alice", "other@x.com", "pw2").unwrap_err();
        assert!(matches!(err, ApiError::DuplicateUsername));

        let err = register(&db, "bob", "a@x.com", "pw2").unwrap_err();
        assert!(matches!(err, ApiError::DuplicateEmail));

        // Exact, case-sensitive match only.
        assert!(register(&db, "Alice", "A@x.com", "pw3").is_ok());
    }

    #[test]
    fn register_validates_input() {
        let db = Database::open_in_memory().unwrap();
        for (username, email, password) in [
            ("  ", "a@x.com", "pw"),
            ("alice", "not-an-email", "pw"),
            ("alice", "a@x.com", ""),
        ] {
            let err = register(&db, username, email, password).unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "{username}/{email}");
        }

        let long = "x".repeat(MAX_USERNAME_LEN + 1);
        assert!(matches!(
            register(&db, &long, "l@x.com", "pw"),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn verify_accepts_correct_password() {
        let db = Database::open_in_memory().unwrap();
        let created = register(&db, "alice", "a@x.com", "pw1").unwrap();

        let account = verify(&db, "alice", "pw1").unwrap();
        assert_eq!(account.id, created.id);
    }

    #[test]
    fn verify_errors_are_uniform() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "alice", "a@x.com", "pw1").unwrap();

        let wrong_password = verify(&db, "alice", "nope").unwrap_err();
        let unknown_user = verify(&db, "mallory", "pw1").unwrap_err();

        assert!(matches!(wrong_password, ApiError::InvalidCredentials));
        assert!(matches!(unknown_user, ApiError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }
}
