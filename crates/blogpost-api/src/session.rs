use rand::RngCore;
use tracing::info;

use blogpost_db::{AccountRow, Database};

use crate::error::ApiError;

/// 256 bits of randomness per token.
const TOKEN_BYTES: usize = 32;

/// Fresh opaque token, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Give `account` a new token. Any token it held before stops resolving.
pub fn issue(db: &Database, account: &AccountRow) -> Result<String, ApiError> {
    let token = generate_token();
    if !db.set_session_token(account.id, Some(&token))? {
        return Err(ApiError::Internal(format!(
            "account {} vanished while issuing a token",
            account.id
        )));
    }
    info!("Issued session token for account {}", account.id);
    Ok(token)
}

pub fn resolve(db: &Database, token: Option<&str>) -> Result<AccountRow, ApiError> {
    let token = token.map(str::trim).unwrap_or_default();
    if token.is_empty() {
        return Err(ApiError::InvalidToken);
    }
    db.get_account_by_session_token(token)?
        .ok_or(ApiError::InvalidToken)
}

/// Clear the token wherever it is held. Unknown tokens are ignored.
pub fn revoke(db: &Database, token: &str) -> Result<(), ApiError> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(());
    }
    if db.clear_session_token(token)? {
        info!("Revoked session token");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(db: &Database) -> AccountRow {
        db.create_account("alice", "a@x.com", "hash").unwrap()
    }

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn issued_token_resolves_until_revoked() {
        let db = Database::open_in_memory().unwrap();
        let alice = account(&db);

        let token = issue(&db, &alice).unwrap();
        assert_eq!(resolve(&db, Some(&token)).unwrap().id, alice.id);

        revoke(&db, &token).unwrap();
        assert!(matches!(
            resolve(&db, Some(&token)),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn reissue_invalidates_previous_token() {
        let db = Database::open_in_memory().unwrap();
        let alice = account(&db);

        let first = issue(&db, &alice).unwrap();
        let second = issue(&db, &alice).unwrap();

        assert!(resolve(&db, Some(&first)).is_err());
        assert_eq!(resolve(&db, Some(&second)).unwrap().id, alice.id);
    }

    #[test]
    fn missing_or_empty_tokens_are_invalid() {
        let db = Database::open_in_memory().unwrap();
        account(&db);

        for token in [None, Some(""), Some("   "), Some("deadbeef")] {
            assert!(matches!(resolve(&db, token), Err(ApiError::InvalidToken)));
        }
    }

    #[test]
    fn revoke_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let alice = account(&db);
        let token = issue(&db, &alice).unwrap();

        revoke(&db, &token).unwrap();
        revoke(&db, &token).unwrap();
        revoke(&db, "never-issued").unwrap();
        revoke(&db, "").unwrap();
    }
}
