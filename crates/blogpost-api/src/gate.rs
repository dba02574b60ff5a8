use blogpost_db::{AccountRow, Database, PostRow};

use crate::Features;
use crate::error::ApiError;
use crate::session;

/// Resolve the caller's token. Creating a post needs nothing more than this.
pub fn authenticate(db: &Database, token: Option<&str>) -> Result<AccountRow, ApiError> {
    session::resolve(db, token).map_err(|e| match e {
        ApiError::InvalidToken => ApiError::Unauthenticated,
        other => other,
    })
}

/// Decide whether the token's holder may edit or delete `post`.
///
/// With ownership enforcement off, any authenticated account passes.
pub fn authorize_mutation(
    db: &Database,
    token: Option<&str>,
    post: &PostRow,
    features: Features,
) -> Result<AccountRow, ApiError> {
    let account = authenticate(db, token)?;
    if features.enforce_ownership && account.id != post.owner_id {
        return Err(ApiError::Forbidden);
    }
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogpost_db::NewPost;
    use chrono::Utc;

    struct Fixture {
        db: Database,
        alice_token: String,
        bob_token: String,
        post: PostRow,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_account("alice", "a@x.com", "hash").unwrap();
        let bob = db.create_account("bob", "b@x.com", "hash").unwrap();
        let alice_token = session::issue(&db, &alice).unwrap();
        let bob_token = session::issue(&db, &bob).unwrap();
        let post = db
            .create_post(&NewPost {
                owner_id: alice.id,
                title: "Hi",
                body: "World",
                image_filename: None,
                created_at: Utc::now(),
            })
            .unwrap();
        Fixture {
            db,
            alice_token,
            bob_token,
            post,
        }
    }

    #[test]
    fn owner_is_allowed() {
        let f = fixture();
        let account =
            authorize_mutation(&f.db, Some(&f.alice_token), &f.post, Features::default()).unwrap();
        assert_eq!(account.id, f.post.owner_id);
    }

    #[test]
    fn non_owner_is_forbidden() {
        let f = fixture();
        let err = authorize_mutation(&f.db, Some(&f.bob_token), &f.post, Features::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[test]
    fn bad_token_is_unauthenticated() {
        let f = fixture();
        for token in [None, Some(""), Some("bogus")] {
            let err = authorize_mutation(&f.db, token, &f.post, Features::default()).unwrap_err();
            assert!(matches!(err, ApiError::Unauthenticated));
        }
    }

    #[test]
    fn revoked_owner_token_is_unauthenticated() {
        let f = fixture();
        session::revoke(&f.db, &f.alice_token).unwrap();
        let err = authorize_mutation(&f.db, Some(&f.alice_token), &f.post, Features::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[test]
    fn open_editing_skips_ownership() {
        let f = fixture();
        let features = Features {
            enforce_ownership: false,
            ..Features::default()
        };
        assert!(authorize_mutation(&f.db, Some(&f.bob_token), &f.post, features).is_ok());
        assert!(authorize_mutation(&f.db, Some("bogus"), &f.post, features).is_err());
    }
}
