use std::cell::RefCell;
use std::rc::Rc;
use taskflow_core::db::{open_db, open_db_in_memory};
use taskflow_core::{AuthError, IdentityProvider, ProfileFields, Session, SqliteIdentityProvider};

fn profile(full_name: &str) -> ProfileFields {
    ProfileFields {
        full_name: full_name.to_string(),
        nickname: "ace".to_string(),
        role_model: "Grace Hopper".to_string(),
    }
}

#[test]
fn sign_up_signs_in_and_stores_profile() {
    let conn = open_db_in_memory().unwrap();
    let provider = SqliteIdentityProvider::new(&conn);

    let identity = provider
        .sign_up(" Ada@Example.com ", "secret1", &profile("Ada Lovelace"))
        .unwrap();
    assert_eq!(identity.email, "ada@example.com");
    assert_eq!(identity.display_name, "Ada Lovelace");
    assert_eq!(provider.current_user().unwrap(), Some(identity.clone()));

    let stored = provider.profile(identity.uid).unwrap().unwrap();
    assert_eq!(stored.email, "ada@example.com");
    assert_eq!(stored.fields, profile("Ada Lovelace"));
}

#[test]
fn display_name_falls_back_to_email() {
    let conn = open_db_in_memory().unwrap();
    let provider = SqliteIdentityProvider::new(&conn);

    let identity = provider
        .sign_up("nobody@example.com", "secret1", &ProfileFields::default())
        .unwrap();
    assert_eq!(identity.display_name, "nobody@example.com");
}

#[test]
fn sign_up_failures_map_to_typed_errors() {
    let conn = open_db_in_memory().unwrap();
    let provider = SqliteIdentityProvider::new(&conn);
    provider
        .sign_up("ada@example.com", "secret1", &profile("Ada"))
        .unwrap();

    assert!(matches!(
        provider.sign_up("ADA@example.com", "another1", &profile("Ada")),
        Err(AuthError::EmailAlreadyInUse)
    ));
    assert!(matches!(
        provider.sign_up("bob@example.com", "12345", &profile("Bob")),
        Err(AuthError::WeakPassword)
    ));
    assert!(matches!(
        provider.sign_up("bob-at-example", "secret1", &profile("Bob")),
        Err(AuthError::InvalidEmail(_))
    ));
}

#[test]
fn sign_in_checks_account_and_password() {
    let conn = open_db_in_memory().unwrap();
    let provider = SqliteIdentityProvider::new(&conn);
    let created = provider
        .sign_up("ada@example.com", "secret1", &profile("Ada"))
        .unwrap();
    provider.sign_out().unwrap();
    assert_eq!(provider.current_user().unwrap(), None);

    assert!(matches!(
        provider.sign_in("ghost@example.com", "secret1"),
        Err(AuthError::NotFound)
    ));
    let wrong = provider.sign_in("ada@example.com", "wrong-pass").unwrap_err();
    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert_eq!(wrong.user_message(), "Incorrect password. Please try again.");
    assert_eq!(provider.current_user().unwrap(), None);

    let signed_in = provider.sign_in("ada@example.com", "secret1").unwrap();
    assert_eq!(signed_in, created);
    assert_eq!(provider.current_user().unwrap(), Some(created));
}

#[test]
fn password_reset_requires_known_account() {
    let conn = open_db_in_memory().unwrap();
    let provider = SqliteIdentityProvider::new(&conn);
    provider
        .sign_up("ada@example.com", "secret1", &profile("Ada"))
        .unwrap();

    provider.send_password_reset("ada@example.com").unwrap();
    assert!(matches!(
        provider.send_password_reset("ghost@example.com"),
        Err(AuthError::NotFound)
    ));

    let resets: i64 = conn
        .query_row("SELECT COUNT(*) FROM password_resets;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(resets, 1);
}

#[test]
fn session_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskflow.sqlite3");

    let uid = {
        let conn = open_db(&path).unwrap();
        let mut session = Session::init(SqliteIdentityProvider::new(&conn)).unwrap();
        assert!(session.current_user().is_none());
        let identity = session
            .sign_up("ada@example.com", "secret1", &profile("Ada"))
            .unwrap();
        identity.uid
    };

    let conn = open_db(&path).unwrap();
    let mut session = Session::init(SqliteIdentityProvider::new(&conn)).unwrap();
    assert_eq!(session.require_user().unwrap().uid, uid);

    session.sign_out().unwrap();
    assert!(session.require_user().is_err());
    let reopened = Session::init(SqliteIdentityProvider::new(&conn)).unwrap();
    assert!(reopened.current_user().is_none());
}

#[test]
fn session_notifies_subscribers_on_identity_changes() {
    let conn = open_db_in_memory().unwrap();
    let mut session = Session::init(SqliteIdentityProvider::new(&conn)).unwrap();

    let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let subscription = session.subscribe(move |identity| {
        sink.borrow_mut()
            .push(identity.map(|identity| identity.email.clone()));
    });

    session
        .sign_up("ada@example.com", "secret1", &profile("Ada"))
        .unwrap();
    assert!(session.sign_in("ada@example.com", "nope-nope").is_err());
    session.sign_out().unwrap();

    assert!(session.unsubscribe(subscription));
    session.sign_in("ada@example.com", "secret1").unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![Some("ada@example.com".to_string()), None]
    );
}

#[test]
fn failed_session_write_rolls_back_the_new_account() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_sessions BEFORE INSERT ON user_session
         BEGIN
             SELECT RAISE(ABORT, 'session store down');
         END;",
    )
    .unwrap();
    let provider = SqliteIdentityProvider::new(&conn);

    let err = provider
        .sign_up("ada@example.com", "secret1", &profile("Ada"))
        .unwrap_err();
    assert!(matches!(err, AuthError::Storage(_)));

    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(users, 0);
    assert_eq!(provider.current_user().unwrap(), None);

    conn.execute_batch("DROP TRIGGER reject_sessions;").unwrap();
    let identity = provider
        .sign_up("ada@example.com", "secret1", &profile("Ada"))
        .unwrap();
    assert_eq!(provider.current_user().unwrap(), Some(identity));
}

#[test]
fn stored_password_is_an_argon2id_hash() {
    let conn = open_db_in_memory().unwrap();
    let provider = SqliteIdentityProvider::new(&conn);
    provider
        .sign_up("ada@example.com", "secret1", &profile("Ada"))
        .unwrap();

    let stored: String = conn
        .query_row("SELECT password_hash FROM users;", [], |row| row.get(0))
        .unwrap();
    assert!(stored.starts_with("$argon2id$"));
    assert!(!stored.contains("secret1"));
}
