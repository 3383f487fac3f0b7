#![cfg(feature = "sqlite")]

mod common;

use std::error::Error;
use std::sync::Arc;

use chrono::Duration;
use rx_ledger::auth::Credentials;
use rx_ledger::auth::Registration;
use rx_ledger::prelude::*;

use common::ledger;

fn registration(username: &str, password: &str) -> Registration {
    Registration {
        username:      username.to_owned(),
        password:      password.to_owned(),
        pharmacy_code: "PH-042".to_owned(),
    }
}

fn credentials(username: &str, password: &str) -> Credentials {
    Credentials {
        username: username.to_owned(),
        password: password.to_owned(),
    }
}

#[tokio::test]
async fn register_then_login() -> Result<(), Box<dyn Error>> {
    let ledger = ledger().await?;
    let tokens = Arc::new(TokenIssuer::new("test-secret", Duration::hours(24)));
    let gate = AuthGate::new(ledger.store.clone(), tokens.clone());

    assert_eq!(gate.register(registration("alice", "correct horse")).await?, "alice");

    let stored = ledger.store.find_user("alice").await?.unwrap();
    assert_ne!(stored.password, "correct horse");
    assert_eq!(stored.pharmacy_code, "PH-042");

    let session = gate.login(credentials("alice", "correct horse")).await?;
    assert_eq!(session.username, "alice");
    let identity = tokens.verify(&session.token)?;
    assert_eq!(identity.id, stored.id);
    assert_eq!(identity.username, "alice");

    Ok(())
}

#[tokio::test]
async fn reregistration_conflicts_and_keeps_hash() -> Result<(), Box<dyn Error>> {
    let ledger = ledger().await?;
    let gate = AuthGate::new(
        ledger.store.clone(),
        Arc::new(TokenIssuer::new("test-secret", Duration::hours(24))),
    );

    gate.register(registration("alice", "first password")).await?;
    let before = ledger.store.find_user("alice").await?.unwrap().password;

    let err = gate.register(registration("alice", "second password")).await.unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)), "got {err:?}");
    assert_eq!(err.to_string(), "Username already exists.");

    let after = ledger.store.find_user("alice").await?.unwrap().password;
    assert_eq!(before, after);

    // The unique index catches what the pre-check would miss.
    let err = ledger
        .store
        .create_user("alice", "$argon2id$other".to_owned(), "PH-000")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)), "got {err:?}");

    assert!(gate.login(credentials("alice", "first password")).await.is_ok());

    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_rejected() -> Result<(), Box<dyn Error>> {
    let ledger = ledger().await?;
    let gate = AuthGate::new(
        ledger.store.clone(),
        Arc::new(TokenIssuer::new("test-secret", Duration::hours(24))),
    );
    gate.register(registration("alice", "correct horse")).await?;

    for creds in [credentials("alice", "wrong horse"), credentials("mallory", "correct horse")] {
        match gate.login(creds).await {
            Err(LedgerError::Auth(msg)) => assert_eq!(msg, "Invalid credentials."),
            other => panic!("unexpected login result: {other:?}"),
        }
    }

    match gate.register(registration("bob", "")).await {
        Err(LedgerError::Validation(msg)) => assert_eq!(msg, "All fields are required."),
        other => panic!("unexpected registration result: {other:?}"),
    }
    assert!(ledger.store.find_user("bob").await?.is_none());

    Ok(())
}
