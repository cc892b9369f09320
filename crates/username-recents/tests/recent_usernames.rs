//! End-to-end behaviour of the recent-username manager over the in-memory
//! backend: recording, first-use seeding, clearing and the active-user view.

use std::sync::Arc;

use futures::StreamExt;
use username_recents::sources::{MockAccountDirectory, MockIdentitySource};
use username_recents::{
    AccountProfile, ActiveAccount, Credential, InMemoryRecentUsernameStorage,
    RecentUsernameManager, RecentUsernameStorage, RecentsConfig, RecentsEvent, SeedSource,
    UserId,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "username_recents=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

struct Harness {
    manager: RecentUsernameManager,
    storage: Arc<InMemoryRecentUsernameStorage>,
    accounts: Arc<MockAccountDirectory>,
}

fn harness(identities: MockIdentitySource, accounts: MockAccountDirectory) -> Harness {
    init_tracing();
    let storage = Arc::new(InMemoryRecentUsernameStorage::new());
    let accounts = Arc::new(accounts);
    let manager = RecentUsernameManager::new(
        RecentsConfig::default(),
        storage.clone(),
        Arc::new(identities),
        accounts.clone(),
    );
    Harness {
        manager,
        storage,
        accounts,
    }
}

#[tokio::test]
async fn first_login_flow_seeds_then_records() {
    let user = UserId::generate();
    let h = harness(
        MockIdentitySource::new().with_credentials(
            user,
            vec![
                Credential::with_identity_email("work", "me@work.io"),
                Credential::new("bank"),
                Credential::with_identity_email("home", "me@home.io"),
            ],
        ),
        MockAccountDirectory::new().with_account(user, AccountProfile::with_email("me@vault.io")),
    );
    let mut events = h.manager.subscribe_events();

    assert_eq!(
        h.manager.get_recent(&user, 3).await,
        vec!["me@home.io", "me@work.io"]
    );

    h.manager.add_username(&user, "me@work.io").await;
    h.manager.add_username(&user, "  new-login  ").await;

    assert_eq!(
        h.manager.get_recent(&user, 3).await,
        vec!["new-login", "me@work.io", "me@home.io"]
    );
    assert_eq!(h.manager.get_recent(&user, 1).await, vec!["new-login"]);

    assert!(matches!(
        events.recv().await.unwrap(),
        RecentsEvent::Seeded {
            source: SeedSource::Credentials,
            count: 2,
            ..
        }
    ));
}

#[tokio::test]
async fn account_email_fallback_and_clear() {
    let user = UserId::generate();
    let h = harness(
        MockIdentitySource::new(),
        MockAccountDirectory::new().with_account(user, AccountProfile::with_email("me@vault.io")),
    );

    assert_eq!(h.manager.get_recent_default(&user).await, vec!["me@vault.io"]);

    h.manager.clear(&user).await;

    assert!(h.manager.get_recent_default(&user).await.is_empty());
    assert_eq!(h.storage.get(&user).await.unwrap(), Some(Vec::new()));

    h.manager.add_username(&user, "fresh").await;
    assert_eq!(h.manager.get_recent_default(&user).await, vec!["fresh"]);
}

#[tokio::test]
async fn many_distinct_usernames_are_capped() {
    let user = UserId::generate();
    let h = harness(MockIdentitySource::new(), MockAccountDirectory::new());

    for i in 0..50 {
        h.manager.add_username(&user, &format!("user{i}")).await;
    }

    let stored = h.storage.get(&user).await.unwrap().unwrap();
    assert_eq!(stored.len(), username_recents::MAX_USERNAMES);
    assert_eq!(stored.first().map(String::as_str), Some("user49"));
    assert_eq!(stored.last().map(String::as_str), Some("user30"));
}

#[tokio::test]
async fn concurrent_adds_keep_every_write() {
    let user = UserId::generate();
    let h = harness(MockIdentitySource::new(), MockAccountDirectory::new());
    let manager = Arc::new(h.manager);

    let mut handles = Vec::new();
    for i in 0..10 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager.add_username(&user, &format!("u{i}")).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut stored = h.storage.get(&user).await.unwrap().unwrap();
    stored.sort();
    let mut expected: Vec<String> = (0..10).map(|i| format!("u{i}")).collect();
    expected.sort();
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn active_view_tracks_sign_in_and_typing() {
    let user = UserId::generate();
    let h = harness(
        MockIdentitySource::new(),
        MockAccountDirectory::new().with_account(user, AccountProfile::with_email("me@vault.io")),
    );
    let mut view = h.manager.watch_active_recent(2);

    assert_eq!(view.next().await.unwrap(), Vec::<String>::new());

    h.accounts.activate(user);
    assert_eq!(view.next().await.unwrap(), Vec::<String>::new());

    for name in ["a", "b", "c"] {
        h.manager.add_username(&user, name).await;
        let latest = view.next().await.unwrap();
        assert_eq!(latest.first().map(String::as_str), Some(name));
        assert!(latest.len() <= 2);
    }

    h.accounts.set_active(Some(ActiveAccount::new(UserId::generate())));
    assert_eq!(view.next().await.unwrap(), Vec::<String>::new());
}
