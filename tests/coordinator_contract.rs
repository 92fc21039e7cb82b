use std::sync::{Arc, Mutex};

use jiff::{SignedDuration, Timestamp};
use marketplace_client::{Credential, RefreshCoordinator, RefreshError, RefreshRole};

fn credential(value: &str) -> Credential {
    let now = Timestamp::now();
    Credential::try_new(value.to_string(), now, now + SignedDuration::from_secs(900))
        .expect("valid credential")
}

#[tokio::test(flavor = "current_thread")]
async fn waiters_resolve_in_arrival_order() {
    let coordinator = Arc::new(RefreshCoordinator::new());
    let RefreshRole::Leader(guard) = coordinator.join() else {
        panic!("first join should lead");
    };

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    for label in ["a", "b", "c"] {
        let RefreshRole::Follower(waiter) = coordinator.join() else {
            panic!("join during a refresh should follow");
        };
        let order = order.clone();
        handles.push(tokio::spawn(async move {
            let outcome = waiter.outcome().await.expect("shared outcome");
            order.lock().unwrap().push(label);
            outcome.value().to_string()
        }));
    }

    // Let the waiter tasks park on their receivers before settling.
    tokio::task::yield_now().await;
    let notified = guard.settle(Ok(credential("shared")));
    assert_eq!(notified, 3);

    for handle in handles {
        assert_eq!(handle.await.expect("join"), "shared");
    }
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
}

#[tokio::test(flavor = "current_thread")]
async fn failure_fans_out_identically() {
    let coordinator = RefreshCoordinator::new();
    let RefreshRole::Leader(guard) = coordinator.join() else {
        panic!("first join should lead");
    };

    let mut waiters = Vec::new();
    for _ in 0..2 {
        let RefreshRole::Follower(waiter) = coordinator.join() else {
            panic!("join during a refresh should follow");
        };
        waiters.push(waiter);
    }

    guard.settle(Err(RefreshError::endpoint(
        reqwest::StatusCode::SERVICE_UNAVAILABLE,
        "session store offline",
    )));

    for waiter in waiters {
        let err = waiter.outcome().await.expect_err("waiters share the failure");
        assert_eq!(err.status, Some(503));
        assert!(err.message.contains("offline"));
    }
    assert!(!coordinator.is_refreshing());
}

#[tokio::test(flavor = "current_thread")]
async fn slot_reopens_after_each_settlement() {
    let coordinator = RefreshCoordinator::new();

    let RefreshRole::Leader(guard) = coordinator.join() else {
        panic!("first join should lead");
    };
    guard.settle(Ok(credential("one")));

    // Arriving after the settlement means leading a new refresh, not
    // observing the previous outcome.
    let RefreshRole::Leader(guard) = coordinator.join() else {
        panic!("post-settlement join should lead");
    };
    assert!(coordinator.is_refreshing());
    guard.settle(Ok(credential("two")));
    assert!(!coordinator.is_refreshing());
}

#[tokio::test(flavor = "current_thread")]
async fn no_waiters_is_a_valid_settlement() {
    let coordinator = RefreshCoordinator::new();
    let RefreshRole::Leader(guard) = coordinator.join() else {
        panic!("first join should lead");
    };
    assert_eq!(guard.settle(Ok(credential("solo"))), 0);
    assert!(!coordinator.is_refreshing());
}
