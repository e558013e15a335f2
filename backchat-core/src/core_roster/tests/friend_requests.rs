//! Friend request lifecycle and duplicate handling

use super::support::{drain, friendship_row, harness, uid, user_row, with_gateway};
use crate::core_gateway::tables;
use crate::core_model::FriendshipStatus;
use proptest::prelude::*;

#[tokio::test]
async fn test_request_accept_makes_both_sides_friends() {
    let alice = harness("u-1");
    alice.gateway.seed(
        tables::USERS,
        vec![user_row("u-1", "alice"), user_row("u-2", "bob")],
    );
    let bob = with_gateway(alice.gateway.clone(), "u-2");

    alice.friends.subscribe().await.unwrap();
    bob.friends.subscribe().await.unwrap();

    let sent = alice.friends.send_friend_request(&uid("u-2")).await.unwrap();
    assert_eq!(sent.status, FriendshipStatus::Pending);
    drain().await;

    // Pending: bob sees an incoming request, nobody sees a friend yet
    assert!(alice.friends.friends().is_empty());
    assert!(alice.friends.requests().is_empty());
    let incoming = bob.friends.requests();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].sender.username, "alice");

    bob.friends.accept_request(&sent.id).await.unwrap();
    drain().await;

    assert_eq!(alice.friends.friends().len(), 1);
    assert_eq!(alice.friends.friends()[0].friend.username, "bob");
    assert_eq!(bob.friends.friends().len(), 1);
    assert_eq!(bob.friends.friends()[0].friend.username, "alice");
    assert!(bob.friends.requests().is_empty());
}

#[tokio::test]
async fn test_duplicate_request_is_a_conflict_in_both_orders() {
    let h = harness("u-1");
    h.gateway.seed(
        tables::FRIENDSHIPS,
        vec![friendship_row("f-1", "u-2", "u-1", "pending")],
    );

    // The existing row has us as user2; sending the other way must
    // still collide.
    let err = h.friends.send_friend_request(&uid("u-2")).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(err.to_string().contains("pending"));
    assert_eq!(h.gateway.rows(tables::FRIENDSHIPS).len(), 1);
}

#[tokio::test]
async fn test_request_to_an_existing_friend_is_a_conflict() {
    let h = harness("u-1");
    h.gateway.seed(
        tables::FRIENDSHIPS,
        vec![friendship_row("f-1", "u-1", "u-2", "accepted")],
    );

    let err = h.friends.send_friend_request(&uid("u-2")).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(err.to_string().contains("already friends"));
}

#[tokio::test]
async fn test_self_request_is_rejected() {
    let h = harness("u-1");
    let err = h.friends.send_friend_request(&uid("u-1")).await.unwrap_err();
    assert!(matches!(err, crate::core_sync::SyncError::Validation(_)));
    assert!(h.gateway.rows(tables::FRIENDSHIPS).is_empty());
}

#[tokio::test]
async fn test_reject_removes_the_request_row() {
    let h = harness("u-1");
    h.gateway.seed(tables::USERS, vec![user_row("u-2", "bob")]);
    h.gateway.seed(
        tables::FRIENDSHIPS,
        vec![friendship_row("f-1", "u-2", "u-1", "pending")],
    );
    h.friends.subscribe().await.unwrap();
    assert_eq!(h.friends.requests().len(), 1);

    let id = h.friends.requests()[0].friendship_id.clone();
    h.friends.reject_request(&id).await.unwrap();
    drain().await;

    assert!(h.friends.requests().is_empty());
    assert!(h.gateway.rows(tables::FRIENDSHIPS).is_empty());
}

#[tokio::test]
async fn test_remove_friend_updates_the_collection() {
    let h = harness("u-1");
    h.gateway.seed(tables::USERS, vec![user_row("u-2", "bob")]);
    h.gateway.seed(
        tables::FRIENDSHIPS,
        vec![friendship_row("f-1", "u-1", "u-2", "accepted")],
    );
    h.friends.subscribe().await.unwrap();
    assert_eq!(h.friends.friends().len(), 1);

    let id = h.friends.friends()[0].friendship_id.clone();
    h.friends.remove_friend(&id).await.unwrap();
    drain().await;

    assert!(h.friends.friends().is_empty());
}

#[tokio::test]
async fn test_search_excludes_self_and_short_queries() {
    let h = harness("u-1");
    h.gateway.seed(
        tables::USERS,
        vec![
            user_row("u-1", "annika"),
            user_row("u-2", "anna"),
            user_row("u-3", "hannah"),
            user_row("u-4", "bob"),
        ],
    );

    // Below the minimum length: no results, no remote call needed
    assert!(h.friends.search_users("an").await.unwrap().is_empty());

    let hits = h.friends.search_users("ann").await.unwrap();
    let names: Vec<&str> = hits.iter().map(|p| p.username.as_str()).collect();
    // "annika" is the viewer and must not appear
    assert_eq!(names, vec!["anna", "hannah"]);
}

#[tokio::test]
async fn test_close_clears_collections_and_subscriptions() {
    let h = harness("u-1");
    h.gateway.seed(tables::USERS, vec![user_row("u-2", "bob")]);
    h.gateway.seed(
        tables::FRIENDSHIPS,
        vec![friendship_row("f-1", "u-1", "u-2", "accepted")],
    );
    h.friends.subscribe().await.unwrap();
    assert_eq!(h.gateway.active_subscriptions(), 2);
    assert_eq!(h.friends.friends().len(), 1);

    h.friends.close().await;
    assert_eq!(h.gateway.active_subscriptions(), 0);
    assert!(h.friends.friends().is_empty());
}

proptest! {
    // The duplicate check is symmetric: whichever side sent first, the
    // reverse request collides.
    #[test]
    fn prop_duplicate_check_is_order_independent(
        first_sender in 0usize..2,
        status in prop_oneof![Just("pending"), Just("accepted")],
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let users = ["u-1", "u-2"];
            let (a, b) = (users[first_sender], users[1 - first_sender]);

            let h = harness("u-1");
            h.gateway.seed(
                tables::FRIENDSHIPS,
                vec![friendship_row("f-1", a, b, status)],
            );

            let err = h.friends.send_friend_request(&uid("u-2")).await.unwrap_err();
            prop_assert!(err.is_conflict());
            prop_assert_eq!(h.gateway.rows(tables::FRIENDSHIPS).len(), 1);
            Ok(())
        })?;
    }
}
