use super::*;
use deny_controller_core::{selector, Outcome};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn added_then_deleted() {
    let store = FakeStore::default();
    let (dispatcher, metrics) = dispatcher(&store);

    dispatcher.handle(WatchEvent::Added(block_x())).await;

    let policy = store
        .get("team-a", "deny-team-a-block-x")
        .expect("policy must be created");
    assert_eq!(policy.spec.selector, "app == 'web'");
    assert_eq!(policy.spec.order, Some(100.0));
    let source = policy.spec.ingress[0].source.clone().expect("source");
    assert_eq!(source.selector.as_deref(), Some("app == 'db'"));
    assert_eq!(
        source.namespace_selector.as_deref(),
        Some("projectcalico.org/name == 'team-b'")
    );
    assert_eq!(metrics.count("team-a", Outcome::Applied), 1);

    dispatcher.handle(WatchEvent::Deleted(block_x())).await;

    assert!(store.get("team-a", "deny-team-a-block-x").is_none());
    assert_eq!(store.len(), 0);
    assert_eq!(metrics.count("team-a", Outcome::Deleted), 1);
    assert_eq!(metrics.count("team-a", Outcome::DeleteFailed), 0);
    assert_eq!(
        store.calls(),
        vec![
            Call::Create("deny-team-a-block-x".to_string()),
            Call::Delete("deny-team-a-block-x".to_string()),
        ]
    );
}

#[tokio::test]
async fn repeated_apply_patches() {
    let store = FakeStore::default();
    let (dispatcher, metrics) = dispatcher(&store);

    dispatcher.handle(WatchEvent::Added(block_x())).await;
    let first = store.get("team-a", "deny-team-a-block-x").expect("created");

    // A re-established watch replays the object.
    dispatcher.handle(WatchEvent::Added(block_x())).await;
    let second = store.get("team-a", "deny-team-a-block-x").expect("patched");

    assert_eq!(first.spec, second.spec);
    assert_eq!(store.len(), 1);
    assert_eq!(metrics.count("team-a", Outcome::Applied), 2);
    assert_eq!(
        store.calls(),
        vec![
            Call::Create("deny-team-a-block-x".to_string()),
            Call::Create("deny-team-a-block-x".to_string()),
            Call::Patch("deny-team-a-block-x".to_string()),
        ]
    );
}

#[tokio::test]
async fn modified_replaces_spec() {
    let store = FakeStore::default();
    let (dispatcher, _) = dispatcher(&store);

    dispatcher.handle(WatchEvent::Added(block_x())).await;
    let modified = custom_deny(
        "team-a",
        "block-x",
        serde_json::json!({
            "sourceNamespace": "team-c",
            "targetLabels": { "app": "api" },
        }),
    );
    dispatcher.handle(WatchEvent::Modified(modified)).await;

    let policy = store.get("team-a", "deny-team-a-block-x").expect("policy");
    assert_eq!(policy.spec.selector, "app == 'api'");
    let source = policy.spec.ingress[0].source.clone().expect("source");
    assert_eq!(source.selector.as_deref(), Some(selector::MATCH_ALL));
    assert_eq!(
        source.namespace_selector.as_deref(),
        Some("projectcalico.org/name == 'team-c'")
    );
}

#[tokio::test]
async fn deleting_missing_policy_fails() {
    let store = FakeStore::default();
    let (dispatcher, metrics) = dispatcher(&store);

    dispatcher.handle(WatchEvent::Deleted(block_x())).await;

    assert_eq!(metrics.count("team-a", Outcome::DeleteFailed), 1);
    assert_eq!(metrics.count("team-a", Outcome::Deleted), 0);
    assert_eq!(
        store.calls(),
        vec![Call::Delete("deny-team-a-block-x".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn apply_failure_is_not_retried() {
    let store = FakeStore::default();
    store.set_unavailable(true);
    let (dispatcher, metrics) = dispatcher(&store);

    dispatcher.handle(WatchEvent::Added(block_x())).await;

    assert_eq!(metrics.count("team-a", Outcome::ApplyFailed), 1);
    assert_eq!(metrics.count("team-a", Outcome::Applied), 0);
    assert_eq!(
        store.calls(),
        vec![
            Call::Create("deny-team-a-block-x".to_string()),
            Call::Patch("deny-team-a-block-x".to_string()),
        ]
    );

    // Recovery of the store alone does not converge the intent.
    store.set_unavailable(false);
    time::sleep(time::Duration::from_secs(300)).await;
    assert_eq!(store.calls().len(), 2);
    assert_eq!(store.len(), 0);

    // Only the next event for the intent does.
    dispatcher.handle(WatchEvent::Modified(block_x())).await;
    assert!(store.get("team-a", "deny-team-a-block-x").is_some());
    assert_eq!(metrics.count("team-a", Outcome::Applied), 1);
}

#[tokio::test]
async fn missing_spec_is_dropped() {
    let store = FakeStore::default();
    let (dispatcher, metrics) = dispatcher(&store);

    let obj = DynamicObject::new("block-x", &CustomDeny::api_resource()).within("team-a");
    dispatcher.handle(WatchEvent::Added(obj)).await;

    assert_eq!(metrics.count("team-a", Outcome::ApplyFailed), 1);
    assert_eq!(store.calls(), Vec::<Call>::new());
}

#[tokio::test]
async fn quoted_values_are_rejected() {
    let store = FakeStore::default();
    let (dispatcher, metrics) = dispatcher(&store);

    let obj = custom_deny(
        "team-a",
        "block-x",
        serde_json::json!({ "sourceNamespace": "team-b' || all() || '" }),
    );
    dispatcher.handle(WatchEvent::Added(obj)).await;

    assert_eq!(metrics.count("team-a", Outcome::ApplyFailed), 1);
    assert_eq!(store.calls(), Vec::<Call>::new());
}

#[tokio::test]
async fn objects_without_identity_are_ignored() {
    let store = FakeStore::default();
    let (dispatcher, _) = dispatcher(&store);

    let cluster_scoped = DynamicObject::new("block-x", &CustomDeny::api_resource())
        .data(serde_json::json!({ "spec": {} }));
    dispatcher
        .handle(WatchEvent::Added(cluster_scoped.clone()))
        .await;
    dispatcher.handle(WatchEvent::Deleted(cluster_scoped)).await;

    assert_eq!(store.calls(), Vec::<Call>::new());
}

#[tokio::test]
async fn bookmarks_are_ignored() {
    let store = FakeStore::default();
    let (dispatcher, metrics) = dispatcher(&store);

    dispatcher.handle(bookmark()).await;

    assert_eq!(store.calls(), Vec::<Call>::new());
    for outcome in [
        Outcome::Applied,
        Outcome::ApplyFailed,
        Outcome::Deleted,
        Outcome::DeleteFailed,
    ] {
        assert_eq!(metrics.count("team-a", outcome), 0);
    }
}
