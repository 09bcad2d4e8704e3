//! RemoteExecutor tests over the local transport.
//!
//! The local transport runs each command through `sh -c`, which lets
//! these tests exercise dispatch, tagging, fail-soft isolation and
//! timeouts without any reachable nodes.

use std::collections::HashSet;
use std::time::Duration;

use clusterhc_client::error::ClientError;
use clusterhc_client::{RemoteExecutor, Target, Transport, resolve_all};

fn target(addr: &str, internal: &str) -> Target {
    Target {
        user: "root".to_string(),
        addr: addr.to_string(),
        internal_addr: internal.to_string(),
    }
}

fn local_executor(targets: Vec<Target>, timeout: Duration) -> RemoteExecutor {
    RemoteExecutor::new(targets, Transport::Local, timeout).unwrap()
}

fn three_nodes() -> Vec<Target> {
    vec![
        target("node-a", "10.0.0.1"),
        target("node-b", "10.0.0.2"),
        target("node-c", "10.0.0.3"),
    ]
}

#[tokio::test]
async fn broadcast_returns_one_tagged_handle_per_target() {
    let rex = local_executor(three_nodes(), Duration::from_secs(5));
    let handles = rex.exec_broadcast("echo hello");
    assert_eq!(handles.len(), 3);

    let tagged: HashSet<String> = handles
        .iter()
        .map(|h| h.target().addr.clone())
        .collect();
    assert_eq!(tagged.len(), 3);

    for (_, outcome) in resolve_all(handles).await {
        assert_eq!(outcome.unwrap(), "hello\n");
    }
}

#[tokio::test]
async fn batch_keeps_input_cardinality() {
    let nodes = three_nodes();
    let rex = local_executor(nodes.clone(), Duration::from_secs(5));

    let jobs = vec![
        ("echo 1".to_string(), nodes[0].clone()),
        ("echo 2".to_string(), nodes[1].clone()),
        ("echo 3".to_string(), nodes[0].clone()),
        ("echo 4".to_string(), nodes[2].clone()),
    ];
    let handles = rex.exec_batch(jobs);
    assert_eq!(handles.len(), 4);

    let results = resolve_all(handles).await;
    assert_eq!(results[0].0, nodes[0]);
    assert_eq!(results[2].0, nodes[0]);
    assert_eq!(results[3].1.as_deref().unwrap(), "4\n");
}

#[tokio::test]
async fn one_failing_command_does_not_abort_the_batch() {
    let nodes = three_nodes();
    let rex = local_executor(nodes.clone(), Duration::from_secs(5));

    let jobs = vec![
        ("echo ok".to_string(), nodes[0].clone()),
        ("echo doomed >&2; exit 3".to_string(), nodes[1].clone()),
        ("echo ok".to_string(), nodes[2].clone()),
    ];
    let results = resolve_all(rex.exec_batch(jobs)).await;

    assert_eq!(results[0].1.as_deref().unwrap(), "ok\n");
    match &results[1].1 {
        Err(ClientError::RemoteCommandFailed { target, detail }) => {
            assert_eq!(target, "node-b");
            assert_eq!(detail, "doomed");
        }
        other => panic!("expected RemoteCommandFailed, got {other:?}"),
    }
    assert_eq!(results[2].1.as_deref().unwrap(), "ok\n");
}

#[tokio::test]
async fn timeout_fails_only_the_slow_handle() {
    let nodes = three_nodes();
    let rex = local_executor(nodes.clone(), Duration::from_millis(300));

    let jobs = vec![
        ("sleep 10".to_string(), nodes[0].clone()),
        ("echo fast".to_string(), nodes[1].clone()),
    ];
    let results = resolve_all(rex.exec_batch(jobs)).await;

    assert!(matches!(
        results[0].1,
        Err(ClientError::RemoteTimeout { .. })
    ));
    assert_eq!(results[1].1.as_deref().unwrap(), "fast\n");
}

#[tokio::test]
async fn exec_one_returns_raw_multiline_output() {
    let nodes = three_nodes();
    let rex = local_executor(nodes.clone(), Duration::from_secs(5));

    let output = rex
        .exec_one("printf 'first\\nsecond\\n'", &nodes[0])
        .await
        .unwrap();
    assert_eq!(output, "first\nsecond\n");
}

#[tokio::test]
async fn exec_one_surfaces_command_failure() {
    let nodes = three_nodes();
    let rex = local_executor(nodes.clone(), Duration::from_secs(5));

    let err = rex.exec_one("exit 7", &nodes[0]).await.unwrap_err();
    match err {
        ClientError::RemoteCommandFailed { detail, .. } => {
            assert!(detail.contains('7'), "detail was: {detail}");
        }
        other => panic!("expected RemoteCommandFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn address_map_round_trips_with_address_of() {
    let a = target("node-a", "10.0.0.1");
    let b = target("node-b", "10.0.0.2");
    let rex = local_executor(vec![a.clone(), b.clone()], Duration::from_secs(5));

    let map = rex.address_map();
    assert_eq!(map.get("node-a"), Some(&"10.0.0.1"));
    assert_eq!(map.get("node-b"), Some(&"10.0.0.2"));
    assert_eq!(rex.address_of(&a), "10.0.0.1");
    assert_eq!(rex.address_of(&b), "10.0.0.2");
}

#[tokio::test]
async fn check_connection_succeeds_locally_and_memoizes() {
    let rex = local_executor(three_nodes(), Duration::from_secs(5));
    assert!(rex.check_connection().await);
    assert!(rex.check_connection().await);
}

#[tokio::test]
async fn empty_target_set_is_rejected() {
    let err = RemoteExecutor::new(Vec::new(), Transport::Local, Duration::from_secs(5))
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidConfig(_)));
}
