//! Namespace ownership integration tests
//!
//! Tests ownership tracking including:
//! - Classification of absent, owned and foreign namespaces
//! - Label applied on creation
//! - Deletion gated on ownership
//! - Pod readiness waits

mod common;

use std::time::Duration;

use common::*;
use fuseml_kube::ownership::*;
use fuseml_kube::Cluster;
use fuseml_kube::pods::{wait_for_pod_by_selector_running, wait_until_pod_by_selector_exists};

#[tokio::test]
async fn test_absent_namespace_is_neither_owned_nor_foreign() {
    let cluster = FakeCluster::new();

    assert_eq!(
        namespace_state(&cluster, "mlflow").await.unwrap(),
        NamespaceState::Absent
    );
    assert!(!namespace_exists_and_owned(&cluster, "mlflow").await.unwrap());
    assert!(!namespace_exists_and_not_owned(&cluster, "mlflow").await.unwrap());
}

#[tokio::test]
async fn test_owned_and_foreign_namespaces() {
    let cluster = FakeCluster::new()
        .with_namespace("fuseml-core", true)
        .with_namespace("kube-system", false);

    assert!(namespace_exists_and_owned(&cluster, "fuseml-core").await.unwrap());
    assert!(namespace_exists_and_not_owned(&cluster, "kube-system").await.unwrap());
    assert!(!namespace_exists_and_owned(&cluster, "kube-system").await.unwrap());
}

#[tokio::test]
async fn test_label_with_other_value_is_foreign() {
    let cluster = FakeCluster::new().with_namespace("seldon-system", false);
    cluster
        .label_namespace("seldon-system", OWNERSHIP_LABEL_KEY, "false")
        .await
        .unwrap();

    assert!(namespace_exists_and_not_owned(&cluster, "seldon-system").await.unwrap());
}

#[tokio::test]
async fn test_create_carries_label() {
    let cluster = FakeCluster::new();

    create_owned_namespace(&cluster, "gitea").await.unwrap();

    let labels = cluster.labels("gitea").unwrap();
    assert_eq!(labels.get(OWNERSHIP_LABEL_KEY).unwrap(), "true");
    assert_eq!(cluster.created_namespaces(), vec!["gitea"]);
}

#[tokio::test]
async fn test_create_reuses_existing_namespace() {
    let cluster = FakeCluster::new().with_namespace("fuseml-workloads", true);

    create_owned_namespace(&cluster, "fuseml-workloads").await.unwrap();

    assert!(cluster.created_namespaces().is_empty());
}

#[tokio::test]
async fn test_label_marks_namespace_owned() {
    let cluster = FakeCluster::new().with_namespace("tekton-pipelines", false);

    label_namespace_owned(&cluster, "tekton-pipelines").await.unwrap();

    assert!(namespace_exists_and_owned(&cluster, "tekton-pipelines").await.unwrap());
}

#[tokio::test]
async fn test_delete_refuses_foreign_namespace() {
    let cluster = FakeCluster::new().with_namespace("istio-system", false);

    let deleted = delete_owned_namespace(&cluster, "istio-system", Duration::from_secs(5))
        .await
        .unwrap();

    assert!(!deleted);
    assert!(cluster.has_namespace("istio-system"));
    assert!(cluster.deleted_namespaces().is_empty());
}

#[tokio::test]
async fn test_delete_absent_namespace_is_noop() {
    let cluster = FakeCluster::new();

    let deleted = delete_owned_namespace(&cluster, "gitea", Duration::from_secs(5))
        .await
        .unwrap();

    assert!(!deleted);
}

#[tokio::test]
async fn test_delete_owned_namespace() {
    let cluster = FakeCluster::new().with_namespace("fuseml-registry", true);

    let deleted = delete_owned_namespace(&cluster, "fuseml-registry", Duration::from_secs(5))
        .await
        .unwrap();

    assert!(deleted);
    assert!(!cluster.has_namespace("fuseml-registry"));
    assert_eq!(cluster.deleted_namespaces(), vec!["fuseml-registry"]);
}

#[tokio::test]
async fn test_running_pods_satisfy_waits() {
    let cluster = FakeCluster::new().with_running_pod("istio-system", "istiod-abc");

    wait_until_pod_by_selector_exists(&cluster, "istio-system", "app=istiod", Duration::from_secs(5))
        .await
        .unwrap();
    wait_for_pod_by_selector_running(&cluster, "istio-system", "app=istiod", Duration::from_secs(5))
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_missing_pods_time_out() {
    let cluster = FakeCluster::new();

    let err = wait_until_pod_by_selector_exists(
        &cluster,
        "fuseml-core",
        "app.kubernetes.io/name=fuseml-core",
        Duration::from_secs(3),
    )
    .await
    .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("fuseml-core"));
}
