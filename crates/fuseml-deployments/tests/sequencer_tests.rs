//! Sequencer and system domain integration tests

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use common::*;
use fuseml_core::options::InstallationOptions;
use fuseml_deployments::domain::{configure_knative_domain, ensure_system_domain};
use fuseml_deployments::options::{install_options, upgrade_options, SYSTEM_DOMAIN};
use fuseml_deployments::{Deployment, PlatformConfig, Sequencer};
use fuseml_kube::InstallContext;

/// Deployment that records every call in a shared journal
struct JournalDeployment {
    id: &'static str,
    journal: Arc<Mutex<Vec<String>>>,
    fail_deploy: bool,
}

#[async_trait]
impl Deployment for JournalDeployment {
    fn id(&self) -> &str {
        self.id
    }

    fn describe(&self) -> String {
        format!("{} (test)", self.id)
    }

    fn version(&self) -> String {
        "0.0.0".to_string()
    }

    async fn deploy(&self, _ctx: &InstallContext, options: &InstallationOptions) -> Result<()> {
        let domain = options.get_string(SYSTEM_DOMAIN, self.id)?;
        self.journal
            .lock()
            .unwrap()
            .push(format!("deploy {} {}", self.id, domain));
        if self.fail_deploy {
            bail!("{} exploded", self.id);
        }
        Ok(())
    }

    async fn upgrade(&self, _ctx: &InstallContext, _options: &InstallationOptions) -> Result<()> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("upgrade {}", self.id));
        Ok(())
    }

    async fn delete(&self, _ctx: &InstallContext) -> Result<()> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("delete {}", self.id));
        Ok(())
    }
}

const PLATFORM_IDS: [&str; 6] = [
    "istio",
    "fuseml-workloads",
    "gitea",
    "fuseml-registry",
    "tekton-pipelines",
    "fuseml-core",
];

fn journaled(failing: Option<&str>) -> (Sequencer, Arc<Mutex<Vec<String>>>) {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let deployments: Vec<Box<dyn Deployment>> = PLATFORM_IDS
        .iter()
        .map(|&id| {
            Box::new(JournalDeployment {
                id,
                journal: journal.clone(),
                fail_deploy: failing == Some(id),
            }) as Box<dyn Deployment>
        })
        .collect();
    (Sequencer::new(deployments), journal)
}

fn entries(journal: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    journal.lock().unwrap().clone()
}

// ============================================================================
// Sequencer
// ============================================================================

#[tokio::test]
async fn test_install_discovers_domain_after_mesh() {
    let cluster = Arc::new(FakeCluster::new().with_load_balancer(
        "istio-system",
        "istio-ingressgateway",
        "10.1.2.3",
    ));
    let runner = Arc::new(RecordingRunner::new());
    let ctx = context(&cluster, &runner);
    let (sequencer, journal) = journaled(None);
    let mut options = install_options("/srv/extensions").unwrap();

    sequencer.install(&ctx, &mut options).await.unwrap();

    assert_eq!(
        entries(&journal),
        vec![
            "deploy istio ",
            "deploy fuseml-workloads 10.1.2.3.nip.io",
            "deploy gitea 10.1.2.3.nip.io",
            "deploy fuseml-registry 10.1.2.3.nip.io",
            "deploy tekton-pipelines 10.1.2.3.nip.io",
            "deploy fuseml-core 10.1.2.3.nip.io",
        ]
    );
    assert_eq!(
        options.get_string(SYSTEM_DOMAIN, "").unwrap(),
        "10.1.2.3.nip.io"
    );
}

#[tokio::test]
async fn test_install_stops_at_first_failure() {
    let cluster = Arc::new(FakeCluster::new());
    let runner = Arc::new(RecordingRunner::new());
    let ctx = context(&cluster, &runner);
    let (sequencer, journal) = journaled(Some("gitea"));
    let mut options = options_with_domain();

    let err = sequencer.install(&ctx, &mut options).await.unwrap_err();

    assert_eq!(err.to_string(), "Failed to deploy gitea");
    assert!(format!("{:#}", err).contains("gitea exploded"));
    assert_eq!(entries(&journal).len(), 3);
}

#[tokio::test]
async fn test_uninstall_follows_removal_order() {
    let cluster = Arc::new(FakeCluster::new());
    let runner = Arc::new(RecordingRunner::new());
    let ctx = context(&cluster, &runner);
    let (sequencer, journal) = journaled(None);

    sequencer.uninstall(&ctx).await.unwrap();

    assert_eq!(
        entries(&journal),
        vec![
            "delete fuseml-workloads",
            "delete tekton-pipelines",
            "delete fuseml-registry",
            "delete gitea",
            "delete fuseml-core",
            "delete istio",
        ]
    );
}

#[tokio::test]
async fn test_upgrade_touches_only_core() {
    let cluster = Arc::new(FakeCluster::new());
    let runner = Arc::new(RecordingRunner::new());
    let ctx = context(&cluster, &runner);
    let (sequencer, journal) = journaled(None);
    let mut options = upgrade_options().unwrap();
    options.set(SYSTEM_DOMAIN, None, DOMAIN).unwrap();

    sequencer.upgrade(&ctx, &mut options).await.unwrap();

    assert_eq!(entries(&journal), vec!["upgrade fuseml-core"]);
}

#[tokio::test]
async fn test_platform_uninstall_on_empty_cluster_is_a_noop() {
    let cluster = Arc::new(FakeCluster::new());
    let runner = Arc::new(RecordingRunner::new());
    let ctx = context(&cluster, &runner);

    Sequencer::platform(PlatformConfig::default())
        .uninstall(&ctx)
        .await
        .unwrap();

    assert!(runner.invocations().is_empty());
    assert!(cluster.deleted_namespaces().is_empty());
}

#[tokio::test]
async fn test_platform_upgrade_requires_core() {
    let cluster = Arc::new(FakeCluster::new());
    let runner = Arc::new(RecordingRunner::new());
    let ctx = context(&cluster, &runner);
    let mut options = upgrade_options().unwrap();
    options.set(SYSTEM_DOMAIN, None, DOMAIN).unwrap();

    let err = Sequencer::platform(PlatformConfig::default())
        .upgrade(&ctx, &mut options)
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("Core component is not installed"));
}

// ============================================================================
// System domain
// ============================================================================

#[tokio::test]
async fn test_given_domain_is_kept() {
    let cluster = Arc::new(FakeCluster::new());
    let runner = Arc::new(RecordingRunner::new());
    let ctx = context(&cluster, &runner);
    let mut options = install_options("/srv/extensions").unwrap();
    options
        .set(SYSTEM_DOMAIN, None, "fuseml.example.com")
        .unwrap();

    let domain = ensure_system_domain(&ctx, &mut options).await.unwrap();

    assert_eq!(domain, "fuseml.example.com");
}

#[tokio::test]
async fn test_domain_from_traefik_without_mesh() {
    let cluster = Arc::new(FakeCluster::new().with_load_balancer(
        "kube-system",
        "traefik",
        "192.168.1.5",
    ));
    let runner = Arc::new(RecordingRunner::new());
    let ctx = context(&cluster, &runner);
    let mut options = install_options("/srv/extensions").unwrap();

    let domain = ensure_system_domain(&ctx, &mut options).await.unwrap();

    assert_eq!(domain, "192.168.1.5.nip.io");
}

#[tokio::test(start_paused = true)]
async fn test_domain_discovery_times_out() {
    let cluster = Arc::new(FakeCluster::new().with_service("istio-system", "istio-ingressgateway"));
    let runner = Arc::new(RecordingRunner::new());
    let ctx = context(&cluster, &runner);
    let mut options = install_options("/srv/extensions").unwrap();

    let start = tokio::time::Instant::now();
    let err = ensure_system_domain(&ctx, &mut options).await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(err
        .to_string()
        .starts_with("Timed out waiting for LoadBalancer IP on istio-ingressgateway service"));
    assert!(elapsed >= Duration::from_secs(120));
    assert!(elapsed <= Duration::from_secs(123));
    assert_eq!(options.get_string(SYSTEM_DOMAIN, "").unwrap(), "");
}

#[tokio::test]
async fn test_knative_domain_patched_when_present() {
    let cluster = Arc::new(FakeCluster::new().with_namespace("knative-serving", false));
    let runner = Arc::new(RecordingRunner::new());
    let ctx = context(&cluster, &runner);

    configure_knative_domain(&ctx, DOMAIN).await.unwrap();

    assert_eq!(
        runner.command_lines(),
        vec![r#"kubectl patch configmap config-domain -n knative-serving --type merge -p {"data":{"10.0.0.1.nip.io":""}}"#]
    );
}

#[tokio::test]
async fn test_knative_domain_skipped_without_knative() {
    let cluster = Arc::new(FakeCluster::new());
    let runner = Arc::new(RecordingRunner::new());
    let ctx = context(&cluster, &runner);

    configure_knative_domain(&ctx, DOMAIN).await.unwrap();

    assert!(runner.invocations().is_empty());
}
