use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Client, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::constants::{defaults, FIELD_MANAGER};
use crate::crds::common::Condition;
use crate::crds::{EtcdCluster, EtcdClusterStatus};
use crate::error::OperatorError;
use crate::metrics;
use crate::reconciler::Reconciler;
use crate::store::KubeStore;

/// Shared context for the EtcdCluster controller.
pub struct Context {
    pub client: Client,
    pub reconciler: Reconciler<KubeStore>,
    /// Fires on operator shutdown and aborts in-flight passes.
    pub shutdown: CancellationToken,
}

/// Run the controller until `shutdown` fires.
pub async fn run(client: Client, namespace: Option<String>, shutdown: CancellationToken) {
    let (clusters, statefulsets): (Api<EtcdCluster>, Api<StatefulSet>) = match &namespace {
        Some(ns) => (
            Api::namespaced(client.clone(), ns),
            Api::namespaced(client.clone(), ns),
        ),
        None => (Api::all(client.clone()), Api::all(client.clone())),
    };

    let ctx = Arc::new(Context {
        client: client.clone(),
        reconciler: Reconciler::new(KubeStore::new(client)),
        shutdown: shutdown.clone(),
    });

    info!(namespace = ?namespace, "Starting EtcdCluster controller");

    Controller::new(clusters, watcher::Config::default())
        .owns(statefulsets, watcher::Config::default())
        .graceful_shutdown_on(shutdown.cancelled_owned())
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _action)) => {
                    tracing::debug!(name = %obj.name, "Reconciled EtcdCluster");
                }
                Err(e) => {
                    error!("EtcdCluster reconciliation error: {:?}", e);
                }
            }
        })
        .await;

    info!("EtcdCluster controller stopped");
}

/// One pass: synthesize, create or update the StatefulSet, report status.
async fn reconcile(cluster: Arc<EtcdCluster>, ctx: Arc<Context>) -> Result<Action, OperatorError> {
    let name = cluster.name_any();
    let started = Instant::now();

    info!(name = %name, replicas = cluster.spec.replicas, "Reconciling EtcdCluster");

    match ctx.reconciler.reconcile_cluster(&cluster, &ctx.shutdown).await {
        Ok(outcome) => {
            let ready = outcome
                .object()
                .status
                .as_ref()
                .and_then(|s| s.ready_replicas)
                .unwrap_or(0);
            let status = progress_status(&cluster, ready);
            let requeue = requeue_after(&status);

            patch_status(&ctx.client, &cluster, &status).await?;
            metrics::record_reconciliation(outcome.as_str(), started.elapsed().as_secs_f64());
            Ok(Action::requeue(requeue))
        }
        Err(OperatorError::Cancelled) => Err(OperatorError::Cancelled),
        Err(e) => {
            metrics::record_error(e.kind());
            if !e.is_transient() {
                let status = failed_status(&cluster, &e);
                if let Err(patch_err) = patch_status(&ctx.client, &cluster, &status).await {
                    warn!(name = %name, "Failed to record failure status: {patch_err}");
                }
            }
            Err(e)
        }
    }
}

fn error_policy(cluster: Arc<EtcdCluster>, error: &OperatorError, _ctx: Arc<Context>) -> Action {
    warn!(name = %cluster.name_any(), kind = error.kind(), "EtcdCluster reconciliation error: {error}");
    Action::requeue(requeue_for_error(error))
}

/// Transient errors retry quickly, intent errors wait for the user.
pub fn requeue_for_error(error: &OperatorError) -> Duration {
    if error.is_transient() {
        Duration::from_secs(defaults::REQUEUE_TRANSIENT_ERROR_SECS)
    } else {
        Duration::from_secs(defaults::REQUEUE_FATAL_ERROR_SECS)
    }
}

fn requeue_after(status: &EtcdClusterStatus) -> Duration {
    if status.phase.as_deref() == Some("Ready") {
        Duration::from_secs(defaults::REQUEUE_READY_SECS)
    } else {
        Duration::from_secs(defaults::REQUEUE_PROGRESSING_SECS)
    }
}

/// Status after a successful pass.
pub fn progress_status(cluster: &EtcdCluster, ready_replicas: i32) -> EtcdClusterStatus {
    let desired = cluster.spec.replicas;
    let message = format!("{ready_replicas}/{desired} members ready");
    let (phase, condition) = if ready_replicas >= desired {
        ("Ready", make_condition("Ready", "True", "MembersReady", &message))
    } else {
        ("Progressing", make_condition("Ready", "False", "MembersStarting", &message))
    };

    EtcdClusterStatus {
        phase: Some(phase.into()),
        ready_replicas,
        observed_generation: cluster.metadata.generation,
        conditions: vec![condition],
    }
}

/// Status after a pass that cannot succeed without a spec change.
pub fn failed_status(cluster: &EtcdCluster, error: &OperatorError) -> EtcdClusterStatus {
    let reason = match error {
        OperatorError::InvalidIntent(_) => "InvalidSpec",
        OperatorError::MergeConflict(_) => "PodTemplateConflict",
        _ => "ReconcileFailed",
    };
    EtcdClusterStatus {
        phase: Some("Failed".into()),
        ready_replicas: cluster.status.as_ref().map_or(0, |s| s.ready_replicas),
        observed_generation: cluster.metadata.generation,
        conditions: vec![make_condition("Ready", "False", reason, &error.to_string())],
    }
}

async fn patch_status(
    client: &Client,
    cluster: &EtcdCluster,
    status: &EtcdClusterStatus,
) -> Result<(), OperatorError> {
    let namespace = cluster
        .namespace()
        .ok_or_else(|| OperatorError::InvalidIntent("EtcdCluster has no namespace".into()))?;
    let api: Api<EtcdCluster> = Api::namespaced(client.clone(), &namespace);
    let status_patch = serde_json::json!({ "status": status });
    api.patch_status(
        &cluster.name_any(),
        &PatchParams::apply(FIELD_MANAGER),
        &Patch::Merge(&status_patch),
    )
    .await?;
    Ok(())
}

fn make_condition(type_: &str, status: &str, reason: &str, message: &str) -> Condition {
    Condition {
        type_: type_.into(),
        status: status.into(),
        reason: Some(reason.into()),
        message: Some(message.into()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}
