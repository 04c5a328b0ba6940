//! Drives the live StatefulSet towards the synthesized manifest.

use k8s_openapi::api::apps::v1::StatefulSet;
use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::crds::EtcdCluster;
use crate::error::{OperatorError, Result};
use crate::resources::EtcdStatefulSet;
use crate::store::{ObjectStore, StoreError};

/// What a successful pass did.
#[derive(Clone, Debug)]
pub enum ReconcileOutcome {
    Created(StatefulSet),
    Updated(StatefulSet),
}

impl ReconcileOutcome {
    pub fn object(&self) -> &StatefulSet {
        match self {
            ReconcileOutcome::Created(sts) | ReconcileOutcome::Updated(sts) => sts,
        }
    }

    /// Metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Created(_) => "created",
            ReconcileOutcome::Updated(_) => "updated",
        }
    }
}

/// Create-or-update of one StatefulSet per pass.
///
/// Passes for the same cluster must not overlap; the controller runtime
/// serializes them per object. Conflicts are returned, never retried here.
pub struct Reconciler<S> {
    store: S,
}

impl<S: ObjectStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Synthesize the manifest for `cluster` and reconcile it.
    pub async fn reconcile_cluster(
        &self,
        cluster: &EtcdCluster,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        if cancel.is_cancelled() {
            return Err(OperatorError::Cancelled);
        }
        let manifest = EtcdStatefulSet::build(cluster)?;
        debug!(name = %cluster.name_any(), "Reconciling synthesized StatefulSet");
        self.reconcile(&manifest, cancel).await
    }

    /// Create the StatefulSet when absent, otherwise update its mutable part.
    /// Cancellation drops the in-flight request and returns [`OperatorError::Cancelled`].
    pub async fn reconcile(
        &self,
        manifest: &EtcdStatefulSet,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(name = %manifest.identity.name, "Reconciliation cancelled");
                Err(OperatorError::Cancelled)
            }
            res = self.apply(manifest) => res,
        }
    }

    async fn apply(&self, manifest: &EtcdStatefulSet) -> Result<ReconcileOutcome> {
        let id = &manifest.identity;
        let key = format!("{}/{}", id.namespace, id.name);

        let live = self
            .store
            .get(&id.namespace, &id.name)
            .await
            .map_err(|e| store_error(e, &key))?;

        let Some(live) = live else {
            return self.create(manifest, &key).await;
        };

        let update = manifest.update_for(&live)?;
        match self.store.update(&update).await {
            Ok(sts) => {
                info!(
                    name = %id.name,
                    namespace = %id.namespace,
                    replicas = update.replicas,
                    "Updated StatefulSet"
                );
                Ok(ReconcileOutcome::Updated(sts))
            }
            Err(StoreError::NotFound) => {
                info!(name = %id.name, namespace = %id.namespace, "StatefulSet vanished before update, recreating");
                self.create(manifest, &key).await
            }
            Err(e) => Err(store_error(e, &key)),
        }
    }

    async fn create(&self, manifest: &EtcdStatefulSet, key: &str) -> Result<ReconcileOutcome> {
        let sts = self
            .store
            .create(&manifest.to_stateful_set())
            .await
            .map_err(|e| store_error(e, key))?;
        info!(
            name = %manifest.identity.name,
            namespace = %manifest.identity.namespace,
            replicas = manifest.mutable.replicas,
            "Created StatefulSet"
        );
        Ok(ReconcileOutcome::Created(sts))
    }
}

fn store_error(err: StoreError, key: &str) -> OperatorError {
    match err {
        StoreError::Conflict | StoreError::AlreadyExists => {
            OperatorError::ObjectConflict(format!("StatefulSet {key}"))
        }
        StoreError::NotFound => {
            OperatorError::RuntimeUnavailable(format!("StatefulSet {key} not found"))
        }
        StoreError::Unavailable(msg) => OperatorError::RuntimeUnavailable(msg),
        StoreError::Encode(e) => OperatorError::Serialization(e),
    }
}
