//! Object store seam between the reconciler and the Kubernetes API.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use thiserror::Error;

use crate::constants::FIELD_MANAGER;
use crate::resources::StatefulSetUpdate;

/// Outcome of a store call other than success.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object not found")]
    NotFound,

    #[error("object already exists")]
    AlreadyExists,

    /// The object's resourceVersion no longer matches the precondition.
    #[error("resource version conflict")]
    Conflict,

    #[error("object store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Read-then-write access to StatefulSets.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a StatefulSet, `None` when absent.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<StatefulSet>, StoreError>;

    async fn create(&self, object: &StatefulSet) -> Result<StatefulSet, StoreError>;

    /// Apply an update conditioned on its resourceVersion.
    async fn update(&self, update: &StatefulSetUpdate) -> Result<StatefulSet, StoreError>;
}

/// [`ObjectStore`] backed by the cluster API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<StatefulSet> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<StatefulSet>, StoreError> {
        self.api(namespace)
            .get_opt(name)
            .await
            .map_err(|e| classify(e, StoreError::Conflict))
    }

    async fn create(&self, object: &StatefulSet) -> Result<StatefulSet, StoreError> {
        let namespace = object.metadata.namespace.as_deref().unwrap_or("default");
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.into()),
            ..Default::default()
        };
        self.api(namespace)
            .create(&params, object)
            .await
            .map_err(|e| classify(e, StoreError::AlreadyExists))
    }

    async fn update(&self, update: &StatefulSetUpdate) -> Result<StatefulSet, StoreError> {
        let patch = update.to_patch()?;
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.into()),
            ..Default::default()
        };
        self.api(&update.namespace)
            .patch(&update.name, &params, &Patch::Strategic(&patch))
            .await
            .map_err(|e| classify(e, StoreError::Conflict))
    }
}

/// Map an API error onto the store outcomes. A 409 means a version conflict
/// on writes to existing objects and a name clash on create.
fn classify(err: kube::Error, on_conflict: StoreError) -> StoreError {
    match err {
        kube::Error::Api(kube::core::ErrorResponse { code: 404, .. }) => StoreError::NotFound,
        kube::Error::Api(kube::core::ErrorResponse { code: 409, .. }) => on_conflict,
        other => StoreError::Unavailable(other.to_string()),
    }
}
