use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{Condition, SecuritySpec, StorageSpec};
use crate::error::{OperatorError, Result};

/// Desired state of an etcd cluster.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "etcd.kvstore.io",
    version = "v1alpha1",
    kind = "EtcdCluster",
    namespaced,
    status = "EtcdClusterStatus",
    shortname = "etcd",
    printcolumn = r#"{"name":"Ready","type":"integer","jsonPath":".status.readyReplicas"}"#,
    printcolumn = r#"{"name":"Desired","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EtcdClusterSpec {
    /// Number of etcd members.
    #[serde(default = "super::defaults::replicas")]
    pub replicas: i32,

    /// Extra etcd flags, rendered as `--name=value` (or `--name` when the
    /// value is empty) ahead of the operator-managed flags.
    #[serde(default)]
    pub options: BTreeMap<String, String>,

    /// Member data storage.
    #[serde(default)]
    pub storage: StorageSpec,

    /// Transport security.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecuritySpec>,

    /// Pod template fragment merged over the generated pod template. Kept
    /// untyped so a malformed fragment fails only its own cluster.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    #[schemars(schema_with = "super::common::raw_object_schema")]
    pub pod_template: serde_json::Value,
}

impl EtcdClusterSpec {
    /// Decode the pod template override. An absent override is empty.
    pub fn pod_template(&self) -> Result<PodTemplateSpec> {
        if self.pod_template.is_null() {
            return Ok(PodTemplateSpec::default());
        }
        serde_json::from_value(self.pod_template.clone())
            .map_err(|e| OperatorError::InvalidIntent(format!("podTemplate: {e}")))
    }
}

/// Status for EtcdCluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EtcdClusterStatus {
    /// Current phase: Pending, Progressing, Ready, Failed.
    #[serde(default)]
    pub phase: Option<String>,

    /// Number of ready members reported by the StatefulSet.
    #[serde(default)]
    pub ready_replicas: i32,

    /// Last observed generation.
    #[serde(default)]
    pub observed_generation: Option<i64>,

    /// Status conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
