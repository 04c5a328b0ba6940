use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::EmptyDirVolumeSource;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Data storage for each member. Exactly one of the two sources must be set;
/// when both are present the ephemeral directive wins.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageSpec {
    /// Back the data directory with an ephemeral volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<EmptyDirVolumeSource>,

    /// Back the data directory with one PersistentVolumeClaim per member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_claim_template: Option<VolumeClaimTemplateSpec>,
}

/// PersistentVolumeClaim template for member data.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolumeClaimTemplateSpec {
    /// Claim template name. Defaults to the data volume name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Extra labels on the claim template.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Extra annotations on the claim template.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    /// Storage size (e.g., "4Gi").
    #[serde(default = "super::defaults::storage_size")]
    pub size: String,

    /// Access modes. Defaults to `["ReadWriteOnce"]`.
    #[serde(default = "super::defaults::access_modes")]
    pub access_modes: Vec<String>,

    /// Kubernetes StorageClass name. Cluster default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
}

/// Transport security settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySpec {
    #[serde(default)]
    pub tls: TlsSpec,
}

/// Secret references for etcd TLS. Each secret holds `tls.crt`/`tls.key`
/// or `ca.crt`. An empty string is the same as an absent reference.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsSpec {
    /// CA bundle trusted for peer connections. Mounted together with `peerSecret`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_trusted_ca_secret: Option<String>,

    /// Peer certificate and key. Enables mutual TLS between members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_secret: Option<String>,

    /// Server certificate and key. Switches the client listener to https.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_secret: Option<String>,

    /// CA bundle used to authenticate client certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_trusted_ca_secret: Option<String>,
}

/// Kubernetes-style condition for status reporting.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type (e.g., "Ready").
    #[serde(rename = "type")]
    pub type_: String,

    /// Status: "True", "False", or "Unknown".
    pub status: String,

    /// Machine-readable reason.
    #[serde(default)]
    pub reason: Option<String>,

    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,

    /// Last transition time (RFC 3339).
    #[serde(default)]
    pub last_transition_time: Option<String>,
}

/// Schema for fields holding arbitrary Kubernetes objects (pod template
/// overrides). The API server keeps unknown fields; structure is checked
/// when the override is merged.
pub fn raw_object_schema(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..Default::default()
    };
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".into(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_template_defaults() {
        let vct: VolumeClaimTemplateSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(vct.size, "4Gi");
        assert_eq!(vct.access_modes, vec!["ReadWriteOnce".to_string()]);
        assert!(vct.name.is_none());
        assert!(vct.storage_class_name.is_none());
    }

    #[test]
    fn test_tls_spec_camel_case() {
        let tls: TlsSpec = serde_json::from_str(
            r#"{"peerSecret": "p", "peerTrustedCaSecret": "pca", "serverSecret": "s", "clientTrustedCaSecret": "c"}"#,
        )
        .unwrap();
        assert_eq!(tls.peer_secret.as_deref(), Some("p"));
        assert_eq!(tls.peer_trusted_ca_secret.as_deref(), Some("pca"));
        assert_eq!(tls.server_secret.as_deref(), Some("s"));
        assert_eq!(tls.client_trusted_ca_secret.as_deref(), Some("c"));
    }

    #[test]
    fn test_raw_object_schema_preserves_unknown_fields() {
        let mut gen = SchemaGenerator::default();
        let schema = serde_json::to_value(raw_object_schema(&mut gen)).unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["x-kubernetes-preserve-unknown-fields"], true);
    }
}
