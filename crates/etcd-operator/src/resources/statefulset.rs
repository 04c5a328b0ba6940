//! StatefulSet synthesis for an [`EtcdCluster`].
//!
//! The manifest is split into [`Identity`], fixed when the StatefulSet is
//! first created, and [`MutableSpec`], the only part an update may carry.
//! [`StatefulSetUpdate`] is built from `MutableSpec` alone, so selector,
//! service name and pod management policy never reach an update request.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, PodSpec, PodTemplateSpec,
    VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use serde_json::json;
use tracing::debug;

use crate::constants::defaults;
use crate::crds::common::VolumeClaimTemplateSpec;
use crate::crds::EtcdCluster;
use crate::error::{OperatorError, Result};
use crate::resources::container::build_etcd_container;
use crate::resources::labels::{cluster_label_selector, pod_template_labels};
use crate::resources::pod_merge::merge_pod_spec;
use crate::resources::tls::TlsPlan;
use crate::resources::volumes::{self, DataStorage};

/// Write-once part of the manifest.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub owner_reference: OwnerReference,
    pub service_name: String,
    pub pod_management_policy: String,
    pub selector: BTreeMap<String, String>,
    pub volume_claim_templates: Vec<PersistentVolumeClaim>,
}

/// Claim template metadata that may follow the cluster spec after creation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClaimMetadata {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

/// Fields that may change on an existing StatefulSet.
#[derive(Clone, Debug, PartialEq)]
pub struct MutableSpec {
    pub replicas: i32,
    pub template: PodTemplateSpec,
    pub claim_metadata: Vec<ClaimMetadata>,
}

/// Fully synthesized StatefulSet for one cluster.
#[derive(Clone, Debug, PartialEq)]
pub struct EtcdStatefulSet {
    pub identity: Identity,
    pub mutable: MutableSpec,
}

impl EtcdStatefulSet {
    /// Synthesize the manifest for `cluster`. Pure apart from debug logging.
    pub fn build(cluster: &EtcdCluster) -> Result<Self> {
        let name = cluster.name_any();
        let namespace = cluster.namespace().ok_or_else(|| {
            OperatorError::InvalidIntent(format!("EtcdCluster {name} has no namespace"))
        })?;
        let owner_reference = owner_reference(cluster)?;
        let spec = &cluster.spec;

        let storage = DataStorage::from_spec(&spec.storage)?;
        let tls = TlsPlan::from_security(spec.security.as_ref());

        let base = PodSpec {
            containers: vec![build_etcd_container(&name, &spec.options, &tls)],
            volumes: Some(volumes::build_volumes(storage, &tls)),
            ..Default::default()
        };
        let overlay = spec.pod_template()?;
        let pod_spec = match &overlay.spec {
            Some(overlay) => merge_pod_spec(&base, overlay)?,
            None => base,
        };

        let overlay_meta = overlay.metadata.as_ref();
        let template = PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(pod_template_labels(
                    &name,
                    overlay_meta.and_then(|m| m.labels.as_ref()),
                )),
                annotations: overlay_meta.and_then(|m| m.annotations.clone()),
                ..Default::default()
            }),
            spec: Some(pod_spec),
        };

        let (volume_claim_templates, claim_metadata) = match storage {
            DataStorage::Claim(vct) => (vec![build_claim_template(vct)], vec![claim_metadata(vct)]),
            DataStorage::Ephemeral(_) => (Vec::new(), Vec::new()),
        };

        debug!(
            name = %name,
            namespace = %namespace,
            replicas = spec.replicas,
            client_scheme = tls.client_scheme().as_str(),
            "Synthesized StatefulSet"
        );

        Ok(Self {
            identity: Identity {
                labels: cluster_label_selector(&name),
                selector: cluster_label_selector(&name),
                service_name: name.clone(),
                pod_management_policy: defaults::POD_MANAGEMENT_POLICY.into(),
                name,
                namespace,
                owner_reference,
                volume_claim_templates,
            },
            mutable: MutableSpec {
                replicas: spec.replicas,
                template,
                claim_metadata,
            },
        })
    }

    /// Full object for the create path.
    pub fn to_stateful_set(&self) -> StatefulSet {
        let id = &self.identity;
        let claims = id
            .volume_claim_templates
            .iter()
            .cloned()
            .map(|mut pvc| {
                let meta = self
                    .mutable
                    .claim_metadata
                    .iter()
                    .find(|m| Some(&m.name) == pvc.metadata.name.as_ref());
                if let Some(meta) = meta {
                    pvc.metadata.labels = non_empty(&meta.labels);
                    pvc.metadata.annotations = non_empty(&meta.annotations);
                }
                pvc
            })
            .collect::<Vec<_>>();

        StatefulSet {
            metadata: ObjectMeta {
                name: Some(id.name.clone()),
                namespace: Some(id.namespace.clone()),
                labels: Some(id.labels.clone()),
                owner_references: Some(vec![id.owner_reference.clone()]),
                ..Default::default()
            },
            spec: Some(StatefulSetSpec {
                replicas: Some(self.mutable.replicas),
                service_name: id.service_name.clone().into(),
                pod_management_policy: Some(id.pod_management_policy.clone()),
                selector: LabelSelector {
                    match_labels: Some(id.selector.clone()),
                    ..Default::default()
                },
                template: self.mutable.template.clone(),
                volume_claim_templates: (!claims.is_empty()).then_some(claims),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Update request against the observed `live` object.
    pub fn update_for(&self, live: &StatefulSet) -> Result<StatefulSetUpdate> {
        let resource_version = live.metadata.resource_version.clone().ok_or_else(|| {
            OperatorError::RuntimeUnavailable(format!(
                "StatefulSet {} has no resourceVersion",
                self.identity.name
            ))
        })?;

        let live_claims = live
            .spec
            .as_ref()
            .and_then(|s| s.volume_claim_templates.clone())
            .unwrap_or_default();

        Ok(StatefulSetUpdate {
            name: self.identity.name.clone(),
            namespace: self.identity.namespace.clone(),
            resource_version,
            replicas: self.mutable.replicas,
            template: self.mutable.template.clone(),
            volume_claim_templates: relabel_claims(&live_claims, &self.mutable.claim_metadata),
        })
    }
}

/// Update carrying only mutable fields, conditioned on a resourceVersion.
#[derive(Clone, Debug, PartialEq)]
pub struct StatefulSetUpdate {
    pub name: String,
    pub namespace: String,
    pub resource_version: String,
    pub replicas: i32,
    pub template: PodTemplateSpec,
    /// Live claim templates with refreshed metadata. `None` when unchanged.
    pub volume_claim_templates: Option<Vec<PersistentVolumeClaim>>,
}

impl StatefulSetUpdate {
    /// Strategic merge patch body. The pod template replaces the live one
    /// wholesale so fields dropped from the cluster spec are removed.
    pub fn to_patch(&self) -> serde_json::Result<serde_json::Value> {
        let mut template = serde_json::to_value(&self.template)?;
        if let Some(obj) = template.as_object_mut() {
            obj.insert("$patch".into(), json!("replace"));
        }

        let mut spec = json!({
            "replicas": self.replicas,
            "template": template,
        });
        if let Some(claims) = &self.volume_claim_templates {
            spec["volumeClaimTemplates"] = serde_json::to_value(claims)?;
        }

        Ok(json!({
            "metadata": { "resourceVersion": self.resource_version },
            "spec": spec,
        }))
    }
}

/// Returns the live claim templates with desired metadata applied, or `None`
/// when every template already carries it. Claim specs are never touched.
fn relabel_claims(
    live: &[PersistentVolumeClaim],
    desired: &[ClaimMetadata],
) -> Option<Vec<PersistentVolumeClaim>> {
    let mut changed = false;
    let claims = live
        .iter()
        .cloned()
        .map(|mut pvc| {
            let meta = desired
                .iter()
                .find(|m| Some(&m.name) == pvc.metadata.name.as_ref());
            if let Some(meta) = meta {
                let live_labels = pvc.metadata.labels.clone().unwrap_or_default();
                let live_annotations = pvc.metadata.annotations.clone().unwrap_or_default();
                if live_labels != meta.labels || live_annotations != meta.annotations {
                    changed = true;
                    pvc.metadata.labels = non_empty(&meta.labels);
                    pvc.metadata.annotations = non_empty(&meta.annotations);
                }
            }
            pvc
        })
        .collect();

    changed.then_some(claims)
}

fn build_claim_template(vct: &VolumeClaimTemplateSpec) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(volumes::claim_name(vct)),
            labels: non_empty(&vct.labels),
            annotations: non_empty(&vct.annotations),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vct.access_modes.clone()),
            storage_class_name: vct.storage_class_name.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".into(),
                    Quantity(vct.size.clone()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn claim_metadata(vct: &VolumeClaimTemplateSpec) -> ClaimMetadata {
    ClaimMetadata {
        name: volumes::claim_name(vct),
        labels: vct.labels.clone(),
        annotations: vct.annotations.clone(),
    }
}

/// Controller reference so deleting the cluster cascades to the StatefulSet.
fn owner_reference(cluster: &EtcdCluster) -> Result<OwnerReference> {
    let uid = cluster.metadata.uid.clone().ok_or_else(|| {
        OperatorError::InvalidIntent(format!("EtcdCluster {} has no uid", cluster.name_any()))
    })?;

    Ok(OwnerReference {
        api_version: EtcdCluster::api_version(&()).to_string(),
        kind: EtcdCluster::kind(&()).to_string(),
        name: cluster.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

fn non_empty(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    (!map.is_empty()).then(|| map.clone())
}
