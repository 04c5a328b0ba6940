pub mod cluster;
pub mod common;
pub mod defaults;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

pub use cluster::{EtcdCluster, EtcdClusterSpec, EtcdClusterStatus};
pub use common::{SecuritySpec, StorageSpec, TlsSpec, VolumeClaimTemplateSpec};

use crate::constants::FIELD_MANAGER;

/// Apply the EtcdCluster CRD with server-side apply, creating or upgrading it.
pub async fn install(client: Client) -> Result<(), kube::Error> {
    let crds: Api<CustomResourceDefinition> = Api::all(client);
    let crd = EtcdCluster::crd();
    let params = PatchParams::apply(FIELD_MANAGER).force();
    crds.patch(EtcdCluster::crd_name(), &params, &Patch::Apply(&crd))
        .await?;
    tracing::info!(crd = EtcdCluster::crd_name(), "Applied CRD");
    Ok(())
}
