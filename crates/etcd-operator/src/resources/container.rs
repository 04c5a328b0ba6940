use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMapEnvSource, Container, ContainerPort, EnvFromSource, EnvVar, EnvVarSource,
    HTTPGetAction, ObjectFieldSelector, Probe,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::constants::{self, env, ports, probes};
use crate::resources::args;
use crate::resources::tls::TlsPlan;
use crate::resources::volumes;

/// ConfigMap carrying initial-cluster bootstrap variables for a cluster.
pub fn cluster_state_config_map_name(cluster_name: &str) -> String {
    format!("{cluster_name}-cluster-state")
}

/// Build the etcd container.
pub fn build_etcd_container(
    cluster_name: &str,
    options: &BTreeMap<String, String>,
    tls: &TlsPlan,
) -> Container {
    Container {
        name: constants::CONTAINER_NAME.into(),
        image: Some(constants::defaults::IMAGE.into()),
        command: Some(args::build_command()),
        args: Some(args::build_args(cluster_name, options, tls)),
        ports: Some(vec![
            ContainerPort {
                name: Some(ports::PEER_NAME.into()),
                container_port: ports::PEER,
                ..Default::default()
            },
            ContainerPort {
                name: Some(ports::CLIENT_NAME.into()),
                container_port: ports::CLIENT,
                ..Default::default()
            },
        ]),
        env: Some(vec![
            field_ref_env(env::POD_NAME, "metadata.name"),
            field_ref_env(env::POD_NAMESPACE, "metadata.namespace"),
        ]),
        env_from: Some(vec![EnvFromSource {
            config_map_ref: Some(ConfigMapEnvSource {
                name: cluster_state_config_map_name(cluster_name).into(),
                ..Default::default()
            }),
            ..Default::default()
        }]),
        startup_probe: Some(health_probe(probes::READYZ)),
        readiness_probe: Some(health_probe(probes::READYZ)),
        liveness_probe: Some(health_probe(probes::LIVEZ)),
        volume_mounts: Some(volumes::build_volume_mounts(tls)),
        ..Default::default()
    }
}

/// Env var resolved by the kubelet from the pod's own metadata.
fn field_ref_env(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.into(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: field_path.into(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn health_probe(path: &str) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.into()),
            port: IntOrString::Int(ports::METRICS),
            ..Default::default()
        }),
        period_seconds: Some(probes::PERIOD_SECONDS),
        ..Default::default()
    }
}
