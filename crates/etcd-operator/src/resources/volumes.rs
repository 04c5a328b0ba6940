use k8s_openapi::api::core::v1::{
    EmptyDirVolumeSource, PersistentVolumeClaimVolumeSource, SecretVolumeSource, Volume,
    VolumeMount,
};

use crate::constants::{paths, volumes};
use crate::crds::common::{StorageSpec, VolumeClaimTemplateSpec};
use crate::error::{OperatorError, Result};
use crate::resources::tls::{PeerTls, TlsPlan};

/// Resolved backing for the data volume.
#[derive(Clone, Copy, Debug)]
pub enum DataStorage<'a> {
    Ephemeral(&'a EmptyDirVolumeSource),
    Claim(&'a VolumeClaimTemplateSpec),
}

impl<'a> DataStorage<'a> {
    pub fn from_spec(storage: &'a StorageSpec) -> Result<Self> {
        match (&storage.empty_dir, &storage.volume_claim_template) {
            (Some(empty_dir), _) => Ok(DataStorage::Ephemeral(empty_dir)),
            (None, Some(vct)) => Ok(DataStorage::Claim(vct)),
            (None, None) => Err(OperatorError::InvalidIntent(
                "storage must set either emptyDir or volumeClaimTemplate".into(),
            )),
        }
    }
}

/// Claim template name. The StatefulSet controller substitutes the pod volume
/// with the same name, so it falls back to the data volume name.
pub fn claim_name(vct: &VolumeClaimTemplateSpec) -> String {
    vct.name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| volumes::DATA.to_string())
}

/// A secret-backed certificate volume and where it is mounted.
struct CertVolume<'a> {
    name: &'static str,
    secret: Option<&'a str>,
    mount_path: &'static str,
}

/// Certificate volumes in contract order: peer CA, peer cert, server cert, client CA.
fn cert_volumes(tls: &TlsPlan) -> Vec<CertVolume<'_>> {
    let mut out = Vec::new();

    if let PeerTls::Explicit {
        ca_secret,
        cert_secret,
    } = &tls.peer
    {
        out.push(CertVolume {
            name: volumes::PEER_CA,
            secret: ca_secret.as_deref(),
            mount_path: paths::PEER_CA_DIR,
        });
        out.push(CertVolume {
            name: volumes::PEER_CERT,
            secret: Some(cert_secret),
            mount_path: paths::PEER_CERT_DIR,
        });
    }

    if let Some(secret) = &tls.server_secret {
        out.push(CertVolume {
            name: volumes::SERVER_CERT,
            secret: Some(secret),
            mount_path: paths::SERVER_CERT_DIR,
        });
    }

    if let Some(secret) = &tls.client_ca_secret {
        out.push(CertVolume {
            name: volumes::CLIENT_CA,
            secret: Some(secret),
            mount_path: paths::CLIENT_CA_DIR,
        });
    }

    out
}

/// Pod volumes: data first, then certificate volumes.
pub fn build_volumes(storage: DataStorage<'_>, tls: &TlsPlan) -> Vec<Volume> {
    let data = match storage {
        DataStorage::Ephemeral(empty_dir) => Volume {
            name: volumes::DATA.into(),
            empty_dir: Some(empty_dir.clone()),
            ..Default::default()
        },
        DataStorage::Claim(vct) => Volume {
            name: volumes::DATA.into(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim_name(vct),
                ..Default::default()
            }),
            ..Default::default()
        },
    };

    let mut out = vec![data];
    out.extend(cert_volumes(tls).into_iter().map(|cv| Volume {
        name: cv.name.into(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(cv.secret.unwrap_or_default().to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }));
    out
}

/// Container mounts, index-aligned with [`build_volumes`].
pub fn build_volume_mounts(tls: &TlsPlan) -> Vec<VolumeMount> {
    let mut out = vec![VolumeMount {
        name: volumes::DATA.into(),
        mount_path: paths::DATA_DIR.into(),
        read_only: Some(false),
        ..Default::default()
    }];
    out.extend(cert_volumes(tls).into_iter().map(|cv| VolumeMount {
        name: cv.name.into(),
        mount_path: cv.mount_path.into(),
        read_only: Some(true),
        ..Default::default()
    }));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::common::{SecuritySpec, TlsSpec};

    fn ephemeral() -> StorageSpec {
        StorageSpec {
            empty_dir: Some(EmptyDirVolumeSource::default()),
            volume_claim_template: None,
        }
    }

    fn plan(peer: bool, server: bool, client: bool) -> TlsPlan {
        let pick = |on: bool, v: &str| on.then(|| v.to_string());
        TlsPlan::from_security(Some(&SecuritySpec {
            tls: TlsSpec {
                peer_trusted_ca_secret: pick(peer, "peer-ca"),
                peer_secret: pick(peer, "p"),
                server_secret: pick(server, "s"),
                client_trusted_ca_secret: pick(client, "c"),
            },
        }))
    }

    #[test]
    fn test_missing_storage_is_invalid_intent() {
        let err = DataStorage::from_spec(&StorageSpec::default()).unwrap_err();
        assert!(matches!(err, OperatorError::InvalidIntent(_)));
    }

    #[test]
    fn test_empty_dir_wins_over_claim() {
        let storage = StorageSpec {
            empty_dir: Some(EmptyDirVolumeSource::default()),
            volume_claim_template: Some(serde_json::from_str("{}").unwrap()),
        };
        assert!(matches!(
            DataStorage::from_spec(&storage).unwrap(),
            DataStorage::Ephemeral(_)
        ));
    }

    #[test]
    fn test_claim_volume_uses_claim_name() {
        let storage = StorageSpec {
            empty_dir: None,
            volume_claim_template: Some(serde_json::from_str(r#"{"name": "etcd-data"}"#).unwrap()),
        };
        let volumes = build_volumes(DataStorage::from_spec(&storage).unwrap(), &plan(false, false, false));
        let pvc = volumes[0].persistent_volume_claim.as_ref().unwrap();
        assert_eq!(volumes[0].name, "data");
        assert_eq!(pvc.claim_name, "etcd-data");
    }

    #[test]
    fn test_claim_name_defaults_to_data() {
        let vct: VolumeClaimTemplateSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(claim_name(&vct), "data");
    }

    #[test]
    fn test_volumes_and_mounts_pair_for_every_tls_combination() {
        let storage = ephemeral();
        for mask in 0..8u8 {
            let tls = plan(mask & 1 != 0, mask & 2 != 0, mask & 4 != 0);
            let volumes = build_volumes(DataStorage::from_spec(&storage).unwrap(), &tls);
            let mounts = build_volume_mounts(&tls);

            assert_eq!(volumes.len(), mounts.len(), "mask {mask}");
            let volume_names: Vec<_> = volumes.iter().map(|v| v.name.as_str()).collect();
            let mount_names: Vec<_> = mounts.iter().map(|m| m.name.as_str()).collect();
            assert_eq!(volume_names, mount_names, "mask {mask}");
        }
    }

    #[test]
    fn test_full_tls_volume_order() {
        let volumes = build_volumes(
            DataStorage::from_spec(&ephemeral()).unwrap(),
            &plan(true, true, true),
        );
        let names: Vec<_> = volumes.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "data",
                "peer-trusted-ca-certificate",
                "peer-certificate",
                "server-certificate",
                "client-trusted-ca-certificate"
            ]
        );
        let secret = |i: usize| volumes[i].secret.as_ref().unwrap().secret_name.clone();
        assert_eq!(secret(1).as_deref(), Some("peer-ca"));
        assert_eq!(secret(2).as_deref(), Some("p"));
        assert_eq!(secret(3).as_deref(), Some("s"));
        assert_eq!(secret(4).as_deref(), Some("c"));
    }

    #[test]
    fn test_mount_paths_and_read_only() {
        let mounts = build_volume_mounts(&plan(true, true, true));
        let paths: Vec<_> = mounts.iter().map(|m| m.mount_path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/var/run/etcd",
                "/etc/etcd/pki/peer/ca",
                "/etc/etcd/pki/peer/cert",
                "/etc/etcd/pki/server/cert",
                "/etc/etcd/pki/client/ca"
            ]
        );
        assert_eq!(mounts[0].read_only, Some(false));
        assert!(mounts[1..].iter().all(|m| m.read_only == Some(true)));
    }

    #[test]
    fn test_peer_secret_without_ca_still_emits_ca_volume() {
        let tls = TlsPlan::from_security(Some(&SecuritySpec {
            tls: TlsSpec {
                peer_secret: Some("p".into()),
                ..Default::default()
            },
        }));
        let volumes = build_volumes(DataStorage::from_spec(&ephemeral()).unwrap(), &tls);
        assert_eq!(volumes.len(), 3);
        assert_eq!(volumes[1].name, "peer-trusted-ca-certificate");
        assert_eq!(
            volumes[1].secret.as_ref().unwrap().secret_name.as_deref(),
            Some("")
        );
    }
}
