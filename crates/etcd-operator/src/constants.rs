/// Kubernetes label keys following the app.kubernetes.io convention.
pub mod labels {
    pub const NAME: &str = "app.kubernetes.io/name";
    pub const INSTANCE: &str = "app.kubernetes.io/instance";
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
}

/// Label values.
pub mod values {
    pub const APP_NAME: &str = "etcd";
    pub const MANAGED_BY: &str = "etcd-operator";
}

/// Field manager used for server-side apply.
pub const FIELD_MANAGER: &str = "etcd-operator";

/// CRD API group. The `EtcdCluster` derive needs a literal, so this copy
/// exists for the CRD test that keeps the two equal.
pub const API_GROUP: &str = "etcd.kvstore.io";

/// Name of the single etcd container in every member pod.
pub const CONTAINER_NAME: &str = "etcd";

/// Fixed etcd listener ports.
pub mod ports {
    pub const CLIENT: i32 = 2379;
    pub const PEER: i32 = 2380;
    pub const METRICS: i32 = 2381;

    pub const CLIENT_NAME: &str = "client";
    pub const PEER_NAME: &str = "peer";
}

/// Health endpoints served on the metrics listener.
pub mod probes {
    pub const READYZ: &str = "/readyz?serializable=false";
    pub const LIVEZ: &str = "/livez";
    pub const PERIOD_SECONDS: i32 = 5;
}

/// Volume names. Position in the generated volume list is fixed:
/// data, peer CA, peer cert, server cert, client CA.
pub mod volumes {
    pub const DATA: &str = "data";
    pub const PEER_CA: &str = "peer-trusted-ca-certificate";
    pub const PEER_CERT: &str = "peer-certificate";
    pub const SERVER_CERT: &str = "server-certificate";
    pub const CLIENT_CA: &str = "client-trusted-ca-certificate";
}

/// Mount points. Argument strings reference files under these paths by
/// literal string, so they must not drift from the mounts.
pub mod paths {
    pub const DATA_DIR: &str = "/var/run/etcd";
    pub const PEER_CA_DIR: &str = "/etc/etcd/pki/peer/ca";
    pub const PEER_CERT_DIR: &str = "/etc/etcd/pki/peer/cert";
    pub const SERVER_CERT_DIR: &str = "/etc/etcd/pki/server/cert";
    pub const CLIENT_CA_DIR: &str = "/etc/etcd/pki/client/ca";

    /// Well-known key layout inside the referenced secrets.
    pub const CA_FILE: &str = "ca.crt";
    pub const CERT_FILE: &str = "tls.crt";
    pub const KEY_FILE: &str = "tls.key";
}

/// Environment variables resolved by the kubelet at pod start.
pub mod env {
    pub const POD_NAME: &str = "POD_NAME";
    pub const POD_NAMESPACE: &str = "POD_NAMESPACE";
}

/// Default resource values.
pub mod defaults {
    pub const IMAGE: &str = "quay.io/coreos/etcd:v3.5.12";
    pub const REPLICAS: i32 = 3;
    pub const STORAGE_SIZE: &str = "4Gi";
    pub const ACCESS_MODE: &str = "ReadWriteOnce";
    pub const LOG_LEVEL: &str = "info";
    pub const METRICS_ADDR: &str = "0.0.0.0:8080";

    /// Members start together; etcd itself decides membership.
    pub const POD_MANAGEMENT_POLICY: &str = "Parallel";

    /// Requeue intervals in seconds.
    pub const REQUEUE_READY_SECS: u64 = 60;
    pub const REQUEUE_PROGRESSING_SECS: u64 = 10;
    pub const REQUEUE_TRANSIENT_ERROR_SECS: u64 = 15;
    pub const REQUEUE_FATAL_ERROR_SECS: u64 = 300;
}
