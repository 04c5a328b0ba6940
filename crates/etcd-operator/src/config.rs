use std::net::SocketAddr;

use clap::Parser;

use crate::constants::defaults;
use crate::error::{OperatorError, Result};

/// Operator process configuration. Every flag falls back to an environment
/// variable so the Deployment can be configured without arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "etcd-operator",
    about = "Kubernetes operator that manages etcd clusters",
    version
)]
pub struct OperatorConfig {
    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, env = "RUST_LOG", default_value = defaults::LOG_LEVEL)]
    pub log_level: String,

    /// Address of the metrics and health endpoint
    #[arg(long, env = "ETCD_OPERATOR_METRICS_ADDR", default_value = defaults::METRICS_ADDR)]
    pub metrics_addr: String,

    /// Apply the EtcdCluster CRD on startup
    #[arg(long, env = "ETCD_OPERATOR_INSTALL_CRDS")]
    pub install_crds: bool,

    /// Only watch EtcdClusters in this namespace (all namespaces when unset)
    #[arg(long, env = "ETCD_OPERATOR_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,
}

impl OperatorConfig {
    pub fn validate(&self) -> Result<()> {
        self.metrics_addr.parse::<SocketAddr>().map_err(|e| {
            OperatorError::Config(format!("invalid metrics address {}: {e}", self.metrics_addr))
        })?;
        if self.watch_namespace.as_deref() == Some("") {
            return Err(OperatorError::Config("watch namespace must not be empty".into()));
        }
        Ok(())
    }
}
