//! etcd operator
//!
//! Synthesizes the StatefulSet for an `EtcdCluster` custom resource and keeps
//! the live object in line with it.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crds;
pub mod error;
pub mod metrics;
pub mod reconciler;
pub mod resources;
pub mod store;
pub mod telemetry;

pub use crds::EtcdCluster;
pub use error::{OperatorError, Result};
