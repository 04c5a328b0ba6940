//! Pure builders for the objects the operator owns.

pub mod args;
pub mod container;
pub mod labels;
pub mod pod_merge;
pub mod statefulset;
pub mod tls;
pub mod volumes;

pub use statefulset::{EtcdStatefulSet, StatefulSetUpdate};
