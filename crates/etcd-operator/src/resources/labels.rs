use std::collections::BTreeMap;

use crate::constants::{labels, values};

/// Identity labels for a cluster. Used as object labels and as the
/// StatefulSet selector, so the set must never change for a given name.
pub fn cluster_label_selector(cluster_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::NAME.into(), values::APP_NAME.into()),
        (labels::INSTANCE.into(), cluster_name.into()),
        (labels::MANAGED_BY.into(), values::MANAGED_BY.into()),
    ])
}

/// Pod template labels: identity labels with user labels layered on top.
pub fn pod_template_labels(
    cluster_name: &str,
    user_labels: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut labels = cluster_label_selector(cluster_name);
    if let Some(extra) = user_labels {
        labels.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    labels
}
