//! Layering of user pod spec overrides on top of the generated pod spec.
//!
//! Both sides are the same concrete type ([`PodSpec`]). Merging walks their
//! JSON form and consults [`MERGE_RULES`] for each field path:
//!
//! - objects (structs and string maps) merge key by key, override wins
//! - lists with a rule are merged element-wise by their identity key; a new
//!   key is appended, a matching key is deep-merged into the existing element
//! - every other list and every scalar is replaced by the override
//!
//! The merge does not check semantic dependencies between fields. An override
//! may re-point a mount the TLS settings rely on and still produce a spec.
//! Volumes are keyed by name only, so re-sourcing a generated volume (for
//! example `{"name": "data", "persistentVolumeClaim": {...}}`) deep-merges
//! into the generated entry and leaves it with two sources, which the API
//! server rejects. Change the data volume through `storage` instead.

use k8s_openapi::api::core::v1::PodSpec;
use serde_json::{Map, Value};

use crate::error::{OperatorError, Result};

/// How a field is combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// The override value replaces the baseline value.
    Replace,
    /// Field-by-field merge of two objects.
    Merge,
    /// Element-wise merge of two lists keyed by the named field.
    MergeByKey(&'static str),
}

/// Per-field rules. Paths use JSON field names, `[]` marks list elements.
/// Objects without a rule merge; lists without a rule are replaced.
pub const MERGE_RULES: &[(&str, Strategy)] = &[
    ("containers", Strategy::MergeByKey("name")),
    ("containers[].env", Strategy::MergeByKey("name")),
    ("containers[].ports", Strategy::MergeByKey("containerPort")),
    ("containers[].volumeMounts", Strategy::MergeByKey("mountPath")),
    ("containers[].volumeDevices", Strategy::MergeByKey("devicePath")),
    ("containers[].resizePolicy", Strategy::MergeByKey("resourceName")),
    ("containers[].args", Strategy::Replace),
    ("containers[].command", Strategy::Replace),
    ("containers[].envFrom", Strategy::Replace),
    ("initContainers", Strategy::MergeByKey("name")),
    ("initContainers[].env", Strategy::MergeByKey("name")),
    ("initContainers[].ports", Strategy::MergeByKey("containerPort")),
    ("initContainers[].volumeMounts", Strategy::MergeByKey("mountPath")),
    ("ephemeralContainers", Strategy::MergeByKey("name")),
    ("volumes", Strategy::MergeByKey("name")),
    ("imagePullSecrets", Strategy::MergeByKey("name")),
    ("hostAliases", Strategy::MergeByKey("ip")),
    ("topologySpreadConstraints", Strategy::MergeByKey("topologyKey")),
    ("resourceClaims", Strategy::MergeByKey("name")),
    ("tolerations", Strategy::Replace),
    ("nodeSelector", Strategy::Merge),
];

fn rule_for(path: &str) -> Option<Strategy> {
    MERGE_RULES
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(_, s)| *s)
}

/// Merge `overlay` onto `base`. Fails with [`OperatorError::MergeConflict`]
/// when the overlay does not fit the baseline's shape.
pub fn merge_pod_spec(base: &PodSpec, overlay: &PodSpec) -> Result<PodSpec> {
    let mut merged = serde_json::to_value(base)?;
    let patch = serde_json::to_value(overlay)?;

    merge_field(&mut merged, &patch, "")?;

    serde_json::from_value(merged)
        .map_err(|e| OperatorError::MergeConflict(format!("merged pod spec is invalid: {e}")))
}

fn merge_field(base: &mut Value, patch: &Value, path: &str) -> Result<()> {
    if patch.is_null() {
        return Ok(());
    }
    if base.is_null() {
        *base = patch.clone();
        return Ok(());
    }

    match rule_for(path) {
        Some(Strategy::Replace) => {
            *base = patch.clone();
            Ok(())
        }
        Some(Strategy::MergeByKey(key)) => match (base, patch) {
            (Value::Array(b), Value::Array(p)) => merge_keyed(b, p, key, path),
            _ => Err(shape_conflict(path, "a list")),
        },
        Some(Strategy::Merge) => match (base, patch) {
            (Value::Object(b), Value::Object(p)) => merge_object(b, p, path),
            _ => Err(shape_conflict(path, "an object")),
        },
        None => match (base, patch) {
            (Value::Object(b), Value::Object(p)) => merge_object(b, p, path),
            (b, p) if b.is_object() || p.is_object() || b.is_array() != p.is_array() => {
                Err(shape_conflict(path, describe(b)))
            }
            (b, p) => {
                *b = p.clone();
                Ok(())
            }
        },
    }
}

fn merge_object(base: &mut Map<String, Value>, patch: &Map<String, Value>, path: &str) -> Result<()> {
    for (key, value) in patch {
        let child = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };
        match base.get_mut(key) {
            Some(existing) => merge_field(existing, value, &child)?,
            None if value.is_null() => {}
            None => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(())
}

fn merge_keyed(base: &mut Vec<Value>, patch: &[Value], key: &str, path: &str) -> Result<()> {
    let element_path = format!("{path}[]");

    for item in patch {
        let id = merge_key(item, key).ok_or_else(|| {
            OperatorError::MergeConflict(format!(
                "{path}: entry is missing merge key `{key}`"
            ))
        })?;

        match base.iter_mut().find(|b| merge_key(b, key) == Some(id)) {
            Some(existing) => merge_field(existing, item, &element_path)?,
            None => base.push(item.clone()),
        }
    }
    Ok(())
}

fn merge_key<'a>(item: &'a Value, key: &str) -> Option<&'a Value> {
    item.as_object()?
        .get(key)
        .filter(|v| !v.is_null() && v.as_str() != Some(""))
}

fn shape_conflict(path: &str, expected: &str) -> OperatorError {
    OperatorError::MergeConflict(format!("{path}: override must be {expected}"))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "an object",
        Value::Array(_) => "a list",
        Value::String(_) => "a string",
        Value::Number(_) => "a number",
        Value::Bool(_) => "a boolean",
        Value::Null => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Container, EnvVar, Toleration, Volume, VolumeMount};

    fn base() -> PodSpec {
        PodSpec {
            containers: vec![Container {
                name: "etcd".into(),
                image: Some("etcd:v1".into()),
                args: Some(vec!["--a".into(), "--b".into()]),
                env: Some(vec![EnvVar {
                    name: "POD_NAME".into(),
                    value: Some("x".into()),
                    ..Default::default()
                }]),
                volume_mounts: Some(vec![VolumeMount {
                    name: "data".into(),
                    mount_path: "/var/run/etcd".into(),
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            volumes: Some(vec![Volume {
                name: "data".into(),
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    fn overlay(json: &str) -> PodSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_overlay_is_identity() {
        let merged = merge_pod_spec(&base(), &PodSpec::default()).unwrap();
        assert_eq!(merged, base());
    }

    #[test]
    fn test_env_added_to_existing_container() {
        let merged = merge_pod_spec(
            &base(),
            &overlay(r#"{"containers": [{"name": "etcd", "env": [{"name": "GOMAXPROCS", "value": "4"}]}]}"#),
        )
        .unwrap();

        assert_eq!(merged.containers.len(), 1);
        let c = &merged.containers[0];
        let names: Vec<_> = c.env.as_ref().unwrap().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["POD_NAME", "GOMAXPROCS"]);
        assert_eq!(c.image.as_deref(), Some("etcd:v1"));
        assert_eq!(c.volume_mounts.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_scalar_override_replaces() {
        let merged = merge_pod_spec(
            &base(),
            &overlay(r#"{"containers": [{"name": "etcd", "image": "etcd:v2"}], "priorityClassName": "high"}"#),
        )
        .unwrap();
        assert_eq!(merged.containers[0].image.as_deref(), Some("etcd:v2"));
        assert_eq!(merged.priority_class_name.as_deref(), Some("high"));
    }

    #[test]
    fn test_env_value_deep_merged_by_name() {
        let merged = merge_pod_spec(
            &base(),
            &overlay(r#"{"containers": [{"name": "etcd", "env": [{"name": "POD_NAME", "value": "y"}]}]}"#),
        )
        .unwrap();
        let env = merged.containers[0].env.as_ref().unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env[0].value.as_deref(), Some("y"));
    }

    #[test]
    fn test_new_container_appended() {
        let merged = merge_pod_spec(
            &base(),
            &overlay(r#"{"containers": [{"name": "sidecar", "image": "busybox"}]}"#),
        )
        .unwrap();
        let names: Vec<_> = merged.containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["etcd", "sidecar"]);
    }

    #[test]
    fn test_volumes_merged_by_name() {
        let merged = merge_pod_spec(
            &base(),
            &overlay(r#"{"volumes": [{"name": "scratch", "emptyDir": {}}]}"#),
        )
        .unwrap();
        let names: Vec<_> = merged.volumes.unwrap().into_iter().map(|v| v.name).collect();
        assert_eq!(names, ["data", "scratch"]);
    }

    #[test]
    fn test_resourced_volume_keeps_generated_source() {
        let mut generated = base();
        generated.volumes.as_mut().unwrap()[0].empty_dir = Some(Default::default());
        let merged = merge_pod_spec(
            &generated,
            &overlay(r#"{"volumes": [{"name": "data", "persistentVolumeClaim": {"claimName": "mine"}}]}"#),
        )
        .unwrap();
        let volumes = merged.volumes.unwrap();
        assert_eq!(volumes.len(), 1);
        assert!(volumes[0].empty_dir.is_some());
        assert_eq!(volumes[0].persistent_volume_claim.as_ref().unwrap().claim_name, "mine");
    }

    #[test]
    fn test_unkeyed_list_replaced() {
        let merged = merge_pod_spec(
            &base(),
            &overlay(r#"{"containers": [{"name": "etcd", "args": ["--only"]}]}"#),
        )
        .unwrap();
        assert_eq!(merged.containers[0].args.as_ref().unwrap(), &["--only"]);

        let mut with_tolerations = base();
        with_tolerations.tolerations = Some(vec![Toleration {
            key: Some("a".into()),
            ..Default::default()
        }]);
        let merged = merge_pod_spec(
            &with_tolerations,
            &overlay(r#"{"tolerations": [{"key": "b"}]}"#),
        )
        .unwrap();
        let keys: Vec<_> = merged.tolerations.unwrap().into_iter().filter_map(|t| t.key).collect();
        assert_eq!(keys, ["b"]);
    }

    #[test]
    fn test_node_selector_merged_as_map() {
        let mut b = base();
        b.node_selector = Some([("zone".to_string(), "a".to_string())].into());
        let merged = merge_pod_spec(
            &b,
            &overlay(r#"{"nodeSelector": {"disk": "ssd", "zone": "b"}}"#),
        )
        .unwrap();
        let sel = merged.node_selector.unwrap();
        assert_eq!(sel.get("zone").unwrap(), "b");
        assert_eq!(sel.get("disk").unwrap(), "ssd");
    }

    #[test]
    fn test_missing_merge_key_is_conflict() {
        let nameless = PodSpec {
            containers: vec![Container {
                image: Some("x".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = merge_pod_spec(&base(), &nameless).unwrap_err();
        assert!(matches!(err, OperatorError::MergeConflict(_)), "{err}");
    }

    #[test]
    fn test_shape_mismatch_is_conflict() {
        let mut b = serde_json::json!({"containers": [{"name": "etcd", "image": "x"}]});
        let p = serde_json::json!({"containers": [{"name": "etcd", "image": {"nested": true}}]});
        let err = merge_field(&mut b, &p, "").unwrap_err();
        assert!(matches!(err, OperatorError::MergeConflict(_)));

        let p = serde_json::json!({"containers": {"name": "etcd"}});
        let err = merge_field(&mut b, &p, "").unwrap_err();
        assert!(matches!(err, OperatorError::MergeConflict(_)));
    }

    #[test]
    fn test_rules_are_unique() {
        for (i, (path, _)) in MERGE_RULES.iter().enumerate() {
            assert!(
                MERGE_RULES[i + 1..].iter().all(|(p, _)| p != path),
                "duplicate rule for {path}"
            );
        }
    }
}
