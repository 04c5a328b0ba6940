use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperatorError {
    /// The cluster intent cannot be synthesized (missing storage, malformed
    /// override shape, missing identity).
    #[error("Invalid cluster intent: {0}")]
    InvalidIntent(String),

    /// The pod template override does not fit the generated pod spec.
    #[error("Pod template merge conflict: {0}")]
    MergeConflict(String),

    /// The live object changed since it was read.
    #[error("Object {0} was modified concurrently, restart the pass from a fresh read")]
    ObjectConflict(String),

    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Reconciliation cancelled")]
    Cancelled,

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, OperatorError>;

impl OperatorError {
    /// Whether this error is transient and the reconciliation should be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OperatorError::ObjectConflict(_)
                | OperatorError::RuntimeUnavailable(_)
                | OperatorError::Kube(_)
        )
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OperatorError::InvalidIntent(_) => "invalid_intent",
            OperatorError::MergeConflict(_) => "merge_conflict",
            OperatorError::ObjectConflict(_) => "object_conflict",
            OperatorError::RuntimeUnavailable(_) => "runtime_unavailable",
            OperatorError::Cancelled => "cancelled",
            OperatorError::Kube(_) => "kube",
            OperatorError::Serialization(_) => "serialization",
            OperatorError::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(OperatorError::ObjectConflict("default/etcd".into()).is_transient());
        assert!(OperatorError::RuntimeUnavailable("timeout".into()).is_transient());
        assert!(!OperatorError::InvalidIntent("no storage".into()).is_transient());
        assert!(!OperatorError::MergeConflict("bad type".into()).is_transient());
        assert!(!OperatorError::Cancelled.is_transient());
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(OperatorError::Cancelled.kind(), "cancelled");
        assert_eq!(
            OperatorError::InvalidIntent(String::new()).kind(),
            "invalid_intent"
        );
    }
}
