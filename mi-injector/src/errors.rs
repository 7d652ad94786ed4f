use mi_core::errors::*;

err_impl! {InjectorError,
    #[error("invalid injector configuration: {0}")]
    InvalidConfig(String),

    #[error("volume {0:?} is already present in the pod spec")]
    VolumeCollision(String),

    #[error("value for custom attribute {0:?} is empty")]
    EmptyCustomAttribute(String),

    #[error("ClusterRoleBinding {0:?} not found; it must be created when the operator is installed")]
    ClusterRoleBindingNotFound(String),

    #[error("namespace {0:?} not found")]
    NamespaceNotFound(String),
}

impl InjectorError {
    // True for both our own not-found errors and a 404 coming back from the API server
    pub fn is_not_found(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<InjectorError>(),
            Some(InjectorError::ClusterRoleBindingNotFound(_) | InjectorError::NamespaceNotFound(_))
        ) || mi_core::k8s::is_not_found(err)
    }
}
