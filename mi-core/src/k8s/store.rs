use std::fmt;

use async_trait::async_trait;
use kube::api::PostParams;
use tracing::*;

use super::*;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn namespaced(namespace: &str, name: &str) -> ObjectKey {
        ObjectKey { namespace: Some(namespace.into()), name: name.into() }
    }

    pub fn cluster(name: &str) -> ObjectKey {
        ObjectKey { namespace: None, name: name.into() }
    }

    pub fn of<K: kube::Resource>(obj: &K) -> ObjectKey {
        ObjectKey { namespace: obj.namespace(), name: obj.name_any() }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}/{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Typed get/create/update access to one kind of Kubernetes object.  `get` returns `Ok(None)`
/// when the object doesn't exist; `update` is a full replace and must fail with a 409 Conflict
/// (see [`is_conflict`]) if the object's resourceVersion is stale.
#[async_trait]
pub trait ObjectStore<K>: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> anyhow::Result<Option<K>>;
    async fn create(&self, obj: &K) -> anyhow::Result<K>;
    async fn update(&self, obj: &K) -> anyhow::Result<K>;
}

/// Everything the injector needs to read or write while handling a pod.
pub trait ClusterStore:
    ObjectStore<corev1::Secret>
    + ObjectStore<corev1::ConfigMap>
    + ObjectStore<corev1::Namespace>
    + ObjectStore<rbacv1::ClusterRoleBinding>
{
}

impl<T> ClusterStore for T where
    T: ObjectStore<corev1::Secret>
        + ObjectStore<corev1::ConfigMap>
        + ObjectStore<corev1::Namespace>
        + ObjectStore<rbacv1::ClusterRoleBinding>
{
}

#[derive(Clone)]
pub struct KubeStore {
    client: kube::Client,
}

impl KubeStore {
    pub fn new(client: kube::Client) -> KubeStore {
        KubeStore { client }
    }
}

macro_rules! namespaced_object_store {
    ($kind:ty) => {
        #[async_trait]
        impl ObjectStore<$kind> for KubeStore {
            async fn get(&self, key: &ObjectKey) -> anyhow::Result<Option<$kind>> {
                let Some(ns) = &key.namespace else { bail!(KubernetesError::missing_namespace(&key.to_string())) };
                debug!("fetching {} {key}", <$kind as k8s_openapi::Resource>::KIND);
                Ok(kube::Api::<$kind>::namespaced(self.client.clone(), ns).get_opt(&key.name).await?)
            }

            async fn create(&self, obj: &$kind) -> anyhow::Result<$kind> {
                let Some(ns) = obj.namespace() else { bail!(KubernetesError::missing_namespace(&obj.name_any())) };
                let api = kube::Api::<$kind>::namespaced(self.client.clone(), &ns);
                Ok(api.create(&PostParams::default(), obj).await?)
            }

            async fn update(&self, obj: &$kind) -> anyhow::Result<$kind> {
                let Some(ns) = obj.namespace() else { bail!(KubernetesError::missing_namespace(&obj.name_any())) };
                let api = kube::Api::<$kind>::namespaced(self.client.clone(), &ns);
                Ok(api.replace(&obj.name_any(), &PostParams::default(), obj).await?)
            }
        }
    };
}

macro_rules! cluster_object_store {
    ($kind:ty) => {
        #[async_trait]
        impl ObjectStore<$kind> for KubeStore {
            async fn get(&self, key: &ObjectKey) -> anyhow::Result<Option<$kind>> {
                debug!("fetching {} {key}", <$kind as k8s_openapi::Resource>::KIND);
                Ok(kube::Api::<$kind>::all(self.client.clone()).get_opt(&key.name).await?)
            }

            async fn create(&self, obj: &$kind) -> anyhow::Result<$kind> {
                let api = kube::Api::<$kind>::all(self.client.clone());
                Ok(api.create(&PostParams::default(), obj).await?)
            }

            async fn update(&self, obj: &$kind) -> anyhow::Result<$kind> {
                let api = kube::Api::<$kind>::all(self.client.clone());
                Ok(api.replace(&obj.name_any(), &PostParams::default(), obj).await?)
            }
        }
    };
}

namespaced_object_store!(corev1::Secret);
namespaced_object_store!(corev1::ConfigMap);
cluster_object_store!(corev1::Namespace);
cluster_object_store!(rbacv1::ClusterRoleBinding);
