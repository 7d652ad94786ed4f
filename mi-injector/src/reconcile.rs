use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use mi_core::errors::*;
use mi_core::k8s::*;
use mi_core::macros::*;
use mi_core::prelude::*;
use mi_core::retry::{
    Backoff,
    retry_on_conflict,
};
use tracing::*;

use crate::container::LICENSE_SECRET_KEY;
use crate::engine::{
    EngineConfig,
    SCRAPER_CONFIG_KEY,
};
use crate::errors::*;

const SECRET_TYPE_OPAQUE: &str = "Opaque";

/// Make sure the license Secret exists in `namespace` and holds the configured license.  An
/// existing Secret is updated in place without touching its labels, since it was most likely
/// created by somebody else.
#[instrument(skip_all, fields(secret = %format!("{namespace}/{name}")))]
pub async fn ensure_license_secret<S>(store: &S, namespace: &str, name: &str, license: &str) -> EmptyResult
where
    S: ObjectStore<corev1::Secret> + ?Sized,
{
    let desired = ByteString(license.as_bytes().to_vec());
    match store.get(&ObjectKey::namespaced(namespace, name)).await? {
        None => {
            info!("creating license secret");
            let secret = corev1::Secret {
                metadata: metav1::ObjectMeta {
                    namespace: Some(namespace.into()),
                    name: Some(name.into()),
                    labels: klabel!(OPERATOR_CREATED_LABEL_KEY => OPERATOR_CREATED_LABEL_VALUE),
                    ..Default::default()
                },
                data: Some(BTreeMap::from([(LICENSE_SECRET_KEY.into(), desired)])),
                type_: Some(SECRET_TYPE_OPAQUE.into()),
                ..Default::default()
            };
            create_unless_exists(store, &secret).await
        },
        Some(secret) if secret.data.as_ref().and_then(|d| d.get(LICENSE_SECRET_KEY)) == Some(&desired) => {
            debug!("license secret up to date");
            Ok(())
        },
        Some(mut secret) => {
            info!("updating license in existing secret");
            secret.data.get_or_insert_default().insert(LICENSE_SECRET_KEY.into(), desired);
            store.update(&secret).await?;
            Ok(())
        },
    }
}

/// Make sure the kubelet scraper ConfigMap exists in `namespace` with exactly the configured
/// content.
#[instrument(skip_all, fields(config_map = %format!("{namespace}/{name}")))]
pub async fn ensure_scraper_config_map<S>(store: &S, namespace: &str, name: &str, content: &str) -> EmptyResult
where
    S: ObjectStore<corev1::ConfigMap> + ?Sized,
{
    let desired = BTreeMap::from([(SCRAPER_CONFIG_KEY.to_string(), content.to_string())]);
    match store.get(&ObjectKey::namespaced(namespace, name)).await? {
        None => {
            info!("creating scraper config map");
            let cm = corev1::ConfigMap {
                metadata: metav1::ObjectMeta {
                    namespace: Some(namespace.into()),
                    name: Some(name.into()),
                    labels: klabel!(OPERATOR_CREATED_LABEL_KEY => OPERATOR_CREATED_LABEL_VALUE),
                    ..Default::default()
                },
                data: Some(desired),
                ..Default::default()
            };
            create_unless_exists(store, &cm).await
        },
        Some(cm) if cm.data.as_ref() == Some(&desired) => {
            debug!("scraper config map up to date");
            Ok(())
        },
        Some(mut cm) => {
            info!("replacing scraper config map data");
            cm.data = Some(desired);
            store.update(&cm).await?;
            Ok(())
        },
    }
}

// Losing a create race to another admission request is fine; whoever won wrote the same thing
async fn create_unless_exists<S, K>(store: &S, obj: &K) -> EmptyResult
where
    S: ObjectStore<K> + ?Sized,
    K: kube::Resource,
{
    match store.create(obj).await {
        Ok(_) => Ok(()),
        Err(err) if is_already_exists(&err) => {
            debug!("{} already exists", obj.namespaced_name());
            Ok(())
        },
        Err(err) => Err(err),
    }
}

fn has_subject(crb: &rbacv1::ClusterRoleBinding, service_account: &str, namespace: &str) -> bool {
    crb.subjects.iter().flatten().any(|s| {
        s.kind == SVC_ACCOUNT_KIND && s.name == service_account && s.namespace.as_deref() == Some(namespace)
    })
}

/// Add the pod's service account to the pre-provisioned ClusterRoleBinding.  The binding is
/// shared by every namespace, so concurrent requests regularly race on it; each attempt
/// re-reads the binding and re-checks membership before writing.  A missing binding is a
/// hard error and is never retried.
#[instrument(skip_all, fields(cluster_role_binding = %name))]
pub async fn ensure_cluster_role_binding_subject<S>(
    store: &S,
    backoff: &Backoff,
    name: &str,
    service_account: &str,
    namespace: &str,
) -> EmptyResult
where
    S: ObjectStore<rbacv1::ClusterRoleBinding> + ?Sized,
{
    let service_account = if service_account.is_empty() { DEFAULT_SERVICE_ACCOUNT } else { service_account };
    let key = &ObjectKey::cluster(name);

    retry_on_conflict(backoff, "add ClusterRoleBinding subject", || async move {
        let Some(mut crb) = store.get(key).await? else {
            bail!(InjectorError::cluster_role_binding_not_found(name));
        };

        if has_subject(&crb, service_account, namespace) {
            debug!("service account {namespace}/{service_account} already bound");
            return Ok(());
        }

        info!("binding service account {namespace}/{service_account}");
        crb.subjects.get_or_insert_default().push(rbacv1::Subject {
            kind: SVC_ACCOUNT_KIND.into(),
            name: service_account.into(),
            namespace: Some(namespace.into()),
            ..Default::default()
        });
        store.update(&crb).await?;
        Ok::<_, anyhow::Error>(())
    })
    .await
}

/// Bring every dependent resource for a pod in `namespace` up to date.  The Secret and the
/// ConfigMap don't depend on each other and are reconciled concurrently; the ClusterRoleBinding
/// goes last.
pub async fn reconcile_dependents(
    store: &dyn ClusterStore,
    config: &EngineConfig,
    backoff: &Backoff,
    namespace: &str,
    service_account: &str,
) -> EmptyResult {
    futures::try_join!(
        ensure_license_secret(store, namespace, &config.license_secret_name, config.license()),
        ensure_scraper_config_map(store, namespace, &config.scraper_config_map_name, &config.scraper_config),
    )?;

    ensure_cluster_role_binding_subject(store, backoff, &config.cluster_role_binding_name, service_account, namespace)
        .await
}
