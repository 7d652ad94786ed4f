use std::sync::Arc;

use mi_core::errors::*;
use mi_core::k8s::*;
use mi_core::prelude::*;
use mi_core::retry::Backoff;
use tracing::*;

use crate::attributes::resolve_custom_attributes;
use crate::container::custom_attributes_env_var;
use crate::engine::{
    EngineConfig,
    SidecarTemplate,
};
use crate::errors::*;
use crate::reconcile::reconcile_dependents;

#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub namespace: String,
    pub dry_run: bool,
}

/// Injects the monitoring sidecar into pods.  Cheap to clone and safe to share between
/// concurrent requests: the only state is the immutable engine config and a handle to the
/// object store.
#[derive(Clone)]
pub struct Injector {
    config: Arc<EngineConfig>,
    store: Arc<dyn ClusterStore>,
    backoff: Backoff,
}

fn pod_display_name(pod: &corev1::Pod, opts: &RequestOptions) -> String {
    let name = pod.metadata.name.as_deref().or(pod.metadata.generate_name.as_deref()).unwrap_or_default();
    format!("{}/{name}", opts.namespace)
}

fn check_volume_collisions(pod: &corev1::Pod, template: &SidecarTemplate) -> EmptyResult {
    let existing = pod.spec.as_ref().and_then(|s| s.volumes.as_ref()).into_iter().flatten();
    for vol in existing {
        if template.volumes.iter().any(|v| v.name == vol.name) {
            bail!(InjectorError::volume_collision(&vol.name));
        }
    }
    Ok(())
}

impl Injector {
    pub fn new(config: Arc<EngineConfig>, store: Arc<dyn ClusterStore>) -> Injector {
        Injector { config, store, backoff: Default::default() }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Injector {
        self.backoff = backoff;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Inject the sidecar into `pod` if it's eligible.  Either the whole injection is applied
    /// or the pod is left untouched; the dependent Secret, ConfigMap, and ClusterRoleBinding
    /// subject may still have been written when an error is returned, which is harmless since
    /// reconciling them again is a no-op.
    #[instrument(skip_all, fields(pod = %pod_display_name(pod, opts), dry_run = opts.dry_run))]
    pub async fn mutate(&self, pod: &mut corev1::Pod, opts: &RequestOptions) -> EmptyResult {
        if !self.should_inject(pod, opts).await? {
            return Ok(());
        }

        let template = self.config.resolve(pod.labels());
        check_volume_collisions(pod, template)?;

        if opts.dry_run {
            debug!("dry run, skipping dependent resources");
        } else {
            let service_account =
                pod.spec.as_ref().and_then(|s| s.service_account_name.as_deref()).unwrap_or_default();
            reconcile_dependents(&*self.store, &self.config, &self.backoff, &opts.namespace, service_account).await?;
        }

        let attributes = resolve_custom_attributes(self.config.custom_attributes(), pod.labels())?;
        let mut container = template.container.clone();
        container.env.get_or_insert_default().push(custom_attributes_env_var(&attributes));

        // Nothing below here can fail
        info!("injecting sidecar (hash {})", template.hash);
        pod.labels_mut().insert(INJECTED_LABEL_KEY.into(), template.hash.clone());
        let spec = pod.spec.get_or_insert_default();
        spec.containers.push(container);
        spec.volumes.get_or_insert_default().extend(template.volumes.iter().cloned());

        Ok(())
    }

    async fn should_inject(&self, pod: &corev1::Pod, opts: &RequestOptions) -> anyhow::Result<bool> {
        if pod.has_label(INJECTED_LABEL_KEY) {
            debug!("pod already injected");
            return Ok(false);
        }

        if pod.has_label(DISABLE_INJECTION_LABEL_KEY) {
            debug!("injection disabled by label");
            return Ok(false);
        }

        if pod.is_owned_by_any(&*JOB_GVKS) {
            debug!("pod belongs to a job");
            return Ok(false);
        }

        let ns = self.namespace(&opts.namespace).await?;
        let matched = self.config.policies.matches(pod.labels(), &ns);
        if !matched {
            debug!("no injection policy matches");
        }
        Ok(matched)
    }

    async fn namespace(&self, name: &str) -> anyhow::Result<corev1::Namespace> {
        if !self.config.policies.needs_namespace_labels() {
            return Ok(corev1::Namespace {
                metadata: metav1::ObjectMeta { name: Some(name.into()), ..Default::default() },
                ..Default::default()
            });
        }

        match ObjectStore::<corev1::Namespace>::get(&*self.store, &ObjectKey::cluster(name)).await? {
            Some(ns) => Ok(ns),
            None => bail!(InjectorError::namespace_not_found(name)),
        }
    }
}
