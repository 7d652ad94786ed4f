use mi_core::prelude::*;

use crate::config::{
    AgentConfig,
    ConfigSelector,
};

pub const SIDECAR_CONTAINER_NAME: &str = "newrelic-infrastructure-sidecar";
pub const LICENSE_SECRET_KEY: &str = "license";

pub const ENV_CUSTOM_ATTRIBUTES: &str = "NRIA_CUSTOM_ATTRIBUTES";
pub const ENV_PASSTHROUGH_ENVIRONMENT: &str = "NRIA_PASSTHROUGH_ENVIRONMENT";
pub const ENV_NODE_NAME: &str = "NRK8S_NODE_NAME";
pub const ENV_CLUSTER_NAME: &str = "CLUSTER_NAME";
pub const ENV_DISPLAY_NAME: &str = "NRIA_DISPLAY_NAME";
pub const ENV_LICENSE_KEY: &str = "NRIA_LICENSE_KEY";

const NODE_NAME_FIELD_PATH: &str = "spec.nodeName";

// Variables the agent forwards from its own environment to the integrations it runs.
pub const PASSTHROUGH_ENV_VARS: [&str; 19] = [
    "KUBERNETES_SERVICE_HOST",
    "KUBERNETES_SERVICE_PORT",
    "CLUSTER_NAME",
    "CADVISOR_PORT",
    "NRK8S_NODE_NAME",
    "KUBE_STATE_METRICS_URL",
    "KUBE_STATE_METRICS_POD_LABEL",
    "TIMEOUT",
    "ETCD_TLS_SECRET_NAME",
    "ETCD_TLS_SECRET_NAMESPACE",
    "API_SERVER_SECURE_PORT",
    "KUBE_STATE_METRICS_SCHEME",
    "KUBE_STATE_METRICS_PORT",
    "SCHEDULER_ENDPOINT_URL",
    "ETCD_ENDPOINT_URL",
    "CONTROLLER_MANAGER_ENDPOINT_URL",
    "API_SERVER_ENDPOINT_URL",
    "DISABLE_KUBE_STATE_METRICS",
    "DISCOVERY_CACHE_TTL",
];

// (volume name, mount path) for each scratch directory the agent writes to; the agent runs
// with a read-only root filesystem so all of these are backed by emptyDir volumes.
pub const AGENT_VOLUME_MOUNTS: [(&str, &str); 4] = [
    ("tmpfs-data", "/var/db/newrelic-infra/data"),
    ("tmpfs-user-data", "/var/db/newrelic-infra/user_data"),
    ("tmpfs-tmp", "/tmp"),
    ("tmpfs-cache", "/var/cache/nr-kubernetes"),
];

fn value_env_var(name: &str, value: &str) -> corev1::EnvVar {
    corev1::EnvVar { name: name.into(), value: Some(value.into()), ..Default::default() }
}

fn node_name_env_var(name: &str) -> corev1::EnvVar {
    corev1::EnvVar {
        name: name.into(),
        value_from: Some(corev1::EnvVarSource {
            field_ref: Some(corev1::ObjectFieldSelector {
                api_version: Some("v1".into()),
                field_path: NODE_NAME_FIELD_PATH.into(),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn standard_env_vars(cluster_name: &str, license_secret_name: &str) -> Vec<corev1::EnvVar> {
    vec![
        corev1::EnvVar {
            name: ENV_LICENSE_KEY.into(),
            value_from: Some(corev1::EnvVarSource {
                secret_key_ref: Some(corev1::SecretKeySelector {
                    name: license_secret_name.into(),
                    key: LICENSE_SECRET_KEY.into(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
        node_name_env_var(ENV_NODE_NAME),
        node_name_env_var(ENV_DISPLAY_NAME),
        value_env_var(ENV_CLUSTER_NAME, cluster_name),
        value_env_var(ENV_PASSTHROUGH_ENVIRONMENT, &PASSTHROUGH_ENV_VARS.join(",")),
    ]
}

/// Build the sidecar container from the agent configuration.  The result doesn't depend on
/// anything about the pod being mutated, so it's built once and cloned for every request.
pub fn build_container(agent: &AgentConfig, cluster_name: &str, license_secret_name: &str) -> corev1::Container {
    let mut env = standard_env_vars(cluster_name, license_secret_name);
    env.extend(agent.extra_env_vars.iter().map(|(k, v)| value_env_var(k, v)));

    let nonzero = |id: i64| (id != 0).then_some(id);

    corev1::Container {
        name: SIDECAR_CONTAINER_NAME.into(),
        image: Some(agent.image.reference()),
        image_pull_policy: agent.image.pull_policy.clone(),
        env: Some(env),
        volume_mounts: Some(
            AGENT_VOLUME_MOUNTS
                .iter()
                .map(|(name, path)| corev1::VolumeMount {
                    name: (*name).into(),
                    mount_path: (*path).into(),
                    ..Default::default()
                })
                .collect(),
        ),
        security_context: Some(corev1::SecurityContext {
            read_only_root_filesystem: Some(true),
            allow_privilege_escalation: Some(false),
            run_as_user: nonzero(agent.pod_security_context.run_as_user),
            run_as_group: nonzero(agent.pod_security_context.run_as_group),
            ..Default::default()
        }),
        resources: agent.resource_requirements.clone(),
        ..Default::default()
    }
}

/// Layer a config selector on top of the base container: its env vars replace base vars of
/// the same name in place and are otherwise appended, and its resource requirements (if any)
/// replace the base ones wholesale.
pub fn apply_override(container: &mut corev1::Container, selector: &ConfigSelector) {
    let env = container.env.get_or_insert_default();
    for (name, value) in &selector.extra_env_vars {
        match env.iter_mut().find(|e| e.name == *name) {
            Some(existing) => *existing = value_env_var(name, value),
            None => env.push(value_env_var(name, value)),
        }
    }

    if let Some(resources) = &selector.resource_requirements {
        container.resources = Some(resources.clone());
    }
}

pub fn build_volumes(container: &corev1::Container) -> Vec<corev1::Volume> {
    container
        .volume_mounts
        .iter()
        .flatten()
        .map(|m| corev1::Volume {
            name: m.name.clone(),
            empty_dir: Some(Default::default()),
            ..Default::default()
        })
        .collect()
}

pub fn custom_attributes_env_var(payload: &str) -> corev1::EnvVar {
    value_env_var(ENV_CUSTOM_ATTRIBUTES, payload)
}
