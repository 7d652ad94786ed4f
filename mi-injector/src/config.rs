use std::collections::BTreeMap;

use mi_core::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

// Raw configuration as it comes out of the operator's YAML file.  Nothing here is validated;
// see EngineConfig::build for that.

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct InjectorConfig {
    pub resource_prefix: String,
    pub license: String,
    pub cluster_name: String,
    pub custom_attributes: Vec<CustomAttribute>,
    pub policies: Vec<InjectionPolicy>,
    pub agent_config: AgentConfig,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AgentConfig {
    pub image: Image,
    pub pod_security_context: PodSecurityContext,
    pub resource_requirements: Option<corev1::ResourceRequirements>,
    pub extra_env_vars: BTreeMap<String, String>,

    #[serde(alias = "resourcesWithSelectors")]
    pub config_selectors: Vec<ConfigSelector>,

    pub kubelet_scraper_config: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Image {
    pub repository: String,
    pub tag: String,
    pub pull_policy: Option<String>,
}

impl Image {
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

// Zero means "not set" for both fields, so there's no way to explicitly ask for uid/gid 0.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PodSecurityContext {
    pub run_as_user: i64,
    pub run_as_group: i64,
}

/// A single injection rule.  Every field that is set must match; a policy with no fields
/// set matches every pod.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct InjectionPolicy {
    pub namespace_name: Option<String>,
    pub namespace_selector: Option<metav1::LabelSelector>,
    pub pod_selector: Option<metav1::LabelSelector>,
}

/// Per-workload customization of the sidecar, picked by matching pod labels.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigSelector {
    pub label_selector: metav1::LabelSelector,
    pub resource_requirements: Option<corev1::ResourceRequirements>,
    pub extra_env_vars: BTreeMap<String, String>,
}

/// An attribute reported by the agent.  The value comes from the pod label named by
/// `from_label` when that label is present and non-empty, and from `default_value` otherwise.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CustomAttribute {
    pub name: String,
    pub default_value: String,
    pub from_label: String,
}
