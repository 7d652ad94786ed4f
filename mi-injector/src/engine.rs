use std::collections::BTreeMap;
use std::fmt;

use mi_core::errors::*;
use mi_core::k8s::Selector;
use mi_core::prelude::*;

use crate::attributes::validate_custom_attributes;
use crate::config::*;
use crate::container::*;
use crate::errors::*;
use crate::hash::*;
use crate::policy::PolicySet;

pub const LICENSE_SECRET_SUFFIX: &str = "-config";
pub const CLUSTER_ROLE_BINDING_SUFFIX: &str = "-infra-agent";
pub const SCRAPER_CONFIG_MAP_SUFFIX: &str = "-kubelet-scraper-config";
pub const SCRAPER_CONFIG_KEY: &str = "nri-kubernetes.yml";
pub const CLUSTER_NAME_ATTRIBUTE: &str = "clusterName";

/// A fully-built sidecar, ready to be cloned into a pod, along with the content hash that
/// gets written to the pod's injected label.
#[derive(Clone, Debug, PartialEq)]
pub struct SidecarTemplate {
    pub container: corev1::Container,
    pub volumes: Vec<corev1::Volume>,
    pub hash: String,
}

#[derive(Clone, Debug)]
struct CompiledConfigSelector {
    selector: Selector,
    template: SidecarTemplate,
}

/// Validated, immutable injector configuration.  Built once at startup and shared by every
/// request; all selectors are compiled and every sidecar variant is pre-built and hashed here
/// so that nothing on the request path can fail because of bad configuration.
#[derive(Clone)]
pub struct EngineConfig {
    pub resource_prefix: String,
    pub cluster_name: String,
    pub license_secret_name: String,
    pub cluster_role_binding_name: String,
    pub scraper_config_map_name: String,
    pub scraper_config: String,
    pub policies: PolicySet,

    license: String,
    custom_attributes: Vec<CustomAttribute>,
    base: SidecarTemplate,
    selectors: Vec<CompiledConfigSelector>,
}

impl EngineConfig {
    pub fn build(mut config: InjectorConfig) -> anyhow::Result<EngineConfig> {
        if config.license.is_empty() {
            bail!(InjectorError::invalid_config("license key is empty"));
        }
        if config.cluster_name.is_empty() {
            bail!(InjectorError::invalid_config("cluster name is empty"));
        }

        config.custom_attributes.push(CustomAttribute {
            name: CLUSTER_NAME_ATTRIBUTE.into(),
            default_value: config.cluster_name.clone(),
            from_label: String::new(),
        });
        validate_custom_attributes(&config.custom_attributes)?;

        let policies = PolicySet::compile(&config.policies)?;

        if config.resource_prefix.is_empty() {
            config.resource_prefix = DEFAULT_RESOURCE_PREFIX.into();
        }
        let agent = &mut config.agent_config;
        if agent.image.repository.is_empty() {
            agent.image.repository = DEFAULT_AGENT_IMAGE_REPOSITORY.into();
        }
        if agent.image.tag.is_empty() {
            agent.image.tag = DEFAULT_AGENT_IMAGE_TAG.into();
        }

        let license_secret_name = format!("{}{LICENSE_SECRET_SUFFIX}", config.resource_prefix);
        let base_container = build_container(&config.agent_config, &config.cluster_name, &license_secret_name);
        let base = make_template(&config, base_container)?;

        let selectors = config
            .agent_config
            .config_selectors
            .iter()
            .enumerate()
            .map(|(i, cs)| -> anyhow::Result<CompiledConfigSelector> {
                let selector = Selector::compile(&cs.label_selector)
                    .map_err(|err| InjectorError::invalid_config(&format!("config selector {i}: {err}")))?;
                let mut container = base.container.clone();
                apply_override(&mut container, cs);
                Ok(CompiledConfigSelector { selector, template: make_template(&config, container)? })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(EngineConfig {
            cluster_role_binding_name: format!("{}{CLUSTER_ROLE_BINDING_SUFFIX}", config.resource_prefix),
            scraper_config_map_name: format!("{}{SCRAPER_CONFIG_MAP_SUFFIX}", config.resource_prefix),
            license_secret_name,
            scraper_config: config.agent_config.kubelet_scraper_config,
            policies,
            resource_prefix: config.resource_prefix,
            cluster_name: config.cluster_name,
            license: config.license,
            custom_attributes: config.custom_attributes,
            base,
            selectors,
        })
    }

    /// Pick the sidecar variant for a pod: the first config selector matching its labels, or
    /// the base template if none do.
    pub fn resolve(&self, pod_labels: &BTreeMap<String, String>) -> &SidecarTemplate {
        self.selectors
            .iter()
            .find(|cs| cs.selector.matches(pod_labels))
            .map_or(&self.base, |cs| &cs.template)
    }

    pub fn base_template(&self) -> &SidecarTemplate {
        &self.base
    }

    pub fn license(&self) -> &str {
        &self.license
    }

    pub fn custom_attributes(&self) -> &[CustomAttribute] {
        &self.custom_attributes
    }
}

fn make_template(config: &InjectorConfig, container: corev1::Container) -> anyhow::Result<SidecarTemplate> {
    let volumes = build_volumes(&container);
    let hash = content_hash(&EffectiveConfig {
        resource_prefix: &config.resource_prefix,
        cluster_name: &config.cluster_name,
        custom_attributes: &config.custom_attributes,
        image: &config.agent_config.image,
        pod_security_context: &config.agent_config.pod_security_context,
        container: &container,
        volumes: &volumes,
    })?;
    Ok(SidecarTemplate { container, volumes, hash })
}

// Hand-written so the license never ends up in a log line
impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("resource_prefix", &self.resource_prefix)
            .field("cluster_name", &self.cluster_name)
            .field("license", &"<redacted>")
            .field("custom_attributes", &self.custom_attributes)
            .field("policies", &self.policies)
            .field("base_hash", &self.base.hash)
            .field("config_selectors", &self.selectors.len())
            .finish()
    }
}
