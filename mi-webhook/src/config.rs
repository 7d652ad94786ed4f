use std::fs;
use std::io;
use std::path::Path;

use anyhow::Context;
use mi_core::errors::*;
use mi_core::prelude::*;
use mi_injector::InjectorConfig;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::*;

/// Top-level layout of the operator's YAML config file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct WebhookConfig {
    pub infra_agent_injection: InjectorConfig,
}

impl WebhookConfig {
    pub fn load(path: &Path) -> anyhow::Result<WebhookConfig> {
        let mut config = WebhookConfig::from_file(path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<WebhookConfig> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                WebhookConfig::from_yaml(&contents).with_context(|| format!("parsing config file {}", path.display()))
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("config file {} not found, using an empty config", path.display());
                Ok(Default::default())
            },
            Err(err) => Err(anyhow!(err).context(format!("reading config file {}", path.display()))),
        }
    }

    pub fn from_yaml(contents: &str) -> anyhow::Result<WebhookConfig> {
        if contents.trim().is_empty() {
            return Ok(Default::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    // The license always comes from the environment. Cluster name and resource prefix from the
    // environment only fill values missing in the file.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        let cfg = &mut self.infra_agent_injection;
        cfg.license = lookup(LICENSE_KEY_ENV_VAR).unwrap_or_default();

        if cfg.cluster_name.is_empty() {
            cfg.cluster_name = lookup(CLUSTER_NAME_ENV_VAR).unwrap_or_default();
        }

        if cfg.resource_prefix.is_empty() {
            cfg.resource_prefix = lookup(RESOURCE_PREFIX_ENV_VAR).unwrap_or_default();
        }
    }
}
