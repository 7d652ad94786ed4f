use lazy_static::lazy_static;

use crate::k8s::GVK;

// Well-known labels
pub const INJECTED_LABEL_KEY: &str = "newrelic/agent-injected";
pub const DISABLE_INJECTION_LABEL_KEY: &str = "infra-operator.newrelic.com/disable-injection";
pub const OPERATOR_CREATED_LABEL_KEY: &str = "newrelic/infra-operator-created";
pub const OPERATOR_CREATED_LABEL_VALUE: &str = "true";

// Env vars read by the config loader
pub const LICENSE_KEY_ENV_VAR: &str = "NRIA_LICENSE_KEY";
pub const CLUSTER_NAME_ENV_VAR: &str = "CLUSTER_NAME";
pub const RESOURCE_PREFIX_ENV_VAR: &str = "RESOURCE_PREFIX";

// Defaults
pub const DEFAULT_RESOURCE_PREFIX: &str = "newrelic-infra-operator";
pub const DEFAULT_AGENT_IMAGE_REPOSITORY: &str = "newrelic/infrastructure-k8s";
pub const DEFAULT_AGENT_IMAGE_TAG: &str = "2.4.0-unprivileged";
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/newrelic/newrelic-infra-operator/operator.yaml";
pub const DEFAULT_WEBHOOK_PORT: &str = "9443";
pub const DEFAULT_HEALTH_PROBE_PORT: &str = "9440";
pub const DEFAULT_MUTATION_TIMEOUT_SECONDS: &str = "10";

// Timing
pub const CONFLICT_RETRY_STEPS: u32 = 5;
pub const CONFLICT_RETRY_DELAY_MS: u64 = 10;
pub const CONFLICT_RETRY_JITTER: f64 = 0.5;

// Kinds
pub const JOB_KIND: &str = "Job";
pub const SVC_ACCOUNT_KIND: &str = "ServiceAccount";

// Built-in GVKs
lazy_static! {
    pub static ref JOB_GVKS: [GVK; 2] = [GVK::new("batch", "v1", JOB_KIND), GVK::new("batch", "v1beta1", JOB_KIND)];
}
