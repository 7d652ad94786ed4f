use std::collections::BTreeMap;

use assert_fs::prelude::*;
use clap::Parser;

use super::*;

const FULL_CONFIG: &str = r#"
infraAgentInjection:
  resourcePrefix: my-operator
  clusterName: prod
  customAttributes:
    - name: team
      defaultValue: unowned
      fromLabel: team
  policies:
    - namespaceName: default
      podSelector:
        matchLabels:
          app: nginx
  agentConfig:
    image:
      repository: example.com/infrastructure-k8s
      tag: 1.2.3
      pullPolicy: IfNotPresent
    podSecurityContext:
      runAsUser: 1000
      runAsGroup: 2000
    extraEnvVars:
      NRIA_VERBOSE: "1"
    resourcesWithSelectors:
      - labelSelector:
          matchLabels:
            size: large
        resourceRequirements:
          limits:
            memory: 300M
    kubeletScraperConfig: |
      interval: 15s
"#;

fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: BTreeMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| vars.get(name).cloned()
}

#[rstest]
fn test_parse_full_config() {
    let config = WebhookConfig::from_yaml(FULL_CONFIG).unwrap().infra_agent_injection;

    assert_eq!(config.resource_prefix, "my-operator");
    assert_eq!(config.cluster_name, "prod");
    assert_is_empty!(config.license);
    assert_eq!(config.custom_attributes[0].from_label, "team");
    assert_eq!(config.policies[0].namespace_name.as_deref(), Some("default"));
    assert_some!(config.policies[0].pod_selector.as_ref());

    let agent = config.agent_config;
    assert_eq!(agent.image.reference(), "example.com/infrastructure-k8s:1.2.3");
    assert_eq!(agent.image.pull_policy.as_deref(), Some("IfNotPresent"));
    assert_eq!(agent.pod_security_context.run_as_user, 1000);
    assert_eq!(agent.pod_security_context.run_as_group, 2000);
    assert_eq!(agent.extra_env_vars.get("NRIA_VERBOSE").map(String::as_str), Some("1"));
    assert_len_eq_x!(&agent.config_selectors, 1);
    assert_some!(agent.config_selectors[0].resource_requirements.as_ref());
    assert_eq!(agent.kubelet_scraper_config, "interval: 15s\n");
}

#[rstest]
#[case::empty("")]
#[case::whitespace("\n  \n")]
#[case::empty_section("infraAgentInjection: {}")]
fn test_parse_empty_config(#[case] contents: &str) {
    assert_eq!(WebhookConfig::from_yaml(contents).unwrap(), WebhookConfig::default());
}

#[rstest]
#[case::top_level("infraAgentInjection: {}\nbogus: true\n")]
#[case::nested("infraAgentInjection:\n  agentConfig:\n    imag: {}\n")]
#[case::policy("infraAgentInjection:\n  policies:\n    - podSelectr: {}\n")]
fn test_parse_rejects_unknown_keys(#[case] contents: &str) {
    let err = WebhookConfig::from_yaml(contents).unwrap_err();
    assert_contains!(format!("{err}"), "unknown field");
}

#[rstest]
#[case::set(&[(LICENSE_KEY_ENV_VAR, TEST_LICENSE)], TEST_LICENSE)]
#[case::empty(&[(LICENSE_KEY_ENV_VAR, "")], "")]
#[case::unset(&[], "")]
fn test_env_license_replaces_file_value(#[case] vars: &[(&str, &str)], #[case] expected: &str) {
    let mut config = WebhookConfig::from_yaml("infraAgentInjection:\n  license: from-file\n").unwrap();
    config.apply_env(env_from(vars));
    assert_eq!(config.infra_agent_injection.license, expected);
}

#[rstest]
fn test_env_license_unset_fails_engine_config() {
    let mut config = WebhookConfig::from_yaml(FULL_CONFIG).unwrap();
    config.apply_env(env_from(&[]));
    let err = EngineConfig::build(config.infra_agent_injection).unwrap_err();
    assert_contains!(err.to_string(), "license key is empty");
}

#[rstest]
#[case::file_wins("infraAgentInjection:\n  clusterName: from-file\n  resourcePrefix: file-prefix\n", "from-file", "file-prefix")]
#[case::env_fills_missing("infraAgentInjection: {}\n", "from-env", "env-prefix")]
fn test_env_fallbacks(#[case] contents: &str, #[case] expected_cluster: &str, #[case] expected_prefix: &str) {
    let mut config = WebhookConfig::from_yaml(contents).unwrap();
    config.apply_env(env_from(&[(CLUSTER_NAME_ENV_VAR, "from-env"), (RESOURCE_PREFIX_ENV_VAR, "env-prefix")]));
    assert_eq!(config.infra_agent_injection.cluster_name, expected_cluster);
    assert_eq!(config.infra_agent_injection.resource_prefix, expected_prefix);
}

#[rstest]
#[traced_test]
fn test_from_file_missing() {
    let dir = assert_fs::TempDir::new().unwrap();
    let config = WebhookConfig::from_file(&dir.path().join("operator.yaml")).unwrap();
    assert_eq!(config, WebhookConfig::default());
    assert!(logs_contain("using an empty config"));
}

#[rstest]
fn test_from_file_builds_engine_config() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("operator.yaml");
    file.write_str(FULL_CONFIG).unwrap();

    let mut config = WebhookConfig::from_file(file.path()).unwrap();
    config.apply_env(env_from(&[(LICENSE_KEY_ENV_VAR, TEST_LICENSE)]));
    let engine_config = EngineConfig::build(config.infra_agent_injection).unwrap();

    assert_eq!(engine_config.resource_prefix, "my-operator");
    assert_eq!(engine_config.license(), TEST_LICENSE);
    assert_eq!(engine_config.license_secret_name, "my-operator-config");
}

#[rstest]
fn test_from_file_bad_yaml() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("operator.yaml");
    file.write_str("infraAgentInjection: [").unwrap();

    let err = WebhookConfig::from_file(file.path()).unwrap_err();
    assert_contains!(format!("{err}"), "parsing config file");
}

#[rstest]
fn test_options_defaults() {
    let opts = Options::try_parse_from(["monitoring-injector", "--cert-path", "tls.crt", "--key-path", "tls.key"]).unwrap();
    assert_eq!(opts.port, 9443);
    assert_eq!(opts.health_probe_port, 9440);
    assert_eq!(opts.mutation_timeout_seconds, 10);
    assert!(!opts.ignore_errors);
    assert_eq!(opts.config_file.to_str(), Some(DEFAULT_CONFIG_PATH));
    assert_eq!(opts.verbosity, "info");
}
