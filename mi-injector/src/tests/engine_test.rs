use super::*;
use crate::container::ENV_CLUSTER_NAME;

fn selector_for(labels: Option<BTreeMap<String, String>>, env: &[(&str, &str)]) -> ConfigSelector {
    ConfigSelector {
        label_selector: metav1::LabelSelector { match_labels: labels, ..Default::default() },
        extra_env_vars: env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        ..Default::default()
    }
}

fn env_value(c: &corev1::Container, name: &str) -> Option<String> {
    c.env.iter().flatten().find(|e| e.name == name).and_then(|e| e.value.clone())
}

#[rstest]
fn test_build_derived_names(injector_config: InjectorConfig) {
    let engine = EngineConfig::build(injector_config).unwrap();

    assert_eq!(engine.license_secret_name, format!("{TEST_RESOURCE_PREFIX}-config"));
    assert_eq!(engine.cluster_role_binding_name, crb_name());
    assert_eq!(engine.scraper_config_map_name, format!("{TEST_RESOURCE_PREFIX}-kubelet-scraper-config"));
    assert_eq!(engine.license(), TEST_LICENSE);
    assert_eq!(engine.scraper_config, TEST_SCRAPER_CONFIG);
}

#[rstest]
fn test_build_defaults(mut injector_config: InjectorConfig) {
    injector_config.resource_prefix = String::new();
    let engine = EngineConfig::build(injector_config).unwrap();

    assert_eq!(engine.resource_prefix, DEFAULT_RESOURCE_PREFIX);
    assert_eq!(engine.cluster_role_binding_name, "newrelic-infra-operator-infra-agent");
    assert_eq!(
        engine.base_template().container.image.as_deref(),
        Some("newrelic/infrastructure-k8s:2.4.0-unprivileged")
    );
}

#[rstest]
fn test_build_appends_cluster_name_attribute(injector_config: InjectorConfig) {
    let engine = EngineConfig::build(injector_config).unwrap();
    let last = engine.custom_attributes().last().unwrap();

    assert_eq!(last.name, "clusterName");
    assert_eq!(last.default_value, TEST_CLUSTER_NAME);
}

#[rstest]
#[case::no_license(|c: &mut InjectorConfig| c.license = String::new(), "license key is empty")]
#[case::no_cluster_name(|c: &mut InjectorConfig| c.cluster_name = String::new(), "cluster name is empty")]
#[case::reserved_attribute(
    |c: &mut InjectorConfig| c.custom_attributes.push(CustomAttribute {
        name: "clusterName".into(),
        default_value: "mine".into(),
        ..Default::default()
    }),
    "duplicate custom attribute \"clusterName\" defined"
)]
#[case::no_policies(|c: &mut InjectorConfig| c.policies.clear(), "at least one injection policy")]
#[case::bad_config_selector(
    |c: &mut InjectorConfig| c.agent_config.config_selectors.push(ConfigSelector {
        label_selector: metav1::LabelSelector {
            match_expressions: Some(vec![metav1::LabelSelectorRequirement {
                key: "app".into(),
                operator: "Exists".into(),
                values: Some(vec!["nginx".into()]),
            }]),
            ..Default::default()
        },
        ..Default::default()
    }),
    "config selector 0"
)]
fn test_build_invalid(mut injector_config: InjectorConfig, #[case] change: fn(&mut InjectorConfig), #[case] msg: &str) {
    change(&mut injector_config);
    let err = EngineConfig::build(injector_config).unwrap_err();

    assert_contains!(err.to_string(), msg);
    assert!(matches!(err.downcast_ref::<InjectorError>(), Some(InjectorError::InvalidConfig(_))));
}

#[rstest]
fn test_debug_redacts_license(injector_config: InjectorConfig) {
    let engine = EngineConfig::build(injector_config).unwrap();
    assert_not_contains!(format!("{engine:?}"), TEST_LICENSE);
}

#[rstest]
fn test_resolve_first_match_wins(mut injector_config: InjectorConfig) {
    injector_config.agent_config.config_selectors = vec![
        selector_for(klabel!("app" => "nginx"), &[("WHICH", "first")]),
        selector_for(klabel!("app" => "nginx"), &[("WHICH", "second")]),
        selector_for(klabel!("app" => "redis"), &[("WHICH", "third")]),
    ];
    let engine = EngineConfig::build(injector_config).unwrap();

    let nginx = engine.resolve(&klabel!("app" => "nginx").unwrap());
    assert_eq!(env_value(&nginx.container, "WHICH").as_deref(), Some("first"));

    let redis = engine.resolve(&klabel!("app" => "redis").unwrap());
    assert_eq!(env_value(&redis.container, "WHICH").as_deref(), Some("third"));

    let other = engine.resolve(&klabel!("app" => "postgres").unwrap());
    assert_eq!(other, engine.base_template());
    assert_none!(env_value(&other.container, "WHICH"));
}

#[rstest]
fn test_resolve_no_selectors(injector_config: InjectorConfig) {
    let engine = EngineConfig::build(injector_config).unwrap();
    assert_eq!(engine.resolve(&BTreeMap::new()), engine.base_template());
}

#[rstest]
fn test_resolve_selector_overrides_standard_env(mut injector_config: InjectorConfig) {
    injector_config.agent_config.config_selectors =
        vec![selector_for(klabel!("app" => "nginx"), &[(ENV_CLUSTER_NAME, "renamed")])];
    let engine = EngineConfig::build(injector_config).unwrap();
    let template = engine.resolve(&klabel!("app" => "nginx").unwrap());

    assert_eq!(env_value(&template.container, ENV_CLUSTER_NAME).as_deref(), Some("renamed"));
    assert_eq!(template.container.env.as_ref().unwrap().len(), engine.base_template().container.env.as_ref().unwrap().len());
}

#[rstest]
fn test_hash_is_stable(injector_config: InjectorConfig) {
    let first = EngineConfig::build(injector_config.clone()).unwrap();
    let second = EngineConfig::build(injector_config).unwrap();

    assert_eq!(first.base_template().hash, second.base_template().hash);
    assert_eq!(first.base_template().hash.len(), 56);
}

#[rstest]
#[case::image_repository(|c: &mut InjectorConfig| c.agent_config.image.repository = "example/agent".into())]
#[case::image_tag(|c: &mut InjectorConfig| c.agent_config.image.tag = "9.9.9".into())]
#[case::pull_policy(|c: &mut InjectorConfig| c.agent_config.image.pull_policy = Some("Always".into()))]
#[case::resource_prefix(|c: &mut InjectorConfig| c.resource_prefix = "other-prefix".into())]
#[case::cluster_name(|c: &mut InjectorConfig| c.cluster_name = "other-cluster".into())]
#[case::custom_attribute(|c: &mut InjectorConfig| c.custom_attributes[0].default_value = "someone".into())]
#[case::run_as_user(|c: &mut InjectorConfig| c.agent_config.pod_security_context.run_as_user = 1000)]
#[case::run_as_group(|c: &mut InjectorConfig| c.agent_config.pod_security_context.run_as_group = 2000)]
#[case::extra_env(|c: &mut InjectorConfig| { c.agent_config.extra_env_vars.insert("FOO".into(), "bar".into()); })]
#[case::resources(|c: &mut InjectorConfig| c.agent_config.resource_requirements = Some(memory_limit("300M")))]
fn test_hash_sensitivity(injector_config: InjectorConfig, #[case] change: fn(&mut InjectorConfig)) {
    let mut changed = injector_config.clone();
    change(&mut changed);

    let before = EngineConfig::build(injector_config).unwrap();
    let after = EngineConfig::build(changed).unwrap();
    assert_ne!(before.base_template().hash, after.base_template().hash);
}

#[rstest]
fn test_hash_ignores_license_and_policies(injector_config: InjectorConfig) {
    let mut changed = injector_config.clone();
    changed.license = "a-different-license".into();
    changed.policies = vec![InjectionPolicy { namespace_name: Some("foo".into()), ..Default::default() }];

    let before = EngineConfig::build(injector_config).unwrap();
    let after = EngineConfig::build(changed).unwrap();
    assert_eq!(before.base_template().hash, after.base_template().hash);
}

#[rstest]
fn test_hash_config_selector_sensitivity(mut injector_config: InjectorConfig) {
    let labels = klabel!("app" => "nginx").unwrap();
    injector_config.agent_config.config_selectors = vec![selector_for(klabel!("app" => "nginx"), &[("FOO", "bar")])];
    let engine = EngineConfig::build(injector_config.clone()).unwrap();
    assert_ne!(engine.resolve(&labels).hash, engine.base_template().hash);

    injector_config.agent_config.config_selectors[0].extra_env_vars.insert("FOO".into(), "baz".into());
    let env_changed = EngineConfig::build(injector_config.clone()).unwrap();
    assert_ne!(env_changed.resolve(&labels).hash, engine.resolve(&labels).hash);
    assert_eq!(env_changed.base_template().hash, engine.base_template().hash);

    injector_config.agent_config.config_selectors[0].resource_requirements = Some(memory_limit("300M"));
    let resources_changed = EngineConfig::build(injector_config).unwrap();
    assert_ne!(resources_changed.resolve(&labels).hash, env_changed.resolve(&labels).hash);
}
