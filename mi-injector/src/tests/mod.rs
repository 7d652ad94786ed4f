mod engine_test;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use assertables::*;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use mi_core::k8s::*;
use mi_core::macros::*;
use mi_core::prelude::*;
use mi_core::retry::Backoff;
use mi_testutils::*;
use rstest::*;
use tracing_test::traced_test;

use super::*;

pub const TEST_SCRAPER_CONFIG: &str = "interval: 15s\ntimeout: 10s\n";

pub fn crb_name() -> String {
    format!("{TEST_RESOURCE_PREFIX}-infra-agent")
}

pub fn secret_key() -> ObjectKey {
    ObjectKey::namespaced(TEST_NAMESPACE, &format!("{TEST_RESOURCE_PREFIX}-config"))
}

pub fn config_map_key() -> ObjectKey {
    ObjectKey::namespaced(TEST_NAMESPACE, &format!("{TEST_RESOURCE_PREFIX}-kubelet-scraper-config"))
}

pub fn fast_backoff() -> Backoff {
    Backoff { steps: 3, duration: Duration::from_millis(1), factor: 1.0, cap: Duration::from_millis(1), jitter: 0.0 }
}

pub fn memory_limit(amount: &str) -> corev1::ResourceRequirements {
    corev1::ResourceRequirements {
        limits: Some(BTreeMap::from([("memory".into(), Quantity(amount.into()))])),
        ..Default::default()
    }
}

#[fixture]
pub fn injector_config() -> InjectorConfig {
    InjectorConfig {
        resource_prefix: TEST_RESOURCE_PREFIX.into(),
        license: TEST_LICENSE.into(),
        cluster_name: TEST_CLUSTER_NAME.into(),
        custom_attributes: vec![CustomAttribute {
            name: "team".into(),
            default_value: "unowned".into(),
            from_label: "team".into(),
        }],
        policies: vec![InjectionPolicy::default()],
        agent_config: AgentConfig {
            kubelet_scraper_config: TEST_SCRAPER_CONFIG.into(),
            ..Default::default()
        },
    }
}

#[fixture]
pub fn store() -> Arc<FakeClusterStore> {
    Arc::new(FakeClusterStore::new().with(build_cluster_role_binding(&crb_name())))
}

pub fn make_injector(config: InjectorConfig, store: Arc<FakeClusterStore>) -> Injector {
    Injector::new(Arc::new(EngineConfig::build(config).unwrap()), store).with_backoff(fast_backoff())
}

pub fn request_options() -> RequestOptions {
    RequestOptions { namespace: TEST_NAMESPACE.into(), dry_run: false }
}
