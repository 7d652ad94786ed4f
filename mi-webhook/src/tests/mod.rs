mod config_test;

use std::sync::Arc;
use std::time::Duration;

use assertables::*;
use mi_injector::container::SIDECAR_CONTAINER_NAME;
use mi_injector::{
    AgentConfig,
    CustomAttribute,
    EngineConfig,
    InjectionPolicy,
    Injector,
    InjectorConfig,
};
use mi_testutils::*;
use rstest::*;
use tracing_test::traced_test;

use super::config::*;
use super::mutation::*;
use super::*;

pub fn crb_name() -> String {
    format!("{TEST_RESOURCE_PREFIX}-infra-agent")
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
        agent_config: AgentConfig::default(),
    }
}

#[fixture]
pub fn store() -> Arc<FakeClusterStore> {
    Arc::new(FakeClusterStore::new().with(build_cluster_role_binding(&crb_name())))
}

pub fn build_ctx(
    config: InjectorConfig,
    store: Arc<FakeClusterStore>,
    timeout: Duration,
    ignore_errors: bool,
) -> MutationContext {
    let injector = Injector::new(Arc::new(EngineConfig::build(config).unwrap()), store);
    MutationContext::new(injector, timeout, ignore_errors)
}
