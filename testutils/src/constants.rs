pub const TEST_NAMESPACE: &str = "test-namespace";
pub const TEST_POD_NAME: &str = "the-pod";
pub const TEST_SERVICE_ACCOUNT: &str = "the-service-account";
pub const TEST_OTHER_SERVICE_ACCOUNT: &str = "the-other-service-account";
pub const TEST_CLUSTER_NAME: &str = "test-cluster";
pub const TEST_LICENSE: &str = "0123456789abcdef";
pub const TEST_RESOURCE_PREFIX: &str = "test-operator";
pub const TEST_APP_CONTAINER: &str = "the-app";
