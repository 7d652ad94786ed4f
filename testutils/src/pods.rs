use std::collections::BTreeMap;

use mi_core::prelude::*;
use rstest::fixture;

use crate::constants::*;

pub fn build_pod(labels: BTreeMap<String, String>, service_account: Option<&str>) -> corev1::Pod {
    corev1::Pod {
        metadata: metav1::ObjectMeta {
            namespace: Some(TEST_NAMESPACE.into()),
            name: Some(TEST_POD_NAME.into()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(corev1::PodSpec {
            service_account_name: service_account.map(String::from),
            containers: vec![corev1::Container {
                name: TEST_APP_CONTAINER.into(),
                image: Some("nginx:latest".into()),
                ..Default::default()
            }],
            volumes: Some(vec![corev1::Volume {
                name: "app-data".into(),
                empty_dir: Some(Default::default()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[fixture]
pub fn test_pod() -> corev1::Pod {
    build_pod(BTreeMap::from([("app".into(), "nginx".into())]), Some(TEST_SERVICE_ACCOUNT))
}

pub fn build_namespace(name: &str, labels: BTreeMap<String, String>) -> corev1::Namespace {
    corev1::Namespace {
        metadata: metav1::ObjectMeta {
            name: Some(name.into()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn build_cluster_role_binding(name: &str) -> rbacv1::ClusterRoleBinding {
    rbacv1::ClusterRoleBinding {
        metadata: metav1::ObjectMeta { name: Some(name.into()), ..Default::default() },
        role_ref: rbacv1::RoleRef {
            api_group: "rbac.authorization.k8s.io".into(),
            kind: "ClusterRole".into(),
            name: name.into(),
        },
        subjects: None,
    }
}

pub fn service_account_subject(name: &str, namespace: &str) -> rbacv1::Subject {
    rbacv1::Subject {
        kind: SVC_ACCOUNT_KIND.into(),
        name: name.into(),
        namespace: Some(namespace.into()),
        ..Default::default()
    }
}
