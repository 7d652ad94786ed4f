use std::collections::BTreeMap;

use mi_core::errors::*;
use mi_core::k8s::Selector;
use mi_core::prelude::*;

use crate::config::InjectionPolicy;
use crate::errors::*;

#[derive(Clone, Debug)]
pub struct Policy {
    namespace_name: Option<String>,
    namespace_selector: Option<Selector>,
    pod_selector: Option<Selector>,
}

fn compile_selector(sel: Option<&metav1::LabelSelector>, what: &str, idx: usize) -> anyhow::Result<Option<Selector>> {
    sel.map(|s| {
        Selector::compile(s).map_err(|err| InjectorError::invalid_config(&format!("policy {idx}: {what}: {err}")))
    })
    .transpose()
}

impl Policy {
    fn compile(policy: &InjectionPolicy, idx: usize) -> anyhow::Result<Policy> {
        Ok(Policy {
            namespace_name: policy.namespace_name.clone(),
            namespace_selector: compile_selector(policy.namespace_selector.as_ref(), "namespace selector", idx)?,
            pod_selector: compile_selector(policy.pod_selector.as_ref(), "pod selector", idx)?,
        })
    }

    pub fn matches(&self, pod_labels: &BTreeMap<String, String>, ns: &corev1::Namespace) -> bool {
        if self.namespace_name.as_ref().is_some_and(|name| *name != ns.name_any()) {
            return false;
        }

        if self.pod_selector.as_ref().is_some_and(|sel| !sel.matches(pod_labels)) {
            return false;
        }

        if self.namespace_selector.as_ref().is_some_and(|sel| !sel.matches(ns.labels())) {
            return false;
        }

        true
    }
}

/// The full list of injection policies; a pod is eligible if any one of them matches.
#[derive(Clone, Debug)]
pub struct PolicySet(Vec<Policy>);

impl PolicySet {
    pub fn compile(policies: &[InjectionPolicy]) -> anyhow::Result<PolicySet> {
        if policies.is_empty() {
            bail!(InjectorError::invalid_config("at least one injection policy must be configured"));
        }

        let compiled = policies
            .iter()
            .enumerate()
            .map(|(i, p)| Policy::compile(p, i))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(PolicySet(compiled))
    }

    pub fn matches(&self, pod_labels: &BTreeMap<String, String>, ns: &corev1::Namespace) -> bool {
        self.0.iter().any(|p| p.matches(pod_labels, ns))
    }

    // Only policies with a namespace label selector need the real Namespace object; everything
    // else can be decided from the namespace name alone.
    pub fn needs_namespace_labels(&self) -> bool {
        self.0.iter().any(|p| p.namespace_selector.is_some())
    }
}
