mod gvk;
mod selector;
mod status;
mod store;

pub use gvk::*;
pub use selector::*;
pub use status::*;
pub use store::*;

use crate::errors::*;
use crate::prelude::*;

err_impl! {KubernetesError,
    #[error("malformed label selector: {0:?}")]
    MalformedLabelSelector(metav1::LabelSelectorRequirement),

    #[error("object has no namespace: {0}")]
    MissingNamespace(String),
}

pub trait KubeResourceExt {
    fn namespaced_name(&self) -> String;
    fn has_label(&self, key: &str) -> bool;
    fn is_owned_by_any(&self, gvks: &[GVK]) -> bool;
}

impl<T: kube::Resource> KubeResourceExt for T {
    fn namespaced_name(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.name_any()),
            None => self.name_any(),
        }
    }

    fn has_label(&self, key: &str) -> bool {
        self.labels().contains_key(key)
    }

    // Owner references with an unparseable apiVersion can't name one of our kinds, so they
    // are skipped rather than treated as an error.
    fn is_owned_by_any(&self, gvks: &[GVK]) -> bool {
        self.owner_references()
            .iter()
            .filter_map(|rf| GVK::from_owner_ref(rf).ok())
            .any(|gvk| gvks.contains(&gvk))
    }
}

#[cfg(test)]
pub mod tests;
