use std::borrow::Cow;
use std::fmt;

use kube::api::GroupVersionKind;

use crate::errors::*;
use crate::prelude::*;

// Thin wrapper around kube's GroupVersionKind so we can build one straight from an owner
// reference and print it in "group/version.kind" form.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct GVK(GroupVersionKind);

impl GVK {
    pub fn new(group: &str, version: &str, kind: &str) -> GVK {
        GVK(GroupVersionKind::gvk(group, version, kind))
    }

    pub fn from_owner_ref(rf: &metav1::OwnerReference) -> anyhow::Result<GVK> {
        match rf.api_version.split('/').collect::<Vec<_>>()[..] {
            [version] => Ok(GVK::new("", version, &rf.kind)),
            [group, version] => Ok(GVK::new(group, version, &rf.kind)),
            _ => bail!("invalid format for api_version: {}", rf.api_version),
        }
    }
}

impl fmt::Display for GVK {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut group = Cow::from(&self.0.group);
        if !group.is_empty() {
            group.to_mut().push('/');
        }

        write!(f, "{group}{}.{}", self.0.version, self.0.kind)
    }
}
