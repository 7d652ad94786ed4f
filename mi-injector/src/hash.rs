use mi_core::prelude::*;
use serde::Serialize;
use sha2::{
    Digest,
    Sha224,
};

use crate::config::{
    CustomAttribute,
    Image,
    PodSecurityContext,
};

/// Everything that determines what the injected sidecar looks like, and nothing about the pod
/// it's injected into.  Struct fields serialize in declaration order and every map in here is
/// a BTreeMap, so the JSON encoding (and therefore the hash) is stable.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig<'a> {
    pub resource_prefix: &'a str,
    pub cluster_name: &'a str,
    pub custom_attributes: &'a [CustomAttribute],
    pub image: &'a Image,
    pub pod_security_context: &'a PodSecurityContext,
    pub container: &'a corev1::Container,
    pub volumes: &'a [corev1::Volume],
}

// SHA-224 keeps the hex digest at 56 characters, which fits in a label value.
pub fn content_hash(config: &EffectiveConfig) -> anyhow::Result<String> {
    let mut hasher = Sha224::new();
    hasher.update(serde_json::to_vec(config)?);
    Ok(format!("{:x}", hasher.finalize()))
}
