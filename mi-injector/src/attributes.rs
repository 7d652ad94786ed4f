use std::collections::BTreeMap;

use mi_core::errors::*;

use crate::config::CustomAttribute;
use crate::errors::*;

// Resolve every attribute against the pod's labels and encode the result as a JSON object.
// Keys come out sorted since the map is a BTreeMap.
pub(crate) fn resolve_custom_attributes(
    attrs: &[CustomAttribute],
    pod_labels: &BTreeMap<String, String>,
) -> anyhow::Result<String> {
    let mut resolved = BTreeMap::new();
    for attr in attrs {
        let from_label = pod_labels.get(&attr.from_label).filter(|v| !attr.from_label.is_empty() && !v.is_empty());
        let value = from_label.unwrap_or(&attr.default_value);
        if value.is_empty() {
            bail!(InjectorError::empty_custom_attribute(&attr.name));
        }
        resolved.insert(attr.name.as_str(), value.as_str());
    }

    Ok(serde_json::to_string(&resolved)?)
}

pub(crate) fn validate_custom_attributes(attrs: &[CustomAttribute]) -> EmptyResult {
    let mut seen = BTreeMap::new();
    for (i, attr) in attrs.iter().enumerate() {
        if attr.name.is_empty() {
            bail!(InjectorError::invalid_config(&format!("custom attribute {i} has empty name")));
        }

        if attr.default_value.is_empty() && attr.from_label.is_empty() {
            bail!(InjectorError::invalid_config(&format!("custom attribute {:?} has no value defined", attr.name)));
        }

        if seen.insert(attr.name.as_str(), i).is_some() {
            bail!(InjectorError::invalid_config(&format!("duplicate custom attribute {:?} defined", attr.name)));
        }
    }

    Ok(())
}
