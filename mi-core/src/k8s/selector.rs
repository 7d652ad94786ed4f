use std::collections::{
    BTreeMap,
    BTreeSet,
};

use super::*;

const OPERATOR_IN: &str = "In";
const OPERATOR_NOT_IN: &str = "NotIn";
const OPERATOR_EXISTS: &str = "Exists";
const OPERATOR_DOES_NOT_EXIST: &str = "DoesNotExist";

#[derive(Clone, Debug, Eq, PartialEq)]
enum Requirement {
    Equals(String, String),
    In(String, BTreeSet<String>),
    NotIn(String, BTreeSet<String>),
    Exists(String),
    DoesNotExist(String),
}

impl Requirement {
    fn compile(expr: &metav1::LabelSelectorRequirement) -> anyhow::Result<Requirement> {
        let values: BTreeSet<_> = expr.values.iter().flatten().cloned().collect();
        let req = match expr.operator.as_str() {
            OPERATOR_IN | OPERATOR_NOT_IN if values.is_empty() => {
                bail!(KubernetesError::malformed_label_selector(expr))
            },
            OPERATOR_IN => Requirement::In(expr.key.clone(), values),
            OPERATOR_NOT_IN => Requirement::NotIn(expr.key.clone(), values),
            OPERATOR_EXISTS | OPERATOR_DOES_NOT_EXIST if !values.is_empty() => {
                bail!(KubernetesError::malformed_label_selector(expr))
            },
            OPERATOR_EXISTS => Requirement::Exists(expr.key.clone()),
            OPERATOR_DOES_NOT_EXIST => Requirement::DoesNotExist(expr.key.clone()),
            _ => bail!(KubernetesError::malformed_label_selector(expr)),
        };
        Ok(req)
    }

    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Requirement::Equals(k, v) => labels.get(k) == Some(v),
            Requirement::In(k, vals) => labels.get(k).is_some_and(|v| vals.contains(v)),
            Requirement::NotIn(k, vals) => labels.get(k).is_none_or(|v| !vals.contains(v)),
            Requirement::Exists(k) => labels.contains_key(k),
            Requirement::DoesNotExist(k) => !labels.contains_key(k),
        }
    }
}

/// A label selector that has already been validated.  Compiling up front means a malformed
/// selector is rejected once when configuration is loaded, and matching on the request path
/// can't fail.
///
/// An empty selector matches every label set, same as the API server's semantics for an
/// empty (but present) `LabelSelector`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    pub fn compile(sel: &metav1::LabelSelector) -> anyhow::Result<Selector> {
        let mut requirements: Vec<_> = sel
            .match_labels
            .iter()
            .flatten()
            .map(|(k, v)| Requirement::Equals(k.clone(), v.clone()))
            .collect();

        for expr in sel.match_expressions.iter().flatten() {
            requirements.push(Requirement::compile(expr)?);
        }

        Ok(Selector { requirements })
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|req| req.matches(labels))
    }
}
