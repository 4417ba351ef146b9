//! Compiles `CustomDeny` intents into Calico `NetworkPolicy` resources.

use crate::Intent;
use deny_controller_core::{generated_policy_name, selector, GENERATED_POLICY_ORDER};
use deny_controller_k8s_api::{
    calico::{Action, EntityRule, PolicyType, Rule},
    CustomDenySpec, NetworkPolicy, NetworkPolicySpec, ObjectMeta,
};

const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
const MANAGED_BY: &str = "deny-controller";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("spec not found in CustomDeny")]
    MissingSpec,

    #[error("invalid CustomDeny spec: {0}")]
    InvalidSpec(#[source] serde_json::Error),

    #[error(transparent)]
    Selector(#[from] selector::Error),
}

/// Builds the policy that denies ingress from the intent's source workloads
/// to its target workloads.
///
/// The policy lives in the intent's namespace and is named after the intent,
/// so it can be found again from the intent's identity alone.
pub fn compile(intent: &Intent) -> Result<NetworkPolicy, Error> {
    let spec = match &intent.spec {
        Some(spec @ serde_json::Value::Object(_)) => spec.clone(),
        _ => return Err(Error::MissingSpec),
    };
    let CustomDenySpec {
        source_namespace,
        source_labels,
        target_labels,
    } = serde_json::from_value(spec).map_err(Error::InvalidSpec)?;

    let spec = NetworkPolicySpec {
        order: Some(GENERATED_POLICY_ORDER),
        selector: selector::from_labels(&target_labels)?,
        types: vec![PolicyType::Ingress],
        ingress: vec![Rule {
            action: Action::Deny,
            source: Some(EntityRule {
                selector: Some(selector::from_labels(&source_labels)?),
                namespace_selector: Some(selector::namespace(&source_namespace)?),
            }),
        }],
    };

    let metadata = ObjectMeta {
        name: Some(generated_policy_name(&intent.id.namespace, &intent.id.name)),
        namespace: Some(intent.id.namespace.clone()),
        labels: Some(
            [(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string())]
                .into_iter()
                .collect(),
        ),
        ..Default::default()
    };

    Ok(NetworkPolicy { metadata, spec })
}
