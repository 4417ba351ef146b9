use crate::Labels;
use kube::api::ApiResource;

/// Declares that workloads matching `source_labels` in `source_namespace`
/// must not reach workloads matching `target_labels` in the resource's own
/// namespace.
///
/// Fields missing from a spec default to empty values.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    kube::CustomResource,
    serde::Deserialize,
    serde::Serialize,
    schemars::JsonSchema,
)]
#[kube(
    group = "security.internal.io",
    version = "v1",
    kind = "CustomDeny",
    plural = "customdenies",
    namespaced
)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomDenySpec {
    pub source_namespace: String,
    pub source_labels: Labels,
    pub target_labels: Labels,
}

// === impl CustomDeny ===

impl CustomDeny {
    /// Describes the resource for untyped watches.
    pub fn api_resource() -> ApiResource {
        ApiResource::erase::<Self>(&())
    }
}
