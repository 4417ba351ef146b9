use deny_controller_k8s_api::DynamicObject;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

/// A `CustomDeny` as delivered by the watch, before its spec is validated.
#[derive(Clone, Debug, PartialEq)]
pub struct Intent {
    pub id: ResourceId,
    pub spec: Option<serde_json::Value>,
}

// === impl ResourceId ===

impl ResourceId {
    pub fn new(namespace: String, name: String) -> Self {
        Self { namespace, name }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// === impl Intent ===

impl Intent {
    /// Extracts an intent from an untyped object.
    ///
    /// Returns `None` when the object lacks a namespace or a name, since it
    /// can't be correlated with a generated policy.
    pub fn from_object(obj: DynamicObject) -> Option<Self> {
        let DynamicObject { metadata, data, .. } = obj;
        let id = ResourceId::new(metadata.namespace?, metadata.name?);
        let spec = match data {
            serde_json::Value::Object(mut fields) => fields.remove("spec"),
            _ => None,
        };
        Some(Self { id, spec })
    }
}
