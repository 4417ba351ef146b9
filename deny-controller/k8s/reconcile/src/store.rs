use crate::ResourceId;
use anyhow::{anyhow, Result};
use deny_controller_core::{generated_policy_name, DENY_CONTROLLER_NAME};
use deny_controller_k8s_api::{
    Api, Client, DeleteParams, NetworkPolicy, NetworkPolicySpec, Patch, PatchParams, PostParams,
    ResourceExt,
};
use tokio::time;
use tracing::debug;

/// Writes generated policies to the policy engine.
#[async_trait::async_trait]
pub trait PolicyStore: Send + Sync {
    /// Creates `policy`, failing if it already exists.
    async fn create(&self, policy: &NetworkPolicy) -> Result<()>;

    /// Replaces the spec of the existing policy `namespace/name`.
    async fn patch_spec(&self, namespace: &str, name: &str, spec: &NetworkPolicySpec)
        -> Result<()>;

    /// Deletes the policy `namespace/name`, failing if it does not exist.
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

/// A [`PolicyStore`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    timeout: time::Duration,
}

/// Creates and deletes generated policies on behalf of intents.
#[derive(Clone, Debug)]
pub struct Reconciler<S> {
    store: S,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    Created,
    Patched,
}

// === impl KubeStore ===

impl KubeStore {
    /// Bounds every write by `timeout`.
    pub fn new(client: Client, timeout: time::Duration) -> Self {
        Self { client, timeout }
    }

    fn api(&self, namespace: &str) -> Api<NetworkPolicy> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl PolicyStore for KubeStore {
    async fn create(&self, policy: &NetworkPolicy) -> Result<()> {
        let namespace = policy
            .namespace()
            .ok_or_else(|| anyhow!("policy {} has no namespace", policy.name_any()))?;
        let params = PostParams {
            field_manager: Some(DENY_CONTROLLER_NAME.to_string()),
            ..Default::default()
        };
        time::timeout(self.timeout, self.api(&namespace).create(&params, policy)).await??;
        Ok(())
    }

    async fn patch_spec(
        &self,
        namespace: &str,
        name: &str,
        spec: &NetworkPolicySpec,
    ) -> Result<()> {
        let params = PatchParams {
            field_manager: Some(DENY_CONTROLLER_NAME.to_string()),
            ..Default::default()
        };
        let patch = serde_json::json!({ "spec": spec });
        time::timeout(
            self.timeout,
            self.api(namespace).patch(name, &params, &Patch::Merge(&patch)),
        )
        .await??;
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        time::timeout(
            self.timeout,
            self.api(namespace).delete(name, &DeleteParams::default()),
        )
        .await??;
        Ok(())
    }
}

// === impl Reconciler ===

impl<S: PolicyStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates `policy`, or replaces the spec of the existing policy with the
    /// same name.
    ///
    /// Any create failure falls back to a patch, so repeated applies of the
    /// same policy all succeed. When both fail, the patch error is returned.
    pub async fn apply(&self, policy: &NetworkPolicy) -> Result<Applied> {
        let error = match self.store.create(policy).await {
            Ok(()) => return Ok(Applied::Created),
            Err(error) => error,
        };

        let name = policy.name_any();
        let namespace = policy
            .namespace()
            .ok_or_else(|| anyhow!("policy {name} has no namespace"))?;
        debug!(%namespace, %name, %error, "Create failed; patching");
        self.store
            .patch_spec(&namespace, &name, &policy.spec)
            .await?;
        Ok(Applied::Patched)
    }

    /// Deletes the policy generated for the intent `id`.
    ///
    /// Fails if the policy does not exist.
    pub async fn delete(&self, id: &ResourceId) -> Result<()> {
        let name = generated_policy_name(&id.namespace, &id.name);
        self.store.delete(&id.namespace, &name).await
    }
}
