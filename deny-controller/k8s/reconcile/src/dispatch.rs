use crate::{compile, Applied, Intent, OutcomeMetrics, PolicyStore, Reconciler};
use anyhow::Result;
use deny_controller_core::Outcome;
use deny_controller_k8s_api::{DynamicObject, WatchEvent};
use tracing::{debug, info, trace, warn};

/// Routes `CustomDeny` watch events to the reconciler and records the outcome
/// of each.
///
/// The dispatcher holds no state of its own; all state lives in the stores.
pub struct Dispatcher<S> {
    reconciler: Reconciler<S>,
    metrics: OutcomeMetrics,
}

// === impl Dispatcher ===

impl<S: PolicyStore> Dispatcher<S> {
    pub fn new(reconciler: Reconciler<S>, metrics: OutcomeMetrics) -> Self {
        Self {
            reconciler,
            metrics,
        }
    }

    pub async fn handle(&self, event: WatchEvent<DynamicObject>) {
        match event {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) => self.apply(obj).await,
            WatchEvent::Deleted(obj) => self.delete(obj).await,
            WatchEvent::Bookmark(_) => trace!("Bookmark"),
            // Error events end the watch session before they reach the
            // dispatcher.
            WatchEvent::Error(_) => {}
        }
    }

    async fn apply(&self, obj: DynamicObject) {
        let Some(intent) = Intent::from_object(obj) else {
            debug!("Ignoring CustomDeny without a namespace and name");
            return;
        };

        let outcome = match self.compile_and_apply(&intent).await {
            Ok(applied) => {
                info!(
                    namespace = %intent.id.namespace,
                    name = %intent.id.name,
                    ?applied,
                    "Applied NetworkPolicy"
                );
                Outcome::Applied
            }
            Err(error) => {
                warn!(
                    namespace = %intent.id.namespace,
                    name = %intent.id.name,
                    %error,
                    "Apply failed"
                );
                Outcome::ApplyFailed
            }
        };
        self.metrics.record(&intent.id.namespace, outcome);
    }

    async fn compile_and_apply(&self, intent: &Intent) -> Result<Applied> {
        let policy = compile::compile(intent)?;
        self.reconciler.apply(&policy).await
    }

    async fn delete(&self, obj: DynamicObject) {
        let Some(Intent { id, .. }) = Intent::from_object(obj) else {
            debug!("Ignoring CustomDeny without a namespace and name");
            return;
        };

        let outcome = match self.reconciler.delete(&id).await {
            Ok(()) => {
                info!(namespace = %id.namespace, name = %id.name, "Deleted NetworkPolicy");
                Outcome::Deleted
            }
            Err(error) => {
                warn!(namespace = %id.namespace, name = %id.name, %error, "Delete failed");
                Outcome::DeleteFailed
            }
        };
        self.metrics.record(&id.namespace, outcome);
    }
}
