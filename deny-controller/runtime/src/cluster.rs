//! Gauges describing the cluster the controller runs in.

use crate::k8s::{Api, Client, Deployment, ListParams, ResourceExt};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{family::Family, gauge::Gauge},
    registry::Registry,
};
use tokio::time;
use tracing::{debug, warn};

#[derive(Clone, Default)]
pub struct ApiServerMetrics {
    up: Gauge,
}

#[derive(Clone, Default)]
pub struct DeploymentMetrics {
    spec_replicas: Family<DeploymentLabels, Gauge>,
    available_replicas: Family<DeploymentLabels, Gauge>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct DeploymentLabels {
    deployment_namespace: String,
    deployment: String,
}

// === impl ApiServerMetrics ===

impl ApiServerMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let up = Gauge::default();
        prom.register(
            "kubernetes_apiserver_up",
            "Whether the app can contact the Kubernetes API server (1 = up, 0 = down)",
            up.clone(),
        );
        Self { up }
    }

    fn set(&self, up: bool) {
        self.up.set(i64::from(up));
    }
}

/// Periodically checks that the API server answers version requests.
pub async fn probe_apiserver(client: Client, metrics: ApiServerMetrics, interval: time::Duration) {
    let mut ticks = time::interval(interval);
    ticks.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        match client.apiserver_version().await {
            Ok(_) => metrics.set(true),
            Err(error) => {
                debug!(%error, "API server unreachable");
                metrics.set(false);
            }
        }
    }
}

// === impl DeploymentMetrics ===

impl DeploymentMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let spec_replicas = Family::default();
        prom.register(
            "deployment_spec_replicas",
            "Desired replicas for a deployment",
            spec_replicas.clone(),
        );

        let available_replicas = Family::default();
        prom.register(
            "deployment_status_replicas_available",
            "Available replicas for a deployment",
            available_replicas.clone(),
        );

        Self {
            spec_replicas,
            available_replicas,
        }
    }

    /// Drops every series, so deployments that no longer exist stop being
    /// reported.
    fn clear(&self) {
        self.spec_replicas.clear();
        self.available_replicas.clear();
    }

    fn update(&self, deployments: &[Deployment]) {
        for deploy in deployments {
            let labels = DeploymentLabels {
                deployment_namespace: deploy.namespace().unwrap_or_default(),
                deployment: deploy.name_any(),
            };
            let desired = deploy
                .spec
                .as_ref()
                .and_then(|spec| spec.replicas)
                .unwrap_or(0);
            let available = deploy
                .status
                .as_ref()
                .and_then(|status| status.available_replicas)
                .unwrap_or(0);
            self.spec_replicas
                .get_or_create(&labels)
                .set(i64::from(desired));
            self.available_replicas
                .get_or_create(&labels)
                .set(i64::from(available));
        }
    }
}

/// Periodically mirrors the replica counts of every Deployment into gauges.
pub async fn poll_deployments(
    client: Client,
    metrics: DeploymentMetrics,
    interval: time::Duration,
    list_timeout: time::Duration,
) {
    let api = Api::<Deployment>::all(client);
    let mut ticks = time::interval(interval);
    ticks.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        metrics.clear();
        match time::timeout(list_timeout, api.list(&ListParams::default())).await {
            Ok(Ok(list)) => metrics.update(&list.items),
            Ok(Err(error)) => warn!(%error, "Failed to list deployments"),
            Err(_) => warn!(timeout = ?list_timeout, "Listing deployments timed out"),
        }
    }
}
