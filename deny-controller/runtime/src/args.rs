use crate::{
    cluster,
    reconcile::{
        ConstantBackoff, Dispatcher, KubeIntentSource, KubeStore, OutcomeMetrics, Reconciler,
        Supervisor,
    },
};
use anyhow::{bail, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use tokio::time::Duration;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "deny-controller",
    about = "Maintains Calico NetworkPolicies for CustomDeny resources"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "deny_controller=info,warn",
        env = "DENY_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain", env = "DENY_CONTROLLER_LOG_FORMAT")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Seconds to wait before re-establishing a CustomDeny watch that could
    /// not be opened.
    #[clap(long, default_value = "30")]
    watch_retry_secs: u64,

    /// Bounds each NetworkPolicy create, patch or delete.
    #[clap(long, default_value = "5000")]
    write_timeout_ms: u64,

    #[clap(long, default_value = "15")]
    apiserver_probe_interval_secs: u64,

    #[clap(long, default_value = "30")]
    deployment_poll_interval_secs: u64,

    #[clap(long, default_value = "10")]
    deployment_list_timeout_secs: u64,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            admin,
            watch_retry_secs,
            write_timeout_ms,
            apiserver_probe_interval_secs,
            deployment_poll_interval_secs,
            deployment_list_timeout_secs,
        } = self;

        let mut prom = <Registry>::default();
        let outcome_metrics = OutcomeMetrics::register(&mut prom);
        let apiserver_metrics = cluster::ApiServerMetrics::register(&mut prom);
        let deployment_metrics = cluster::DeploymentMetrics::register(&mut prom);
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let client = runtime.client();
        let version = client.apiserver_version().await?;
        info!(version = %version.git_version, "Connected to Kubernetes");

        tokio::spawn(
            cluster::probe_apiserver(
                client.clone(),
                apiserver_metrics,
                Duration::from_secs(apiserver_probe_interval_secs),
            )
            .instrument(info_span!("apiserver")),
        );

        tokio::spawn(
            cluster::poll_deployments(
                client.clone(),
                deployment_metrics,
                Duration::from_secs(deployment_poll_interval_secs),
                Duration::from_secs(deployment_list_timeout_secs),
            )
            .instrument(info_span!("deployments")),
        );

        // Spawn the CustomDeny watch. It holds the runtime's shutdown until it
        // has stopped.
        let store = KubeStore::new(client.clone(), Duration::from_millis(write_timeout_ms));
        let dispatcher = Dispatcher::new(Reconciler::new(store), outcome_metrics);
        let supervisor = Supervisor::new(
            KubeIntentSource::new(client),
            dispatcher,
            ConstantBackoff::new(Duration::from_secs(watch_retry_secs)),
        );
        tokio::spawn(
            supervisor
                .run(runtime.shutdown_handle())
                .instrument(info_span!("customdenies")),
        );

        // Block the main thread on the shutdown signal. Once it fires, wait for
        // the background tasks to complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
