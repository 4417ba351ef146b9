use crate::{Dispatcher, PolicyStore};
use anyhow::Result;
use deny_controller_k8s_api::{Api, Client, CustomDeny, DynamicObject, WatchEvent, WatchParams};
use futures::prelude::*;
use std::pin::Pin;
use tokio::time;
use tracing::{debug, info, warn};

pub type IntentStream =
    Pin<Box<dyn Stream<Item = Result<WatchEvent<DynamicObject>>> + Send + 'static>>;

/// Opens change streams over `CustomDeny` resources in all namespaces.
#[async_trait::async_trait]
pub trait IntentSource: Send + Sync {
    async fn watch(&self) -> Result<IntentStream>;
}

/// Chooses how long to wait before re-establishing a watch that could not be
/// opened.
pub trait Backoff: Send + Sync {
    fn next_delay(&mut self) -> time::Duration;

    /// Called once a watch has been established.
    fn reset(&mut self) {}
}

/// Waits the same delay after every failure, forever.
#[derive(Copy, Clone, Debug)]
pub struct ConstantBackoff(time::Duration);

#[derive(Clone)]
pub struct KubeIntentSource {
    api: Api<DynamicObject>,
    params: WatchParams,
}

/// Keeps a single `CustomDeny` watch open, feeding every event to a
/// [`Dispatcher`], until shutdown is signaled.
pub struct Supervisor<W, S, B> {
    source: W,
    dispatcher: Dispatcher<S>,
    backoff: B,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Session {
    Closed,
    Shutdown,
}

// === impl ConstantBackoff ===

impl ConstantBackoff {
    pub const fn new(delay: time::Duration) -> Self {
        Self(delay)
    }
}

impl Default for ConstantBackoff {
    fn default() -> Self {
        Self(time::Duration::from_secs(30))
    }
}

impl Backoff for ConstantBackoff {
    fn next_delay(&mut self) -> time::Duration {
        self.0
    }
}

// === impl KubeIntentSource ===

impl KubeIntentSource {
    /// Limits the amount of time a watch can be idle before being reset.
    ///
    /// Must be less than 295 or Kubernetes throws an error.
    const WATCH_TIMEOUT_SECS: u32 = 290;

    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all_with(client, &CustomDeny::api_resource()),
            params: WatchParams::default().timeout(Self::WATCH_TIMEOUT_SECS),
        }
    }
}

#[async_trait::async_trait]
impl IntentSource for KubeIntentSource {
    async fn watch(&self) -> Result<IntentStream> {
        // Starting from any resource version makes the server replay the
        // current set of objects as `Added` events.
        let events = self.api.watch(&self.params, "0").await?;
        Ok(events.err_into::<anyhow::Error>().boxed())
    }
}

// === impl Supervisor ===

impl<W, S, B> Supervisor<W, S, B>
where
    W: IntentSource,
    S: PolicyStore,
    B: Backoff,
{
    pub fn new(source: W, dispatcher: Dispatcher<S>, backoff: B) -> Self {
        Self {
            source,
            dispatcher,
            backoff,
        }
    }

    pub async fn run(mut self, shutdown: drain::Watch) {
        loop {
            if shutdown.clone().signaled().now_or_never().is_some() {
                break;
            }

            let events = tokio::select! {
                biased;
                _ = shutdown.clone().signaled() => break,
                res = self.source.watch() => res,
            };
            let events = match events {
                Ok(events) => events,
                Err(error) => {
                    let delay = self.backoff.next_delay();
                    warn!(%error, ?delay, "Failed to watch CustomDeny resources");
                    tokio::select! {
                        biased;
                        _ = shutdown.clone().signaled() => break,
                        _ = time::sleep(delay) => continue,
                    }
                }
            };

            self.backoff.reset();
            info!("Watching CustomDeny resources");
            if self.forward(events, &shutdown).await == Session::Shutdown {
                break;
            }
        }

        info!("Stopped watching CustomDeny resources");
    }

    /// Dispatches events, one at a time, until the stream ends or fails.
    ///
    /// The stream is dropped before returning, so the caller never holds two
    /// watches at once.
    async fn forward(&self, mut events: IntentStream, shutdown: &drain::Watch) -> Session {
        let session = loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.clone().signaled() => break Session::Shutdown,
                next = events.next() => next,
            };

            match next {
                Some(Ok(WatchEvent::Error(error))) => {
                    warn!(?error, "CustomDeny watch failed");
                    break Session::Closed;
                }
                Some(Ok(event)) => self.dispatcher.handle(event).await,
                Some(Err(error)) => {
                    warn!(%error, "CustomDeny watch failed");
                    break Session::Closed;
                }
                None => {
                    debug!("CustomDeny watch closed");
                    break Session::Closed;
                }
            }
        };
        drop(events);
        session
    }
}
