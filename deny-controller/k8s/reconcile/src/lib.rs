#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod compile;
mod dispatch;
mod metrics;
mod resource_id;
mod store;
mod supervisor;


pub use self::{
    dispatch::Dispatcher,
    metrics::OutcomeMetrics,
    resource_id::{Intent, ResourceId},
    store::{Applied, KubeStore, PolicyStore, Reconciler},
    supervisor::{
        Backoff, ConstantBackoff, IntentSource, IntentStream, KubeIntentSource, Supervisor,
    },
};
