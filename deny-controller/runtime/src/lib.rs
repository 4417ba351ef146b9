#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use deny_controller_core as core;
pub use deny_controller_k8s_api as k8s;
pub use deny_controller_k8s_reconcile as reconcile;

mod args;
mod cluster;

pub use self::args::Args;
