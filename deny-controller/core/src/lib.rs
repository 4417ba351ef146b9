#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod outcome;
pub mod selector;

pub use self::outcome::Outcome;

pub const DENY_CONTROLLER_NAME: &str = "security.internal.io/deny-controller";

/// The order assigned to every generated policy, so that generated denies are
/// evaluated ahead of default-allow rules.
pub const GENERATED_POLICY_ORDER: f64 = 100.0;

/// Derives the name of the policy generated on behalf of the intent
/// `namespace/name`.
///
/// The name is a pure function of the intent's identity so that a generated
/// policy can always be found again without any other bookkeeping.
pub fn generated_policy_name(namespace: &str, name: &str) -> String {
    format!("deny-{namespace}-{name}")
}
