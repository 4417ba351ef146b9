use deny_controller_core::Outcome;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

/// Counts the outcomes of intent events by namespace.
#[derive(Clone, Default)]
pub struct OutcomeMetrics {
    outcomes: Family<OutcomeLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OutcomeLabels {
    namespace: String,
    status: String,
}

// === impl OutcomeMetrics ===

impl OutcomeMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let outcomes = Family::default();
        prom.register(
            "custom_deny_policies",
            "Number of CustomDeny operations",
            outcomes.clone(),
        );
        Self { outcomes }
    }

    pub fn record(&self, namespace: &str, outcome: Outcome) {
        self.outcomes
            .get_or_create(&OutcomeLabels {
                namespace: namespace.to_string(),
                status: outcome.to_string(),
            })
            .inc();
    }

    #[cfg(test)]
    pub(crate) fn count(&self, namespace: &str, outcome: Outcome) -> u64 {
        self.outcomes
            .get_or_create(&OutcomeLabels {
                namespace: namespace.to_string(),
                status: outcome.to_string(),
            })
            .get()
    }
}
