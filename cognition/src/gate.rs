//! Guardiania vetting gate - last check on irreversible, costly intents.
//!
//! Deliberately narrow and independent of the constitution, so a bad
//! amendment cannot loosen it.

use tracing::debug;

use constitution::CognitiveIntent;

use crate::config::GateConfig;

#[derive(Debug, Clone, Default)]
pub struct GuardianiaGate {
    config: GateConfig,
}

impl GuardianiaGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a custom ethical cost ceiling.
    pub fn with_config(config: GateConfig) -> Self {
        Self { config }
    }

    /// `false` for a hard intent whose ethical cost is strictly above the ceiling.
    pub fn vet(&self, intent: &CognitiveIntent) -> bool {
        self.rejection(intent).is_none()
    }

    /// Reason the gate rejects an intent, if it does.
    pub fn rejection(&self, intent: &CognitiveIntent) -> Option<String> {
        let ceiling = self.config.hard_ethical_cost_ceiling;
        if intent.reversibility.is_hard() && intent.ethical_cost > ceiling {
            debug!(
                intent_id = %intent.id,
                ethical_cost = intent.ethical_cost,
                ceiling,
                "Guardiania gate rejected intent"
            );
            Some(format!(
                "rejected by guardiania gate: hard intent with ethical cost {:.2} exceeds {:.2}",
                intent.ethical_cost, ceiling
            ))
        } else {
            None
        }
    }

    /// Vet and return the rejection reason alongside.
    pub fn vet_with_reason(&self, intent: &CognitiveIntent) -> (bool, Option<String>) {
        let rejection = self.rejection(intent);
        (rejection.is_none(), rejection)
    }
}
