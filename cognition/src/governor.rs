//! Meta-cognitive governor - second-order check over the whole tick.
//!
//! The governor only ever adds suppression. It looks at the aggregate of
//! proposed intents and can hold back a batch whose members individually
//! pass constitutional evaluation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use constitution::{CognitiveIntent, CognitiveState};

use crate::config::GovernorConfig;

/// Aggregate pattern that triggered dampening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GovernorConcern {
    /// Combined urgency of the batch is too high
    ExcessiveUrgency { total: f64, limit: f64 },
    /// Too many irreversible intents at once
    TooManyHardIntents { count: usize, limit: usize },
    /// Irreversible action proposed while the state is incoherent
    LowCoherence { coherence: f64, minimum: f64 },
}

impl GovernorConcern {
    pub fn describe(&self) -> String {
        match self {
            Self::ExcessiveUrgency { total, limit } => {
                format!("total urgency {total:.2} exceeds {limit:.2}")
            }
            Self::TooManyHardIntents { count, limit } => {
                format!("{count} hard intents exceed limit {limit}")
            }
            Self::LowCoherence { coherence, minimum } => {
                format!("coherence {coherence:.2} below {minimum:.2} with hard intents proposed")
            }
        }
    }
}

/// Aggregate view of one tick's proposals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub intent_count: usize,
    pub total_urgency: f64,
    pub hard_intent_count: usize,
    pub mean_ethical_cost: f64,
    pub coherence: f64,
    /// Concerns that fired; empty means no dampening
    pub concerns: Vec<GovernorConcern>,
}

impl Assessment {
    /// Human-readable summary of the concerns.
    pub fn summary(&self) -> String {
        if self.concerns.is_empty() {
            return "no governor concerns".to_string();
        }
        self.concerns
            .iter()
            .map(GovernorConcern::describe)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Meta-cognitive governor.
#[derive(Debug, Clone, Default)]
pub struct MetaGovernor {
    config: GovernorConfig,
}

impl MetaGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom thresholds.
    pub fn with_config(config: GovernorConfig) -> Self {
        Self { config }
    }

    /// Assess the aggregate picture.
    pub fn assess(&self, state: &CognitiveState, intents: &[CognitiveIntent]) -> Assessment {
        let intent_count = intents.len();
        let total_urgency: f64 = intents.iter().map(|i| i.urgency).sum();
        let hard_intent_count = intents.iter().filter(|i| i.reversibility.is_hard()).count();
        let mean_ethical_cost = if intent_count == 0 {
            0.0
        } else {
            intents.iter().map(|i| i.ethical_cost).sum::<f64>() / intent_count as f64
        };
        let coherence = state.coherence();

        let mut concerns = Vec::new();
        if total_urgency > self.config.max_total_urgency {
            concerns.push(GovernorConcern::ExcessiveUrgency {
                total: total_urgency,
                limit: self.config.max_total_urgency,
            });
        }
        if hard_intent_count > self.config.max_hard_intents {
            concerns.push(GovernorConcern::TooManyHardIntents {
                count: hard_intent_count,
                limit: self.config.max_hard_intents,
            });
        }
        if hard_intent_count > 0 && coherence < self.config.min_coherence {
            concerns.push(GovernorConcern::LowCoherence {
                coherence,
                minimum: self.config.min_coherence,
            });
        }

        if !concerns.is_empty() {
            debug!(
                intent_count,
                total_urgency,
                hard_intent_count,
                concerns = concerns.len(),
                "Governor concerns raised"
            );
        }

        Assessment {
            intent_count,
            total_urgency,
            hard_intent_count,
            mean_ethical_cost,
            coherence,
            concerns,
        }
    }

    /// Whether execution should be held back this tick.
    pub fn should_dampen(&self, assessment: &Assessment) -> bool {
        !assessment.concerns.is_empty()
    }
}
