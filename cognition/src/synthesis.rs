//! State synthesis - folds a batch of signals into the next state snapshot.
//!
//! The synthesizer owns only the risk/load/coherence slice of the state.
//! Legitimacy and active protocols pass through untouched.

use chrono::{DateTime, Utc};
use tracing::trace;

use constitution::{clamp_unit, CognitiveState};

use crate::config::SynthesisConfig;
use crate::types::{Signal, SignalDomain};

/// Pure fold of signals into state.
#[derive(Debug, Clone, Default)]
pub struct StateSynthesizer {
    config: SynthesisConfig,
}

impl StateSynthesizer {
    /// Create a synthesizer with the default gains.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom gains.
    pub fn with_config(config: SynthesisConfig) -> Self {
        Self { config }
    }

    /// Produce the next state from `prev` and a batch in arrival order.
    ///
    /// Clamping happens after every signal, so order matters at saturation.
    /// A signal's own intensity is clamped before it contributes, so no
    /// signal can lower risk or load.
    pub fn synthesize(&self, prev: &CognitiveState, signals: &[Signal], now: DateTime<Utc>) -> CognitiveState {
        let (risk, load) = signals
            .iter()
            .fold((prev.risk(), prev.load()), |(risk, load), signal| {
                let intensity = clamp_unit(signal.intensity);
                let risk = if signal.domain == SignalDomain::Security {
                    clamp_unit(risk + intensity * self.config.risk_gain)
                } else {
                    risk
                };
                let load = clamp_unit(load + intensity * self.config.load_gain);
                trace!(signal_id = %signal.id, risk, load, "Folded signal");
                (risk, load)
            });

        prev.clone().with_risk_load(risk, load, now)
    }
}
