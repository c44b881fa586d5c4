//! Configuration for the cognitive pipeline.

use serde::{Deserialize, Serialize};

use constitution::{EvaluationMode, DEFAULT_PROTECTIVE_DAMPENING};

use crate::generator::IntentRule;
use crate::types::{CognitionError, Result};

/// Configuration for a Cognitive Machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitionConfig {
    /// Machine ID
    pub machine_id: String,
    /// Signal intake configuration
    #[serde(default)]
    pub intake: IntakeConfig,
    /// State synthesis configuration
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    /// Intent generation configuration
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Constitutional evaluation configuration
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Meta-cognitive governor configuration
    #[serde(default)]
    pub governor: GovernorConfig,
    /// Guardiania gate configuration
    #[serde(default)]
    pub gate: GateConfig,
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
}

impl Default for CognitionConfig {
    fn default() -> Self {
        Self {
            machine_id: uuid::Uuid::new_v4().to_string(),
            intake: IntakeConfig::default(),
            synthesis: SynthesisConfig::default(),
            generator: GeneratorConfig::default(),
            evaluation: EvaluationConfig::default(),
            governor: GovernorConfig::default(),
            gate: GateConfig::default(),
            general: GeneralConfig::default(),
        }
    }
}

impl CognitionConfig {
    /// Create a new config with machine ID.
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            ..Default::default()
        }
    }

    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Check that every threshold and gain is usable.
    pub fn validate(&self) -> Result<()> {
        if self.machine_id.trim().is_empty() {
            return Err(CognitionError::ConfigError("machine_id is empty".to_string()));
        }
        if self.intake.buffer_size == 0 {
            return Err(CognitionError::ConfigError(
                "intake.buffer_size must be positive".to_string(),
            ));
        }

        let unit_fields = [
            ("synthesis.risk_gain", self.synthesis.risk_gain),
            ("synthesis.load_gain", self.synthesis.load_gain),
            ("generator.emergency_risk_threshold", self.generator.emergency_risk_threshold),
            ("evaluation.protective_dampening", self.evaluation.protective_dampening),
            ("governor.min_coherence", self.governor.min_coherence),
            ("gate.hard_ethical_cost_ceiling", self.gate.hard_ethical_cost_ceiling),
            ("general.initial_legitimacy", self.general.initial_legitimacy),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(CognitionError::ConfigError(format!(
                    "{name} = {value} is outside [0, 1]"
                )));
            }
        }

        let max_urgency = self.governor.max_total_urgency;
        if max_urgency.is_nan() || max_urgency < 0.0 {
            return Err(CognitionError::ConfigError(
                "governor.max_total_urgency must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

/// Signal intake configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Maximum signals buffered between ticks; oldest are dropped beyond this
    pub buffer_size: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self { buffer_size: 10_000 }
    }
}

/// State synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Risk added per unit of security signal intensity
    pub risk_gain: f64,
    /// Load added per unit of signal intensity
    pub load_gain: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            risk_gain: 0.4,
            load_gain: 0.2,
        }
    }
}

/// Intent generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Emit the emergency intent at all
    pub emergency_enabled: bool,
    /// Risk strictly above which the emergency intent is emitted
    pub emergency_risk_threshold: f64,
    /// Additional state-to-intent mappings
    #[serde(default)]
    pub rules: Vec<IntentRule>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            emergency_enabled: true,
            emergency_risk_threshold: 0.8,
            rules: vec![],
        }
    }
}

/// Constitutional evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Full evaluation or short-circuit on the first absolute failure
    pub mode: EvaluationMode,
    /// Factor applied per failing protective rule
    pub protective_dampening: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            mode: EvaluationMode::Full,
            protective_dampening: DEFAULT_PROTECTIVE_DAMPENING,
        }
    }
}

/// Meta-cognitive governor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Total proposed urgency above which execution is dampened
    pub max_total_urgency: f64,
    /// Hard-reversibility intents tolerated per tick
    pub max_hard_intents: usize,
    /// Coherence below which no hard intent may execute
    pub min_coherence: f64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_total_urgency: 2.0,
            max_hard_intents: 1,
            min_coherence: 0.2,
        }
    }
}

/// Guardiania gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Ethical cost strictly above which hard intents are rejected
    pub hard_ethical_cost_ceiling: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            hard_ethical_cost_ceiling: 0.7,
        }
    }
}

/// General configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Run the built-in consistency check on every batch
    pub integrity_checks_enabled: bool,
    /// Legitimacy of the initial state
    pub initial_legitimacy: f64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            integrity_checks_enabled: true,
            initial_legitimacy: 1.0,
        }
    }
}
