//! CognitiveMachine - the per-tick orchestrator.
//!
//! Composes intake, synthesis, generation, constitutional evaluation, the
//! governor and the Guardiania gate into one transaction per `tick()`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use constitution::{
    CognitiveIntent, CognitiveState, Constitution, ConstitutionalVerdict, EvaluationMode, RuleEngine,
};

use crate::config::{CognitionConfig, EvaluationConfig};
use crate::gate::GuardianiaGate;
use crate::generator::{IntentGenerator, IntentIdGenerator, IntentRule, UuidIdGenerator};
use crate::governor::{Assessment, MetaGovernor};
use crate::intake::SignalIntake;
use crate::integrity::{ConsistencyCheck, IntegrityCheck, IntegrityViolation};
use crate::synthesis::StateSynthesizer;
use crate::types::{CognitionError, RawSignal, Result, Signal};

/// Where a tick currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachinePhase {
    Idle,
    Draining,
    Synthesizing,
    Generating,
    Evaluating,
    Dampening,
    Vetting,
}

impl MachinePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Draining => "draining",
            Self::Synthesizing => "synthesizing",
            Self::Generating => "generating",
            Self::Evaluating => "evaluating",
            Self::Dampening => "dampening",
            Self::Vetting => "vetting",
        }
    }
}

impl fmt::Display for MachinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fail-closed mode entered after an integrity fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lockdown {
    /// Check that raised the fault
    pub check: String,
    /// What it found
    pub detail: String,
    /// When the machine locked down
    pub since: DateTime<Utc>,
}

impl Lockdown {
    fn from_violation(violation: &IntegrityViolation) -> Self {
        Self {
            check: violation.check.clone(),
            detail: violation.detail.clone(),
            since: Utc::now(),
        }
    }

    fn reason(&self) -> String {
        format!(
            "machine in lockdown after {} integrity fault: {}",
            self.check, self.detail
        )
    }
}

/// What happened to one candidate intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDisposition {
    pub intent_id: String,
    /// Constitutional verdict
    pub verdict: ConstitutionalVerdict,
    /// Whether the governor held this tick back
    pub governor_suppressed: bool,
    /// Whether the Guardiania gate passed the intent
    pub gate_passed: bool,
    /// Whether the intent is in the executable set
    pub executable: bool,
    /// Single blocking reason naming the rule, governor, gate or lockdown
    pub reason: Option<String>,
}

/// Result of one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickOutcome {
    /// Tick number, starting at 1
    pub tick: u64,
    /// New held state
    pub state: CognitiveState,
    /// All candidate intents
    pub intents: Vec<CognitiveIntent>,
    /// Intents cleared for execution, with protective dampening applied
    pub executable: Vec<CognitiveIntent>,
    /// One entry per candidate, same order as `intents`
    pub dispositions: Vec<IntentDisposition>,
    /// Governor assessment of the tick
    pub assessment: Assessment,
    /// Signals drained into this tick
    pub signals_processed: usize,
    /// Whether the machine was locked down during the tick
    pub lockdown: bool,
}

/// Outcome of re-submitting a single intent, typically after a human
/// approval was attached.
#[derive(Debug, Clone, Serialize)]
pub struct Resubmission {
    pub disposition: IntentDisposition,
    /// The intent as it may execute, if it may
    pub executable: Option<CognitiveIntent>,
}

/// State guarded by the tick lock.
struct Core {
    state: CognitiveState,
    rules: RuleEngine,
    tick: u64,
    lockdown: Option<Lockdown>,
    /// Candidate intents of the last completed tick
    last_intents: Vec<CognitiveIntent>,
}

/// The Cognitive Machine.
///
/// `ingest` only touches the intake buffer and never waits on a tick.
/// Everything that reads or replaces the held state goes through one lock,
/// so at most one tick is in flight.
pub struct CognitiveMachine {
    /// Configuration
    config: CognitionConfig,
    /// Signal intake
    intake: SignalIntake,
    synthesizer: StateSynthesizer,
    generator: IntentGenerator,
    governor: MetaGovernor,
    gate: GuardianiaGate,
    /// Batch integrity checks
    checks: Vec<Arc<dyn IntegrityCheck>>,
    /// Held state and active rule engine
    core: Mutex<Core>,
    /// Current phase
    phase: RwLock<MachinePhase>,
}

impl CognitiveMachine {
    /// Create a machine with default configuration and the reference
    /// constitution.
    pub fn new(machine_id: impl Into<String>) -> Result<Self> {
        MachineBuilder::new(machine_id).build()
    }

    /// Create with custom configuration and the reference constitution.
    pub fn with_config(config: CognitionConfig) -> Result<Self> {
        MachineBuilder::from_config(config).build()
    }

    /// Create a builder.
    pub fn builder(machine_id: impl Into<String>) -> MachineBuilder {
        MachineBuilder::new(machine_id)
    }

    /// Get machine ID.
    pub fn id(&self) -> &str {
        &self.config.machine_id
    }

    pub fn config(&self) -> &CognitionConfig {
        &self.config
    }

    /// Hand a signal to the intake buffer.
    ///
    /// Signals whose intensity is not a finite value in [0, 1] are rejected.
    pub async fn ingest(&self, signal: Signal) -> Result<()> {
        self.intake.ingest(signal).await
    }

    /// Validate an untyped record, then ingest it.
    pub async fn ingest_raw(&self, raw: RawSignal) -> Result<()> {
        let signal = raw.validate()?;
        self.ingest(signal).await
    }

    /// Parse and validate a JSON record, then ingest it.
    pub async fn ingest_json(&self, value: serde_json::Value) -> Result<()> {
        let signal = Signal::from_json(value)?;
        self.ingest(signal).await
    }

    /// Signals waiting for the next tick.
    pub async fn pending_signals(&self) -> usize {
        self.intake.len().await
    }

    /// Signals dropped by the intake buffer on overflow.
    pub fn dropped_signals(&self) -> u64 {
        self.intake.dropped()
    }

    /// Current phase.
    pub async fn phase(&self) -> MachinePhase {
        *self.phase.read().await
    }

    async fn set_phase(&self, phase: MachinePhase) {
        *self.phase.write().await = phase;
    }

    /// Snapshot of the held state.
    pub async fn state(&self) -> CognitiveState {
        self.core.lock().await.state.clone()
    }

    /// Number of completed ticks.
    pub async fn tick_count(&self) -> u64 {
        self.core.lock().await.tick
    }

    /// The constitution currently evaluated against.
    pub async fn constitution(&self) -> Arc<Constitution> {
        Arc::clone(self.core.lock().await.rules.constitution())
    }

    /// Current lockdown, if any.
    pub async fn lockdown(&self) -> Option<Lockdown> {
        self.core.lock().await.lockdown.clone()
    }

    pub async fn is_locked_down(&self) -> bool {
        self.core.lock().await.lockdown.is_some()
    }

    /// Clear a lockdown. Returns whether one was active.
    pub async fn release_lockdown(&self, actor_id: &str, reason: &str) -> bool {
        let mut core = self.core.lock().await;
        match core.lockdown.take() {
            Some(lockdown) => {
                info!(
                    machine_id = %self.config.machine_id,
                    actor_id,
                    reason,
                    check = %lockdown.check,
                    "Lockdown released"
                );
                true
            }
            None => false,
        }
    }

    /// Set legitimacy from a governance flow outside synthesis.
    pub async fn set_legitimacy(&self, legitimacy: f64) -> CognitiveState {
        let mut core = self.core.lock().await;
        core.state = core.state.clone().with_legitimacy(legitimacy);
        debug!(legitimacy = core.state.legitimacy(), "Legitimacy updated");
        core.state.clone()
    }

    /// Mark a protocol active.
    pub async fn activate_protocol(&self, protocol: impl Into<String>) -> CognitiveState {
        let protocol = protocol.into();
        let mut core = self.core.lock().await;
        core.state = core.state.clone().with_protocol(protocol.clone());
        info!(
            protocol = %protocol,
            active = core.state.active_protocols().len(),
            "Protocol activated"
        );
        core.state.clone()
    }

    /// Mark a protocol inactive.
    pub async fn deactivate_protocol(&self, protocol: &str) -> CognitiveState {
        let mut core = self.core.lock().await;
        core.state = core.state.clone().without_protocol(protocol);
        info!(
            protocol,
            active = core.state.active_protocols().len(),
            "Protocol deactivated"
        );
        core.state.clone()
    }

    /// Switch to a newer version of the active constitution after verifying
    /// its hash. Older or equal versions and other constitutions are refused;
    /// going back means committing a rollback version first.
    pub async fn adopt_constitution(&self, constitution: Arc<Constitution>) -> Result<()> {
        constitution.verify()?;

        let mut core = self.core.lock().await;
        let current = core.rules.constitution();
        if constitution.id() != current.id() {
            return Err(CognitionError::Validation(format!(
                "constitution {} cannot replace {}",
                constitution.id(),
                current.id()
            )));
        }
        let previous = current.version();
        if constitution.version() <= previous {
            warn!(
                constitution_id = %constitution.id(),
                active_version = previous,
                offered_version = constitution.version(),
                "Refusing to adopt a non-advancing constitution version"
            );
            return Err(CognitionError::Validation(format!(
                "constitution version {} does not advance active version {}",
                constitution.version(),
                previous
            )));
        }
        core.rules = build_rule_engine(&self.config.evaluation, Arc::clone(&constitution));
        info!(
            constitution_id = %constitution.id(),
            from_version = previous,
            to_version = constitution.version(),
            hash = %constitution.hash(),
            "Constitution adopted"
        );
        Ok(())
    }

    /// Run one tick.
    ///
    /// On an integrity fault the drained batch is discarded, the held state
    /// is left unchanged and the machine locks down.
    pub async fn tick(&self) -> Result<TickOutcome> {
        let mut core = self.core.lock().await;
        let result = self.run_tick(&mut core).await;
        self.set_phase(MachinePhase::Idle).await;
        result
    }

    async fn run_tick(&self, core: &mut Core) -> Result<TickOutcome> {
        self.set_phase(MachinePhase::Draining).await;
        let batch = self.intake.drain().await;

        if let Some(violation) = self.checks.iter().find_map(|check| check.inspect(&batch)) {
            warn!(
                machine_id = %self.config.machine_id,
                check = %violation.check,
                detail = %violation.detail,
                signals = ?violation.signal_ids,
                discarded = batch.len(),
                "Integrity fault, entering lockdown"
            );
            core.lockdown = Some(Lockdown::from_violation(&violation));
            return Err(CognitionError::IntegrityFault {
                check: violation.check,
                detail: violation.detail,
            });
        }

        self.set_phase(MachinePhase::Synthesizing).await;
        let state = self.synthesizer.synthesize(&core.state, &batch, Utc::now());

        self.set_phase(MachinePhase::Generating).await;
        let intents = self.generator.generate(&state);

        self.set_phase(MachinePhase::Evaluating).await;
        let verdicts: Vec<ConstitutionalVerdict> = intents
            .iter()
            .map(|intent| core.rules.evaluate(&state, intent))
            .collect();

        self.set_phase(MachinePhase::Dampening).await;
        let assessment = self.governor.assess(&state, &intents);
        let suppress = self.governor.should_dampen(&assessment);

        self.set_phase(MachinePhase::Vetting).await;
        let lockdown = core.lockdown.clone();
        let mut executable = Vec::new();
        let mut dispositions = Vec::with_capacity(intents.len());
        for (intent, verdict) in intents.iter().zip(verdicts) {
            let (disposition, cleared) = self.dispose(intent, verdict, &assessment, suppress, lockdown.as_ref());
            executable.extend(cleared);
            dispositions.push(disposition);
        }

        core.state = state.clone();
        core.last_intents = intents.clone();
        core.tick += 1;

        info!(
            machine_id = %self.config.machine_id,
            tick = core.tick,
            signals = batch.len(),
            intents = intents.len(),
            executable = executable.len(),
            lockdown = lockdown.is_some(),
            risk = state.risk(),
            load = state.load(),
            "Tick complete"
        );

        Ok(TickOutcome {
            tick: core.tick,
            state,
            intents,
            executable,
            dispositions,
            assessment,
            signals_processed: batch.len(),
            lockdown: lockdown.is_some(),
        })
    }

    /// Gate one evaluated intent. Reason precedence: lockdown, constitution,
    /// governor, gate.
    fn dispose(
        &self,
        intent: &CognitiveIntent,
        verdict: ConstitutionalVerdict,
        assessment: &Assessment,
        suppress: bool,
        lockdown: Option<&Lockdown>,
    ) -> (IntentDisposition, Option<CognitiveIntent>) {
        let gate_rejection = self.gate.rejection(intent);

        let reason = if let Some(lockdown) = lockdown {
            Some(lockdown.reason())
        } else if !verdict.allowed {
            Some(verdict.reason.clone())
        } else if suppress {
            Some(format!("suppressed by meta-cognitive governor: {}", assessment.summary()))
        } else {
            gate_rejection.clone()
        };

        let cleared = if reason.is_none() {
            Some(match verdict.dampening {
                Some(factor) => intent.dampened(factor),
                None => intent.clone(),
            })
        } else {
            None
        };

        if let Some(reason) = &reason {
            debug!(intent_id = %intent.id, action = %intent.action, reason = %reason, "Intent blocked");
        }

        let disposition = IntentDisposition {
            intent_id: intent.id.clone(),
            verdict,
            governor_suppressed: suppress,
            gate_passed: gate_rejection.is_none(),
            executable: cleared.is_some(),
            reason,
        };
        (disposition, cleared)
    }

    /// Run a single intent back through constitution, governor and gate
    /// against the held state, e.g. after the human channel approved it.
    ///
    /// The governor sees the resubmitted intent alongside the rest of the
    /// last tick's candidates, so a group it suppressed stays suppressed
    /// when its members come back one at a time.
    pub async fn resubmit(&self, intent: CognitiveIntent) -> Result<Resubmission> {
        intent.check().map_err(|problems| {
            CognitionError::Validation(format!("intent {}: {problems}", intent.id))
        })?;

        let core = self.core.lock().await;
        let verdict = core.rules.evaluate(&core.state, &intent);
        let cohort = resubmission_cohort(&core.last_intents, &intent);
        let assessment = self.governor.assess(&core.state, &cohort);
        let suppress = self.governor.should_dampen(&assessment);
        let (disposition, executable) =
            self.dispose(&intent, verdict, &assessment, suppress, core.lockdown.as_ref());

        info!(
            intent_id = %intent.id,
            approved_by = intent.human_approval.as_ref().map(|a| a.actor_id.as_str()).unwrap_or("none"),
            executable = disposition.executable,
            "Intent resubmitted"
        );

        Ok(Resubmission {
            disposition,
            executable,
        })
    }
}

/// The last tick's candidates with `intent` in place of the candidate
/// sharing its id, or appended when none does.
fn resubmission_cohort(last: &[CognitiveIntent], intent: &CognitiveIntent) -> Vec<CognitiveIntent> {
    let mut cohort: Vec<CognitiveIntent> = last.iter().filter(|c| c.id != intent.id).cloned().collect();
    cohort.push(intent.clone());
    cohort
}

fn build_rule_engine(config: &EvaluationConfig, constitution: Arc<Constitution>) -> RuleEngine {
    RuleEngine::new(constitution)
        .with_mode(config.mode)
        .with_protective_dampening(config.protective_dampening)
}

/// Builder for CognitiveMachine.
pub struct MachineBuilder {
    config: CognitionConfig,
    constitution: Option<Arc<Constitution>>,
    ids: Option<Arc<dyn IntentIdGenerator>>,
    checks: Vec<Arc<dyn IntegrityCheck>>,
    initial_state: Option<CognitiveState>,
}

impl MachineBuilder {
    /// Create a new builder.
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self::from_config(CognitionConfig::new(machine_id))
    }

    /// Start from an existing configuration.
    pub fn from_config(config: CognitionConfig) -> Self {
        Self {
            config,
            constitution: None,
            ids: None,
            checks: Vec::new(),
            initial_state: None,
        }
    }

    /// Set intake buffer size.
    pub fn intake_buffer_size(mut self, size: usize) -> Self {
        self.config.intake.buffer_size = size;
        self
    }

    /// Set evaluation mode.
    pub fn evaluation_mode(mut self, mode: EvaluationMode) -> Self {
        self.config.evaluation.mode = mode;
        self
    }

    /// Set the per-rule protective dampening factor.
    pub fn protective_dampening(mut self, factor: f64) -> Self {
        self.config.evaluation.protective_dampening = factor;
        self
    }

    /// Set the emergency risk threshold.
    pub fn emergency_threshold(mut self, threshold: f64) -> Self {
        self.config.generator.emergency_risk_threshold = threshold;
        self
    }

    /// Add a state-to-intent mapping.
    pub fn intent_rule(mut self, rule: IntentRule) -> Self {
        self.config.generator.rules.push(rule);
        self
    }

    /// Enable/disable the built-in consistency check.
    pub fn integrity_checks(mut self, enabled: bool) -> Self {
        self.config.general.integrity_checks_enabled = enabled;
        self
    }

    /// Add an integrity check.
    pub fn integrity_check(mut self, check: Arc<dyn IntegrityCheck>) -> Self {
        self.checks.push(check);
        self
    }

    /// Set the intent id source.
    pub fn id_generator(mut self, ids: Arc<dyn IntentIdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Evaluate against this constitution instead of the reference one.
    pub fn constitution(mut self, constitution: Arc<Constitution>) -> Self {
        self.constitution = Some(constitution);
        self
    }

    /// Start from this state instead of the calm initial one.
    pub fn initial_state(mut self, state: CognitiveState) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Build the machine.
    pub fn build(self) -> Result<CognitiveMachine> {
        self.config.validate()?;

        let constitution = match self.constitution {
            Some(constitution) => {
                constitution.verify()?;
                constitution
            }
            None => Arc::new(Constitution::reference(Utc::now())?),
        };

        let ids = self.ids.unwrap_or_else(|| Arc::new(UuidIdGenerator));
        let generator = IntentGenerator::from_config(&self.config.generator, ids)?;

        let mut checks: Vec<Arc<dyn IntegrityCheck>> = Vec::new();
        if self.config.general.integrity_checks_enabled {
            checks.push(Arc::new(ConsistencyCheck::new()));
        }
        checks.extend(self.checks);

        let state = self.initial_state.unwrap_or_else(|| {
            CognitiveState::initial(Utc::now()).with_legitimacy(self.config.general.initial_legitimacy)
        });

        let rules = build_rule_engine(&self.config.evaluation, Arc::clone(&constitution));

        info!(
            machine_id = %self.config.machine_id,
            constitution_id = %constitution.id(),
            constitution_version = constitution.version(),
            intent_rules = generator.rule_count(),
            integrity_checks = checks.len(),
            "CognitiveMachine built"
        );

        Ok(CognitiveMachine {
            intake: SignalIntake::with_config(self.config.intake.clone()),
            synthesizer: StateSynthesizer::with_config(self.config.synthesis.clone()),
            generator,
            governor: MetaGovernor::with_config(self.config.governor.clone()),
            gate: GuardianiaGate::with_config(self.config.gate.clone()),
            checks,
            core: Mutex::new(Core {
                state,
                rules,
                tick: 0,
                lockdown: None,
                last_intents: Vec::new(),
            }),
            phase: RwLock::new(MachinePhase::Idle),
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use constitution::{IntentScope, Reversibility};

    use super::*;
    use crate::generator::{IntentTemplate, SequentialIdGenerator, StateCondition, EMERGENCY_ACTION};
    use crate::types::{SignalDomain, SignalNature, SignalOrigin};

    fn security(intensity: f64) -> Signal {
        Signal::new(
            SignalOrigin::Sensing,
            SignalDomain::Security,
            SignalNature::Observation,
            "intrusion_attempt",
            intensity,
        )
    }

    fn sequential() -> Arc<dyn IntentIdGenerator> {
        Arc::new(SequentialIdGenerator::new())
    }

    fn rebalance_rule() -> IntentRule {
        IntentRule::new(
            "rebalance",
            StateCondition::Always,
            IntentTemplate {
                action: "rebalance_load".to_string(),
                scope: IntentScope::System,
                reversibility: Reversibility::Soft,
                urgency: 0.4,
                confidence: 0.8,
                ethical_cost: 0.1,
                derived_from: ["scheduler".to_string(), "telemetry".to_string()].into(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_tick_on_empty_intake() {
        let machine = CognitiveMachine::new("test-machine").unwrap();
        let outcome = machine.tick().await.unwrap();

        assert_eq!(outcome.tick, 1);
        assert_eq!(outcome.signals_processed, 0);
        assert!(outcome.intents.is_empty());
        assert!(outcome.executable.is_empty());
        assert_eq!(machine.phase().await, MachinePhase::Idle);
    }

    #[tokio::test]
    async fn test_tick_replaces_state() {
        let machine = CognitiveMachine::new("test-machine").unwrap();
        machine.ingest(security(1.0)).await.unwrap();
        assert_eq!(machine.pending_signals().await, 1);

        let outcome = machine.tick().await.unwrap();
        assert!((outcome.state.risk() - 0.4).abs() < 1e-9);
        assert_eq!(machine.state().await, outcome.state);
        assert_eq!(machine.pending_signals().await, 0);
    }

    #[tokio::test]
    async fn test_soft_intent_is_executable() {
        let machine = CognitiveMachine::builder("test-machine")
            .id_generator(sequential())
            .intent_rule(rebalance_rule())
            .build()
            .unwrap();

        let outcome = machine.tick().await.unwrap();
        assert_eq!(outcome.executable.len(), 1);
        assert_eq!(outcome.executable[0].id, "intent-1");
        assert!(outcome.dispositions[0].executable);
        assert!(outcome.dispositions[0].reason.is_none());
    }

    #[tokio::test]
    async fn test_emergency_without_sources_needs_human() {
        let machine = CognitiveMachine::builder("test-machine")
            .initial_state(CognitiveState::new(0.85, 0.1, 0.9, Utc::now()))
            .build()
            .unwrap();

        let outcome = machine.tick().await.unwrap();
        assert_eq!(outcome.intents.len(), 1);
        assert_eq!(outcome.intents[0].action, EMERGENCY_ACTION);

        let disposition = &outcome.dispositions[0];
        assert!(!disposition.verdict.allowed);
        assert!(disposition.verdict.require_human);
        assert!(disposition.reason.as_deref().unwrap().contains("no-single-source-dominance"));
        assert!(outcome.executable.is_empty());
    }

    #[tokio::test]
    async fn test_protocol_saturation_dampens_executable_copy() {
        let machine = CognitiveMachine::builder("test-machine")
            .intent_rule(rebalance_rule())
            .build()
            .unwrap();
        for protocol in ["quarantine", "rate_limit", "audit_mode"] {
            machine.activate_protocol(protocol).await;
        }

        let outcome = machine.tick().await.unwrap();
        assert_eq!(outcome.dispositions[0].verdict.dampening, Some(0.5));
        assert_eq!(outcome.executable.len(), 1);
        assert!((outcome.executable[0].urgency - 0.2).abs() < 1e-9);
        assert_eq!(outcome.intents[0].urgency, 0.4);
    }

    #[tokio::test]
    async fn test_integrity_fault_locks_down() {
        let machine = CognitiveMachine::builder("test-machine")
            .intent_rule(rebalance_rule())
            .build()
            .unwrap();
        let before = machine.state().await;

        machine.ingest(security(0.5).with_id("dup")).await.unwrap();
        machine.ingest(security(0.5).with_id("dup")).await.unwrap();

        let err = machine.tick().await.unwrap_err();
        assert!(matches!(err, CognitionError::IntegrityFault { .. }));
        assert!(machine.is_locked_down().await);
        assert_eq!(machine.state().await, before);
        assert_eq!(machine.pending_signals().await, 0);
        assert_eq!(machine.tick_count().await, 0);

        let outcome = machine.tick().await.unwrap();
        assert!(outcome.lockdown);
        assert!(outcome.executable.is_empty());
        assert!(outcome.dispositions[0].reason.as_deref().unwrap().contains("lockdown"));

        assert!(machine.release_lockdown("steward-1", "duplicate feed fixed").await);
        assert!(!machine.release_lockdown("steward-1", "again").await);
        let outcome = machine.tick().await.unwrap();
        assert_eq!(outcome.executable.len(), 1);
    }

    #[tokio::test]
    async fn test_human_approval_resubmission_still_gated() {
        let machine = CognitiveMachine::builder("test-machine")
            .initial_state(CognitiveState::new(0.85, 0.1, 0.9, Utc::now()))
            .build()
            .unwrap();
        let outcome = machine.tick().await.unwrap();

        let approved = outcome.intents[0]
            .clone()
            .with_approval("steward-7", "confirmed breach by phone");
        let resubmission = machine.resubmit(approved).await.unwrap();

        let disposition = resubmission.disposition;
        assert!(disposition.verdict.allowed);
        assert_eq!(disposition.verdict.overridden_rules, vec!["no-single-source-dominance".to_string()]);
        assert!(!disposition.gate_passed);
        assert!(resubmission.executable.is_none());
        assert!(disposition.reason.as_deref().unwrap().contains("guardiania"));
    }

    #[tokio::test]
    async fn test_resubmit_rejects_malformed_intent() {
        let machine = CognitiveMachine::new("test-machine").unwrap();
        let mut intent = rebalance_rule().template.to_intent("bad".to_string());
        intent.urgency = 4.0;
        assert!(matches!(machine.resubmit(intent).await, Err(CognitionError::Validation(_))));
    }

    #[tokio::test]
    async fn test_governance_flows_update_state() {
        let machine = CognitiveMachine::new("test-machine").unwrap();
        let state = machine.set_legitimacy(0.6).await;
        assert_eq!(state.legitimacy(), 0.6);

        machine.activate_protocol("quarantine").await;
        let state = machine.deactivate_protocol("quarantine").await;
        assert!(state.active_protocols().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_raw_fails_closed() {
        let machine = CognitiveMachine::new("test-machine").unwrap();
        let raw = RawSignal {
            id: Some("sig-1".to_string()),
            ..Default::default()
        };
        assert!(machine.ingest_raw(raw).await.is_err());
        assert_eq!(machine.pending_signals().await, 0);
    }

    #[tokio::test]
    async fn test_builder() {
        let machine = MachineBuilder::new("builder-test")
            .intake_buffer_size(100)
            .evaluation_mode(EvaluationMode::ShortCircuit)
            .protective_dampening(0.25)
            .integrity_checks(false)
            .build()
            .unwrap();

        assert_eq!(machine.id(), "builder-test");
        assert_eq!(machine.config().intake.buffer_size, 100);
        assert_eq!(machine.config().evaluation.mode, EvaluationMode::ShortCircuit);
        assert!(machine.checks.is_empty());
    }

    #[tokio::test]
    async fn test_builder_rejects_invalid_config() {
        let result = MachineBuilder::new("bad").protective_dampening(1.5).build();
        assert!(matches!(result, Err(CognitionError::ConfigError(_))));
    }
}
