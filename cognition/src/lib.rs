//! Cognition - the tick-driven cognitive decision pipeline.
//!
//! Turns a stream of signals into a bounded state snapshot, proposes
//! candidate intents from it, and filters them through constitutional
//! evaluation, a meta-cognitive governor and the Guardiania gate before
//! anything may execute:
//!
//! - **Intake**: concurrent producers, whole-batch hand-off
//! - **Synthesis**: pure fold of a batch into the next state
//! - **Generation**: state-to-intent mappings, emergency built in
//! - **Filtering**: constitution, governor, gate, in that order
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      CognitiveMachine                        │
//! │                                                              │
//! │  ┌────────┐  ┌────────────┐  ┌───────────┐                   │
//! │  │ Intake │──│ Synthesize │──│ Generate  │                   │
//! │  └────────┘  └────────────┘  └─────┬─────┘                   │
//! │                                    │                         │
//! │               ┌────────────────────┼──────────────┐          │
//! │               ▼                    ▼              │          │
//! │       ┌──────────────┐     ┌──────────────┐       │          │
//! │       │ Constitution │     │   Governor   │       │          │
//! │       └──────┬───────┘     └──────┬───────┘       │          │
//! │              └─────────┬──────────┘               │          │
//! │                  ┌─────▼──────┐                   │          │
//! │                  │ Guardiania │──▶ executable     │          │
//! │                  └────────────┘                   │          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cognition::{CognitiveMachine, Signal, SignalDomain, SignalNature, SignalOrigin};
//!
//! let machine = CognitiveMachine::new("node-1")?;
//! machine
//!     .ingest(Signal::new(
//!         SignalOrigin::Sensing,
//!         SignalDomain::Security,
//!         SignalNature::Observation,
//!         "port_scan",
//!         0.6,
//!     ))
//!     .await?;
//!
//! let outcome = machine.tick().await?;
//! for intent in &outcome.executable {
//!     dispatcher.perform(intent).await?;
//! }
//! ```

pub mod config;
pub mod gate;
pub mod generator;
pub mod governor;
pub mod intake;
pub mod integrity;
pub mod machine;
pub mod synthesis;
pub mod types;

// Re-export main types
pub use config::CognitionConfig;
pub use gate::GuardianiaGate;
pub use generator::{
    IntentGenerator, IntentIdGenerator, IntentRule, IntentTemplate, SequentialIdGenerator, StateCondition,
    UuidIdGenerator, EMERGENCY_ACTION,
};
pub use governor::{Assessment, GovernorConcern, MetaGovernor};
pub use intake::SignalIntake;
pub use integrity::{ConsistencyCheck, IntegrityCheck, IntegrityViolation};
pub use machine::{
    CognitiveMachine, IntentDisposition, Lockdown, MachineBuilder, MachinePhase, Resubmission, TickOutcome,
};
pub use synthesis::StateSynthesizer;
pub use types::*;

pub use constitution::{CognitiveIntent, CognitiveState, IntentScope, Reversibility};
