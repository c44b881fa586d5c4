//! Integrity checks run over each drained batch before synthesis.
//!
//! A violation is a fault, not a rejection: the machine discards the batch
//! and locks down until a human releases it.

use std::collections::{HashMap, HashSet};

use crate::types::Signal;

/// What a check found wrong with a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityViolation {
    /// Name of the check that fired
    pub check: String,
    /// Description of the inconsistency
    pub detail: String,
    /// Signals involved
    pub signal_ids: Vec<String>,
}

/// Common trait for batch integrity checks.
pub trait IntegrityCheck: Send + Sync {
    /// Name of the check.
    fn name(&self) -> &str;

    /// Inspect a batch in arrival order.
    fn inspect(&self, batch: &[Signal]) -> Option<IntegrityViolation>;
}

/// Flags duplicate signal ids and contradictory readings.
///
/// Two signals contradict when the same named producer reports the same type
/// tag at the same timestamp with different intensities. Signals without a
/// `source_id` are only checked for duplicate ids, since readings from
/// different sensors are expected to differ.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyCheck;

impl ConsistencyCheck {
    pub const NAME: &'static str = "consistency";

    pub fn new() -> Self {
        Self
    }
}

impl IntegrityCheck for ConsistencyCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn inspect(&self, batch: &[Signal]) -> Option<IntegrityViolation> {
        let mut seen_ids = HashSet::new();
        let mut readings: HashMap<(&str, &str, _), &Signal> = HashMap::new();

        for signal in batch {
            if !seen_ids.insert(signal.id.as_str()) {
                return Some(IntegrityViolation {
                    check: Self::NAME.to_string(),
                    detail: format!("duplicate signal id {}", signal.id),
                    signal_ids: vec![signal.id.clone()],
                });
            }

            let Some(source) = signal.source_id.as_deref() else {
                continue;
            };
            let key = (source, signal.signal_type.as_str(), signal.timestamp);
            match readings.get(&key) {
                Some(earlier) if earlier.intensity != signal.intensity => {
                    return Some(IntegrityViolation {
                        check: Self::NAME.to_string(),
                        detail: format!(
                            "contradictory {} readings from {} at {}: {} vs {}",
                            signal.signal_type,
                            source,
                            signal.timestamp.to_rfc3339(),
                            earlier.intensity,
                            signal.intensity
                        ),
                        signal_ids: vec![earlier.id.clone(), signal.id.clone()],
                    });
                }
                Some(_) => {}
                None => {
                    readings.insert(key, signal);
                }
            }
        }

        None
    }
}
