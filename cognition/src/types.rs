//! Core types for the cognitive pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use constitution::{clamp_unit, ConstitutionError};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Which subsystem produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SignalOrigin {
    /// Sensing subsystems
    Sensing,
    /// Social layer
    Social,
    /// Ledger activity
    Ledger,
    /// Infrastructure telemetry
    Infrastructure,
    /// Direct human input
    HumanInput,
}

/// Domain a signal speaks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SignalDomain {
    Security,
    Economy,
    Governance,
    Infrastructure,
    UserExperience,
    Ritual,
}

/// Epistemic nature of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SignalNature {
    /// Something was seen
    Observation,
    /// Something was judged
    Evaluation,
    /// Something was ordered
    Directive,
}

/// Severity level of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SignalSeverity {
    Info = 0,
    Notice = 1,
    Warning = 2,
    Critical = 3,
}

impl Default for SignalSeverity {
    fn default() -> Self {
        Self::Info
    }
}

/// An immutable fact about the environment.
///
/// Consumed exactly once by state synthesis, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    /// Unique signal ID
    pub id: String,
    /// Producing subsystem
    pub origin: SignalOrigin,
    /// Domain the signal concerns
    pub domain: SignalDomain,
    /// Observation, evaluation or directive
    pub nature: SignalNature,
    /// Free-text type tag
    #[serde(rename = "type")]
    pub signal_type: String,
    /// Severity level
    pub severity: SignalSeverity,
    /// Intensity (0.0 - 1.0)
    pub intensity: f64,
    /// When the signal was produced
    pub timestamp: DateTime<Utc>,
    /// Raw data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Identity of the producing sensor or service, if it reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Related anchor (lookup only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_ref: Option<String>,
    /// Related ledger transaction (lookup only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_tx_ref: Option<String>,
}

impl Signal {
    /// Create a new signal. Intensity is clamped into `[0, 1]`.
    pub fn new(
        origin: SignalOrigin,
        domain: SignalDomain,
        nature: SignalNature,
        signal_type: impl Into<String>,
        intensity: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            origin,
            domain,
            nature,
            signal_type: signal_type.into(),
            severity: SignalSeverity::default(),
            intensity: clamp_unit(intensity),
            timestamp: Utc::now(),
            payload: None,
            source_id: None,
            anchor_ref: None,
            ledger_tx_ref: None,
        }
    }

    /// Set an explicit ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set severity level.
    pub fn with_severity(mut self, severity: SignalSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the production time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach raw data.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Name the producer.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_id = Some(source.into());
        self
    }

    /// Reference a related anchor.
    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor_ref = Some(anchor.into());
        self
    }

    /// Reference a related ledger transaction.
    pub fn with_ledger_tx(mut self, tx: impl Into<String>) -> Self {
        self.ledger_tx_ref = Some(tx.into());
        self
    }

    /// Check the fields a caller may have set directly. Intensity must be a
    /// finite value in `[0, 1]`.
    pub fn check(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.intensity) {
            return Err(CognitionError::Validation(format!(
                "signal {}: intensity {} is outside [0, 1]",
                self.id, self.intensity
            )));
        }
        Ok(())
    }

    /// Parse and validate an untyped record.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let raw: RawSignal = serde_json::from_value(value)
            .map_err(|e| CognitionError::Validation(format!("malformed signal: {e}")))?;
        raw.validate()
    }
}

/// A signal as received at the boundary, before validation.
///
/// Every attribute is optional here so that missing fields can be reported
/// together instead of failing on the first one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSignal {
    pub id: Option<String>,
    pub origin: Option<SignalOrigin>,
    pub domain: Option<SignalDomain>,
    pub nature: Option<SignalNature>,
    #[serde(rename = "type")]
    pub signal_type: Option<String>,
    pub severity: Option<SignalSeverity>,
    pub intensity: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub payload: Option<serde_json::Value>,
    pub source_id: Option<String>,
    pub anchor_ref: Option<String>,
    pub ledger_tx_ref: Option<String>,
}

impl RawSignal {
    /// Validate into a [`Signal`], failing closed on any missing or
    /// out-of-range required field.
    pub fn validate(self) -> Result<Signal> {
        let mut missing = Vec::new();

        let id = self.id.filter(|s| !s.trim().is_empty());
        let signal_type = self.signal_type.filter(|s| !s.trim().is_empty());

        if id.is_none() {
            missing.push("id");
        }
        if self.origin.is_none() {
            missing.push("origin");
        }
        if self.domain.is_none() {
            missing.push("domain");
        }
        if self.nature.is_none() {
            missing.push("nature");
        }
        if signal_type.is_none() {
            missing.push("type");
        }
        if self.severity.is_none() {
            missing.push("severity");
        }
        if self.intensity.is_none() {
            missing.push("intensity");
        }
        if self.timestamp.is_none() {
            missing.push("timestamp");
        }

        match (id, self.origin, self.domain, self.nature, signal_type, self.severity, self.intensity, self.timestamp) {
            (
                Some(id),
                Some(origin),
                Some(domain),
                Some(nature),
                Some(signal_type),
                Some(severity),
                Some(intensity),
                Some(timestamp),
            ) => {
                let signal = Signal {
                    id,
                    origin,
                    domain,
                    nature,
                    signal_type,
                    severity,
                    intensity,
                    timestamp,
                    payload: self.payload,
                    source_id: self.source_id,
                    anchor_ref: self.anchor_ref,
                    ledger_tx_ref: self.ledger_tx_ref,
                };
                signal.check()?;
                Ok(signal)
            }
            _ => Err(CognitionError::Validation(format!(
                "signal is missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

/// Error types for the cognitive pipeline.
///
/// Constitutional rejections and governor suppression are not errors; they
/// are returned as data in the tick outcome.
#[derive(Debug, thiserror::Error)]
pub enum CognitionError {
    /// Malformed signal or intent rejected at the boundary
    #[error("Validation failure: {0}")]
    Validation(String),

    /// Consistency check failed; the machine is now locked down
    #[error("Integrity fault detected by {check}: {detail}")]
    IntegrityFault { check: String, detail: String },

    /// Constitution could not be built, verified or published
    #[error("Constitution error: {0}")]
    Constitution(#[from] ConstitutionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, CognitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> serde_json::Value {
        serde_json::json!({
            "id": "sig-1",
            "origin": "sensing",
            "domain": "security",
            "nature": "observation",
            "type": "perimeter_breach",
            "severity": "critical",
            "intensity": 0.7,
            "timestamp": "2026-02-01T10:00:00Z",
            "ledgerTxRef": "tx-42"
        })
    }

    #[test]
    fn test_from_json_accepts_complete_record() {
        let signal = Signal::from_json(complete()).unwrap();
        assert_eq!(signal.id, "sig-1");
        assert_eq!(signal.domain, SignalDomain::Security);
        assert_eq!(signal.severity, SignalSeverity::Critical);
        assert_eq!(signal.ledger_tx_ref.as_deref(), Some("tx-42"));
        assert!(signal.payload.is_none());
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let mut value = complete();
        let obj = value.as_object_mut().unwrap();
        obj.remove("domain");
        obj.remove("timestamp");

        let err = Signal::from_json(value).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("domain"));
        assert!(message.contains("timestamp"));
    }

    #[test]
    fn test_unknown_domain_is_rejected() {
        let mut value = complete();
        value["domain"] = serde_json::json!("weather");
        assert!(matches!(Signal::from_json(value), Err(CognitionError::Validation(_))));
    }

    #[test]
    fn test_out_of_range_intensity_is_rejected() {
        let mut value = complete();
        value["intensity"] = serde_json::json!(1.5);
        assert!(matches!(Signal::from_json(value), Err(CognitionError::Validation(_))));
    }

    #[test]
    fn test_new_clamps_intensity() {
        let signal = Signal::new(
            SignalOrigin::Infrastructure,
            SignalDomain::Infrastructure,
            SignalNature::Observation,
            "cpu",
            3.0,
        );
        assert_eq!(signal.intensity, 1.0);
        assert_eq!(signal.severity, SignalSeverity::Info);
    }

    #[test]
    fn test_check_rejects_directly_set_intensity() {
        let mut signal = Signal::new(
            SignalOrigin::Sensing,
            SignalDomain::Security,
            SignalNature::Observation,
            "port_scan",
            0.5,
        );
        assert!(signal.check().is_ok());

        for bad in [f64::NAN, f64::INFINITY, -2.0, 1.01] {
            signal.intensity = bad;
            assert!(matches!(signal.check(), Err(CognitionError::Validation(_))), "{bad}");
        }
    }

    #[test]
    fn test_source_id_is_carried_through() {
        let mut value = complete();
        value["sourceId"] = serde_json::json!("rack-1");
        let signal = Signal::from_json(value).unwrap();
        assert_eq!(signal.source_id.as_deref(), Some("rack-1"));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(SignalSeverity::Critical > SignalSeverity::Warning);
        assert!(SignalSeverity::Notice > SignalSeverity::Info);
    }
}
