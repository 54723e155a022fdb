//! Envelope types for the listener-facing WebSocket protocol.
//!
//! Every frame the server sends is one JSON object whose `"type"` field names
//! the variant.  The set of variants is closed: listeners can switch on
//! `type` without guessing at shapes.
//!
//! ```json
//! {"type":"test","message":"WebSocket connection successful"}
//! {"type":"status","status":"connected","message":"Connected 2 DualSense controller(s)"}
//! {"type":"controllers","controllers":[{"buttons":{...},...},null]}
//! ```
//!
//! All encoding goes through [`Envelope::to_json`].

use padcast_core::InputSnapshot;
use serde::{Deserialize, Serialize};

/// Text of the greeting sent to every new listener.
pub const TEST_MESSAGE: &str = "WebSocket connection successful";

/// Device lifecycle as reported in `status` envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Connected,
    Disconnected,
    Error,
}

/// Every message the server sends to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    /// Sent once, immediately after a listener connects.
    Test { message: String },

    /// Device discovery/attach outcome.
    Status { status: StatusKind, message: String },

    /// Latest snapshot of every known device, one slot per device index.
    ///
    /// A slot is `null` until its device has calibrated and produced a
    /// report, and stays `null` for devices that failed to attach or
    /// calibrate.  Always the full array, never a delta.
    Controllers { controllers: Vec<Option<InputSnapshot>> },
}

impl Envelope {
    /// The connect-time greeting.
    pub fn test() -> Self {
        Self::Test {
            message: TEST_MESSAGE.to_string(),
        }
    }

    pub fn status(status: StatusKind, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Short variant name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Test { .. } => "test",
            Self::Status { .. } => "status",
            Self::Controllers { .. } => "controllers",
        }
    }

    /// Encodes the envelope as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns the serializer error.  serde_json writes non-finite floats as
    /// `null`, so the envelope types above do not trigger it in practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn encode(envelope: &Envelope) -> Value {
        serde_json::from_str(&envelope.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_test_envelope_shape() {
        assert_eq!(
            encode(&Envelope::test()),
            json!({"type": "test", "message": "WebSocket connection successful"})
        );
    }

    #[test]
    fn test_status_envelope_uses_lowercase_status() {
        let value = encode(&Envelope::status(StatusKind::Disconnected, "No controllers found"));
        assert_eq!(
            value,
            json!({"type": "status", "status": "disconnected", "message": "No controllers found"})
        );
    }

    #[test]
    fn test_status_error_kind() {
        let value = encode(&Envelope::status(StatusKind::Error, "boom"));
        assert_eq!(value["status"], "error");
    }

    #[test]
    fn test_controllers_envelope_keeps_null_slots() {
        // Arrange: slot 0 decoded, slot 1 still calibrating.
        let envelope = Envelope::Controllers {
            controllers: vec![Some(InputSnapshot::default()), None],
        };

        // Act
        let value = encode(&envelope);

        // Assert
        assert_eq!(value["type"], "controllers");
        let slots = value["controllers"].as_array().unwrap();
        assert_eq!(slots.len(), 2);
        assert!(slots[0].is_object());
        assert!(slots[0].get("leftStick").is_some());
        assert!(slots[1].is_null());
    }

    #[test]
    fn test_envelope_round_trips_through_json() {
        let original =
            Envelope::status(StatusKind::Connected, "Connected 1 DualSense controller(s)");
        let decoded: Envelope = serde_json::from_str(&original.to_json().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_non_finite_trigger_is_written_as_null() {
        let mut snapshot = InputSnapshot::default();
        snapshot.triggers.l2 = f64::NAN;
        let envelope = Envelope::Controllers {
            controllers: vec![Some(snapshot)],
        };

        let value = encode(&envelope);

        assert!(value["controllers"][0]["triggers"]["l2"].is_null());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Envelope::test().kind(), "test");
        assert_eq!(Envelope::status(StatusKind::Error, "x").kind(), "status");
        assert_eq!(
            Envelope::Controllers {
                controllers: vec![]
            }
            .kind(),
            "controllers"
        );
    }
}
