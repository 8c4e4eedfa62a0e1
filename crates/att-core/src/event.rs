//! Raw access-control events from the door cameras.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Key under which controllers wrap their event body. Some firmware
/// revisions wrap it twice.
const WRAPPER_KEY: &str = "AccessControllerEvent";

/// Address fields tried when probing a payload, in priority order.
const ADDRESS_KEYS: &[&str] = &["ipAddress", "remoteHostAddr", "ip"];

/// One hardware notification as normalized by the ingestion collaborator.
///
/// Immutable once recorded: the reconciler derives sessions from events but
/// never rewrites them. Timestamps are site-local wall clock; schedules and
/// calendar-day bucketing are defined against the doorway's clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Unique identifier for this event.
    pub id: String,
    /// Badge id as reported by the device, possibly zero-padded.
    pub employee_id: String,
    /// Device label, when the controller reports one.
    #[serde(default)]
    pub device_label: Option<String>,
    /// Network address of the reporting device, when known up front.
    #[serde(default)]
    pub network_address: Option<String>,
    /// When the event occurred (site-local wall clock).
    pub event_time: NaiveDateTime,
    /// Opaque controller payload, used only for classification.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

impl RawEvent {
    /// Resolves the network address that should drive classification.
    ///
    /// The explicit field wins; otherwise the payload is probed. Upstream
    /// systems sometimes double-wrap the event body, so the once-nested
    /// wrapper is checked first, then the outer wrapper, then the payload
    /// root. Absent or malformed payloads yield `None`.
    #[must_use]
    pub fn network_address(&self) -> Option<String> {
        if let Some(addr) = &self.network_address {
            if !addr.is_empty() {
                return Some(addr.clone());
            }
        }
        let payload = self.payload.as_ref()?;
        let outer = payload.get(WRAPPER_KEY);
        if let Some(outer) = outer {
            if let Some(addr) = outer.get(WRAPPER_KEY).and_then(address_in) {
                return Some(addr);
            }
            if let Some(addr) = address_in(outer) {
                return Some(addr);
            }
        }
        address_in(payload)
    }
}

/// Probes one JSON object for a non-empty address field.
fn address_in(value: &serde_json::Value) -> Option<String> {
    let obj = value.as_object()?;
    for key in ADDRESS_KEYS {
        if let Some(addr) = obj.get(*key).and_then(serde_json::Value::as_str) {
            if !addr.is_empty() {
                return Some(addr.to_string());
            }
        }
    }
    None
}
