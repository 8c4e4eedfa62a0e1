//! Entry/exit classification of raw camera events.
//!
//! Both doorway cameras report through the same channel; the direction is
//! recovered from the device's network address (most reliable) or, failing
//! that, from keywords in the device label. The signatures are injected
//! configuration so the classifier stays a pure function of its inputs.

use serde::{Deserialize, Serialize};

use crate::event::RawEvent;

/// Direction of a classified event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Entry,
    Exit,
}

impl Direction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Patterns identifying one camera of the doorway pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSignature {
    /// Network addresses for this camera.
    pub addresses: Vec<String>,
    /// Case-insensitive keywords matched against the device label.
    pub keywords: Vec<String>,
}

impl DeviceSignature {
    /// Whether `addr` names this camera: exact match, substring of a
    /// configured address, `.N` suffix match, or a bare last octet.
    fn matches_address(&self, addr: &str) -> bool {
        for configured in &self.addresses {
            if addr.contains(configured.as_str()) {
                return true;
            }
            if let Some(octet) = last_octet(configured) {
                if addr.ends_with(&format!(".{octet}")) || addr == octet {
                    return true;
                }
            }
        }
        false
    }

    /// Whether the lowercased device label hits a keyword or one of the
    /// configured addresses' last octets.
    fn matches_label(&self, label_lower: &str) -> bool {
        if self
            .keywords
            .iter()
            .any(|kw| label_lower.contains(kw.to_lowercase().as_str()))
        {
            return true;
        }
        self.addresses
            .iter()
            .filter_map(|a| last_octet(a))
            .any(|octet| label_lower.contains(octet))
    }
}

/// Extracts the final dotted component of an address, if numeric.
fn last_octet(address: &str) -> Option<&str> {
    let octet = address.rsplit('.').next()?;
    if !octet.is_empty() && octet.bytes().all(|b| b.is_ascii_digit()) {
        Some(octet)
    } else {
        None
    }
}

/// Injected entry/exit signatures for the doorway pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub entry: DeviceSignature,
    pub exit: DeviceSignature,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            entry: DeviceSignature {
                addresses: vec!["192.168.1.124".to_string()],
                keywords: vec![
                    "entry".to_string(),
                    "вход".to_string(),
                    "входная".to_string(),
                ],
            },
            exit: DeviceSignature {
                addresses: vec!["192.168.1.143".to_string()],
                keywords: vec![
                    "exit".to_string(),
                    "выход".to_string(),
                    "выходная".to_string(),
                ],
            },
        }
    }
}

/// Classifies a raw event as entry, exit, or neither.
///
/// Address signals take priority over label keywords; exit is checked before
/// entry on both tiers. A label matching both signatures without an address
/// signal is ambiguous and stays unclassified. Pure function, no side
/// effects.
#[must_use]
pub fn classify(event: &RawEvent, config: &ClassifierConfig) -> Option<Direction> {
    if let Some(addr) = event.network_address() {
        if config.exit.matches_address(&addr) {
            return Some(Direction::Exit);
        }
        if config.entry.matches_address(&addr) {
            return Some(Direction::Entry);
        }
    }

    let label_lower = event.device_label.as_deref()?.to_lowercase();
    let entry_hit = config.entry.matches_label(&label_lower);
    let exit_hit = config.exit.matches_label(&label_lower);
    match (entry_hit, exit_hit) {
        (true, false) => Some(Direction::Entry),
        (false, true) => Some(Direction::Exit),
        // Both or neither: no reliable signal.
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(label: Option<&str>, address: Option<&str>) -> RawEvent {
        RawEvent {
            id: "e1".into(),
            employee_id: "7".into(),
            device_label: label.map(String::from),
            network_address: address.map(String::from),
            event_time: "2026-01-05T09:00:00".parse().unwrap(),
            payload: None,
        }
    }

    #[test]
    fn exact_address_classifies_exit() {
        let config = ClassifierConfig::default();
        let e = event(None, Some("192.168.1.143"));
        assert_eq!(classify(&e, &config), Some(Direction::Exit));
    }

    #[test]
    fn exact_address_classifies_entry() {
        let config = ClassifierConfig::default();
        let e = event(None, Some("192.168.1.124"));
        assert_eq!(classify(&e, &config), Some(Direction::Entry));
    }

    #[test]
    fn last_octet_suffix_matches() {
        let config = ClassifierConfig::default();
        assert_eq!(
            classify(&event(None, Some("10.0.0.143")), &config),
            Some(Direction::Exit)
        );
        assert_eq!(
            classify(&event(None, Some("143")), &config),
            Some(Direction::Exit)
        );
    }

    #[test]
    fn payload_address_used_when_field_absent() {
        let config = ClassifierConfig::default();
        let mut e = event(None, None);
        e.payload = Some(json!({
            "AccessControllerEvent": {"ipAddress": "192.168.1.124"}
        }));
        assert_eq!(classify(&e, &config), Some(Direction::Entry));
    }

    #[test]
    fn keyword_fallback_is_case_insensitive() {
        let config = ClassifierConfig::default();
        assert_eq!(
            classify(&event(Some("Main ENTRY door"), None), &config),
            Some(Direction::Entry)
        );
        assert_eq!(
            classify(&event(Some("Выход 1"), None), &config),
            Some(Direction::Exit)
        );
    }

    #[test]
    fn octet_in_label_matches() {
        let config = ClassifierConfig::default();
        assert_eq!(
            classify(&event(Some("camera 124"), None), &config),
            Some(Direction::Entry)
        );
    }

    #[test]
    fn address_signal_beats_conflicting_label() {
        let config = ClassifierConfig::default();
        let e = event(Some("entry camera"), Some("192.168.1.143"));
        assert_eq!(classify(&e, &config), Some(Direction::Exit));
    }

    #[test]
    fn ambiguous_label_is_unclassified() {
        let config = ClassifierConfig::default();
        let e = event(Some("entry exit corridor"), None);
        assert_eq!(classify(&e, &config), None);
    }

    #[test]
    fn no_signal_is_unclassified() {
        let config = ClassifierConfig::default();
        assert_eq!(classify(&event(None, None), &config), None);
        assert_eq!(classify(&event(Some("lobby cam"), None), &config), None);
        assert_eq!(classify(&event(None, Some("10.1.1.1")), &config), None);
    }
}
