//! Sports event records and the enriched context derived from them.
//!
//! `EventRecord` is what the producer publishes to the raw stream,
//! `EventContext` is what the commentary side consumes. Both use a canonical
//! JSON encoding in which every field is always present.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur while encoding records.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// JSON serialization failed.
    #[error("JSON serialization failed: {source}")]
    SerdeJson {
        #[source]
        source: serde_json::Error,
    },
}

/// Kind of on-pitch event.
///
/// Unknown names are kept verbatim in `Other` so that a newer upstream can
/// introduce event types without breaking decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Shot,
    Goal,
    Foul,
    Card,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Shot => "SHOT",
            EventType::Goal => "GOAL",
            EventType::Foul => "FOUL",
            EventType::Card => "CARD",
            EventType::Other(name) => name,
        }
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "SHOT" => EventType::Shot,
            "GOAL" => EventType::Goal,
            "FOUL" => EventType::Foul,
            "CARD" => EventType::Card,
            _ => EventType::Other(name),
        }
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        EventType::from(name.to_string())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected event as emitted by the upstream feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique identifier, also used as the message key.
    pub event_id: String,
    pub event_type: EventType,
    pub player_number: String,
    pub team: String,
    /// Match clock in `MM:SS`.
    pub timestamp: String,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
    /// Normalized pitch coordinates in `[0, 1]`.
    pub location_x: f64,
    pub location_y: f64,
}

/// An event enriched with the player's running totals.
///
/// Counters include the event itself, so a player's first goal arrives with
/// `player_total_goals == 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    pub event_type: EventType,
    pub player_number: String,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub event_timestamp: String,
    #[serde(default)]
    pub player_total_shots: u32,
    #[serde(default)]
    pub player_total_goals: u32,
    #[serde(default)]
    pub player_total_fouls: u32,
}

/// Serializes a record into its canonical byte form.
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(record).map_err(|source| Error::SerdeJson { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn goal_record() -> EventRecord {
        EventRecord {
            event_id: "evt_012".to_string(),
            event_type: EventType::Goal,
            player_number: "10".to_string(),
            team: "BLUE".to_string(),
            timestamp: "56:30".to_string(),
            confidence: 0.97,
            location_x: 0.88,
            location_y: 0.50,
        }
    }

    #[test]
    fn test_event_type_known_names() {
        assert_eq!(EventType::from("SHOT"), EventType::Shot);
        assert_eq!(EventType::from("GOAL"), EventType::Goal);
        assert_eq!(EventType::from("FOUL"), EventType::Foul);
        assert_eq!(EventType::from("CARD"), EventType::Card);
    }

    #[test]
    fn test_event_type_unknown_name_is_kept() {
        let event_type = EventType::from("OFFSIDE");
        assert_eq!(event_type, EventType::Other("OFFSIDE".to_string()));
        assert_eq!(event_type.to_string(), "OFFSIDE");
    }

    #[test]
    fn test_event_type_is_case_sensitive() {
        assert_eq!(EventType::from("goal"), EventType::Other("goal".to_string()));
    }

    #[test]
    fn test_record_encoding_has_every_field() {
        let bytes = encode(&goal_record()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!({
                "event_id": "evt_012",
                "event_type": "GOAL",
                "player_number": "10",
                "team": "BLUE",
                "timestamp": "56:30",
                "confidence": 0.97,
                "location_x": 0.88,
                "location_y": 0.50
            })
        );
    }

    #[test]
    fn test_context_missing_counters_default_to_zero() {
        let context: EventContext = serde_json::from_value(json!({
            "event_type": "CARD",
            "player_number": "7"
        }))
        .unwrap();
        assert_eq!(context.event_type, EventType::Card);
        assert_eq!(context.team, "");
        assert_eq!(context.player_total_shots, 0);
        assert_eq!(context.player_total_goals, 0);
        assert_eq!(context.player_total_fouls, 0);
    }

    #[test]
    fn test_context_rejects_negative_counter() {
        let result = serde_json::from_value::<EventContext>(json!({
            "event_type": "FOUL",
            "player_number": "7",
            "player_total_fouls": -1
        }));
        assert!(result.is_err());
    }
}
