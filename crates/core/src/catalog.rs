//! Event sources feeding the producer.

use crate::event::{EventRecord, EventType};
use std::fs;
use std::path::Path;

/// Errors that can occur while loading a catalog.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read the catalog file.
    #[error("Failed to read catalog file: {source}")]
    IO {
        #[source]
        source: std::io::Error,
    },
    /// Catalog file is not a JSON array of event records.
    #[error("Failed to parse catalog file: {source}")]
    SerdeJson {
        #[source]
        source: serde_json::Error,
    },
}

/// A finite, restartable sequence of event records.
///
/// Every call to `events` starts again from the first record.
pub trait EventSource {
    fn events(&self) -> impl Iterator<Item = EventRecord> + Send + '_;
}

/// Fixed in-memory list of events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: Vec<EventRecord>,
}

impl Catalog {
    pub fn new(records: Vec<EventRecord>) -> Self {
        Catalog { records }
    }

    /// Loads a catalog from a JSON array of event records.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = fs::read_to_string(path).map_err(|source| Error::IO { source })?;
        let records: Vec<EventRecord> =
            serde_json::from_str(&content).map_err(|source| Error::SerdeJson { source })?;
        Ok(Catalog { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sample match: #9 piles up shots, #7 collects fouls and a card,
    /// #10 shoots and then scores.
    pub fn sample() -> Self {
        Catalog::new(vec![
            record("evt_004", EventType::Shot, "9", "BLUE", "15:20", 0.88, 0.75, 0.45),
            record("evt_005", EventType::Shot, "9", "BLUE", "18:45", 0.91, 0.82, 0.52),
            record("evt_006", EventType::Shot, "9", "BLUE", "22:10", 0.89, 0.78, 0.48),
            record("evt_007", EventType::Foul, "7", "RED", "35:15", 0.83, 0.55, 0.38),
            record("evt_008", EventType::Foul, "7", "RED", "41:30", 0.87, 0.62, 0.42),
            record("evt_009", EventType::Card, "7", "RED", "43:00", 0.95, 0.60, 0.40),
            record("evt_010", EventType::Foul, "7", "RED", "67:45", 0.82, 0.58, 0.35),
            record("evt_011", EventType::Shot, "10", "BLUE", "52:20", 0.90, 0.85, 0.55),
            record("evt_012", EventType::Goal, "10", "BLUE", "56:30", 0.97, 0.88, 0.50),
        ])
    }
}

impl EventSource for Catalog {
    fn events(&self) -> impl Iterator<Item = EventRecord> + Send + '_ {
        self.records.iter().cloned()
    }
}

#[allow(clippy::too_many_arguments)]
fn record(
    event_id: &str,
    event_type: EventType,
    player_number: &str,
    team: &str,
    timestamp: &str,
    confidence: f64,
    location_x: f64,
    location_y: f64,
) -> EventRecord {
    EventRecord {
        event_id: event_id.to_string(),
        event_type,
        player_number: player_number.to_string(),
        team: team.to_string(),
        timestamp: timestamp.to_string(),
        confidence,
        location_x,
        location_y,
    }
}
