//! Running per-player statistics.
//!
//! Turns raw event records into event contexts carrying the player's totals
//! so far, the current event included. Totals are keyed by team and shirt
//! number. Each event id is counted once, so redelivered records do not
//! inflate the counters. Only the most recent event ids are remembered; the
//! stream's duplicate window drops older re-published ids before they reach
//! the enricher.

use crate::decode::{decode_as, DecodeError};
use crate::event::{encode, EventContext, EventRecord, EventType};
use crate::stream::consumer::Stage;
use crate::stream::publisher::RecordSink;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use tracing::{debug, info};

/// Errors that can occur while enriching records.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Context could not be serialized.
    #[error(transparent)]
    Encode(#[from] crate::event::Error),
    /// Downstream transport rejected the context.
    #[error("Failed to forward context for event {event_id}: {source}")]
    Forward {
        event_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Shots, goals and fouls credited to one player.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlayerTotals {
    pub shots: u32,
    pub goals: u32,
    pub fouls: u32,
}

impl PlayerTotals {
    fn apply(&mut self, event_type: &EventType) {
        match event_type {
            EventType::Shot => self.shots += 1,
            EventType::Goal => self.goals += 1,
            EventType::Foul => self.fouls += 1,
            EventType::Card | EventType::Other(_) => {}
        }
    }

    fn revert(&mut self, event_type: &EventType) {
        match event_type {
            EventType::Shot => self.shots = self.shots.saturating_sub(1),
            EventType::Goal => self.goals = self.goals.saturating_sub(1),
            EventType::Foul => self.fouls = self.fouls.saturating_sub(1),
            EventType::Card | EventType::Other(_) => {}
        }
    }
}

/// Number of recent event ids remembered for redelivery detection.
pub const DEFAULT_SEEN_CAPACITY: usize = 10_000;

#[derive(Debug)]
pub struct PlayerStats {
    totals: HashMap<(String, String), PlayerTotals>,
    seen: HashSet<String>,
    /// Remembered ids, oldest first.
    order: VecDeque<String>,
    capacity: usize,
}

impl Default for PlayerStats {
    fn default() -> Self {
        PlayerStats::with_capacity(DEFAULT_SEEN_CAPACITY)
    }
}

impl PlayerStats {
    pub fn new() -> Self {
        PlayerStats::default()
    }

    /// Remembers at most `capacity` event ids, evicting the oldest first.
    pub fn with_capacity(capacity: usize) -> Self {
        PlayerStats {
            totals: HashMap::new(),
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Counts a record and returns its context, or `None` for a record whose
    /// event id was already counted.
    pub fn enrich(&mut self, record: &EventRecord) -> Option<EventContext> {
        if !self.remember(&record.event_id) {
            return None;
        }

        let totals = self
            .totals
            .entry((record.team.clone(), record.player_number.clone()))
            .or_default();
        totals.apply(&record.event_type);

        Some(EventContext {
            event_type: record.event_type.clone(),
            player_number: record.player_number.clone(),
            team: record.team.clone(),
            event_timestamp: record.timestamp.clone(),
            player_total_shots: totals.shots,
            player_total_goals: totals.goals,
            player_total_fouls: totals.fouls,
        })
    }

    /// Undoes a previous `enrich` call for the same record.
    pub fn forget(&mut self, record: &EventRecord) {
        if !self.seen.remove(&record.event_id) {
            return;
        }
        self.order.retain(|id| id != &record.event_id);
        if let Some(totals) = self
            .totals
            .get_mut(&(record.team.clone(), record.player_number.clone()))
        {
            totals.revert(&record.event_type);
        }
    }

    pub fn totals(&self, team: &str, player_number: &str) -> PlayerTotals {
        self.totals
            .get(&(team.to_string(), player_number.to_string()))
            .copied()
            .unwrap_or_default()
    }

    fn remember(&mut self, event_id: &str) -> bool {
        if !self.seen.insert(event_id.to_string()) {
            return false;
        }
        self.order.push_back(event_id.to_string());
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }
}

/// Consumer stage that enriches raw records and forwards the contexts.
pub struct Enricher<S> {
    stats: Mutex<PlayerStats>,
    sink: S,
}

impl<S: RecordSink + 'static> Enricher<S> {
    pub fn new(sink: S) -> Self {
        Enricher {
            stats: Mutex::new(PlayerStats::new()),
            sink,
        }
    }

    pub fn totals(&self, team: &str, player_number: &str) -> PlayerTotals {
        self.stats
            .lock()
            .map(|stats| stats.totals(team, player_number))
            .unwrap_or_default()
    }

    fn with_stats<R>(&self, f: impl FnOnce(&mut PlayerStats) -> R) -> R {
        let mut stats = match self.stats.lock() {
            Ok(stats) => stats,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut stats)
    }
}

#[async_trait::async_trait]
impl<S: RecordSink + 'static> Stage for Enricher<S> {
    type Input = EventRecord;
    type Error = Error;

    fn decode(&self, payload: &[u8]) -> Result<EventRecord, DecodeError> {
        decode_as(payload)
    }

    async fn process(&self, record: EventRecord) -> Result<(), Error> {
        let Some(context) = self.with_stats(|stats| stats.enrich(&record)) else {
            debug!("event {} already counted", record.event_id);
            return Ok(());
        };

        let payload = match encode(&context) {
            Ok(payload) => payload,
            Err(e) => {
                self.with_stats(|stats| stats.forget(&record));
                return Err(e.into());
            }
        };

        if let Err(e) = self.sink.send(&record.event_id, payload).await {
            self.with_stats(|stats| stats.forget(&record));
            return Err(Error::Forward {
                event_id: record.event_id,
                source: Box::new(e),
            });
        }

        info!(
            "{} by #{}-{}: {} shots, {} goals, {} fouls",
            context.event_type,
            context.player_number,
            context.team,
            context.player_total_shots,
            context.player_total_goals,
            context.player_total_fouls
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, EventSource};
    use crate::decode::decode;
    use crate::stream::consumer::{BoxError, Consumer, Delivery};
    use crate::throttle::Gate;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(thiserror::Error, Debug)]
    #[error("broker unavailable")]
    struct Unavailable;

    #[derive(Default)]
    struct MemorySink {
        sent: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
        failing: AtomicBool,
        failures_left: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl RecordSink for MemorySink {
        type Error = Unavailable;

        async fn send(&self, key: &str, payload: Vec<u8>) -> Result<(), Unavailable> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(Unavailable);
            }
            let fail_once = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if fail_once {
                return Err(Unavailable);
            }
            self.sent.lock().unwrap().push((key.to_string(), payload));
            Ok(())
        }
    }

    struct RawMessage {
        payload: Vec<u8>,
        acks: Arc<AtomicUsize>,
        naks: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Delivery for RawMessage {
        fn payload(&self) -> &[u8] {
            &self.payload
        }

        async fn ack(&self) -> Result<(), BoxError> {
            self.acks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn nak(&self) -> Result<(), BoxError> {
            self.naks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn contexts(catalog: &Catalog) -> Vec<EventContext> {
        let mut stats = PlayerStats::new();
        catalog.events().filter_map(|e| stats.enrich(&e)).collect()
    }

    #[test]
    fn test_sample_match_totals() {
        let contexts = contexts(&Catalog::sample());
        let counters: Vec<(u32, u32, u32)> = contexts
            .iter()
            .map(|c| {
                (
                    c.player_total_shots,
                    c.player_total_goals,
                    c.player_total_fouls,
                )
            })
            .collect();

        assert_eq!(
            counters,
            vec![
                (1, 0, 0),
                (2, 0, 0),
                (3, 0, 0),
                (0, 0, 1),
                (0, 0, 2),
                (0, 0, 2),
                (0, 0, 3),
                (1, 0, 0),
                (1, 1, 0),
            ]
        );
    }

    #[test]
    fn test_context_copies_event_fields() {
        let contexts = contexts(&Catalog::sample());
        let goal = contexts.last().unwrap();
        assert_eq!(goal.event_type, EventType::Goal);
        assert_eq!(goal.player_number, "10");
        assert_eq!(goal.team, "BLUE");
        assert_eq!(goal.event_timestamp, "56:30");
    }

    #[test]
    fn test_redelivered_event_is_ignored() {
        let mut stats = PlayerStats::new();
        let shot = Catalog::sample().events().next().unwrap();

        assert!(stats.enrich(&shot).is_some());
        assert!(stats.enrich(&shot).is_none());
        assert_eq!(stats.totals("BLUE", "9").shots, 1);
    }

    #[test]
    fn test_same_number_on_other_team_is_separate() {
        let mut stats = PlayerStats::new();
        let mut shot = Catalog::sample().events().next().unwrap();
        stats.enrich(&shot);

        shot.event_id = "evt_900".to_string();
        shot.team = "RED".to_string();
        let context = stats.enrich(&shot).unwrap();

        assert_eq!(context.player_total_shots, 1);
        assert_eq!(stats.totals("BLUE", "9").shots, 1);
    }

    #[test]
    fn test_seen_ids_are_bounded() {
        let mut stats = PlayerStats::with_capacity(2);
        let events: Vec<EventRecord> = Catalog::sample().events().take(3).collect();
        for event in &events {
            assert!(stats.enrich(event).is_some());
        }

        assert_eq!(stats.seen.len(), 2);
        assert!(stats.enrich(&events[2]).is_none());
        assert!(stats.enrich(&events[1]).is_none());
        // Evicted, so counted again.
        assert!(stats.enrich(&events[0]).is_some());
        assert_eq!(stats.totals("BLUE", "9").shots, 4);
    }

    #[test]
    fn test_forget_reverts_record() {
        let mut stats = PlayerStats::new();
        let shot = Catalog::sample().events().next().unwrap();

        stats.enrich(&shot);
        stats.forget(&shot);

        assert_eq!(stats.totals("BLUE", "9"), PlayerTotals::default());
        assert!(stats.enrich(&shot).is_some());
    }

    #[tokio::test]
    async fn test_enricher_forwards_decodable_contexts() {
        let enricher = Enricher::new(MemorySink::default());
        for record in Catalog::sample().events() {
            let payload = encode(&record).unwrap();
            let record = enricher.decode(&payload).unwrap();
            enricher.process(record).await.unwrap();
        }

        let sent = enricher.sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 9);
        let (key, payload) = sent.last().unwrap();
        assert_eq!(key, "evt_012");
        let context = decode(payload).unwrap();
        assert_eq!(context.player_total_goals, 1);
        assert_eq!(context.player_total_shots, 1);
    }

    #[tokio::test]
    async fn test_enricher_rolls_back_on_forward_failure() {
        let enricher = Enricher::new(MemorySink::default());
        let shot = Catalog::sample().events().next().unwrap();

        enricher.sink.failing.store(true, Ordering::SeqCst);
        let result = enricher.process(shot.clone()).await;
        assert!(matches!(result, Err(Error::Forward { .. })));
        assert_eq!(enricher.totals("BLUE", "9").shots, 0);

        enricher.sink.failing.store(false, Ordering::SeqCst);
        enricher.process(shot).await.unwrap();
        assert_eq!(enricher.totals("BLUE", "9").shots, 1);
    }

    #[tokio::test]
    async fn test_failed_forward_is_redelivered_and_counted_once() {
        let sink = MemorySink {
            failures_left: AtomicUsize::new(1),
            ..Default::default()
        };
        let sent = Arc::clone(&sink.sent);
        let acks = Arc::new(AtomicUsize::new(0));
        let naks = Arc::new(AtomicUsize::new(0));

        let foul = Catalog::sample().events().nth(3).unwrap();
        let payload = encode(&foul).unwrap();
        // The broker hands the same message back after the negative ack.
        let deliveries: Vec<Result<RawMessage, String>> = (0..2)
            .map(|_| {
                Ok(RawMessage {
                    payload: payload.clone(),
                    acks: Arc::clone(&acks),
                    naks: Arc::clone(&naks),
                })
            })
            .collect();

        let consumer = Consumer::new(Enricher::new(sink), Gate::open());
        let summary = consumer
            .run(tokio_stream::iter(deliveries), std::future::pending::<()>())
            .await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed, 1);
        assert_eq!(naks.load(Ordering::SeqCst), 1);
        assert_eq!(acks.load(Ordering::SeqCst), 1);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "evt_007");
        let context = decode(&sent[0].1).unwrap();
        assert_eq!(context.player_total_fouls, 1);
    }
}
