use serde::{Deserialize, Serialize};

/// Default time the broker waits for an acknowledgement before redelivering.
pub const DEFAULT_ACK_WAIT_SECS: u64 = 60;

/// Configuration of a JetStream publisher.
#[derive(PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
pub struct Publisher {
    /// Subject to publish to.
    pub subject: String,
    /// Stream the subject belongs to.
    #[serde(default)]
    pub stream: Option<StreamOptions>,
}

/// Configuration of a durable JetStream pull subscription.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
pub struct Subscriber {
    /// Subject to consume.
    pub subject: String,
    /// Durable consumer name.
    pub durable_name: String,
    /// Stream the subject belongs to.
    pub stream: StreamOptions,
    /// Where a newly created consumer starts reading.
    #[serde(default)]
    pub start: StartPosition,
    /// Seconds a delivered message may stay unacknowledged before the broker
    /// redelivers it (default: 60).
    #[serde(default = "default_ack_wait_secs")]
    pub ack_wait_secs: u64,
}

impl Default for Subscriber {
    fn default() -> Self {
        Subscriber {
            subject: String::new(),
            durable_name: String::new(),
            stream: StreamOptions::default(),
            start: StartPosition::default(),
            ack_wait_secs: DEFAULT_ACK_WAIT_SECS,
        }
    }
}

fn default_ack_wait_secs() -> u64 {
    DEFAULT_ACK_WAIT_SECS
}

/// Starting point of a newly created durable consumer.
///
/// Existing consumers always resume from their acknowledged position.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPosition {
    /// Only messages published after the consumer was created.
    #[default]
    Latest,
    /// Every message still retained by the stream.
    Earliest,
}

#[derive(PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamOptions {
    /// Stream name.
    pub name: String,
    /// Stream description.
    pub description: Option<String>,
    /// Subject patterns for the stream (can include wildcards).
    pub subjects: Vec<String>,
    /// Maximum age of messages in seconds.
    pub max_age_secs: Option<u64>,
    /// Window in seconds in which a repeated message id is dropped.
    pub duplicate_window_secs: Option<u64>,
    /// Whether to create or update the stream if it doesn't exist or differs.
    pub create_or_update: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_default() {
        let publisher = Publisher::default();
        assert_eq!(publisher.subject, String::new());
        assert_eq!(publisher.stream, None);
    }

    #[test]
    fn test_subscriber_deserialize_defaults() {
        let subscriber: Subscriber = serde_json::from_str(
            r#"{"subject":"commentary_context","durable_name":"commentary-generator","stream":{"name":"COMMENTARY"}}"#,
        )
        .unwrap();

        assert_eq!(subscriber.subject, "commentary_context");
        assert_eq!(subscriber.durable_name, "commentary-generator");
        assert_eq!(subscriber.stream.name, "COMMENTARY");
        assert!(subscriber.stream.subjects.is_empty());
        assert!(!subscriber.stream.create_or_update);
        assert_eq!(subscriber.start, StartPosition::Latest);
        assert_eq!(subscriber.ack_wait_secs, DEFAULT_ACK_WAIT_SECS);
    }

    #[test]
    fn test_start_position_lowercase() {
        let start: StartPosition = serde_json::from_str(r#""earliest""#).unwrap();
        assert_eq!(start, StartPosition::Earliest);
    }

    #[test]
    fn test_publisher_serialization() {
        let publisher = Publisher {
            subject: "raw-events".to_string(),
            stream: Some(StreamOptions {
                name: "RAW_EVENTS".to_string(),
                subjects: vec!["raw-events".to_string()],
                duplicate_window_secs: Some(120),
                create_or_update: true,
                ..Default::default()
            }),
        };

        let json = serde_json::to_string(&publisher).unwrap();
        let deserialized: Publisher = serde_json::from_str(&json).unwrap();
        assert_eq!(publisher, deserialized);
    }
}
