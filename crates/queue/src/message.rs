use chrono::{DateTime, Utc};

/// Stream entry field holding the message body.
pub const BODY_FIELD: &str = "body";

/// One queued webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Stream entry ID, `<milliseconds>-<sequence>`.
    pub id: String,
    pub topic: String,
    pub body: Vec<u8>,
    /// When the message was enqueued.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(id: impl Into<String>, topic: impl Into<String>, body: Vec<u8>) -> Self {
        let id = id.into();
        let timestamp = entry_timestamp(&id).unwrap_or_else(Utc::now);
        Self {
            id,
            topic: topic.into(),
            body,
            timestamp,
        }
    }
}

/// The time part of a stream entry ID.
pub fn entry_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let (millis, _sequence) = id.split_once('-')?;
    DateTime::from_timestamp_millis(millis.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_from_entry_id() {
        let ts = entry_timestamp("1526919030474-55").unwrap();
        assert_eq!(ts.timestamp_millis(), 1_526_919_030_474);
        assert_eq!(ts.to_rfc3339(), "2018-05-21T16:10:30.474+00:00");
    }

    #[test]
    fn malformed_ids() {
        assert_eq!(entry_timestamp("1526919030474"), None);
        assert_eq!(entry_timestamp("abc-0"), None);
        assert_eq!(entry_timestamp(""), None);
    }

    #[test]
    fn message_uses_entry_time() {
        let msg = Message::new("1000-0", "docker", b"{}".to_vec());
        assert_eq!(msg.timestamp.timestamp_millis(), 1000);
        assert_eq!(msg.topic, "docker");
    }
}
