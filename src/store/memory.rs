//! In-memory session transport
//!
//! This is primarily for development and testing.
//! For production, use MongoTransport or another persistent backend.
//!
//! It mirrors the document store's observable semantics where the driver
//! depends on them: duplicate keys reject the insert, and an update that
//! writes values identical to what is stored reports zero modified rows
//! while still counting as matched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::{SessionTransport, UpdateOutcome};
use crate::error::SessionError;
use crate::record::{SessionFilter, SessionRecord};

/// In-memory session transport
///
/// Not meant for production: records vanish on process restart, are
/// invisible to other server instances, and accumulate until swept by
/// `delete_expired_before`.
pub struct MemoryTransport {
    records: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl MemoryTransport {
    /// Create a new empty transport
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Snapshot of the stored record for `session_id`, ignoring any IP pin
    ///
    /// Lets tests verify persisted state (data bytes, timestamp) rather
    /// than only operation return values.
    pub fn record(&self, session_id: &str) -> Option<SessionRecord> {
        self.records.read().get(session_id).cloned()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no records are stored
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryTransport {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

#[async_trait]
impl SessionTransport for MemoryTransport {
    async fn find_one(&self, filter: &SessionFilter) -> Result<Option<Vec<u8>>, SessionError> {
        let records = self.records.read();
        Ok(records
            .get(&filter.id)
            .filter(|record| filter.matches(record))
            .map(|record| record.data.clone()))
    }

    async fn exists(&self, filter: &SessionFilter) -> Result<bool, SessionError> {
        let records = self.records.read();
        Ok(records
            .get(&filter.id)
            .map(|record| filter.matches(record))
            .unwrap_or(false))
    }

    async fn insert(&self, record: SessionRecord) -> Result<(), SessionError> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            // Same shape as the store's duplicate-key rejection
            return Err(SessionError::WriteConflict(format!(
                "duplicate key: {}",
                record.id
            )));
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn update(
        &self,
        filter: &SessionFilter,
        timestamp: DateTime<Utc>,
        data: Option<&[u8]>,
    ) -> Result<UpdateOutcome, SessionError> {
        let mut records = self.records.write();

        let record = match records.get_mut(&filter.id) {
            Some(record) if filter.matches(record) => record,
            _ => {
                return Ok(UpdateOutcome {
                    matched: 0,
                    modified: 0,
                })
            }
        };

        let mut modified = false;
        if record.timestamp != timestamp {
            record.timestamp = timestamp;
            modified = true;
        }
        if let Some(data) = data {
            if record.data != data {
                record.data = data.to_vec();
                modified = true;
            }
        }

        Ok(UpdateOutcome {
            matched: 1,
            modified: modified as u64,
        })
    }

    async fn delete_one(&self, filter: &SessionFilter) -> Result<(), SessionError> {
        let mut records = self.records.write();
        let matches = records
            .get(&filter.id)
            .map(|record| filter.matches(record))
            .unwrap_or(false);
        if matches {
            records.remove(&filter.id);
        }
        Ok(())
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SessionError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| record.timestamp >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, ip: Option<&str>, at: DateTime<Utc>, data: &[u8]) -> SessionRecord {
        SessionRecord {
            id: id.to_string(),
            ip_address: ip.map(str::to_string),
            timestamp: at,
            data: data.to_vec(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let transport = MemoryTransport::new();
        transport
            .insert(record("abc", None, t0(), b"x=1"))
            .await
            .unwrap();

        let found = transport.find_one(&SessionFilter::by_id("abc")).await.unwrap();
        assert_eq!(found.as_deref(), Some(b"x=1".as_slice()));

        let missing = transport.find_one(&SessionFilter::by_id("def")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_a_conflict() {
        let transport = MemoryTransport::new();
        transport
            .insert(record("abc", None, t0(), b"x=1"))
            .await
            .unwrap();

        let err = transport
            .insert(record("abc", None, t0(), b"x=2"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::WriteConflict(_)));
        // The first record is untouched
        assert_eq!(transport.record("abc").unwrap().data, b"x=1");
    }

    #[tokio::test]
    async fn test_update_reports_matched_and_modified() {
        let transport = MemoryTransport::new();
        transport
            .insert(record("abc", None, t0(), b"x=1"))
            .await
            .unwrap();

        let filter = SessionFilter::by_id("abc");

        // Identical timestamp, no data: matched but nothing modified
        let outcome = transport.update(&filter, t0(), None).await.unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 0 });

        // New timestamp touches the record
        let later = t0() + chrono::Duration::seconds(30);
        let outcome = transport.update(&filter, later, None).await.unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });

        // Nothing matches a different ID
        let outcome = transport
            .update(&SessionFilter::by_id("def"), later, Some(b"x=2"))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 0, modified: 0 });
    }

    #[tokio::test]
    async fn test_pinned_filter_hides_other_addresses() {
        let transport = MemoryTransport::new();
        transport
            .insert(record("abc", Some("10.0.0.1"), t0(), b"x=1"))
            .await
            .unwrap();

        let pinned = SessionFilter::by_id("abc").with_ip_address("10.0.0.2");
        assert!(transport.find_one(&pinned).await.unwrap().is_none());
        assert!(!transport.exists(&pinned).await.unwrap());

        transport.delete_one(&pinned).await.unwrap();
        assert_eq!(transport.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_expired_is_strictly_older() {
        let transport = MemoryTransport::new();
        let cutoff = t0();
        transport
            .insert(record("old", None, cutoff - chrono::Duration::seconds(1), b""))
            .await
            .unwrap();
        transport
            .insert(record("edge", None, cutoff, b""))
            .await
            .unwrap();
        transport
            .insert(record("new", None, cutoff + chrono::Duration::seconds(1), b""))
            .await
            .unwrap();

        let removed = transport.delete_expired_before(cutoff).await.unwrap();
        assert_eq!(removed, 1);
        assert!(transport.record("old").is_none());
        assert!(transport.record("edge").is_some());
        assert!(transport.record("new").is_some());
    }
}
