//! Session record and lookup filter
//!
//! These types are the wire contract with the document store. The field
//! names (`_id`, `ip_address`, `timestamp`, `data`) and their filter and
//! projection usage match the collections written by the CodeIgniter
//! MongoDB session driver, so existing stored sessions keep working during
//! a migration.

use chrono::{DateTime, Utc};

/// One persisted session document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Primary key (`_id`); equals the session ID
    pub id: String,

    /// Client IP at creation/last write; consulted only when IP-pinning
    /// is enabled
    pub ip_address: Option<String>,

    /// Last-write time; basis for expiry.
    /// Stored on the wire as int64 Unix seconds, the encoding the original
    /// driver used (`time()`).
    pub timestamp: DateTime<Utc>,

    /// Opaque serialized session payload
    pub data: Vec<u8>,
}

/// Identity filter for lookups, updates and deletes
///
/// `ip_address` is `Some` iff IP-pinning is enabled: a record under the
/// same ID but a different address must then behave as if it does not
/// exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFilter {
    /// Session ID to match against `_id`
    pub id: String,

    /// Pinned client address, when IP-pinning is enabled
    pub ip_address: Option<String>,
}

impl SessionFilter {
    /// Filter by session ID only
    pub fn by_id<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            ip_address: None,
        }
    }

    /// Pin the filter to a client address
    pub fn with_ip_address<S: Into<String>>(mut self, addr: S) -> Self {
        self.ip_address = Some(addr.into());
        self
    }

    /// Whether `record` is the session this filter identifies
    pub fn matches(&self, record: &SessionRecord) -> bool {
        if record.id != self.id {
            return false;
        }
        match &self.ip_address {
            Some(addr) => record.ip_address.as_deref() == Some(addr.as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, ip: Option<&str>) -> SessionRecord {
        SessionRecord {
            id: id.to_string(),
            ip_address: ip.map(str::to_string),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            data: b"x=1".to_vec(),
        }
    }

    #[test]
    fn test_filter_by_id() {
        let filter = SessionFilter::by_id("abc");
        assert!(filter.matches(&record("abc", Some("10.0.0.1"))));
        assert!(filter.matches(&record("abc", None)));
        assert!(!filter.matches(&record("def", None)));
    }

    #[test]
    fn test_pinned_filter_requires_matching_address() {
        let filter = SessionFilter::by_id("abc").with_ip_address("10.0.0.1");
        assert!(filter.matches(&record("abc", Some("10.0.0.1"))));
        assert!(!filter.matches(&record("abc", Some("10.0.0.2"))));
        // A record written without an address never satisfies a pinned filter
        assert!(!filter.matches(&record("abc", None)));
    }
}
