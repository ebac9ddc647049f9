//! Storage transport trait
//!
//! The driver's read/write/destroy/gc protocol is backend-agnostic; this
//! trait is the seam where a concrete document-store client plugs in. The
//! surface is deliberately small: find, insert, update, delete, and a bulk
//! expiry sweep, each a single round trip.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SessionError;
use crate::record::{SessionFilter, SessionRecord};

/// Row counts reported by an acknowledged update
///
/// MongoDB distinguishes documents *matched* by the filter from documents
/// actually *modified*; a `$set` writing values identical to what is stored
/// matches without modifying. The driver's success policy is built on
/// `matched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents the filter matched
    pub matched: u64,
    /// Documents actually changed
    pub modified: u64,
}

/// Trait for session storage transports
///
/// Implementations talk to one collection of session documents keyed by
/// `_id`. All operations are independent, stateless round trips; every
/// cross-call invariant (dirty-tracking, identity-change detection) lives
/// in the driver.
#[async_trait]
pub trait SessionTransport: Send + Sync + 'static {
    /// Fetch the payload of at most one record matching `filter`,
    /// projecting only the `data` field
    ///
    /// Returns `None` when nothing matches; absence is not an error.
    async fn find_one(&self, filter: &SessionFilter) -> Result<Option<Vec<u8>>, SessionError>;

    /// Probe for the existence of a matching record (limit one, minimal
    /// projection)
    async fn exists(&self, filter: &SessionFilter) -> Result<bool, SessionError>;

    /// Insert a new record
    ///
    /// Must confirm a single-document insert; a duplicate key surfaces as
    /// [`SessionError::WriteConflict`].
    async fn insert(&self, record: SessionRecord) -> Result<(), SessionError>;

    /// Update the record matching `filter`: `timestamp` is always set,
    /// `data` only when given
    async fn update(
        &self,
        filter: &SessionFilter,
        timestamp: DateTime<Utc>,
        data: Option<&[u8]>,
    ) -> Result<UpdateOutcome, SessionError>;

    /// Delete at most one record matching `filter`
    ///
    /// Deleting a record that does not exist is not an error.
    async fn delete_one(&self, filter: &SessionFilter) -> Result<(), SessionError>;

    /// Delete every record whose `timestamp` is strictly older than
    /// `cutoff`; returns the number removed
    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SessionError>;

    /// Release any backend resources; the default is a no-op
    async fn close(&self) -> Result<(), SessionError> {
        Ok(())
    }
}
