//! Session persistence driver
//!
//! The driver owns the read/write/destroy/gc protocol on top of a pluggable
//! [`SessionTransport`]. Across calls it carries exactly three pieces of
//! state: the session ID seen by the last `read`, a row-exists cache, and a
//! fingerprint of the payload last known to be persisted. Everything else
//! is a stateless round trip to the store.
//!
//! One driver instance serves one request cycle. The cache fields are not
//! meaningful across unrelated sessions, so do not share an instance
//! between concurrently processed requests; the caller is expected to
//! `read` before `write` within one logical request.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::error::SessionError;
use crate::fingerprint::Fingerprint;
use crate::record::{SessionFilter, SessionRecord};
use crate::store::SessionTransport;

#[cfg(feature = "mongo-store")]
use crate::config::MongoSessionConfig;
#[cfg(feature = "mongo-store")]
use crate::store::MongoTransport;

/// Per-request ambient state, passed explicitly into each operation
///
/// Carries the client's source address, which the web layer must supply
/// when IP-pinning is enabled.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    remote_addr: Option<IpAddr>,
}

impl RequestContext {
    /// Context without a client address
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a request arriving from `addr`
    pub fn from_addr(addr: IpAddr) -> Self {
        Self {
            remote_addr: Some(addr),
        }
    }

    /// The client's source address, if known
    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }
}

/// Session persistence driver over a storage transport
///
/// # Example
///
/// ```rust,ignore
/// use mongo_session_driver::{MongoSessionConfig, RequestContext, SessionDriver};
///
/// let config = MongoSessionConfig::builder()
///     .with_host("127.0.0.1")
///     .with_port(27017)
///     /* ... */
///     .build()?;
///
/// let mut driver = SessionDriver::open(&config).await?;
/// let ctx = RequestContext::from_addr("203.0.113.7".parse()?);
///
/// let mut payload = driver.read("k3yboardc4t", &ctx).await?;
/// payload.extend_from_slice(b"views|i:1;");
/// driver.write("k3yboardc4t", &payload, &ctx).await?;
/// driver.close().await?;
/// ```
pub struct SessionDriver<T: SessionTransport> {
    /// `Some` while open; `close` takes it and ends the instance's life
    transport: Option<T>,
    match_ip: bool,
    clock: Arc<dyn Clock>,

    // Carried state, exactly as the session protocol requires
    current_session_id: Option<String>,
    row_exists: bool,
    fingerprint: Fingerprint,
}

impl<T: SessionTransport> SessionDriver<T> {
    /// Open a driver over an already-connected transport
    pub fn with_transport(transport: T, match_ip: bool) -> Self {
        Self {
            transport: Some(transport),
            match_ip,
            clock: Arc::new(SystemClock),
            current_session_id: None,
            row_exists: false,
            fingerprint: Fingerprint::empty(),
        }
    }

    /// Replace the time source (default: [`SystemClock`])
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Whether the driver has been opened and not yet closed
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    fn transport(&self) -> Result<&T, SessionError> {
        self.transport.as_ref().ok_or(SessionError::NotOpen)
    }

    /// Identity filter for `session_id`: `_id`, plus the pinned client
    /// address when IP-pinning is enabled
    fn identity_filter(
        &self,
        session_id: &str,
        ctx: &RequestContext,
    ) -> Result<SessionFilter, SessionError> {
        let mut filter = SessionFilter::by_id(session_id);
        if self.match_ip {
            let addr = ctx.remote_addr().ok_or(SessionError::MissingRemoteAddr)?;
            filter = filter.with_ip_address(addr.to_string());
        }
        Ok(filter)
    }

    // Conflicting writers are serialized by the store's per-document
    // atomicity; there is no driver-level lock to take or release.
    fn get_lock(&self, _session_id: &str) -> bool {
        true
    }

    fn release_lock(&self) -> bool {
        true
    }

    /// Read the session payload for `session_id`
    ///
    /// A missing record is a normal outcome, not an error: the result is an
    /// empty payload, indistinguishable from a session whose data happens
    /// to be empty. The fingerprint and row-exists cache are refreshed
    /// either way.
    pub async fn read(
        &mut self,
        session_id: &str,
        ctx: &RequestContext,
    ) -> Result<Vec<u8>, SessionError> {
        // Needed by write() to detect session-ID regeneration
        self.current_session_id = Some(session_id.to_string());
        self.get_lock(session_id);

        let filter = self.identity_filter(session_id, ctx)?;
        match self.transport()?.find_one(&filter).await? {
            Some(data) => {
                self.fingerprint = Fingerprint::of(&data);
                self.row_exists = true;
                Ok(data)
            }
            None => {
                // A driver instance outlives an ID regeneration, so the
                // flag is reset explicitly rather than trusted to still
                // hold its initial value
                self.row_exists = false;
                self.fingerprint = Fingerprint::empty();
                Ok(Vec::new())
            }
        }
    }

    /// Persist `payload` under `session_id`
    ///
    /// A session ID differing from the one last seen by `read` means the
    /// caller regenerated the ID; the new ID is presumed to have no record
    /// yet. A first write inserts, later writes update through the
    /// identity filter, always refreshing `timestamp` and only rewriting
    /// `data` when the payload's fingerprint changed.
    ///
    /// An update counts as success iff the filter matched exactly one
    /// document, regardless of the modified count: a touch whose timestamp
    /// lands on the same second legitimately modifies nothing, while zero
    /// matches means the record vanished or the IP pin excluded it.
    pub async fn write(
        &mut self,
        session_id: &str,
        payload: &[u8],
        ctx: &RequestContext,
    ) -> Result<(), SessionError> {
        // Was the ID regenerated?
        if self.current_session_id.as_deref() != Some(session_id) {
            self.row_exists = false;
            self.current_session_id = Some(session_id.to_string());
        }

        let filter = self.identity_filter(session_id, ctx)?;

        if !self.row_exists {
            let record = SessionRecord {
                id: session_id.to_string(),
                ip_address: ctx.remote_addr().map(|addr| addr.to_string()),
                timestamp: self.clock.now(),
                data: payload.to_vec(),
            };
            // On failure the cache keeps claiming no row exists, so a
            // retry goes down the insert path again
            self.transport()?.insert(record).await?;
            self.fingerprint = Fingerprint::of(payload);
            self.row_exists = true;
            return Ok(());
        }

        let payload_fingerprint = Fingerprint::of(payload);
        let data = (payload_fingerprint != self.fingerprint).then_some(payload);

        let outcome = self
            .transport()?
            .update(&filter, self.clock.now(), data)
            .await?;
        if outcome.matched != 1 {
            return Err(SessionError::WriteConflict(format!(
                "update matched {} row(s) for session {}",
                outcome.matched, session_id
            )));
        }

        self.fingerprint = payload_fingerprint;
        Ok(())
    }

    /// Release the connection; the driver is terminal afterwards
    ///
    /// Idempotent: closing an already-closed driver succeeds.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        self.release_lock();
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }

    /// Delete the session identified by `session_id`, then close
    ///
    /// Deleting a session that does not exist is not an error; destroy is
    /// idempotent.
    pub async fn destroy(
        &mut self,
        session_id: &str,
        ctx: &RequestContext,
    ) -> Result<(), SessionError> {
        let filter = self.identity_filter(session_id, ctx)?;
        self.transport()?.delete_one(&filter).await?;
        self.close().await
    }

    /// Remove every session whose last write is older than `max_lifetime`
    /// ago; returns the number removed
    ///
    /// An acknowledged sweep is success regardless of how many records it
    /// removed.
    pub async fn gc(&self, max_lifetime: Duration) -> Result<u64, SessionError> {
        let cutoff = self.clock.now() - chrono::Duration::seconds(max_lifetime.as_secs() as i64);
        self.transport()?.delete_expired_before(cutoff).await
    }

    /// Whether a record exists for `session_id` (strict-mode session
    /// handling)
    ///
    /// Does not disturb the driver's carried state.
    pub async fn validate_id(
        &self,
        session_id: &str,
        ctx: &RequestContext,
    ) -> Result<bool, SessionError> {
        let filter = self.identity_filter(session_id, ctx)?;
        self.transport()?.exists(&filter).await
    }
}

#[cfg(feature = "mongo-store")]
impl SessionDriver<MongoTransport> {
    /// Connect to the configured MongoDB collection and open a driver
    /// over it
    ///
    /// Configuration is already validated by
    /// [`MongoSessionConfigBuilder::build`](crate::config::MongoSessionConfigBuilder::build);
    /// this fails if the server cannot be reached.
    pub async fn open(config: &MongoSessionConfig) -> Result<Self, SessionError> {
        let transport = MongoTransport::connect(config).await?;
        Ok(Self::with_transport(transport, config.match_ip))
    }
}
