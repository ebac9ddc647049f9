//! # mongo-session-driver
//!
//! MongoDB-backed session persistence driver for server-side web stacks.
//!
//! This crate stores, retrieves, and expires opaque session payloads in a
//! MongoDB collection using the same document layout as the CodeIgniter
//! MongoDB session driver, allowing a Rust service to share live session
//! collections with an existing PHP deployment during a migration.
//!
//! The HTTP layer stays in charge of cookies and session-ID generation;
//! this driver only owns persistence.
//!
//! ## Features
//!
//! - **Dirty-checked writes**: unchanged session content is never
//!   rewritten; a repeat write only touches the record's timestamp
//! - **ID-regeneration detection**: a session ID differing from the last
//!   `read` is treated as a fresh identity and inserted, not updated
//! - **IP-pinning**: optionally binds records to the client address seen at
//!   write time, enforced on every lookup
//! - **Pluggable transports**: MongoDB for production, an in-memory
//!   transport for development and tests, or a custom backend
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mongo_session_driver::{MongoSessionConfig, RequestContext, SessionDriver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MongoSessionConfig::builder()
//!         .with_host("127.0.0.1")
//!         .with_port(27017)
//!         .with_database("app")
//!         .with_username("session")
//!         .with_password("secret")
//!         .with_collection("ci_sessions")
//!         .with_write_concern("majority")
//!         .with_journal(true)
//!         .with_match_ip(false)
//!         .with_max_lifetime(7200)
//!         .build()?;
//!
//!     let mut driver = SessionDriver::open(&config).await?;
//!     let ctx = RequestContext::from_addr("203.0.113.7".parse()?);
//!
//!     let payload = driver.read("k3yboardc4t", &ctx).await?;
//!     // ... the web layer mutates the payload in memory ...
//!     driver.write("k3yboardc4t", &payload, &ctx).await?;
//!     driver.close().await?;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod fingerprint;
pub mod record;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{MongoSessionConfig, MongoSessionConfigBuilder};
pub use driver::{RequestContext, SessionDriver};
pub use error::SessionError;
pub use fingerprint::Fingerprint;
pub use record::{SessionFilter, SessionRecord};
pub use store::{MemoryTransport, SessionTransport, UpdateOutcome};

#[cfg(feature = "mongo-store")]
pub use store::MongoTransport;
