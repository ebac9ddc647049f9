//! Session storage transports

mod memory;
mod transport;

pub use memory::MemoryTransport;
pub use transport::{SessionTransport, UpdateOutcome};

#[cfg(feature = "mongo-store")]
mod mongo;

#[cfg(feature = "mongo-store")]
pub use mongo::MongoTransport;
