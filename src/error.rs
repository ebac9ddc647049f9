//! Session driver error types

use std::fmt;

/// Errors that can occur during session persistence operations
#[derive(Debug)]
pub enum SessionError {
    /// One or more required configuration fields are missing.
    /// All missing fields are collected before this is returned.
    Config(Vec<&'static str>),
    /// The document store could not be reached or authenticated with
    Connection(String),
    /// An operation was issued before `open` or after `close`
    NotOpen,
    /// IP-pinning is enabled but the request context carries no client address
    MissingRemoteAddr,
    /// A write was acknowledged but affected an unexpected number of rows
    /// (duplicate key on insert, vanished record on update)
    WriteConflict(String),
    /// Any other failure reported by the storage backend
    Backend(String),
    /// MongoDB driver error (when the mongo-store feature is enabled)
    #[cfg(feature = "mongo-store")]
    Mongo(mongodb::error::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(missing) => {
                write!(f, "session store config missing: {}", missing.join(", "))
            }
            SessionError::Connection(msg) => write!(f, "connection error: {}", msg),
            SessionError::NotOpen => write!(f, "session store is not open"),
            SessionError::MissingRemoteAddr => {
                write!(f, "IP pinning is enabled but no remote address was supplied")
            }
            SessionError::WriteConflict(msg) => write!(f, "write conflict: {}", msg),
            SessionError::Backend(msg) => write!(f, "storage backend error: {}", msg),
            #[cfg(feature = "mongo-store")]
            SessionError::Mongo(e) => write!(f, "MongoDB error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(feature = "mongo-store")]
impl From<mongodb::error::Error> for SessionError {
    fn from(err: mongodb::error::Error) -> Self {
        SessionError::Mongo(err)
    }
}
