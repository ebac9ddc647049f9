//! Session store configuration
//!
//! Connection parameters are supplied by an external configuration loader.
//! Every field is required; [`MongoSessionConfigBuilder::build`] validates
//! them all up front and reports every missing field in a single error, so
//! a misconfigured deployment fails at startup rather than on first use.

use serde::Deserialize;
use std::time::Duration;

use crate::error::SessionError;

/// Validated configuration for the MongoDB session store
#[derive(Clone, Debug)]
pub struct MongoSessionConfig {
    /// Host name or address of the MongoDB server
    pub host: String,

    /// TCP port of the MongoDB server
    pub port: u16,

    /// Database holding the session collection
    pub database: String,

    /// Username for authentication
    pub username: String,

    /// Password for authentication
    pub password: String,

    /// Collection holding one document per session
    pub collection: String,

    /// Write acknowledgment level: a node count like `"1"` or `"majority"`
    pub write_concern: String,

    /// Whether writes wait for the on-disk journal
    pub journal: bool,

    /// Whether sessions are pinned to the client IP observed at write time
    pub match_ip: bool,

    /// Maximum session lifetime in seconds; the basis for `gc` and expiry
    pub max_lifetime: u64,
}

impl MongoSessionConfig {
    /// Start building a configuration
    pub fn builder() -> MongoSessionConfigBuilder {
        MongoSessionConfigBuilder::default()
    }

    /// Maximum session lifetime as a Duration
    pub fn max_lifetime_duration(&self) -> Duration {
        Duration::from_secs(self.max_lifetime)
    }
}

/// Builder for [`MongoSessionConfig`]
///
/// Deserializable so a configuration loader can hand over a whole file
/// section; unset fields are collected and reported together by
/// [`build`](Self::build).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MongoSessionConfigBuilder {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub collection: Option<String>,
    pub write_concern: Option<String>,
    pub journal: Option<bool>,
    pub match_ip: Option<bool>,
    pub max_lifetime: Option<u64>,
}

impl MongoSessionConfigBuilder {
    /// Set the MongoDB host
    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the MongoDB port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the database name
    pub fn with_database<S: Into<String>>(mut self, database: S) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the authentication username
    pub fn with_username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the authentication password
    pub fn with_password<S: Into<String>>(mut self, password: S) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the session collection name
    pub fn with_collection<S: Into<String>>(mut self, collection: S) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Set the write acknowledgment level (`"1"`, `"majority"`, ...)
    pub fn with_write_concern<S: Into<String>>(mut self, w: S) -> Self {
        self.write_concern = Some(w.into());
        self
    }

    /// Set whether writes wait for the journal
    pub fn with_journal(mut self, journal: bool) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Set whether sessions are pinned to the client IP
    pub fn with_match_ip(mut self, match_ip: bool) -> Self {
        self.match_ip = Some(match_ip);
        self
    }

    /// Set the maximum session lifetime in seconds
    pub fn with_max_lifetime(mut self, secs: u64) -> Self {
        self.max_lifetime = Some(secs);
        self
    }

    /// Validate and produce the configuration
    ///
    /// Collects every unset field and returns them in one
    /// [`SessionError::Config`] rather than failing on the first.
    pub fn build(self) -> Result<MongoSessionConfig, SessionError> {
        let mut missing = Vec::new();

        if self.host.is_none() {
            missing.push("host");
        }
        if self.port.is_none() {
            missing.push("port");
        }
        if self.database.is_none() {
            missing.push("database");
        }
        if self.username.is_none() {
            missing.push("username");
        }
        if self.password.is_none() {
            missing.push("password");
        }
        if self.collection.is_none() {
            missing.push("collection");
        }
        if self.write_concern.is_none() {
            missing.push("write_concern");
        }
        if self.journal.is_none() {
            missing.push("journal");
        }
        if self.match_ip.is_none() {
            missing.push("match_ip");
        }
        if self.max_lifetime.is_none() {
            missing.push("max_lifetime");
        }

        if !missing.is_empty() {
            return Err(SessionError::Config(missing));
        }

        Ok(MongoSessionConfig {
            host: self.host.unwrap_or_default(),
            port: self.port.unwrap_or_default(),
            database: self.database.unwrap_or_default(),
            username: self.username.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            collection: self.collection.unwrap_or_default(),
            write_concern: self.write_concern.unwrap_or_default(),
            journal: self.journal.unwrap_or_default(),
            match_ip: self.match_ip.unwrap_or_default(),
            max_lifetime: self.max_lifetime.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_builder() -> MongoSessionConfigBuilder {
        MongoSessionConfig::builder()
            .with_host("127.0.0.1")
            .with_port(27017)
            .with_database("app")
            .with_username("session")
            .with_password("secret")
            .with_collection("ci_sessions")
            .with_write_concern("majority")
            .with_journal(true)
            .with_match_ip(false)
            .with_max_lifetime(7200)
    }

    #[test]
    fn test_complete_config_builds() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.collection, "ci_sessions");
        assert_eq!(config.max_lifetime_duration(), Duration::from_secs(7200));
        assert!(!config.match_ip);
    }

    #[test]
    fn test_missing_fields_are_aggregated() {
        let err = MongoSessionConfig::builder()
            .with_host("127.0.0.1")
            .with_port(27017)
            .with_collection("ci_sessions")
            .build()
            .unwrap_err();

        match err {
            SessionError::Config(missing) => {
                assert_eq!(
                    missing,
                    vec![
                        "database",
                        "username",
                        "password",
                        "write_concern",
                        "journal",
                        "match_ip",
                        "max_lifetime",
                    ]
                );
            }
            other => panic!("expected Config error, got {other}"),
        }
    }

    #[test]
    fn test_empty_builder_reports_every_field() {
        let err = MongoSessionConfig::builder().build().unwrap_err();
        match err {
            SessionError::Config(missing) => assert_eq!(missing.len(), 10),
            other => panic!("expected Config error, got {other}"),
        }
    }

    #[test]
    fn test_builder_deserializes_from_loader_output() {
        let raw = r#"{
            "host": "mongo.internal",
            "port": 27017,
            "database": "app",
            "username": "session",
            "password": "secret",
            "collection": "ci_sessions",
            "write_concern": "1",
            "journal": false,
            "match_ip": true,
            "max_lifetime": 1440
        }"#;

        let builder: MongoSessionConfigBuilder = serde_json::from_str(raw).unwrap();
        let config = builder.build().unwrap();
        assert_eq!(config.host, "mongo.internal");
        assert!(config.match_ip);
        assert_eq!(config.max_lifetime, 1440);
    }

    #[test]
    fn test_partial_loader_output_still_aggregates() {
        let builder: MongoSessionConfigBuilder =
            serde_json::from_str(r#"{"host": "mongo.internal"}"#).unwrap();
        let err = builder.build().unwrap_err();
        match err {
            SessionError::Config(missing) => {
                assert!(missing.contains(&"port"));
                assert!(missing.contains(&"password"));
                assert!(!missing.contains(&"host"));
            }
            other => panic!("expected Config error, got {other}"),
        }
    }
}
