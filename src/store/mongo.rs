//! MongoDB session transport
//!
//! Talks to one collection of session documents in the layout written by
//! the CodeIgniter MongoDB session driver:
//! - `_id`: session ID (string)
//! - `ip_address`: client address at last write (string or null)
//! - `timestamp`: last-write time as int64 Unix seconds
//! - `data`: opaque payload, BSON binary (legacy collections: UTF-8 string)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{doc, Binary, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{Acknowledgment, ClientOptions, Credential, ServerAddress, WriteConcern};
use mongodb::{Client, Collection, IndexModel};

use super::{SessionTransport, UpdateOutcome};
use crate::config::MongoSessionConfig;
use crate::error::SessionError;
use crate::record::{SessionFilter, SessionRecord};

/// MongoDB-backed session transport
///
/// # Example
///
/// ```rust,ignore
/// use mongo_session_driver::{MongoSessionConfig, MongoTransport};
///
/// let config = MongoSessionConfig::builder()
///     .with_host("127.0.0.1")
///     .with_port(27017)
///     /* ... */
///     .build()?;
/// let transport = MongoTransport::connect(&config).await?;
/// ```
#[derive(Clone)]
pub struct MongoTransport {
    client: Client,
    collection: Collection<Document>,
}

impl MongoTransport {
    /// Connect to the configured server and verify it is reachable
    ///
    /// Runs a `ping` so that an unreachable or misconfigured server fails
    /// here rather than on the first session operation.
    pub async fn connect(config: &MongoSessionConfig) -> Result<Self, SessionError> {
        let write_concern = WriteConcern::builder()
            .w(parse_acknowledgment(&config.write_concern))
            .journal(config.journal)
            .build();

        let options = ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp {
                host: config.host.clone(),
                port: Some(config.port),
            }])
            .credential(
                Credential::builder()
                    .username(config.username.clone())
                    .password(config.password.clone())
                    .build(),
            )
            .write_concern(write_concern)
            .build();

        let client = Client::with_options(options)
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        let database = client.database(&config.database);

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;

        tracing::debug!(
            "connected to MongoDB session store at {}:{}/{}",
            config.host,
            config.port,
            config.database
        );

        let collection = database.collection::<Document>(&config.collection);
        Ok(Self { client, collection })
    }

    /// Build a transport over an existing client
    pub fn from_client(client: Client, database: &str, collection: &str) -> Self {
        let collection = client.database(database).collection::<Document>(collection);
        Self { client, collection }
    }

    /// Create an ascending index on `timestamp` so gc sweeps stay indexed
    ///
    /// Safe to call on every startup; creating an index that already exists
    /// is a no-op server-side.
    pub async fn ensure_timestamp_index(&self) -> Result<(), SessionError> {
        let index = IndexModel::builder().keys(doc! { "timestamp": 1 }).build();
        self.collection.create_index(index).await?;
        Ok(())
    }
}

/// Translate the configured write-acknowledgment level
fn parse_acknowledgment(w: &str) -> Acknowledgment {
    match w {
        "majority" => Acknowledgment::Majority,
        other => match other.parse::<u32>() {
            Ok(nodes) => Acknowledgment::Nodes(nodes),
            Err(_) => Acknowledgment::Custom(other.to_string()),
        },
    }
}

/// Identity filter as a BSON query document
fn filter_document(filter: &SessionFilter) -> Document {
    let mut doc = doc! { "_id": &filter.id };
    if let Some(addr) = &filter.ip_address {
        doc.insert("ip_address", addr.as_str());
    }
    doc
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) if write_error.code == 11000
    )
}

#[async_trait]
impl SessionTransport for MongoTransport {
    async fn find_one(&self, filter: &SessionFilter) -> Result<Option<Vec<u8>>, SessionError> {
        let found = self
            .collection
            .find_one(filter_document(filter))
            .projection(doc! { "data": 1 })
            .await?;

        let doc = match found {
            Some(doc) => doc,
            None => return Ok(None),
        };

        match doc.get("data") {
            Some(Bson::Binary(bin)) => Ok(Some(bin.bytes.clone())),
            // Collections written by the original PHP driver hold data as a
            // UTF-8 string
            Some(Bson::String(s)) => Ok(Some(s.clone().into_bytes())),
            None => Ok(Some(Vec::new())),
            Some(other) => Err(SessionError::Backend(format!(
                "unexpected BSON type {:?} for data field",
                other.element_type()
            ))),
        }
    }

    async fn exists(&self, filter: &SessionFilter) -> Result<bool, SessionError> {
        let found = self
            .collection
            .find_one(filter_document(filter))
            .projection(doc! { "_id": 1 })
            .await?;
        Ok(found.is_some())
    }

    async fn insert(&self, record: SessionRecord) -> Result<(), SessionError> {
        let doc = doc! {
            "_id": &record.id,
            "ip_address": record.ip_address.as_deref().map_or(Bson::Null, Bson::from),
            "timestamp": record.timestamp.timestamp(),
            "data": Binary { subtype: BinarySubtype::Generic, bytes: record.data.clone() },
        };

        match self.collection.insert_one(doc).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(SessionError::WriteConflict(format!(
                "duplicate key: {}",
                record.id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(
        &self,
        filter: &SessionFilter,
        timestamp: DateTime<Utc>,
        data: Option<&[u8]>,
    ) -> Result<UpdateOutcome, SessionError> {
        let mut set = doc! { "timestamp": timestamp.timestamp() };
        if let Some(data) = data {
            set.insert(
                "data",
                Binary {
                    subtype: BinarySubtype::Generic,
                    bytes: data.to_vec(),
                },
            );
        }

        let result = self
            .collection
            .update_one(filter_document(filter), doc! { "$set": set })
            .await?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, filter: &SessionFilter) -> Result<(), SessionError> {
        self.collection.delete_one(filter_document(filter)).await?;
        Ok(())
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SessionError> {
        let result = self
            .collection
            .delete_many(doc! { "timestamp": { "$lt": cutoff.timestamp() } })
            .await?;

        tracing::debug!("gc removed {} expired session(s)", result.deleted_count);
        Ok(result.deleted_count)
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Tests require a running MongoDB instance
    // Run with: cargo test --features mongo-store -- --ignored

    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    #[ignore]
    async fn test_mongo_transport_basic() {
        let client = Client::with_uri_str("mongodb://127.0.0.1:27017")
            .await
            .unwrap();
        let transport =
            MongoTransport::from_client(client, "mongo_session_driver_test", "ci_sessions");

        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let filter = SessionFilter::by_id("test-id");

        // Clean slate
        transport.delete_one(&filter).await.unwrap();

        transport
            .insert(SessionRecord {
                id: "test-id".to_string(),
                ip_address: Some("127.0.0.1".to_string()),
                timestamp: t0,
                data: b"user|s:5:\"alice\";".to_vec(),
            })
            .await
            .unwrap();

        let found = transport.find_one(&filter).await.unwrap();
        assert_eq!(found.as_deref(), Some(b"user|s:5:\"alice\";".as_slice()));
        assert!(transport.exists(&filter).await.unwrap());

        // Duplicate key rejected
        let err = transport
            .insert(SessionRecord {
                id: "test-id".to_string(),
                ip_address: None,
                timestamp: t0,
                data: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::WriteConflict(_)));

        // Touch + rewrite
        let later = t0 + chrono::Duration::seconds(60);
        let outcome = transport
            .update(&filter, later, Some(b"user|s:3:\"bob\";"))
            .await
            .unwrap();
        assert_eq!(outcome.matched, 1);

        transport.delete_one(&filter).await.unwrap();
        assert!(!transport.exists(&filter).await.unwrap());
    }
}
