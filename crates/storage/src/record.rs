//! On-disk record format
//!
//! Every entity is stored as a [`CacheRecord`]: the variant's type tag plus a
//! per-variant record struct whose fields are written under fixed numeric
//! keys. Renaming a Rust field therefore never breaks existing data, and a
//! field missing on disk decodes to its zero value.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{DomainEntity, EntityKind, Post, User};

/// Record encoding errors
#[derive(Debug, Error)]
pub enum RecordError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored tag belongs to a different variant or schema
    #[error("Type tag mismatch: expected {expected}, found {found}")]
    TagMismatch {
        /// Tag of the box being read
        expected: u8,
        /// Tag found in the record
        found: u8,
    },
}

/// Result type for record operations
pub type Result<T> = std::result::Result<T, RecordError>;

/// Storage representation of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    /// Variant type tag
    #[serde(rename = "t", default)]
    pub tag: u8,
    /// Field-keyed payload
    #[serde(rename = "r", default)]
    pub record: T,
}

/// An entity with a compile-time record mapping
pub trait CacheEntity: Sized {
    /// Box this entity lives in
    const KIND: EntityKind;

    /// Field-keyed record struct
    type Record: Serialize + DeserializeOwned + Default;

    /// Entity id used as the box key
    fn id(&self) -> i64;

    /// Map to the storage record
    fn to_record(&self) -> Self::Record;

    /// Map back from the storage record
    fn from_record(record: Self::Record) -> Self;

    /// Wrap into the store-wide enum
    fn into_domain(self) -> DomainEntity;
}

/// Stored form of a [`Post`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(rename = "0", default)]
    id: i64,
    #[serde(rename = "1", default)]
    title: String,
    #[serde(rename = "2", default)]
    description: String,
    #[serde(rename = "3", default)]
    user_id: i64,
}

/// Stored form of a [`User`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "0", default)]
    id: i64,
    #[serde(rename = "1", default)]
    name: String,
    #[serde(rename = "2", default)]
    username: String,
    #[serde(rename = "3", default)]
    email: String,
}

impl CacheEntity for Post {
    const KIND: EntityKind = EntityKind::Post;
    type Record = PostRecord;

    fn id(&self) -> i64 {
        self.id
    }

    fn to_record(&self) -> PostRecord {
        PostRecord {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            user_id: self.user_id,
        }
    }

    fn from_record(record: PostRecord) -> Self {
        Post {
            id: record.id,
            title: record.title,
            description: record.description,
            user_id: record.user_id,
        }
    }

    fn into_domain(self) -> DomainEntity {
        DomainEntity::Post(self)
    }
}

impl CacheEntity for User {
    const KIND: EntityKind = EntityKind::User;
    type Record = UserRecord;

    fn id(&self) -> i64 {
        self.id
    }

    fn to_record(&self) -> UserRecord {
        UserRecord {
            id: self.id,
            name: self.name.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }

    fn from_record(record: UserRecord) -> Self {
        User { id: record.id, name: record.name, username: record.username, email: record.email }
    }

    fn into_domain(self) -> DomainEntity {
        DomainEntity::User(self)
    }
}

/// Encode an entity into its on-disk bytes
pub fn encode<E: CacheEntity>(entity: &E) -> Result<Vec<u8>> {
    let record = CacheRecord { tag: E::KIND.type_tag(), record: entity.to_record() };
    Ok(serde_json::to_vec(&record)?)
}

/// Decode an entity from its on-disk bytes
pub fn decode<E: CacheEntity>(bytes: &[u8]) -> Result<E> {
    let record: CacheRecord<E::Record> = serde_json::from_slice(bytes)?;
    let expected = E::KIND.type_tag();
    if record.tag != expected {
        return Err(RecordError::TagMismatch { expected, found: record.tag });
    }
    Ok(E::from_record(record.record))
}

/// Order-preserving box key for an id
pub(crate) fn id_key(id: i64) -> [u8; 8] {
    ((id as u64) ^ (1 << 63)).to_be_bytes()
}
