//! Storage layer for the offline client
//!
//! This crate provides the persistent entity cache: domain entities, their
//! on-disk record format, and the sled-backed store holding one box per
//! entity variant.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entity;
pub mod record;
pub mod store;

pub use entity::{DomainEntity, EntityKind, Post, User};
pub use record::{CacheEntity, CacheRecord};
pub use store::{PersistentStore, StoreConfig, StoreError, StoreMode};
