//! Offline-first entity repositories
//!
//! Reads go to the network when the monitor says we are connected and are
//! written through to the store. When offline, or when the request fails
//! or returns something that is not the expected entity, the cached copy
//! is served instead. The cache is never reconciled with
//! the server beyond last-writer-wins upserts.

use std::marker::PhantomData;

use networking::{NetworkError, NetworkErrorCause};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use storage::{CacheEntity, Post, User};
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::services::AppServices;

/// Where a value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Fresh from the server
    Network,
    /// Served from the local store
    Cache,
}

/// A value together with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched<T> {
    /// The value
    pub value: T,
    /// Where it came from
    pub source: DataSource,
}

impl<T> Fetched<T> {
    fn network(value: T) -> Self {
        Self { value, source: DataSource::Network }
    }

    fn cache(value: T) -> Self {
        Self { value, source: DataSource::Cache }
    }

    /// Whether the value was served from cache
    pub fn is_cached(&self) -> bool {
        self.source == DataSource::Cache
    }
}

/// Repository for one entity kind under a REST collection route
pub struct Repository<E> {
    services: AppServices,
    route: String,
    _entity: PhantomData<fn() -> E>,
}

/// Posts under `/posts`
pub type PostRepository = Repository<Post>;

/// Users under `/users`
pub type UserRepository = Repository<User>;

impl PostRepository {
    /// Repository for the `/posts` collection
    pub fn posts(services: AppServices) -> Self {
        Self::new(services, "/posts")
    }
}

impl UserRepository {
    /// Repository for the `/users` collection
    pub fn users(services: AppServices) -> Self {
        Self::new(services, "/users")
    }
}

impl<E> Repository<E>
where
    E: CacheEntity + Serialize + DeserializeOwned,
{
    /// Create a repository for `route`
    pub fn new(services: AppServices, route: impl Into<String>) -> Self {
        Self { services, route: route.into(), _entity: PhantomData }
    }

    /// Collection route
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Fetch one entity, falling back to the cache
    pub async fn get(&self, id: i64) -> Result<Fetched<E>> {
        let failure = if self.services.monitor().is_connected().await {
            let route = format!("{}/{}", self.route.trim_end_matches('/'), id);
            match self.fetch::<E>(&route).await {
                Ok(entity) => {
                    self.services.store().put_typed(&entity);
                    return Ok(Fetched::network(entity));
                }
                Err(e) => Some(e),
            }
        } else {
            debug!("Offline, reading {} {} from cache", E::KIND, id);
            None
        };

        match (self.cached(id), failure) {
            (Some(entity), _) => Ok(Fetched::cache(entity)),
            (None, Some(e)) => Err(e.into()),
            (None, None) => Err(AppError::Unavailable { kind: E::KIND, id }),
        }
    }

    /// Fetch the whole collection, falling back to the cache
    ///
    /// Offline with an empty cache yields an empty list.
    pub async fn list(&self) -> Result<Fetched<Vec<E>>> {
        let failure = if self.services.monitor().is_connected().await {
            match self.fetch::<Vec<E>>(&self.route).await {
                Ok(entities) => {
                    let store = self.services.store();
                    for entity in &entities {
                        store.put_typed(entity);
                    }
                    return Ok(Fetched::network(entities));
                }
                Err(e) => Some(e),
            }
        } else {
            None
        };

        let cached = self.services.store().list_typed::<E>();
        match failure {
            Some(e) if cached.is_empty() => Err(e.into()),
            _ => Ok(Fetched::cache(cached)),
        }
    }

    /// Create an entity on the server and cache the server's copy
    ///
    /// Writes are never queued; offline creation fails with the network
    /// error the client reports.
    pub async fn create(&self, entity: &E) -> Result<E> {
        let value = self.services.client().post_http(&self.route, entity, None).await?;
        let created: E = decode(value)?;
        self.services.store().put_typed(&created);
        Ok(created)
    }

    /// Cached copy, without touching the network
    pub fn cached(&self, id: i64) -> Option<E> {
        self.services.store().get_typed::<E>(id)
    }

    async fn fetch<T: DeserializeOwned>(&self, route: &str) -> std::result::Result<T, NetworkError> {
        let fetched = match self.services.client().get_http(route).await {
            Ok(value) => decode(value),
            Err(e) => Err(e),
        };

        fetched.inspect_err(|e| warn!("Fetching {} failed, using cache: {}", route, e.cause()))
    }
}

/// Decode a response body; a mismatched shape counts as a network failure
fn decode<T: DeserializeOwned>(value: Value) -> std::result::Result<T, NetworkError> {
    serde_json::from_value(value)
        .map_err(|e| NetworkError::from(NetworkErrorCause::Decode(e.to_string())))
}
