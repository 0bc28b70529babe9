//! Persistent entity store
//!
//! This module provides the typed local cache backed by sled. Each entity
//! variant gets its own box (a sled tree) keyed by entity id. The boxes are
//! opened once, on the first call to [`PersistentStore::init`], and stay
//! open for the lifetime of the store.
//!
//! Storage failures never reach callers. A store that cannot open its
//! database enters [`StoreMode::DegradedEmpty`] and behaves like a freshly
//! created one; a failed read yields `None`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use sled::{Db, Tree};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::entity::{DomainEntity, EntityKind, Post, User};
use crate::record::{self, id_key, CacheEntity, RecordError};

/// Store error types
///
/// These are logged at the store boundary and never returned to callers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened
    #[error("Failed to open store at {path}: {source}")]
    Open {
        /// Database directory
        path: PathBuf,
        /// Underlying engine error
        source: sled::Error,
    },

    /// Storage directory could not be created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Sled database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Record encoding error
    #[error("Record error: {0}")]
    Record(#[from] RecordError),
}

/// Result type for store internals
pub type Result<T> = std::result::Result<T, StoreError>;

/// Operating mode reported by [`PersistentStore::init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Boxes opened from disk
    Ready,
    /// Opening failed; boxes start empty and are not persisted
    DegradedEmpty,
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Explicit storage directory (None resolves a platform directory)
    pub path: Option<PathBuf>,
    /// Directory name used under the platform documents directory
    pub app_dir: String,
    /// Cache capacity in bytes
    pub cache_capacity: u64,
    /// Enable compression
    pub use_compression: bool,
    /// Flush interval in milliseconds (None for immediate flush)
    pub flush_every_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            app_dir: "offline-client".to_string(),
            cache_capacity: 16 * 1024 * 1024, // 16MB
            use_compression: true,
            flush_every_ms: Some(500),
        }
    }
}

impl StoreConfig {
    /// Create a configuration rooted at an explicit directory
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()), ..Default::default() }
    }

    /// Set the directory name used under the documents directory
    pub fn app_dir(mut self, name: impl Into<String>) -> Self {
        self.app_dir = name.into();
        self
    }

    /// Set cache capacity in bytes
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Enable or disable compression
    pub fn use_compression(mut self, enabled: bool) -> Self {
        self.use_compression = enabled;
        self
    }

    /// Set flush interval in milliseconds
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }

    /// Directory holding the box database
    ///
    /// Falls back from the documents directory to the data directory and
    /// finally the working directory.
    pub fn resolve_dir(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }

        dirs::document_dir()
            .or_else(dirs::data_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(&self.app_dir)
    }
}

/// Opened boxes, fixed for the lifetime of the store
struct Boxes {
    mode: StoreMode,
    db: Option<Db>,
    trees: HashMap<EntityKind, Tree>,
}

impl Boxes {
    fn open(config: &StoreConfig) -> Result<Self> {
        let dir = config.resolve_dir();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("boxes");

        let mut db_config = sled::Config::new()
            .path(&path)
            .cache_capacity(config.cache_capacity)
            .use_compression(config.use_compression);

        if let Some(ms) = config.flush_every_ms {
            db_config = db_config.flush_every_ms(Some(ms));
        }

        let db = db_config.open().map_err(|source| StoreError::Open { path, source })?;
        Self::with_trees(db, StoreMode::Ready)
    }

    fn degraded() -> Self {
        let opened = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(StoreError::from)
            .and_then(|db| Self::with_trees(db, StoreMode::DegradedEmpty));

        match opened {
            Ok(boxes) => boxes,
            Err(e) => {
                warn!("Temporary store unavailable, writes will be dropped: {}", e);
                Self { mode: StoreMode::DegradedEmpty, db: None, trees: HashMap::new() }
            }
        }
    }

    fn with_trees(db: Db, mode: StoreMode) -> Result<Self> {
        let mut trees = HashMap::new();
        for kind in EntityKind::ALL {
            trees.insert(kind, db.open_tree(kind.box_key())?);
        }
        Ok(Self { mode, db: Some(db), trees })
    }
}

/// Typed local cache of domain entities
///
/// Construct once at startup, call [`init`](Self::init), then hand the
/// store to whatever needs it. Operations issued before `init` behave as
/// an empty store.
pub struct PersistentStore {
    config: StoreConfig,
    boxes: OnceCell<Boxes>,
    open_attempts: AtomicUsize,
}

impl PersistentStore {
    /// Create a store; nothing is opened until [`init`](Self::init)
    pub fn new(config: StoreConfig) -> Self {
        Self { config, boxes: OnceCell::new(), open_attempts: AtomicUsize::new(0) }
    }

    /// Open the boxes
    ///
    /// Idempotent: once a call has completed, later calls return the same
    /// mode without touching the disk.
    pub async fn init(&self) -> StoreMode {
        self.boxes.get_or_init(|| self.open_boxes()).await.mode
    }

    async fn open_boxes(&self) -> Boxes {
        self.open_attempts.fetch_add(1, Ordering::SeqCst);
        let config = self.config.clone();

        match tokio::task::spawn_blocking(move || Boxes::open(&config)).await {
            Ok(Ok(boxes)) => {
                info!("Opened {} boxes in {}", boxes.trees.len(), self.config.resolve_dir().display());
                boxes
            }
            Ok(Err(e)) => {
                warn!("Failed to open store, continuing with empty boxes: {}", e);
                Boxes::degraded()
            }
            Err(e) => {
                warn!("Store open task failed, continuing with empty boxes: {}", e);
                Boxes::degraded()
            }
        }
    }

    /// Mode chosen by `init`, or None before it has run
    pub fn mode(&self) -> Option<StoreMode> {
        self.boxes.get().map(|boxes| boxes.mode)
    }

    /// Number of times the database open was attempted
    pub fn open_attempts(&self) -> usize {
        self.open_attempts.load(Ordering::SeqCst)
    }

    fn tree(&self, kind: EntityKind) -> Option<&Tree> {
        let tree = self.boxes.get().and_then(|boxes| boxes.trees.get(&kind));
        if tree.is_none() {
            debug!("Box {} is not open", kind);
        }
        tree
    }

    /// Look up an entity by id
    pub fn get(&self, kind: EntityKind, id: i64) -> Option<DomainEntity> {
        match kind {
            EntityKind::Post => self.get_typed::<Post>(id).map(DomainEntity::Post),
            EntityKind::User => self.get_typed::<User>(id).map(DomainEntity::User),
        }
    }

    /// Look up an entity by id with a concrete type
    pub fn get_typed<E: CacheEntity>(&self, id: i64) -> Option<E> {
        let tree = self.tree(E::KIND)?;

        match tree.get(id_key(id)) {
            Ok(Some(bytes)) => match record::decode::<E>(&bytes) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!("Unreadable record {} in box {}: {}", id, E::KIND, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read {} from box {}: {}", id, E::KIND, e);
                None
            }
        }
    }

    /// Insert or replace an entity; last writer wins
    pub fn put(&self, entity: &DomainEntity) {
        match entity {
            DomainEntity::Post(post) => self.put_typed(post),
            DomainEntity::User(user) => self.put_typed(user),
        }
    }

    /// Insert or replace a typed entity
    pub fn put_typed<E: CacheEntity>(&self, entity: &E) {
        let Some(tree) = self.tree(E::KIND) else {
            return;
        };

        let written = record::encode(entity)
            .map_err(StoreError::from)
            .and_then(|bytes| Ok(tree.insert(id_key(entity.id()), bytes)?));

        if let Err(e) = written {
            warn!("Failed to write {} to box {}: {}", entity.id(), E::KIND, e);
        }
    }

    /// Remove an entity, returning whether it existed
    pub fn delete(&self, kind: EntityKind, id: i64) -> bool {
        let Some(tree) = self.tree(kind) else {
            return false;
        };

        match tree.remove(id_key(id)) {
            Ok(previous) => previous.is_some(),
            Err(e) => {
                warn!("Failed to delete {} from box {}: {}", id, kind, e);
                false
            }
        }
    }

    /// All entities of a variant, in box order
    pub fn list(&self, kind: EntityKind) -> Vec<DomainEntity> {
        match kind {
            EntityKind::Post => self.list_typed::<Post>().into_iter().map(DomainEntity::Post).collect(),
            EntityKind::User => self.list_typed::<User>().into_iter().map(DomainEntity::User).collect(),
        }
    }

    /// All entities of a concrete type, in box order
    ///
    /// Records that fail to decode are skipped.
    pub fn list_typed<E: CacheEntity>(&self) -> Vec<E> {
        let Some(tree) = self.tree(E::KIND) else {
            return Vec::new();
        };

        let mut entities = Vec::new();
        for item in tree.iter() {
            match item.map_err(StoreError::from).and_then(|(_, bytes)| {
                Ok(record::decode::<E>(&bytes)?)
            }) {
                Ok(entity) => entities.push(entity),
                Err(e) => warn!("Skipping record in box {}: {}", E::KIND, e),
            }
        }
        entities
    }

    /// Remove every entity of a variant
    pub fn clear(&self, kind: EntityKind) {
        if let Some(tree) = self.tree(kind) {
            if let Err(e) = tree.clear() {
                warn!("Failed to clear box {}: {}", kind, e);
            }
        }
    }

    /// Number of entities in a box
    pub fn len(&self, kind: EntityKind) -> usize {
        self.tree(kind).map(|tree| tree.len()).unwrap_or(0)
    }

    /// Check if a box is empty
    pub fn is_empty(&self, kind: EntityKind) -> bool {
        self.len(kind) == 0
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) {
        let Some(db) = self.boxes.get().and_then(|boxes| boxes.db.as_ref()) else {
            return;
        };

        if let Err(e) = db.flush_async().await {
            warn!("Failed to flush store: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> PersistentStore {
        let store = PersistentStore::new(StoreConfig::new(dir.path()).flush_every_ms(None));
        assert_eq!(store.init().await, StoreMode::Ready);
        store
    }

    #[tokio::test]
    async fn test_put_and_get_post() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let post = Post::new(1, "a", "b", 2);
        store.put(&post.clone().into());

        assert_eq!(store.get(EntityKind::Post, 1), Some(DomainEntity::Post(post)));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        assert_eq!(store.get(EntityKind::User, 42), None);
    }

    #[tokio::test]
    async fn test_boxes_are_separate() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.put(&Post::new(1, "post", "", 0).into());
        store.put(&User::new(1, "user", "u", "e").into());

        assert_eq!(store.get(EntityKind::Post, 1).unwrap().kind(), EntityKind::Post);
        assert_eq!(store.get(EntityKind::User, 1).unwrap().kind(), EntityKind::User);
        assert_eq!(store.len(EntityKind::Post), 1);
        assert_eq!(store.len(EntityKind::User), 1);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.put_typed(&Post::new(1, "first", "", 0));
        store.put_typed(&Post::new(1, "second", "", 0));

        let post: Post = store.get_typed(1).unwrap();
        assert_eq!(post.title, "second");
        assert_eq!(store.len(EntityKind::Post), 1);
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.put_typed(&Post::new(5, "t", "d", 1));
        assert!(store.delete(EntityKind::Post, 5));
        assert_eq!(store.get(EntityKind::Post, 5), None);
        assert!(!store.delete(EntityKind::Post, 5));
    }

    #[tokio::test]
    async fn test_list_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        for id in [3, 1, 2] {
            store.put_typed(&Post::new(id, format!("post {}", id), "", 0));
        }

        let ids: Vec<i64> = store.list(EntityKind::Post).iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        store.clear(EntityKind::Post);
        assert!(store.is_empty(EntityKind::Post));
        assert!(store.list(EntityKind::Post).is_empty());
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        store.put_typed(&User::new(9, "n", "u", "e"));

        assert_eq!(store.init().await, StoreMode::Ready);
        assert_eq!(store.open_attempts(), 1);
        assert_eq!(store.get_typed::<User>(9), Some(User::new(9, "n", "u", "e")));
    }

    #[tokio::test]
    async fn test_operations_before_init_behave_empty() {
        let dir = TempDir::new().unwrap();
        let store = PersistentStore::new(StoreConfig::new(dir.path()));

        store.put_typed(&Post::new(1, "a", "b", 2));
        assert_eq!(store.mode(), None);
        assert_eq!(store.get(EntityKind::Post, 1), None);
        assert!(store.list(EntityKind::Post).is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_enters_degraded_mode() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = PersistentStore::new(StoreConfig::new(blocker.join("store")));
        assert_eq!(store.init().await, StoreMode::DegradedEmpty);
        assert_eq!(store.mode(), Some(StoreMode::DegradedEmpty));
        assert!(store.list(EntityKind::Post).is_empty());

        // Degraded boxes still accept writes for the session
        store.put_typed(&Post::new(1, "a", "b", 2));
        assert_eq!(store.get_typed::<Post>(1), Some(Post::new(1, "a", "b", 2)));
    }

    #[tokio::test]
    async fn test_unreadable_record_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let tree = store.tree(EntityKind::Post).unwrap();
        tree.insert(id_key(8), b"not json".to_vec()).unwrap();

        assert_eq!(store.get(EntityKind::Post, 8), None);
        assert!(store.list(EntityKind::Post).is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::new("/tmp/boxes")
            .app_dir("demo")
            .cache_capacity(1024)
            .use_compression(false)
            .flush_every_ms(Some(1000));

        assert_eq!(config.resolve_dir(), PathBuf::from("/tmp/boxes"));
        assert_eq!(config.app_dir, "demo");
        assert_eq!(config.cache_capacity, 1024);
        assert!(!config.use_compression);
        assert_eq!(config.flush_every_ms, Some(1000));
    }

    #[test]
    fn test_config_resolves_platform_dir() {
        let config = StoreConfig::default().app_dir("demo-app");
        assert!(config.resolve_dir().ends_with("demo-app"));
    }
}
