//! Domain entities held in the local cache
//!
//! Entities are plain records keyed by an integer id. Each variant lives in
//! its own box, identified by a stable string key and a small integer type
//! tag that must never change once data has been written to disk.

use serde::{Deserialize, Serialize};

/// Entity variants known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Posts (box `posts`)
    Post,
    /// Users (box `users`)
    User,
}

impl EntityKind {
    /// Every registered variant, in box-open order
    pub const ALL: [EntityKind; 2] = [EntityKind::Post, EntityKind::User];

    /// Stable key of the box holding this variant
    pub fn box_key(&self) -> &'static str {
        match self {
            EntityKind::Post => "posts",
            EntityKind::User => "users",
        }
    }

    /// Stable on-disk type tag
    pub fn type_tag(&self) -> u8 {
        match self {
            EntityKind::Post => 1,
            EntityKind::User => 2,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.box_key())
    }
}

/// A post as returned by the API
///
/// The API names the text field `body`; it is accepted as an alias for
/// `description` when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Post id
    pub id: i64,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Body text
    #[serde(default, alias = "body")]
    pub description: String,
    /// Author id
    #[serde(default)]
    pub user_id: i64,
}

impl Post {
    /// Create a new post
    pub fn new(
        id: i64,
        title: impl Into<String>,
        description: impl Into<String>,
        user_id: i64,
    ) -> Self {
        Self { id, title: title.into(), description: description.into(), user_id }
    }
}

/// A user as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User id
    pub id: i64,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Login handle
    #[serde(default)]
    pub username: String,
    /// Contact email
    #[serde(default)]
    pub email: String,
}

impl User {
    /// Create a new user
    pub fn new(
        id: i64,
        name: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self { id, name: name.into(), username: username.into(), email: email.into() }
    }
}

/// Any entity the store can hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEntity {
    /// A post
    Post(Post),
    /// A user
    User(User),
}

impl DomainEntity {
    /// The variant of this entity
    pub fn kind(&self) -> EntityKind {
        match self {
            DomainEntity::Post(_) => EntityKind::Post,
            DomainEntity::User(_) => EntityKind::User,
        }
    }

    /// The entity id
    pub fn id(&self) -> i64 {
        match self {
            DomainEntity::Post(post) => post.id,
            DomainEntity::User(user) => user.id,
        }
    }

    /// Borrow as a post, if it is one
    pub fn as_post(&self) -> Option<&Post> {
        match self {
            DomainEntity::Post(post) => Some(post),
            _ => None,
        }
    }

    /// Borrow as a user, if it is one
    pub fn as_user(&self) -> Option<&User> {
        match self {
            DomainEntity::User(user) => Some(user),
            _ => None,
        }
    }
}

impl From<Post> for DomainEntity {
    fn from(post: Post) -> Self {
        DomainEntity::Post(post)
    }
}

impl From<User> for DomainEntity {
    fn from(user: User) -> Self {
        DomainEntity::User(user)
    }
}
