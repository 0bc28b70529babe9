//! Application core for the offline client
//!
//! Wires the connectivity monitor, persistent store and HTTP client into
//! one set of services, and builds the offline-first repositories and
//! UI-facing collaborator seams on top of them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collaborators;
pub mod config;
pub mod error;
pub mod logging;
pub mod repository;
pub mod services;

pub use collaborators::{
    confirm_then, ConfirmationPrompt, LogoutOnConfirm, Navigator, NoopOnConfirm, OnConfirm,
    SessionFlags,
};
pub use config::AppConfig;
pub use error::{AppError, Result};
pub use repository::{DataSource, Fetched, PostRepository, Repository, UserRepository};
pub use services::AppServices;
