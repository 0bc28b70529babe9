//! Collaborator interfaces
//!
//! The data layer never draws UI or owns the session. These traits are what
//! the surrounding app implements so that flows such as "confirm, then reset
//! to the first screen" can be driven from here.

use async_trait::async_trait;
use tracing::debug;

/// Asks the user a yes/no question
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    /// Show the prompt and wait for the answer
    async fn confirm(&self, title: &str, message: &str) -> bool;
}

/// Screen navigation owned by the UI
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    /// Drop the navigation stack and return to the initial screen
    fn reset_to_initial(&self);
}

/// Session state owned by the app
#[cfg_attr(test, mockall::automock)]
pub trait SessionFlags: Send + Sync {
    /// Whether a user is logged in
    fn is_logged_in(&self) -> bool;

    /// Record the logged-in flag
    fn set_logged_in(&self, logged_in: bool);
}

/// Action run after the user confirms
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OnConfirm: Send + Sync {
    /// Run the confirmed action
    async fn on_confirm(&self);
}

/// Confirmation hook that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOnConfirm;

#[async_trait]
impl OnConfirm for NoopOnConfirm {
    async fn on_confirm(&self) {}
}

/// Hook that logs the user out and returns to the initial screen
pub struct LogoutOnConfirm<'a> {
    session: &'a dyn SessionFlags,
    navigator: &'a dyn Navigator,
}

impl<'a> LogoutOnConfirm<'a> {
    /// Create the hook
    pub fn new(session: &'a dyn SessionFlags, navigator: &'a dyn Navigator) -> Self {
        Self { session, navigator }
    }
}

#[async_trait]
impl OnConfirm for LogoutOnConfirm<'_> {
    async fn on_confirm(&self) {
        self.session.set_logged_in(false);
        self.navigator.reset_to_initial();
    }
}

/// Prompt the user and run `hook` only if they confirm
///
/// Returns whether the user confirmed.
pub async fn confirm_then(
    prompt: &dyn ConfirmationPrompt,
    title: &str,
    message: &str,
    hook: &dyn OnConfirm,
) -> bool {
    let confirmed = prompt.confirm(title, message).await;
    debug!("Prompt '{}' answered: {}", title, confirmed);

    if confirmed {
        hook.on_confirm().await;
    }
    confirmed
}
