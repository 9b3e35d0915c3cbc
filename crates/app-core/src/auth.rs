//! Identity collaborator
//!
//! The monitor keys every remote read by the signed-in user. Sign-in itself
//! lives elsewhere in the app; this module only defines how the monitor asks
//! who that user is.

use notify_client::UserId;
use parking_lot::RwLock;

/// Source of the currently authenticated user
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, or `None` when signed out
    fn current_user(&self) -> Option<UserId>;
}

/// Identity held in memory and updated by the sign-in flow
///
/// # Example
///
/// ```rust
/// use app_core::auth::{IdentityProvider, SessionIdentity};
/// use notify_client::UserId;
///
/// let identity = SessionIdentity::signed_out();
/// assert!(identity.current_user().is_none());
///
/// identity.sign_in(UserId::new("user-1"));
/// assert_eq!(identity.current_user(), Some(UserId::new("user-1")));
/// ```
#[derive(Debug, Default)]
pub struct SessionIdentity {
    user: RwLock<Option<UserId>>,
}

impl SessionIdentity {
    /// Identity with a signed-in user
    pub fn new(user: UserId) -> Self {
        Self { user: RwLock::new(Some(user)) }
    }

    /// Identity with nobody signed in
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Record a sign-in
    pub fn sign_in(&self, user: UserId) {
        *self.user.write() = Some(user);
    }

    /// Record a sign-out
    pub fn sign_out(&self) {
        *self.user.write() = None;
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.user.read().clone()
    }
}
