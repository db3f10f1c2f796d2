//! Who is signed in.
//!
//! Authentication itself happens elsewhere; the engine only needs to know
//! the current user id (if any) and to hear when it changes.

use std::sync::Arc;
use tokio::sync::watch;

pub type IdentityHandle = Arc<dyn IdentityProvider + Send + Sync>;

pub trait IdentityProvider: Send + Sync {
    /// Id of the signed-in user, or `None` when signed out.
    fn current_owner(&self) -> Option<String>;

    /// Receiver that is marked changed whenever the signed-in user changes.
    fn watch(&self) -> watch::Receiver<Option<String>>;
}

/// In-process identity provider.
///
/// Hosts that already track sign-in state elsewhere forward it here with
/// [`sign_in()`](Self::sign_in) and [`sign_out()`](Self::sign_out).
///
/// # Examples
///
/// ```
/// use binge_sync::{IdentityProvider, Session};
///
/// let session = Session::signed_out();
/// assert_eq!(session.current_owner(), None);
/// session.sign_in("u1");
/// assert_eq!(session.current_owner().as_deref(), Some("u1"));
/// ```
pub struct Session {
    sender: watch::Sender<Option<String>>,
}

impl Session {
    pub fn signed_out() -> Self {
        Self { sender: watch::Sender::new(None) }
    }

    pub fn signed_in(id: impl Into<String>) -> Self {
        Self { sender: watch::Sender::new(Some(id.into())) }
    }

    pub fn sign_in(&self, id: impl Into<String>) {
        let id = id.into();
        tracing::debug!(owner = %id, "Signed in");
        self.sender.send_replace(Some(id));
    }

    pub fn sign_out(&self) {
        tracing::debug!("Signed out");
        self.sender.send_replace(None);
    }
}

impl IdentityProvider for Session {
    fn current_owner(&self) -> Option<String> {
        self.sender.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<String>> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_watch_sees_changes() {
        let session = Session::signed_in("u1");
        let mut receiver = session.watch();
        assert_eq!(receiver.borrow_and_update().as_deref(), Some("u1"));
        session.sign_out();
        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow_and_update(), None);
        assert_eq!(session.current_owner(), None);
    }
}
