//! Route gating: the single decision point for which top-level screen tree
//! the host shell mounts, plus the foreground-resume hook that revalidates
//! the session.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::models::SessionSnapshot;
use crate::session::SessionManager;

/// The three top-level screen trees the shell can mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenTree {
    /// Shown until the first load-from-storage attempt completes. Never make
    /// an auth decision off an uninitialized snapshot.
    Loading,
    /// Welcome / login / register.
    PreAuth,
    /// The authenticated tab navigator.
    Main,
}

/// Host app lifecycle states, as reported by the platform shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAppState {
    Active,
    Inactive,
    Background,
}

/// Consumes session snapshots and answers "which tree is mounted". Also owns
/// the foreground-resume revalidation sequence.
pub struct RouteGate {
    manager: Arc<SessionManager>,
    rx: watch::Receiver<SessionSnapshot>,
}

impl RouteGate {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        let rx = manager.subscribe();
        RouteGate { manager, rx }
    }

    /// Pure mapping from a snapshot to a screen tree.
    pub fn resolve(snapshot: &SessionSnapshot) -> ScreenTree {
        if !snapshot.is_initialized {
            ScreenTree::Loading
        } else if snapshot.is_authenticated {
            ScreenTree::Main
        } else {
            ScreenTree::PreAuth
        }
    }

    /// The tree for the snapshot as of right now.
    pub fn active_tree(&self) -> ScreenTree {
        Self::resolve(&self.rx.borrow())
    }

    /// Wait for the next session transition and return the tree it lands on.
    /// The watch channel delivers transitions in the same tick they are
    /// published; there is no polling interval to wait out.
    pub async fn changed(&mut self) -> ScreenTree {
        // Only errors once the manager is gone, at which point the last
        // observed snapshot is all there is.
        let _ = self.rx.changed().await;
        self.active_tree()
    }

    /// Host lifecycle hook. On transition to the foreground: check expiry
    /// first; if the session survived, refresh the token best-effort. A
    /// failed refresh clears the session and the next resolve lands on the
    /// pre-auth tree; nothing here surfaces an error to the user.
    pub async fn on_app_state_change(&self, next: HostAppState) {
        if next != HostAppState::Active {
            return;
        }

        let expired = self.manager.check_expiry().await;
        if expired {
            debug!("Session expired on foreground resume");
            return;
        }

        if self.manager.snapshot().is_authenticated {
            if let Err(e) = self.manager.refresh().await {
                warn!("Token refresh on foreground resume failed: {}", e);
            }
        }
    }
}
