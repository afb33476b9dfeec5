use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use super::store::{ChangeEvent, ChangeFeed};

/// Reviewer login. Compared verbatim; there is a single shared account.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Shared boolean session flag gating the review panel.
#[derive(Debug)]
pub struct AdminSession {
    credentials: AdminCredentials,
    authenticated: AtomicBool,
    feed: ChangeFeed,
}

impl AdminSession {
    pub fn new(credentials: AdminCredentials, feed: ChangeFeed) -> Self {
        Self {
            credentials,
            authenticated: AtomicBool::new(false),
            feed,
        }
    }

    pub fn login(&self, username: &str, password: &str) -> bool {
        if username != self.credentials.username || password != self.credentials.password {
            warn!(%username, "admin login rejected");
            return false;
        }

        self.authenticated.store(true, Ordering::Release);
        self.feed
            .publish(ChangeEvent::AdminSession { authenticated: true });
        info!(%username, "admin session opened");
        true
    }

    pub fn logout(&self) {
        if self.authenticated.swap(false, Ordering::AcqRel) {
            self.feed
                .publish(ChangeEvent::AdminSession { authenticated: false });
            info!("admin session closed");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }
}
