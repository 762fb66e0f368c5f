//! Advisory access gate for a single session.
//!
//! The secret is compared with what the user types and a flag is kept for the
//! lifetime of the session. It keeps casual users out of the front-end; it is
//! not an authentication mechanism.

use std::sync::atomic::{AtomicBool, Ordering};

pub struct SessionGate {
    secret: Option<String>,
    unlocked: AtomicBool,
}

impl SessionGate {
    /// A gate with no secret is always open.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret,
            unlocked: AtomicBool::new(false),
        }
    }

    /// Unlock the session if `input` matches the secret.
    pub fn try_unlock(&self, input: &str) -> bool {
        let ok = match &self.secret {
            Some(secret) => secret == input,
            None => true,
        };
        if ok {
            self.unlocked.store(true, Ordering::SeqCst);
        } else {
            log::debug!("Rejected session unlock attempt");
        }
        ok
    }

    pub fn is_authenticated(&self) -> bool {
        self.secret.is_none() || self.unlocked.load(Ordering::SeqCst)
    }

    /// Lock the session again.
    pub fn end(&self) {
        self.unlocked.store(false, Ordering::SeqCst);
    }
}
