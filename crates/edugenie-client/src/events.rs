//! Session lifecycle events published by the API client.
//!
//! The client announces when a session is established or cleared so that
//! observers (the auth context, a CLI, a UI shell) can follow along without
//! polling the session store.
//!
//! ```
//! use edugenie_client::events::{ClearReason, SessionBroadcaster, SessionEvent};
//!
//! # async fn example() {
//! let broadcaster = SessionBroadcaster::default();
//! let mut receiver = broadcaster.subscribe();
//!
//! broadcaster.send(SessionEvent::cleared(ClearReason::Logout));
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("{}", event.event_name());
//! }
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::UserSummary;

/// Why a session was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
    /// The server answered 401.
    AuthRejected,
    /// The user signed out.
    Logout,
}

impl std::fmt::Display for ClearReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthRejected => write!(f, "auth_rejected"),
            Self::Logout => write!(f, "logout"),
        }
    }
}

/// A change to the persisted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A token and user were persisted after sign-in.
    Established {
        /// The signed-in user.
        user: UserSummary,
        /// When the session was written.
        at: DateTime<Utc>,
    },
    /// The token and user were removed.
    Cleared {
        /// What triggered the clear.
        reason: ClearReason,
        /// When the session was cleared.
        at: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Creates an `Established` event stamped now.
    #[must_use]
    pub fn established(user: UserSummary) -> Self {
        Self::Established { user, at: Utc::now() }
    }

    /// Creates a `Cleared` event stamped now.
    #[must_use]
    pub fn cleared(reason: ClearReason) -> Self {
        Self::Cleared { reason, at: Utc::now() }
    }

    /// Returns the event name as a string.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Established { .. } => "established",
            Self::Cleared { .. } => "cleared",
        }
    }
}

/// Fans session events out to every subscriber.
///
/// Events are not replayed to late subscribers.
#[derive(Debug, Clone)]
pub struct SessionBroadcaster {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionBroadcaster {
    /// Creates a broadcaster buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new subscriber.
    ///
    /// A subscriber that falls behind receives `Lagged` and misses events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event, returning how many subscribers will see it.
    pub fn send(&self, event: SessionEvent) -> usize {
        // No receivers is not an error here.
        self.sender.send(event).unwrap_or(0)
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionBroadcaster {
    fn default() -> Self {
        Self::new(32)
    }
}
