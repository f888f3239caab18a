//! FlowBus pub/sub for mount lifecycle notifications.
//!
//! The mount manager publishes a [`MountFlow`] whenever a mountpoint becomes
//! available or goes away. Subscribers use NATS-style subject patterns:
//!
//! - `*` matches exactly one token: `vfs.*` matches `vfs.mount` and `vfs.unmount`
//! - `>` matches one or more tokens (only at end)
//! - Exact match: `vfs.mount` only matches `vfs.mount`
//!
//! # Example
//!
//! ```ignore
//! let mut sub = manager.events().subscribe("vfs.*");
//! manager.add(NewMount::new("Share", "WebDAV"))?;
//!
//! while let Some(msg) = sub.recv().await {
//!     println!("{} {}", msg.subject, msg.payload.name());
//! }
//! ```

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ============================================================================
// Pattern Matching
// ============================================================================

/// Check if a subject matches a pattern.
///
/// Patterns use NATS-style wildcards:
/// - `*` matches exactly one token
/// - `>` matches one or more tokens (only at end)
pub fn matches_pattern(pattern: &str, subject: &str) -> bool {
    let pattern_tokens: Vec<&str> = pattern.split('.').collect();
    let subject_tokens: Vec<&str> = subject.split('.').collect();

    let mut pi = 0;
    let mut si = 0;

    while pi < pattern_tokens.len() && si < subject_tokens.len() {
        match pattern_tokens[pi] {
            ">" => {
                // `>` must be last and swallows the remaining tokens
                return pi == pattern_tokens.len() - 1;
            }
            "*" => {
                pi += 1;
                si += 1;
            }
            token => {
                if token != subject_tokens[si] {
                    return false;
                }
                pi += 1;
                si += 1;
            }
        }
    }

    pi == pattern_tokens.len() && si == subject_tokens.len()
}

// ============================================================================
// Flow Message Types
// ============================================================================

/// Trait for payloads that know their subject.
pub trait HasSubject {
    /// Get the subject string for this payload.
    fn subject(&self) -> &str;
}

/// A message published to the flow bus.
#[derive(Clone, Debug)]
pub struct FlowMessage<T> {
    /// The subject (derived from payload).
    pub subject: String,
    /// The payload data.
    pub payload: T,
    /// When this message was created.
    pub timestamp: Instant,
}

impl<T: HasSubject> FlowMessage<T> {
    /// Create a new flow message.
    pub fn new(payload: T) -> Self {
        let subject = payload.subject().to_string();
        Self {
            subject,
            payload,
            timestamp: Instant::now(),
        }
    }
}

// ============================================================================
// Mount Flow Events
// ============================================================================

/// Mount lifecycle events.
///
/// `source` identifies the originator (e.g. a window id) so that it can
/// ignore the echo of its own change. The mount manager itself publishes
/// with `source: None`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountFlow {
    /// A mountpoint was registered or came online.
    Mounted {
        /// Mountpoint name.
        name: String,
        /// Originator of the change.
        source: Option<String>,
    },

    /// A mountpoint was unmounted.
    Unmounted {
        /// Mountpoint name.
        name: String,
        /// Originator of the change.
        source: Option<String>,
    },
}

impl MountFlow {
    /// Mounted event with no originator.
    pub fn mounted(name: impl Into<String>) -> Self {
        Self::Mounted {
            name: name.into(),
            source: None,
        }
    }

    /// Unmounted event with no originator.
    pub fn unmounted(name: impl Into<String>) -> Self {
        Self::Unmounted {
            name: name.into(),
            source: None,
        }
    }

    /// Get the subject string for this event.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Mounted { .. } => "vfs.mount",
            Self::Unmounted { .. } => "vfs.unmount",
        }
    }

    /// Get the mountpoint name.
    pub fn name(&self) -> &str {
        match self {
            Self::Mounted { name, .. } | Self::Unmounted { name, .. } => name,
        }
    }

    /// Get the originator, if any.
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Mounted { source, .. } | Self::Unmounted { source, .. } => source.as_deref(),
        }
    }
}

impl HasSubject for MountFlow {
    fn subject(&self) -> &str {
        MountFlow::subject(self)
    }
}

// ============================================================================
// FlowBus
// ============================================================================

/// Type-parameterized pub/sub bus for a specific flow domain.
///
/// Uses a broadcast channel internally for multi-subscriber delivery.
/// Subscribers receive only messages matching their pattern.
#[derive(Debug)]
pub struct FlowBus<T: Clone + Send + 'static> {
    tx: broadcast::Sender<FlowMessage<T>>,
    capacity: usize,
}

impl<T: Clone + Send + 'static> FlowBus<T> {
    /// Create a new flow bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Get the channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Send + HasSubject + 'static> FlowBus<T> {
    /// Publish a payload to the bus.
    ///
    /// Returns the number of subscribers that received the message; zero
    /// when nobody is listening.
    pub fn publish(&self, payload: T) -> usize {
        let msg = FlowMessage::new(payload);
        self.tx.send(msg).unwrap_or(0)
    }

    /// Subscribe to messages matching a pattern.
    pub fn subscribe(&self, pattern: &str) -> Subscription<T> {
        Subscription {
            pattern: pattern.to_string(),
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone + Send + 'static> Clone for FlowBus<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            capacity: self.capacity,
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A subscription to a FlowBus with pattern filtering.
pub struct Subscription<T: Clone> {
    pattern: String,
    rx: broadcast::Receiver<FlowMessage<T>>,
}

impl<T: Clone> Subscription<T> {
    /// Get the subscription pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Receive the next matching message, waiting if necessary.
    ///
    /// Returns None if the channel is closed.
    pub async fn recv(&mut self) -> Option<FlowMessage<T>> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => {
                    if matches_pattern(&self.pattern, &msg.subject) {
                        return Some(msg);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        pattern = %self.pattern,
                        lagged = n,
                        "Flow subscription lagged behind"
                    );
                }
            }
        }
    }

    /// Try to receive the next matching message without blocking.
    ///
    /// Returns None if no matching message is available.
    pub fn try_recv(&mut self) -> Option<FlowMessage<T>> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) => {
                    if matches_pattern(&self.pattern, &msg.subject) {
                        return Some(msg);
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(
                        pattern = %self.pattern,
                        lagged = n,
                        "Flow subscription lagged behind"
                    );
                }
            }
        }
    }
}

impl<T: Clone> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Thread-safe handle to a MountFlow bus.
pub type SharedMountFlowBus = Arc<FlowBus<MountFlow>>;

/// Create a new shared mount flow bus.
pub fn shared_mount_flow_bus(capacity: usize) -> SharedMountFlowBus {
    Arc::new(FlowBus::new(capacity))
}

// ============================================================================
// Tests
// ============================================================================
